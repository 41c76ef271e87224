//! Runs the `count` pre-pass: counts every categorical value of a CSV by
//! label and writes a `Field,Value,Neg,Pos,Total` table, sorted by field
//! and then by descending total.
//!
//! The table is what `convert --frequencies` reads to collapse rare
//! categories.

use std::error::Error;
use std::path::PathBuf;
use structopt::StructOpt;

use hfe::config::{CountConfig, SchemaOpt};

#[derive(Debug, StructOpt)]
#[structopt(name = "count", about = "Count categorical values of a CSV click log.")]
struct Opt {
    /// Input CSV, including a header row.
    csv_path: PathBuf,

    /// Output frequency table, replaced if it exists.
    out_path: PathBuf,

    #[structopt(flatten)]
    schema: SchemaOpt,

    /// Rows whose label equals this are counted as positive.
    #[structopt(long, default_value = "1")]
    positive_label: String,

    /// Leave out values seen fewer times than this.
    #[structopt(long, default_value = "0")]
    min_count: u64,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opt = Opt::from_args();
    let config = CountConfig {
        schema: opt.schema.schema()?,
        positive_label: opt.positive_label,
        min_count: opt.min_count,
        ..CountConfig::new(opt.csv_path, opt.out_path)
    };
    hfe::count_frequencies(&config)?;
    Ok(())
}
