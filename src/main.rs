//! Main file runs the `convert` command-line application, which encodes a
//! click log CSV into an svmlight file with hashed categorical features.

use std::error::Error;
use std::path::PathBuf;
use structopt::StructOpt;

use hfe::config::{self, CollapseConfig, ConvertConfig, SchemaOpt};
use hfe::schema::Layout;

/// Reads a CSV file with a header row and writes one svmlight line per
/// row, `<label> <index>:<value>...`, with indices ascending.
///
/// Each continuous field `i` contributes its value divided by the field
/// maximum at index `i`, the natural log of the value at
/// `i + log_offset` when the value is at least 1, and a hashed indicator
/// of its raw text. Each categorical field contributes a hashed indicator
/// only. Hashed indicators land in `[hash_offset, hash_offset + nr_bins)`.
///
/// With --frequencies, categorical values counted fewer than --threshold
/// times (see the `count` binary) are replaced by a per-field `<field>less`
/// value before hashing.
///
/// The output file is written next to its destination and renamed into
/// place at the end, so a failed run leaves no partial output.
///
/// Set `RUST_LOG=debug` for more detail.
#[derive(Debug, StructOpt)]
#[structopt(name = "convert", about = "Encode a CSV click log as svmlight.")]
struct Opt {
    /// Input CSV, including a header row.
    csv_path: PathBuf,

    /// Output svmlight file, replaced if it exists.
    svm_path: PathBuf,

    /// Number of hash bins for indicator features.
    #[structopt(short = "n", long, default_value = "10000000")]
    nr_bins: u64,

    /// Categories seen fewer times than this are collapsed. Only used with
    /// --frequencies.
    #[structopt(short = "t", long, default_value = "10")]
    threshold: u64,

    /// Frequency table CSV with `Field`, `Value` and `Total` columns, as
    /// written by `count`.
    #[structopt(long)]
    frequencies: Option<PathBuf>,

    #[structopt(flatten)]
    schema: SchemaOpt,

    /// Offset of log-transformed continuous features.
    #[structopt(long, default_value = "14")]
    log_offset: u32,

    /// Offset of hashed indicator features.
    #[structopt(long, default_value = "28")]
    hash_offset: u64,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if std::env::args_os().len() <= 1 {
        Opt::clap().print_help()?;
        println!();
        return Ok(());
    }
    let opt = Opt::from_args();
    let threshold = opt.threshold;

    let config = ConvertConfig {
        nr_bins: opt.nr_bins,
        collapse: opt.frequencies.map(|frequencies| CollapseConfig {
            frequencies,
            threshold,
        }),
        schema: opt.schema.schema()?,
        layout: Layout {
            log_offset: opt.log_offset,
            hash_offset: opt.hash_offset,
        },
        ..ConvertConfig::new(opt.csv_path, opt.svm_path)
    };
    if config.collapse.is_none() && threshold != config::DEFAULT_THRESHOLD {
        log::warn!("--threshold has no effect without --frequencies");
    }

    hfe::read_featurize_write(&config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_flags() {
        let opt = Opt::from_iter(&["convert", "tr.csv", "tr.svm", "-n", "100", "-t", "3"]);
        assert_eq!(opt.nr_bins, 100);
        assert_eq!(opt.threshold, 3);
        let opt = Opt::from_iter(&["convert", "tr.csv", "tr.svm", "--nr-bins", "7"]);
        assert_eq!(opt.nr_bins, 7);
        assert_eq!(opt.threshold, config::DEFAULT_THRESHOLD);
    }
}
