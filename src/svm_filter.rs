//! Runs the `filter` tool over an encoded training/validation pair.
//!
//! Given tr.svm and va.svm, running
//!
//! cargo run --bin filter tr.svm va.svm --min-support 10
//!
//! counts feature occurrences in tr.svm, then rewrites both files in place
//! keeping only retained indices, each as `index:1`, plus a bias feature
//! at the end of every line.
use std::error::Error;
use std::path::PathBuf;
use structopt::StructOpt;

use hfe::config::FilterConfig;
use hfe::filter::{self, RetentionPolicy};

#[derive(Debug, StructOpt)]
#[structopt(name = "filter", about = "Prune features of svmlight files by training support.")]
struct Opt {
    /// Training svmlight file. Occurrences are counted here.
    train: PathBuf,

    /// Validation svmlight file. Rewritten with the same retained indices.
    valid: PathBuf,

    /// Index of the bias feature appended to every line.
    #[structopt(long, default_value = "10000500")]
    bias_index: u64,

    /// Lines whose label equals this are counted as positive.
    #[structopt(long, default_value = "1")]
    positive_label: String,

    /// Retain only indices occurring at least this many times in training.
    #[structopt(long)]
    min_support: Option<u64>,

    /// Retain only indices whose positive rate in training falls outside
    /// [LOW, HIGH]. Combines with --min-support.
    #[structopt(long, number_of_values = 2, value_names = &["LOW", "HIGH"])]
    rate_band: Option<Vec<f64>>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opt = Opt::from_args();
    let retention = match (opt.min_support, opt.rate_band) {
        (min_total, Some(band)) => RetentionPolicy::RateBand {
            min_total: min_total.unwrap_or(0),
            low: band[0],
            high: band[1],
        },
        (Some(min_total), None) => RetentionPolicy::MinSupport { min_total },
        (None, None) => RetentionPolicy::All,
    };
    let config = FilterConfig {
        bias_index: opt.bias_index,
        positive_label: opt.positive_label,
        retention,
        ..FilterConfig::new(opt.train, opt.valid)
    };
    filter::filter_files(&config)?;
    Ok(())
}
