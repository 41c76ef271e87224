//! `hfe` stands for hashed feature encoding. It converts tabular click logs
//! in CSV form into sparse svmlight files, using the hashing trick for
//! categorical values and simple transforms for numeric ones.
//!
//! Three batch tools sit on top of the library:
//!
//! - `convert` encodes a CSV file (`read_featurize_write`).
//! - `count` builds the per-value frequency table that `convert` can use
//!   to collapse rare categories (`count_frequencies`).
//! - `filter` prunes feature indices of an encoded training/validation pair
//!   based on their training occurrences (`filter::filter_files`).

pub mod atomic;
pub mod config;
mod error;
pub mod feature;
pub mod filter;
pub mod frequency;
pub mod hasher;
pub mod scanner;
pub mod schema;
pub mod svmlight;

pub use error::{Error, Result};

use atomic::AtomicFile;
use config::{ConvertConfig, CountConfig};
use csv::StringRecord;
use feature::{FeatureSet, Featurizer};
use frequency::{Collapser, FrequencyCounter, FrequencyTable};
use log::{debug, info};
use std::fs::File;
use std::path::Path;
use std::time::Instant;

/// Opens a CSV with a header row. Rows may have varying lengths; short rows
/// are reported when a missing column is accessed.
pub(crate) fn open_csv(path: &Path) -> Result<csv::Reader<File>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    Ok(reader)
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ConvertSummary {
    pub rows: u64,
    pub features: u64,
}

/// Encodes every row of `config.csv_path` into one svmlight line of
/// `config.svm_path`. The output only appears once all rows are written.
pub fn read_featurize_write(config: &ConvertConfig) -> Result<ConvertSummary> {
    config.validate()?;
    debug!(
        "nr_bins {} layout {:?} fields {} continuous {} categorical",
        config.nr_bins,
        config.layout,
        config.schema.ncontinuous(),
        config.schema.ncategorical()
    );

    let table = match &config.collapse {
        Some(collapse) => {
            let start = Instant::now();
            let table = FrequencyTable::from_csv(&collapse.frequencies)?;
            info!(
                "load frequencies {:?} {:.0?}",
                collapse.frequencies,
                Instant::now().duration_since(start)
            );
            info!(
                "num tokens {} threshold {}",
                table.len(),
                collapse.threshold
            );
            Some((table, collapse.threshold))
        }
        None => None,
    };
    let collapser = table
        .as_ref()
        .map(|(table, threshold)| Collapser::new(table, *threshold));

    let mut reader = open_csv(&config.csv_path)?;
    let resolved = config.schema.resolve(reader.headers()?)?;
    let featurizer = Featurizer::new(&resolved, config.layout, config.nr_bins, collapser);

    let start = Instant::now();
    let mut out = AtomicFile::create(&config.svm_path)?;
    let mut record = StringRecord::new();
    let mut features = FeatureSet::new();
    let mut summary = ConvertSummary::default();
    while reader.read_record(&mut record)? {
        let label = resolved.label(&record)?;
        featurizer.extract_into(&record, &mut features)?;
        svmlight::write_line(&mut out, label, &features)?;
        summary.rows += 1;
        summary.features += features.len() as u64;
    }
    out.commit()?;
    info!(
        "convert rows {:?} {:.0?}",
        config.csv_path,
        Instant::now().duration_since(start)
    );
    info!(
        "num rows {} features written {}",
        summary.rows, summary.features
    );
    Ok(summary)
}

/// Counts categorical values of `config.csv_path` by label and writes the
/// frequency table to `config.out_path`. Returns the number of entries.
pub fn count_frequencies(config: &CountConfig) -> Result<usize> {
    config.validate()?;
    let mut reader = open_csv(&config.csv_path)?;
    let resolved = config.schema.resolve(reader.headers()?)?;
    let mut counter = FrequencyCounter::new(&resolved, config.positive_label.as_str());

    let start = Instant::now();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        counter.observe(&record)?;
    }
    info!(
        "count {:?} {:.0?}",
        config.csv_path,
        Instant::now().duration_since(start)
    );
    info!("num rows {}", counter.rows());

    counter.write_csv(&config.out_path, config.min_count)
}
