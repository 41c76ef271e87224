//! Run configuration for the `convert`, `count` and `filter` tools.
//!
//! All configurations are plain immutable structs. `validate` is called
//! before any input is read, so a bad option fails the run up front.

use crate::atomic;
use crate::error::{Error, Result};
use crate::filter::{RetentionPolicy, DEFAULT_BIAS_INDEX};
use crate::schema::{Column, Layout, Schema};
use std::path::{Path, PathBuf};
use structopt::clap::arg_enum;
use structopt::StructOpt;

pub const DEFAULT_NR_BINS: u64 = 10_000_000;
pub const DEFAULT_THRESHOLD: u64 = 10;
pub const DEFAULT_POSITIVE_LABEL: &str = "1";

/// Rare-category collapsing: load counts from `frequencies` and collapse
/// categorical values seen fewer than `threshold` times.
#[derive(Debug, Clone, PartialEq)]
pub struct CollapseConfig {
    pub frequencies: PathBuf,
    pub threshold: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertConfig {
    pub csv_path: PathBuf,
    pub svm_path: PathBuf,
    pub nr_bins: u64,
    pub collapse: Option<CollapseConfig>,
    pub schema: Schema,
    pub layout: Layout,
}

impl ConvertConfig {
    /// Reference schema and layout with default bin count and no collapsing.
    pub fn new(csv_path: impl Into<PathBuf>, svm_path: impl Into<PathBuf>) -> Self {
        ConvertConfig {
            csv_path: csv_path.into(),
            svm_path: svm_path.into(),
            nr_bins: DEFAULT_NR_BINS,
            collapse: None,
            schema: Schema::reference_positional(),
            layout: Layout::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.nr_bins == 0 {
            return Err(Error::config("nr_bins must be positive"));
        }
        if self.layout.hash_offset.checked_add(self.nr_bins).is_none() {
            return Err(Error::config(format!(
                "hashed indices overflow: offset {} + {} bins",
                self.layout.hash_offset, self.nr_bins
            )));
        }
        check_not_clobbered(&self.csv_path, &self.svm_path)?;
        if let Some(collapse) = &self.collapse {
            check_not_clobbered(&collapse.frequencies, &self.svm_path)?;
        }
        self.schema.validate(&self.layout)
    }
}

/// Frequency counting pre-pass. Tokens with a total below `min_count` are
/// left out of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct CountConfig {
    pub csv_path: PathBuf,
    pub out_path: PathBuf,
    pub schema: Schema,
    pub positive_label: String,
    pub min_count: u64,
}

impl CountConfig {
    pub fn new(csv_path: impl Into<PathBuf>, out_path: impl Into<PathBuf>) -> Self {
        CountConfig {
            csv_path: csv_path.into(),
            out_path: out_path.into(),
            schema: Schema::reference_positional(),
            positive_label: DEFAULT_POSITIVE_LABEL.to_owned(),
            min_count: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.positive_label.is_empty() {
            return Err(Error::config("positive label must not be empty"));
        }
        check_not_clobbered(&self.csv_path, &self.out_path)?;
        if self.schema.ncategorical() == 0 {
            return Err(Error::config("schema has no categorical fields to count"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    pub train_path: PathBuf,
    pub validation_path: PathBuf,
    pub bias_index: u64,
    pub positive_label: String,
    pub retention: RetentionPolicy,
}

impl FilterConfig {
    pub fn new(train_path: impl Into<PathBuf>, validation_path: impl Into<PathBuf>) -> Self {
        FilterConfig {
            train_path: train_path.into(),
            validation_path: validation_path.into(),
            bias_index: DEFAULT_BIAS_INDEX,
            positive_label: DEFAULT_POSITIVE_LABEL.to_owned(),
            retention: RetentionPolicy::All,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.positive_label.is_empty() {
            return Err(Error::config("positive label must not be empty"));
        }
        // both files are rewritten in place
        check_not_clobbered(&self.train_path, &self.validation_path)?;
        check_not_clobbered(&self.validation_path, &self.train_path)?;
        self.retention.validate()
    }
}

/// Fails if writing `output` would touch `input`, either directly or through
/// the temporary file `output` is staged in.
fn check_not_clobbered(input: &Path, output: &Path) -> Result<()> {
    let temp = atomic::temp_path(output);
    for &(target, what) in &[(output, "output"), (temp.as_path(), "temporary output")] {
        if same_file(input, target) {
            return Err(Error::config(format!(
                "input {:?} is also the {} {:?}",
                input, what, target
            )));
        }
    }
    Ok(())
}

/// Compares canonical paths when both exist, the paths as given otherwise.
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

arg_enum! {

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Preset {
    Positional,
    Named
}

}

/// Command-line options selecting the CSV column layout, shared by the
/// `convert` and `count` binaries.
#[derive(Debug, StructOpt)]
pub struct SchemaOpt {
    /// Column layout. `positional` expects `Id, Label, I1..I13, C1..C26`
    /// in that order and ignores the header names. `named` looks up the
    /// header names `Label`, `I1..I13` and `C1..C26` instead.
    #[structopt(
        long,
        possible_values = &Preset::variants(),
        case_insensitive = true,
        default_value = "positional"
    )]
    pub layout: Preset,

    /// Read the label from this 0-based column instead.
    #[structopt(long)]
    pub label_column: Option<usize>,

    /// Read the label from the column with this header name instead.
    #[structopt(long)]
    pub label_name: Option<String>,
}

impl SchemaOpt {
    pub fn schema(&self) -> Result<Schema> {
        let mut schema = match self.layout {
            Preset::Positional => Schema::reference_positional(),
            Preset::Named => Schema::reference_named(),
        };
        match (self.label_column, &self.label_name) {
            (Some(_), Some(_)) => {
                return Err(Error::config(
                    "--label-column and --label-name are mutually exclusive",
                ))
            }
            (Some(position), None) => schema.label = Column::Position(position),
            (None, Some(name)) => schema.label = Column::Name(name.clone()),
            (None, None) => {}
        }
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        ConvertConfig::new("tr.csv", "tr.svm").validate().unwrap();
        CountConfig::new("tr.csv", "freq.csv").validate().unwrap();
        FilterConfig::new("tr.svm", "va.svm").validate().unwrap();
    }

    #[test]
    fn zero_bins() {
        let mut config = ConvertConfig::new("tr.csv", "tr.svm");
        config.nr_bins = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        config.nr_bins = 1;
        config.validate().unwrap();
    }

    #[test]
    fn bin_overflow() {
        let mut config = ConvertConfig::new("tr.csv", "tr.svm");
        config.nr_bins = u64::MAX;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn same_paths() {
        let config = ConvertConfig::new("x", "x");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        let config = FilterConfig::new("x", "x");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        let config = CountConfig::new("x", "x");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn input_is_temporary_output() {
        let config = ConvertConfig::new("tr.svm.tmp", "tr.svm");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        let config = CountConfig::new("freq.csv.tmp", "freq.csv");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        let config = FilterConfig::new("va.svm.tmp", "va.svm");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        let config = FilterConfig::new("tr.svm", "tr.svm.tmp");
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = ConvertConfig::new("tr.csv", "tr.svm");
        config.collapse = Some(CollapseConfig {
            frequencies: "tr.svm.tmp".into(),
            threshold: 10,
        });
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn same_file_through_different_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tr.csv"), "Label\n").unwrap();
        let config = ConvertConfig::new(
            dir.path().join("tr.csv"),
            dir.path().join(".").join("tr.csv"),
        );
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn bad_rate_band() {
        let mut config = FilterConfig::new("tr.svm", "va.svm");
        config.retention = RetentionPolicy::RateBand {
            min_total: 100,
            low: 0.45,
            high: 0.25,
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn empty_positive_label() {
        let mut config = FilterConfig::new("tr.svm", "va.svm");
        config.positive_label = String::new();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn schema_options() {
        let opt = SchemaOpt::from_iter(&["hfe"]);
        assert_eq!(opt.schema().unwrap(), Schema::reference_positional());

        let opt = SchemaOpt::from_iter(&["hfe", "--layout", "named", "--label-name", "y"]);
        let schema = opt.schema().unwrap();
        assert_eq!(schema.label, Column::Name("y".to_owned()));
        assert_eq!(schema.fields, Schema::reference_named().fields);

        let opt = SchemaOpt::from_iter(&["hfe", "--label-column", "0"]);
        assert_eq!(opt.schema().unwrap().label, Column::Position(0));

        let opt = SchemaOpt::from_iter(&["hfe", "--label-column", "0", "--label-name", "y"]);
        assert!(matches!(opt.schema(), Err(Error::Config(_))));
    }
}
