//! Rare-category collapsing.
//!
//! A categorical value is kept only if it was seen at least `threshold`
//! times in a corpus pass. Anything rarer is replaced by a per-field
//! sentinel, so all rare values of a field share one hashed index.
//!
//! Counts live in a `FrequencyTable` keyed by `<field>-<value>` tokens, e.g.
//! `C3-a1b2c3`. The table is produced once by `FrequencyCounter` (the
//! `count` binary) and loaded read-only by the converter.

use crate::atomic::AtomicFile;
use crate::error::{Error, Result};
use crate::schema::{self, FieldDescriptor, ResolvedSchema};
use hashbrown::HashMap;
use itertools::Itertools;
use log::info;
use std::borrow::Cow;
use std::path::Path;

/// Frequency table token for a field value.
pub fn token(field: &FieldDescriptor, value: &str) -> String {
    format!("{}-{}", field.name, value)
}

/// The value every rare category of `field` is replaced with.
pub fn sentinel(field: &FieldDescriptor) -> String {
    format!("{}less", field.name)
}

#[derive(Debug, Default, Clone)]
pub struct FrequencyTable {
    counts: HashMap<String, u64>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: String, count: u64) {
        self.counts.insert(token, count);
    }

    /// Occurrence count of `token`; tokens never seen count as 0.
    pub fn count(&self, token: &str) -> u64 {
        self.counts.get(token).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Load a table from CSV with (at least) `Field`, `Value` and `Total`
    /// header columns, as written by `FrequencyCounter::write_csv`.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = crate::open_csv(path.as_ref())?;
        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                Error::config(format!(
                    "frequency table {:?} has no {} column",
                    path.as_ref(),
                    name
                ))
            })
        };
        let (field, value, total) = (column("Field")?, column("Value")?, column("Total")?);

        let mut table = FrequencyTable::new();
        for record in reader.records() {
            let record = record?;
            let line = schema::record_line(&record);
            let count = schema::cell(&record, total)?;
            let count: u64 = count
                .parse()
                .map_err(|_| Error::parse(line, format!("bad Total {:?}", count)))?;
            let token = format!(
                "{}-{}",
                schema::cell(&record, field)?,
                schema::cell(&record, value)?
            );
            table.insert(token, count);
        }
        Ok(table)
    }
}

impl std::iter::FromIterator<(String, u64)> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        FrequencyTable {
            counts: iter.into_iter().collect(),
        }
    }
}

/// Replaces categorical values seen fewer than `threshold` times.
pub struct Collapser<'a> {
    table: &'a FrequencyTable,
    threshold: u64,
}

impl<'a> Collapser<'a> {
    pub fn new(table: &'a FrequencyTable, threshold: u64) -> Self {
        Collapser { table, threshold }
    }

    /// Continuous fields pass through untouched. Collapsing is idempotent:
    /// the sentinel is never itself a frequent token, so it maps to itself.
    pub fn collapse<'v>(&self, field: &FieldDescriptor, value: &'v str) -> Cow<'v, str> {
        if !field.kind.is_categorical() {
            return Cow::Borrowed(value);
        }
        if self.table.count(&token(field, value)) < self.threshold {
            Cow::Owned(sentinel(field))
        } else {
            Cow::Borrowed(value)
        }
    }
}

/// Per-value label counts gathered by `FrequencyCounter`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct LabelCounts {
    pub negative: u64,
    pub positive: u64,
}

impl LabelCounts {
    pub fn total(&self) -> u64 {
        self.negative + self.positive
    }
}

/// The corpus pre-pass that builds a frequency table: counts every
/// categorical value of every row, split by label.
pub struct FrequencyCounter<'a> {
    schema: &'a ResolvedSchema,
    positive_label: String,
    // one map per schema field, categorical fields only get entries
    counts: Vec<HashMap<String, LabelCounts>>,
    rows: u64,
}

impl<'a> FrequencyCounter<'a> {
    pub fn new(schema: &'a ResolvedSchema, positive_label: impl Into<String>) -> Self {
        FrequencyCounter {
            schema,
            positive_label: positive_label.into(),
            counts: vec![HashMap::new(); schema.fields.len()],
            rows: 0,
        }
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn observe(&mut self, record: &csv::StringRecord) -> Result<()> {
        let positive = self.schema.label(record)? == self.positive_label;
        for (i, (column, field)) in self.schema.fields.iter().enumerate() {
            if !field.kind.is_categorical() {
                continue;
            }
            let value = schema::cell(record, *column)?;
            let counts = self.counts[i].entry_ref(value).or_default();
            if positive {
                counts.positive += 1;
            } else {
                counts.negative += 1;
            }
        }
        self.rows += 1;
        Ok(())
    }

    /// Table of totals, dropping tokens seen fewer than `min_count` times.
    pub fn table(&self, min_count: u64) -> FrequencyTable {
        self.entries(min_count)
            .map(|(field, value, counts)| (token(field, value), counts.total()))
            .collect()
    }

    /// Entries in schema field order, then by descending total, then value.
    fn entries(
        &self,
        min_count: u64,
    ) -> impl Iterator<Item = (&FieldDescriptor, &str, LabelCounts)> + '_ {
        self.schema
            .fields
            .iter()
            .zip(self.counts.iter())
            .flat_map(move |((_, field), counts)| {
                counts
                    .iter()
                    .filter(move |(_, c)| c.total() >= min_count)
                    .sorted_by(|(lv, lc), (rv, rc)| {
                        rc.total().cmp(&lc.total()).then_with(|| lv.cmp(rv))
                    })
                    .map(move |(value, c)| (field, value.as_str(), *c))
            })
    }

    /// Writes `Field,Value,Neg,Pos,Total` rows, replacing `path` atomically.
    pub fn write_csv(&self, path: impl AsRef<Path>, min_count: u64) -> Result<usize> {
        let mut out = AtomicFile::create(path.as_ref())?;
        let mut nwritten = 0;
        {
            let mut writer = csv::Writer::from_writer(&mut out);
            writer.write_record(&["Field", "Value", "Neg", "Pos", "Total"])?;
            for (field, value, counts) in self.entries(min_count) {
                let (neg, pos, total) = (
                    counts.negative.to_string(),
                    counts.positive.to_string(),
                    counts.total().to_string(),
                );
                writer.write_record(&[field.name.as_str(), value, &neg, &pos, &total])?;
                nwritten += 1;
            }
            writer.flush()?;
        }
        out.commit()?;
        info!(
            "wrote {} frequency entries from {} rows to {:?}",
            nwritten,
            self.rows,
            path.as_ref()
        );
        Ok(nwritten)
    }
}
