//! Static description of the CSV columns: which column holds the label, which
//! fields are continuous or categorical, and where each kind of feature lands
//! in the output index space.
//!
//! Columns are referenced either by position or by header name. A `Schema`
//! is resolved once against the header row into a `ResolvedSchema`, which
//! only carries positions, so per-row extraction never looks at names.

use crate::error::{Error, Result};
use csv::StringRecord;
use hashbrown::HashSet;
use std::collections::BTreeMap;

/// Maximum observed values of the thirteen integer fields of the reference
/// click log, used to normalize continuous features into `[0, 1]`.
pub const REFERENCE_MAX_VALUES: [f64; 13] = [
    5775.0, 257675.0, 65535.0, 969.0, 23159456.0, 431037.0, 56311.0, 6047.0, 29019.0, 11.0,
    231.0, 4008.0, 7393.0,
];

pub const REFERENCE_CONTINUOUS: u32 = 13;
pub const REFERENCE_CATEGORICAL: u32 = 26;

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Position(usize),
    Name(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Continuous { max_value: f64 },
    Categorical,
}

impl FieldKind {
    pub fn is_categorical(&self) -> bool {
        matches!(self, FieldKind::Categorical)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Human readable field name, e.g. `I3` or `C17`. Frequency table
    /// tokens and collapse sentinels are built from it.
    pub name: String,
    pub column: Column,
    /// 1-based position of the field among fields of the same kind. Doubles
    /// as the hash discriminator and, for continuous fields, the dense index.
    pub index: u32,
    pub kind: FieldKind,
}

/// Where each family of features is placed in the output index space.
///
/// Continuous field `i` writes its normalized value at `i` and its log value
/// at `i + log_offset`. Hashed indicators go to `hash + hash_offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub log_offset: u32,
    pub hash_offset: u64,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            log_offset: 14,
            hash_offset: 28,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub label: Column,
    pub fields: Vec<FieldDescriptor>,
}

/// A schema with every column pinned to a position in the row.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    pub label: usize,
    pub fields: Vec<(usize, FieldDescriptor)>,
}

impl Schema {
    /// Reference layout addressed by position: `Id, Label, I1..I13, C1..C26`.
    /// The header row is read but ignored.
    pub fn reference_positional() -> Self {
        Self::reference(
            Column::Position(1),
            |i| Column::Position(1 + i as usize),
            |i| Column::Position(1 + (REFERENCE_CONTINUOUS + i) as usize),
        )
    }

    /// Reference layout addressed by header names `Label`, `I<i>` and `C<i>`.
    pub fn reference_named() -> Self {
        Self::reference(
            Column::Name("Label".to_owned()),
            |i| Column::Name(format!("I{}", i)),
            |i| Column::Name(format!("C{}", i)),
        )
    }

    fn reference(
        label: Column,
        continuous: impl Fn(u32) -> Column,
        categorical: impl Fn(u32) -> Column,
    ) -> Self {
        let nfields = (REFERENCE_CONTINUOUS + REFERENCE_CATEGORICAL) as usize;
        let mut fields = Vec::with_capacity(nfields);
        for (i, &max_value) in (1..=REFERENCE_CONTINUOUS).zip(REFERENCE_MAX_VALUES.iter()) {
            fields.push(FieldDescriptor {
                name: format!("I{}", i),
                column: continuous(i),
                index: i,
                kind: FieldKind::Continuous { max_value },
            });
        }
        for i in 1..=REFERENCE_CATEGORICAL {
            fields.push(FieldDescriptor {
                name: format!("C{}", i),
                column: categorical(i),
                index: i,
                kind: FieldKind::Categorical,
            });
        }
        Schema { label, fields }
    }

    /// Build a schema from explicit continuous columns with their max values
    /// and categorical columns, numbering fields of each kind from 1.
    ///
    /// Every continuous field needs an entry in `max_values`, keyed by its
    /// 1-based index.
    pub fn from_columns(
        label: Column,
        continuous: Vec<Column>,
        max_values: &BTreeMap<u32, f64>,
        categorical: Vec<Column>,
    ) -> Result<Self> {
        let mut fields = Vec::with_capacity(continuous.len() + categorical.len());
        for (i, column) in (1..).zip(continuous) {
            let max_value = *max_values
                .get(&i)
                .ok_or_else(|| Error::config(format!("no max value for continuous field I{}", i)))?;
            fields.push(FieldDescriptor {
                name: format!("I{}", i),
                column,
                index: i,
                kind: FieldKind::Continuous { max_value },
            });
        }
        for (i, column) in (1..).zip(categorical) {
            fields.push(FieldDescriptor {
                name: format!("C{}", i),
                column,
                index: i,
                kind: FieldKind::Categorical,
            });
        }
        Ok(Schema { label, fields })
    }

    pub fn ncontinuous(&self) -> usize {
        self.fields.iter().filter(|f| !f.kind.is_categorical()).count()
    }

    pub fn ncategorical(&self) -> usize {
        self.fields.iter().filter(|f| f.kind.is_categorical()).count()
    }

    /// Largest continuous field index, 0 if there are none.
    pub(crate) fn max_continuous_index(&self) -> u32 {
        self.fields
            .iter()
            .filter(|f| !f.kind.is_categorical())
            .map(|f| f.index)
            .max()
            .unwrap_or(0)
    }

    /// Checks the schema against the layout before any row is processed.
    pub fn validate(&self, layout: &Layout) -> Result<()> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.index == 0 {
                return Err(Error::config(format!("field {} has index 0", field.name)));
            }
            if !seen.insert((field.kind.is_categorical(), field.index)) {
                return Err(Error::config(format!(
                    "duplicate field index {} for {}",
                    field.index, field.name
                )));
            }
            if let FieldKind::Continuous { max_value } = field.kind {
                if !(max_value.is_finite() && max_value > 0.0) {
                    return Err(Error::config(format!(
                        "max value {} for {} must be positive",
                        max_value, field.name
                    )));
                }
            }
        }

        // dense: [1, m], log: [1 + log_offset, m + log_offset], hashed: >= hash_offset
        let m = self.max_continuous_index();
        if m > 0 && layout.log_offset < m {
            return Err(Error::config(format!(
                "log offset {} overlaps dense indices up to {}",
                layout.log_offset, m
            )));
        }
        let top = u64::from(m) + u64::from(layout.log_offset);
        if m > 0 && layout.hash_offset <= top {
            return Err(Error::config(format!(
                "hash offset {} overlaps numeric indices up to {}",
                layout.hash_offset, top
            )));
        }
        Ok(())
    }

    /// Pin every column to a position using the header row.
    pub fn resolve(&self, headers: &StringRecord) -> Result<ResolvedSchema> {
        let position = |column: &Column| -> Result<usize> {
            match column {
                Column::Position(p) => Ok(*p),
                Column::Name(name) => headers
                    .iter()
                    .position(|h| h == name)
                    .ok_or_else(|| Error::config(format!("no column named {:?} in header", name))),
            }
        };
        let label = position(&self.label)?;
        let fields = self
            .fields
            .iter()
            .map(|f| Ok((position(&f.column)?, f.clone())))
            .collect::<Result<Vec<_>>>()?;
        Ok(ResolvedSchema { label, fields })
    }
}

impl ResolvedSchema {
    pub fn label<'r>(&self, record: &'r StringRecord) -> Result<&'r str> {
        cell(record, self.label)
    }
}

/// The value at `column`, or a parse error naming the short row.
pub(crate) fn cell(record: &StringRecord, column: usize) -> Result<&str> {
    record.get(column).ok_or_else(|| {
        Error::parse(
            record_line(record),
            format!("row has {} columns, needs column {}", record.len(), column),
        )
    })
}

/// 1-based line of the record in its CSV file, 0 when unknown.
pub(crate) fn record_line(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}
