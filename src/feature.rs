//! The `feature` module turns one CSV row into a set of sparse
//! `(index, value)` features.
//!
//! Every field produces a hashed one-hot indicator of its raw value. This
//! holds for continuous fields too, so a numeric column also acts as a
//! categorical one, and a missing value hashes as the empty string.
//! Continuous fields additionally produce their value normalized by the
//! field's maximum and, for values of at least 1, the natural log of the
//! value.
//!
//! Collisions in the hashed range are accepted. Beyond that, two features
//! that agree on both index and value collapse into one entry of the set.
//! With a non-overlapping `Layout` that only happens between hashed
//! indicators, which all carry value 1.

use crate::error::{Error, Result};
use crate::frequency::Collapser;
use crate::hasher;
use crate::schema::{self, FieldKind, Layout, ResolvedSchema};
use csv::StringRecord;
use ordered_float::OrderedFloat;

/// A single sparse feature. Ordered by index, then value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Feature {
    pub index: u64,
    pub value: OrderedFloat<f64>,
}

impl Feature {
    pub fn new(index: u64, value: f64) -> Self {
        Feature {
            index,
            value: OrderedFloat(value),
        }
    }

    /// A one-hot indicator.
    pub fn presence(index: u64) -> Self {
        Self::new(index, 1.0)
    }
}

/// The features of one row, as a set of `(index, value)` pairs.
///
/// Inserts are cheap appends; `sort` orders the features and drops exact
/// duplicates. `iter` always yields sorted, unique features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    features: Vec<Feature>,
    sorted: bool,
}

impl FeatureSet {
    pub fn new() -> Self {
        FeatureSet {
            features: Vec::new(),
            sorted: true,
        }
    }

    pub fn with_capacity(n: usize) -> Self {
        FeatureSet {
            features: Vec::with_capacity(n),
            sorted: true,
        }
    }

    pub fn insert(&mut self, feature: Feature) {
        self.features.push(feature);
        self.sorted = false;
    }

    pub fn sort(&mut self) {
        if !self.sorted {
            self.features.sort_unstable();
            self.features.dedup();
            self.sorted = true;
        }
    }

    pub fn clear(&mut self) {
        self.features.clear();
        self.sorted = true;
    }

    /// Sorted, unique features. Panics in debug builds if `sort` was not
    /// called after the last insert.
    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        debug_assert!(self.sorted, "FeatureSet::iter before sort");
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        debug_assert!(self.sorted, "FeatureSet::len before sort");
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn contains(&self, index: u64, value: f64) -> bool {
        self.features.contains(&Feature::new(index, value))
    }

    /// Value of the feature at `index`, if exactly one is present.
    pub fn get(&self, index: u64) -> Option<f64> {
        let mut values = self.features.iter().filter(|f| f.index == index);
        let first = values.next()?;
        match values.find(|f| f.value != first.value) {
            Some(_) => None,
            None => Some(first.value.into_inner()),
        }
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::iter::FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        let mut set = FeatureSet::new();
        for f in iter {
            set.insert(f);
        }
        set.sort();
        set
    }
}

/// Extracts features from rows of a resolved schema.
///
/// Holds only borrowed, read-only state, so one featurizer serves every row
/// of a run.
pub struct Featurizer<'a> {
    schema: &'a ResolvedSchema,
    layout: Layout,
    nr_bins: u64,
    collapser: Option<Collapser<'a>>,
}

impl<'a> Featurizer<'a> {
    pub fn new(
        schema: &'a ResolvedSchema,
        layout: Layout,
        nr_bins: u64,
        collapser: Option<Collapser<'a>>,
    ) -> Self {
        Featurizer {
            schema,
            layout,
            nr_bins,
            collapser,
        }
    }

    pub fn nfields(&self) -> usize {
        self.schema.fields.len()
    }

    /// Hashed one-hot index for a field value.
    pub fn hashed(&self, discriminator: u32, value: &str) -> u64 {
        hasher::hash_str(&hasher::field_key(discriminator, value), self.nr_bins)
            + self.layout.hash_offset
    }

    pub fn extract(&self, record: &StringRecord) -> Result<FeatureSet> {
        let mut features = FeatureSet::with_capacity(self.nfields() * 2);
        self.extract_into(record, &mut features)?;
        Ok(features)
    }

    /// Like `extract`, reusing `features` as scratch space. The set is
    /// cleared first and left sorted.
    pub fn extract_into(&self, record: &StringRecord, features: &mut FeatureSet) -> Result<()> {
        features.clear();
        for (column, field) in self.schema.fields.iter() {
            let raw = schema::cell(record, *column)?;
            match field.kind {
                FieldKind::Continuous { max_value } => {
                    features.insert(Feature::presence(self.hashed(field.index, raw)));
                    if raw.is_empty() {
                        continue;
                    }
                    let value = parse_continuous(raw).ok_or_else(|| {
                        Error::parse(
                            schema::record_line(record),
                            format!("field {} value {:?} is not a finite number", field.name, raw),
                        )
                    })?;
                    let index = u64::from(field.index);
                    features.insert(Feature::new(index, value / max_value));
                    if value >= 1.0 {
                        let log_index = index + u64::from(self.layout.log_offset);
                        features.insert(Feature::new(log_index, value.ln()));
                    }
                }
                FieldKind::Categorical => {
                    let value = match &self.collapser {
                        Some(collapser) => collapser.collapse(field, raw),
                        None => raw.into(),
                    };
                    features.insert(Feature::presence(self.hashed(field.index, &value)));
                }
            }
        }
        features.sort();
        Ok(())
    }
}

fn parse_continuous(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}
