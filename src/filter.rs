//! Cross-file feature filtering.
//!
//! Two sequential phases over already-encoded svmlight files:
//!
//!   1. Count how often each feature index appears on positive and negative
//!      lines of the training file, and pick the indices to retain with a
//!      predicate over those counts.
//!   2. Rewrite the training file and then the validation file in place.
//!      Each line keeps its label, every retained index as `index:1` and a
//!      trailing bias feature. Feature values are dropped on purpose; the
//!      output is binary presence only.
//!
//! Every rewrite goes through `AtomicFile`, so a failed run leaves a file
//! either fully rewritten or untouched.

use crate::config::FilterConfig;
use crate::error::{Error, Result};
use crate::scanner::Scanner;
use crate::svmlight;
use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use log::{debug, info};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

/// Index of the always-present bias feature appended to every line.
pub const DEFAULT_BIAS_INDEX: u64 = 10_000_500;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Occurrence {
    pub positive: u64,
    pub negative: u64,
}

impl Occurrence {
    pub fn total(&self) -> u64 {
        self.positive + self.negative
    }

    /// Fraction of occurrences on positive lines, 0 if never seen.
    pub fn rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.positive as f64 / total as f64,
        }
    }
}

/// Which feature indices survive the count phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetentionPolicy {
    /// Keep everything seen in training.
    All,
    /// Keep indices seen at least `min_total` times.
    MinSupport { min_total: u64 },
    /// Keep indices seen at least `min_total` times whose positive rate
    /// lies outside `[low, high]`.
    RateBand { min_total: u64, low: f64, high: f64 },
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy::All
    }
}

impl RetentionPolicy {
    pub fn keep(&self, occurrence: &Occurrence) -> bool {
        match *self {
            RetentionPolicy::All => true,
            RetentionPolicy::MinSupport { min_total } => occurrence.total() >= min_total,
            RetentionPolicy::RateBand {
                min_total,
                low,
                high,
            } => {
                let rate = occurrence.rate();
                occurrence.total() >= min_total && (rate < low || rate > high)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let RetentionPolicy::RateBand { low, high, .. } = *self {
            let unit = 0.0..=1.0;
            if !(unit.contains(&low) && unit.contains(&high) && low <= high) {
                return Err(Error::config(format!(
                    "rate band [{}, {}] must satisfy 0 <= low <= high <= 1",
                    low, high
                )));
            }
        }
        Ok(())
    }
}

/// Per-index label counts over a training file.
#[derive(Debug, Default, Clone)]
pub struct Occurrences {
    records: HashMap<u64, Occurrence>,
    lines: u64,
}

impl Occurrences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count phase: one pass over `path`. A line is positive when its label
    /// equals `positive_label` exactly.
    pub fn count(path: impl AsRef<Path>, positive_label: &str) -> Result<Self> {
        Scanner::new(path.as_ref()).fold(Occurrences::new(), |mut acc, i, bytes| {
            let line = match svmlight::parse_line(bytes, i)? {
                Some(line) => line,
                None => return Ok(acc),
            };
            let positive = line.label() == positive_label;
            for token in line {
                let (index, _) = token?;
                acc.observe(index, positive);
            }
            acc.lines += 1;
            Ok(acc)
        })
    }

    pub fn observe(&mut self, index: u64, positive: bool) {
        let record = self.records.entry(index).or_default();
        if positive {
            record.positive += 1;
        } else {
            record.negative += 1;
        }
    }

    pub fn get(&self, index: u64) -> Option<&Occurrence> {
        self.records.get(&index)
    }

    /// Number of distinct indices seen.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of non-blank lines counted.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn retain<P>(&self, predicate: P) -> RetainedSet
    where
        P: Fn(&Occurrence) -> bool,
    {
        self.records
            .iter()
            .filter(|(_, o)| predicate(o))
            .map(|(&index, _)| index)
            .collect()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RetainedSet {
    indices: HashSet<u64>,
}

impl RetainedSet {
    pub fn contains(&self, index: u64) -> bool {
        self.indices.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Retained indices in ascending order.
    pub fn sorted(&self) -> Vec<u64> {
        self.indices.iter().copied().sorted_unstable().collect()
    }
}

impl std::iter::FromIterator<u64> for RetainedSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        RetainedSet {
            indices: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RewriteStats {
    pub lines: u64,
    pub kept: u64,
    pub dropped: u64,
}

/// Rewrite phase for one file, in place. Blank lines are dropped, and so
/// is any `bias_index` token already on a line, so rewriting an already
/// filtered file does not repeat the bias feature.
pub fn rewrite(
    path: impl AsRef<Path>,
    retained: &RetainedSet,
    bias_index: u64,
) -> Result<RewriteStats> {
    let path = path.as_ref();
    let mut stats = RewriteStats::default();
    Scanner::new(path).for_each_sink(path, |i, bytes, out| {
        let line = match svmlight::parse_line(bytes, i)? {
            Some(line) => line,
            None => return Ok(()),
        };
        out.write_all(line.label().as_bytes())?;
        for token in line {
            let (index, _) = token?;
            if index == bias_index || !retained.contains(index) {
                stats.dropped += 1;
                continue;
            }
            write!(out, " {}:1", index)?;
            stats.kept += 1;
        }
        writeln!(out, " {}:1", bias_index)?;
        stats.lines += 1;
        Ok(())
    })?;
    Ok(stats)
}

/// Count on the training file, then rewrite training and validation.
pub fn filter_files(config: &FilterConfig) -> Result<(RewriteStats, RewriteStats)> {
    config.validate()?;
    let policy = config.retention;
    // fail on an unreadable file before either one is replaced
    for path in &[&config.train_path, &config.validation_path] {
        File::open(path)?;
    }

    let start = Instant::now();
    let occurrences = Occurrences::count(&config.train_path, &config.positive_label)?;
    info!(
        "count {:?} {:.0?}",
        config.train_path,
        Instant::now().duration_since(start)
    );
    info!(
        "num lines {} distinct indices {}",
        occurrences.lines(),
        occurrences.len()
    );

    let retained = occurrences.retain(|o| policy.keep(o));
    info!("retained {} of {} indices ({:?})", retained.len(), occurrences.len(), policy);
    if retained.is_empty() {
        info!("no indices retained, lines will carry only the bias feature");
    }
    debug!("bias index {}", config.bias_index);

    let mut stats = Vec::with_capacity(2);
    for path in &[&config.train_path, &config.validation_path] {
        let start = Instant::now();
        let s = rewrite(path, &retained, config.bias_index)?;
        info!(
            "rewrite {:?} {:.0?}: {} lines, {} tokens kept, {} dropped",
            path,
            Instant::now().duration_since(start),
            s.lines,
            s.kept,
            s.dropped
        );
        stats.push(s);
    }
    Ok((stats[0], stats[1]))
}
