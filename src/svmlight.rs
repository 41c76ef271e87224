//! Reading and writing lines in svmlight format, i.e.,
//! `<label> <index>:<value> <index>:<value>...`
//!
//! Written lines always have their features sorted by index and a single
//! space after the label, even when there are no features.

use crate::error::{Error, Result};
use crate::feature::FeatureSet;
use bstr::ByteSlice;
use itertools::Itertools;
use std::io::{self, Write};
use std::str;

/// Write one encoded line, newline included.
pub fn write_line<W: Write>(writer: &mut W, label: &str, features: &FeatureSet) -> io::Result<()> {
    writer.write_all(label.as_bytes())?;
    writer.write_all(b" ")?;
    for (i, f) in features.iter().enumerate() {
        if i > 0 {
            writer.write_all(b" ")?;
        }
        write!(writer, "{}:{}", f.index, f.value.into_inner())?;
    }
    writer.write_all(b"\n")
}

/// Same text as `write_line`, as a `String`.
pub fn format_line(label: &str, features: &FeatureSet) -> String {
    let tokens = features
        .iter()
        .map(|f| format!("{}:{}", f.index, f.value.into_inner()))
        .join(" ");
    format!("{} {}\n", label, tokens)
}

/// A parsed svmlight line: the label and an iterator over its
/// `(index, value)` tokens.
pub struct SvmlightLineIter<'a> {
    label: &'a str,
    words: bstr::Fields<'a>,
    line: u64,
}

/// Split a line into label and tokens. Blank lines yield `None`.
pub fn parse_line(bytes: &[u8], line: u64) -> Result<Option<SvmlightLineIter<'_>>> {
    let mut words = bytes.fields();
    let label = match words.next() {
        Some(label) => label,
        None => return Ok(None),
    };
    let label = str::from_utf8(label).map_err(|_| Error::parse(line, "label is not utf-8"))?;
    Ok(Some(SvmlightLineIter { label, words, line }))
}

impl<'a> SvmlightLineIter<'a> {
    pub fn label(&self) -> &'a str {
        self.label
    }
}

impl<'a> Iterator for SvmlightLineIter<'a> {
    type Item = Result<(u64, f64)>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.line;
        self.words.next().map(|word| parse_token(word, line))
    }
}

fn parse_token(word: &[u8], line: u64) -> Result<(u64, f64)> {
    let bad = || Error::parse(line, format!("malformed token {:?}", word.as_bstr()));
    let pos = word.find_byte(b':').ok_or_else(bad)?;
    let (index, value) = (&word[..pos], &word[pos + 1..]);
    if value.find_byte(b':').is_some() {
        return Err(bad());
    }
    let index: u64 = str::from_utf8(index)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(bad)?;
    let value: f64 = str::from_utf8(value)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(bad)?;
    Ok((index, value))
}
