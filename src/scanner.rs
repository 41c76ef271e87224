//! Sequential line access to text files.
//!
//! Lines are handed out as raw bytes without their trailing `\n` (and
//! `\r`, if the file has Windows line endings) along with their 1-based
//! line number. Decoding and tokenizing is left to the caller.

use crate::atomic::AtomicFile;
use crate::error::Result;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

const BUFSIZE: usize = 64 * 1024;

pub struct Scanner {
    path: PathBuf,
}

impl Scanner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Fold over every line of the file.
    pub fn fold<U, Fold>(&self, init: U, mut fold: Fold) -> Result<U>
    where
        Fold: FnMut(U, u64, &[u8]) -> Result<U>,
    {
        let file = File::open(&self.path)?;
        let reader = BufReader::with_capacity(BUFSIZE, file);
        let mut acc = init;
        for (i, line) in reader.split(b'\n').enumerate() {
            let line = line?;
            acc = fold(acc, i as u64 + 1, trim_cr(&line))?;
        }
        Ok(acc)
    }

    /// Map over lines of the file, writing to a sink that atomically
    /// replaces `target` once every line has been processed. `target` may
    /// be the scanned file itself.
    ///
    /// `apply` writes whatever it wants for each line, newlines included.
    /// If it fails, the sink is discarded and `target` is left untouched.
    /// Returns the number of lines read.
    pub fn for_each_sink<Apply>(&self, target: &Path, mut apply: Apply) -> Result<u64>
    where
        Apply: FnMut(u64, &[u8], &mut AtomicFile) -> Result<()>,
    {
        let mut sink = AtomicFile::create(target)?;
        let nlines = self.fold(0, |_, i, line| {
            apply(i, line, &mut sink)?;
            Ok(i)
        })?;
        sink.commit()?;
        Ok(nlines)
    }
}

fn trim_cr(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    }
}
