//! Atomic file replacement.
//!
//! Output is written next to its destination under a `.tmp` suffix and only
//! renamed over the destination once every byte is flushed and synced. If
//! anything fails first, or the `AtomicFile` is dropped without `commit`, the
//! temporary file is removed and the destination keeps its old contents.

use log::debug;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

// 64KB, same as the line scanner's read buffer
const BUFSIZE: usize = 64 * 1024;

pub struct AtomicFile {
    target: PathBuf,
    temp: PathBuf,
    writer: Option<BufWriter<File>>,
    committed: bool,
}

/// `<path>.tmp`, placed in the same directory so the final rename never
/// crosses a filesystem boundary.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut fname = path
        .file_name()
        .map(|f| f.to_owned())
        .unwrap_or_default();
    fname.push(".tmp");
    path.with_file_name(fname)
}

impl AtomicFile {
    pub fn create(target: impl AsRef<Path>) -> io::Result<Self> {
        let target = target.as_ref().to_path_buf();
        let temp = temp_path(&target);
        if temp.exists() {
            debug!("temp file {:?} exists, will overwrite", temp);
        }
        let file = File::create(&temp)?;
        Ok(AtomicFile {
            target,
            temp,
            writer: Some(BufWriter::with_capacity(BUFSIZE, file)),
            committed: false,
        })
    }

    pub fn temp(&self) -> &Path {
        &self.temp
    }

    /// Flush, sync and rename the temporary file over the target.
    pub fn commit(mut self) -> io::Result<()> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => return Err(io::Error::new(io::ErrorKind::Other, "already closed")),
        };
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&self.temp, &self.target)?;
        self.committed = true;
        debug!("replaced {:?}", self.target);
        Ok(())
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "already closed"))
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer()?.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.writer()?.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // close before unlinking
        self.writer.take();
        if let Err(e) = fs::remove_file(&self.temp) {
            debug!("could not remove {:?}: {}", self.temp, e);
        }
    }
}
