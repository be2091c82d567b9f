// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A `Read + Seek` trait object, boxed so callers don't need to know whether
/// the backing storage is a file or an in-memory buffer.
pub trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

/// A capability to obtain a fresh, independently-positioned reader over the
/// same logical bytes. Each parallel extraction worker calls `open()` once
/// and owns the result; no reader is ever shared across threads, which
/// sidesteps the need for seekable-clone semantics entirely.
pub trait PayloadSource: Send + Sync {
    fn open(&self) -> io::Result<Box<dyn ReadSeek>>;
}

/// A `PayloadSource` backed by a path, reopened per call.
#[derive(Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PayloadSource for FileSource {
    fn open(&self) -> io::Result<Box<dyn ReadSeek>> {
        Ok(Box::new(File::open(&self.path)?))
    }
}

/// A `PayloadSource` backed by an in-memory buffer, shared via `Arc` so every
/// `open()` call gets its own `Cursor` over the same bytes. Used in tests and
/// for small payload manifests that are cheaper to keep resident than to
/// reopen from disk.
#[derive(Clone)]
pub struct MemSource {
    data: Arc<Vec<u8>>,
}

impl MemSource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data: Arc::new(data) }
    }
}

impl PayloadSource for MemSource {
    fn open(&self) -> io::Result<Box<dyn ReadSeek>> {
        Ok(Box::new(Cursor::new(self.data.as_ref().clone())))
    }
}

/// Convenience for opening a plain path as a `PayloadSource` without naming
/// the concrete type at call sites.
pub fn file_source(path: impl AsRef<Path>) -> FileSource {
    FileSource::new(path.as_ref())
}
