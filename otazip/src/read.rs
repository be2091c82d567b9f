// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::{Result, ZipError};
use crate::{MUST_BE_STORED, REQUIRED_ENTRIES};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::{CompressionMethod, ZipArchive};

/// A validated, randomly-accessible view of an input OTA archive.
pub struct OtaArchiveReader {
    archive: ZipArchive<File>,
}

impl OtaArchiveReader {
    /// Opens `path` and checks the required-entry-presence and
    /// entry-compression invariants, failing fast with `MALFORMED_ARCHIVE`
    /// before any extraction is attempted.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(file)?;
        let mut reader = Self { archive };
        reader.validate()?;
        Ok(reader)
    }

    fn validate(&mut self) -> Result<()> {
        for &name in REQUIRED_ENTRIES.iter() {
            if self.archive.by_name(name).is_err() {
                return Err(ZipError::MissingEntry(name));
            }
        }
        for &name in MUST_BE_STORED.iter() {
            let entry = self.archive.by_name(name)?;
            if entry.compression() != CompressionMethod::Stored {
                return Err(ZipError::MustBeStored {
                    name: name.to_string(),
                    found: entry.compression(),
                });
            }
        }
        Ok(())
    }

    /// Names of every entry in the archive, in ZIP central-directory order.
    pub fn entry_names(&self) -> Vec<String> {
        self.archive.file_names().map(|s| s.to_string()).collect()
    }

    /// Reads one entry's (decompressed) contents fully into memory. Used
    /// for the metadata entries and `otacert`, which are small; the
    /// payload itself is streamed instead via `read_entry_to`.
    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut entry = self.archive.by_name(name)?;
        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Streams one entry's (decompressed) contents into `dst` without
    /// buffering the whole entry in memory.
    pub fn read_entry_to(&mut self, name: &str, dst: &mut impl std::io::Write) -> Result<u64> {
        let mut entry = self.archive.by_name(name)?;
        Ok(std::io::copy(&mut entry, dst)?)
    }

    pub fn entry_size(&mut self, name: &str) -> Result<u64> {
        Ok(self.archive.by_name(name)?.size())
    }

    /// The entry's on-disk (possibly still-compressed) size, i.e. exactly
    /// how many bytes `raw_copy_into` will write for it. Used to predict an
    /// entry's local-file-header offset in the output archive ahead of
    /// writing it.
    pub fn entry_compressed_size(&mut self, name: &str) -> Result<u64> {
        Ok(self.archive.by_name(name)?.compressed_size())
    }

    pub fn entry_compression(&mut self, name: &str) -> Result<CompressionMethod> {
        Ok(self.archive.by_name(name)?.compression())
    }

    /// Copies one entry's raw (still-compressed) bytes and header metadata
    /// straight into `writer`, without decompressing and recompressing.
    /// Used for every entry the orchestrator classifies as `Copy`.
    pub fn raw_copy_into<W: std::io::Write + std::io::Seek>(
        &mut self,
        name: &str,
        writer: &mut zip::ZipWriter<W>,
    ) -> Result<()> {
        let entry = self.archive.by_name(name)?;
        writer.raw_copy_file(entry)?;
        Ok(())
    }
}
