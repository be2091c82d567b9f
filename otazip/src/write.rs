// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::{Result, ZipError};
use crate::{MAX_PAYLOAD_SIZE_WITHOUT_ZIP64, PAYLOAD};
use std::io::{Seek, SeekFrom, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// What to do with one entry when rewriting the archive.
pub enum EntryAction {
    /// Entry does not appear in the output at all.
    Drop,
    /// Copy the entry's bytes through unchanged (raw, still-compressed).
    Copy,
    /// Replace the entry's contents with `bytes`, stored with
    /// `compression`. Used for the rebuilt payload, properties, otacert
    /// and metadata entries.
    ReplaceWithBytes { bytes: Vec<u8>, compression: CompressionMethod },
}

/// The byte range of the final central directory plus end-of-central-
/// directory record, latched at the moment writing switches from entry
/// data to central-directory data. The outer OTA signer signs exactly
/// this range.
#[derive(Debug, Clone, Copy)]
pub struct CentralDirectoryRange {
    pub start: u64,
    pub end: u64,
}

/// Drives a single forward pass over an output archive, honoring the
/// caller's per-entry plan.
pub struct OtaArchiveWriter<W: Write + Seek> {
    writer: ZipWriter<W>,
}

impl<W: Write + Seek> OtaArchiveWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { writer: ZipWriter::new(sink) }
    }

    /// Writes one entry according to `action`. `source` is consulted only
    /// for `EntryAction::Copy`.
    pub fn write_entry(
        &mut self,
        name: &str,
        action: EntryAction,
        source: &mut crate::OtaArchiveReader,
    ) -> Result<()> {
        match action {
            EntryAction::Drop => Ok(()),
            EntryAction::Copy => source.raw_copy_into(name, &mut self.writer),
            EntryAction::ReplaceWithBytes { bytes, compression } => {
                self.write_bytes(name, &bytes, compression)
            }
        }
    }

    /// Writes `bytes` as a brand-new entry (no corresponding input entry),
    /// used for entries the rebuild synthesizes outright (the new payload,
    /// its properties, and the regenerated metadata entries).
    pub fn write_bytes(&mut self, name: &str, bytes: &[u8], compression: CompressionMethod) -> Result<()> {
        if name == PAYLOAD {
            // Android's recovery installer rejects ZIP64 on this entry
            // specifically, regardless of how large it is.
            // Rather than flip a process-wide "disallow zip64" switch, we
            // simply refuse sizes that would force one here.
            if bytes.len() as u64 > MAX_PAYLOAD_SIZE_WITHOUT_ZIP64 {
                return Err(ZipError::Zip64NotAllowed {
                    name: name.to_string(),
                    size: bytes.len() as u64,
                });
            }
            if compression != CompressionMethod::Stored {
                return Err(ZipError::MustBeStored { name: name.to_string(), found: compression });
            }
        }

        let options = FileOptions::default().compression_method(compression).large_file(false);
        self.writer.start_file(name, options)?;
        self.writer.write_all(bytes)?;
        Ok(())
    }

    /// The output stream's current position. Called immediately before
    /// `write_entry`/`write_bytes` for an entry whose local-file-header
    /// offset the caller needs to record for the metadata regenerator,
    /// since for a `Stored` entry with a declared size the local file
    /// header begins exactly here.
    pub fn current_position(&mut self) -> Result<u64> {
        Ok(self.writer.stream_position()?)
    }

    /// Latches the writer's current output offset. Everything written
    /// from here on is the central directory plus EOCD record, since the
    /// caller is expected to have already written every entry.
    pub fn begin_central_directory(&mut self) -> Result<u64> {
        Ok(self.writer.stream_position()?)
    }

    /// Finalizes the archive and returns the byte range that
    /// `begin_central_directory` opened, now that it is known to extend to
    /// end of file.
    pub fn finish(self, start: u64) -> Result<(W, CentralDirectoryRange)> {
        let mut file = self.writer.finish()?;
        let end = file.seek(SeekFrom::End(0))?;
        Ok((file, CentralDirectoryRange { start, end }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OtaArchiveReader;
    use std::fs::File;
    use std::io::Cursor;

    #[test]
    fn payload_over_u32_max_is_rejected() {
        // Constructing an actual 4GiB buffer in a unit test is wasteful;
        // instead we check the boundary constant directly, and rely on the
        // orchestrator-level integration test to exercise a realistically
        // sized payload end-to-end.
        assert_eq!(MAX_PAYLOAD_SIZE_WITHOUT_ZIP64, u32::MAX as u64);
    }

    #[test]
    fn write_bytes_rejects_compressed_payload() {
        let buf = Cursor::new(Vec::new());
        let mut w = OtaArchiveWriter::new(buf);
        let err = w.write_bytes(PAYLOAD, b"abc", CompressionMethod::Deflated).unwrap_err();
        assert!(matches!(err, ZipError::MustBeStored { .. }));
    }

    #[test]
    fn central_directory_range_covers_tail_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let in_path = dir.path().join("in.zip");
        {
            let file = File::create(&in_path).unwrap();
            let mut zw = ZipWriter::new(file);
            let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
            for name in crate::REQUIRED_ENTRIES {
                zw.start_file(name, stored).unwrap();
                zw.write_all(b"x").unwrap();
            }
            zw.finish().unwrap();
        }

        let mut reader = OtaArchiveReader::open(&in_path).unwrap();
        let buf = Cursor::new(Vec::new());
        let mut out = OtaArchiveWriter::new(buf);
        for name in crate::REQUIRED_ENTRIES {
            out.write_entry(name, EntryAction::Copy, &mut reader).unwrap();
        }
        let start = out.begin_central_directory().unwrap();
        let (buf, range) = out.finish(start).unwrap();
        assert_eq!(range.start, start);
        assert_eq!(range.end as usize, buf.into_inner().len());
    }
}
