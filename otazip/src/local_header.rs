// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Raw ZIP local-file-header parsing, independent of the central directory.
//! Used only to verify, post-write, that the byte offsets recorded in the
//! regenerated OTA metadata entries really do point at the local file
//! header of the entry they claim to.

use crate::error::{Result, ZipError};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

const SIGNATURE: u32 = 0x0403_4b50;

/// The handful of local-file-header fields `verify_metadata` needs: the
/// entry's name and its declared (uncompressed) size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHeaderInfo {
    pub name: String,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
}

/// Reads and validates the local file header at `offset` in `file`,
/// without consulting the central directory at all — a local-header-only
/// byte reader is the only way to confirm a metadata-recorded offset truly
/// names the start of an entry's header, rather than trusting the same
/// library that wrote the offset to also confirm it.
pub fn read_local_header(file: &mut File, offset: u64) -> Result<LocalHeaderInfo> {
    file.seek(SeekFrom::Start(offset))?;

    let mut fixed = [0u8; 30];
    file.read_exact(&mut fixed)?;

    let signature = u32::from_le_bytes(fixed[0..4].try_into().unwrap());
    if signature != SIGNATURE {
        return Err(ZipError::BadLocalHeader { offset });
    }
    let compressed_size = u32::from_le_bytes(fixed[18..22].try_into().unwrap()) as u64;
    let uncompressed_size = u32::from_le_bytes(fixed[22..26].try_into().unwrap()) as u64;
    let name_len = u16::from_le_bytes(fixed[26..28].try_into().unwrap()) as usize;
    let extra_len = u16::from_le_bytes(fixed[28..30].try_into().unwrap()) as usize;

    let mut name_bytes = vec![0u8; name_len];
    file.read_exact(&mut name_bytes)?;
    file.seek(SeekFrom::Current(extra_len as i64))?;

    let name = String::from_utf8(name_bytes).map_err(|_| ZipError::BadLocalHeader { offset })?;
    Ok(LocalHeaderInfo { name, compressed_size, uncompressed_size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::{EntryAction, OtaArchiveWriter};
    use crate::OtaArchiveReader;
    use std::io::Write as _;
    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn make_minimal_ota(path: &std::path::Path) {
        let file = File::create(path).unwrap();
        let mut w = ZipWriter::new(file);
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
        for &name in crate::REQUIRED_ENTRIES.iter() {
            w.start_file(name, stored).unwrap();
            w.write_all(b"stub").unwrap();
        }
        w.finish().unwrap();
    }

    #[test]
    fn reads_the_first_entrys_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ota.zip");
        make_minimal_ota(&path);

        let mut file = File::open(&path).unwrap();
        let info = read_local_header(&mut file, 0).unwrap();
        assert_eq!(info.name, crate::REQUIRED_ENTRIES[0]);
        assert_eq!(info.uncompressed_size, 4);
    }

    #[test]
    fn rejects_an_offset_that_is_not_a_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ota.zip");
        make_minimal_ota(&path);

        let mut file = File::open(&path).unwrap();
        let err = read_local_header(&mut file, 5).unwrap_err();
        assert!(matches!(err, ZipError::BadLocalHeader { offset: 5 }));
    }

    #[test]
    fn offsets_captured_while_writing_resolve_to_the_right_entry() {
        let dir = tempfile::tempdir().unwrap();
        let in_path = dir.path().join("in.zip");
        make_minimal_ota(&in_path);

        let out_path = dir.path().join("out.zip");
        let mut reader = OtaArchiveReader::open(&in_path).unwrap();
        let mut out =
            OtaArchiveWriter::new(std::fs::File::create(&out_path).unwrap());
        let mut offsets = Vec::new();
        for name in crate::REQUIRED_ENTRIES {
            offsets.push((name, 0u64));
            let at = offsets.len() - 1;
            // Position before writing this entry is its local header offset.
            let pos = out.current_position().unwrap();
            offsets[at].1 = pos;
            out.write_entry(name, EntryAction::Copy, &mut reader).unwrap();
        }
        let start = out.begin_central_directory().unwrap();
        out.finish(start).unwrap();

        let mut file = File::open(&out_path).unwrap();
        for (name, offset) in offsets {
            let info = read_local_header(&mut file, offset).unwrap();
            assert_eq!(info.name, name);
        }
    }
}
