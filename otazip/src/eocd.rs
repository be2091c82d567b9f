// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::{Result, ZipError};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

/// Fixed size of an end-of-central-directory record with an empty comment.
const EOCD_SIZE: u64 = 22;
const EOCD_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];
/// Offset of the 2-byte comment-length field within the fixed EOCD record.
const EOCD_COMMENT_LEN_OFFSET: u64 = 20;

/// Appends `comment` as the archive's ZIP comment and patches the
/// end-of-central-directory record's comment-length field to match, in
/// place.
///
/// Assumes `file` was just produced by `OtaArchiveWriter::finish`, whose
/// EOCD carries no comment yet (comment length 0), so the EOCD record is
/// exactly the last 22 bytes of the file before this call.
pub fn append_comment(file: &mut File, comment: &[u8]) -> Result<()> {
    if comment.len() > u16::MAX as usize {
        return Err(ZipError::CommentTooLarge { size: comment.len() });
    }

    let len = file.seek(SeekFrom::End(0))?;
    if len < EOCD_SIZE {
        return Err(ZipError::BadEocd);
    }
    let eocd_start = len - EOCD_SIZE;

    file.seek(SeekFrom::Start(eocd_start))?;
    let mut signature = [0u8; 4];
    file.read_exact(&mut signature)?;
    if signature != EOCD_SIGNATURE {
        return Err(ZipError::BadEocd);
    }

    file.seek(SeekFrom::Start(eocd_start + EOCD_COMMENT_LEN_OFFSET))?;
    file.write_all(&(comment.len() as u16).to_le_bytes())?;

    file.seek(SeekFrom::End(0))?;
    file.write_all(comment)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn minimal_zip(path: &std::path::Path) {
        let file = File::create(path).unwrap();
        let mut w = ZipWriter::new(file);
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
        w.start_file("a.txt", stored).unwrap();
        w.write_all(b"hi").unwrap();
        w.finish().unwrap();
    }

    #[test]
    fn appends_comment_and_updates_length_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.zip");
        minimal_zip(&path);
        let before_len = std::fs::metadata(&path).unwrap().len();

        let mut file = File::options().read(true).write(true).open(&path).unwrap();
        append_comment(&mut file, b"signature-bytes").unwrap();
        drop(file);

        let after_len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(after_len, before_len + b"signature-bytes".len() as u64);

        let bytes = std::fs::read(&path).unwrap();
        let eocd_start = bytes.len() - b"signature-bytes".len() - EOCD_SIZE as usize;
        let comment_len = u16::from_le_bytes([
            bytes[eocd_start + EOCD_COMMENT_LEN_OFFSET as usize],
            bytes[eocd_start + EOCD_COMMENT_LEN_OFFSET as usize + 1],
        ]);
        assert_eq!(comment_len as usize, b"signature-bytes".len());
        assert_eq!(&bytes[bytes.len() - b"signature-bytes".len()..], b"signature-bytes");
    }

    #[test]
    fn rejects_a_file_too_short_to_contain_an_eocd() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.bin");
        std::fs::write(&path, b"too short").unwrap();
        let mut file = File::options().read(true).write(true).open(&path).unwrap();
        assert!(matches!(append_comment(&mut file, b"x"), Err(ZipError::BadEocd)));
    }
}
