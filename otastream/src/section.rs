// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::io::{self, Read, Seek, SeekFrom};

/// Restricts reads to `[offset, offset + len)` of an underlying reader,
/// presenting that range as its own zero-based stream. Used to hand each
/// install operation exactly its data blob without giving it access to the
/// rest of the payload.
pub struct SectionReader<R> {
    inner: R,
    start: u64,
    len: u64,
    pos: u64,
}

impl<R: Read + Seek> SectionReader<R> {
    pub fn new(mut inner: R, start: u64, len: u64) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(start))?;
        Ok(Self { inner, start, len, pos: 0 })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<R: Read + Seek> Read for SectionReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.len - self.pos;
        if remaining == 0 {
            return Ok(0);
        }
        let cap = remaining.min(buf.len() as u64) as usize;
        let n = self.inner.read(&mut buf[..cap])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: Read + Seek> Seek for SectionReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => n,
            SeekFrom::Current(n) => (self.pos as i64 + n).max(0) as u64,
            SeekFrom::End(n) => (self.len as i64 + n).max(0) as u64,
        };
        self.inner.seek(SeekFrom::Start(self.start + target))?;
        self.pos = target;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read as _};

    #[test]
    fn reads_only_the_requested_range() {
        let data = b"0123456789".to_vec();
        let mut section = SectionReader::new(Cursor::new(data), 2, 4).unwrap();
        let mut buf = Vec::new();
        section.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"2345");
    }

    #[test]
    fn seek_is_relative_to_section() {
        let data = b"0123456789".to_vec();
        let mut section = SectionReader::new(Cursor::new(data), 3, 5).unwrap();
        section.seek(SeekFrom::Start(2)).unwrap();
        let mut buf = [0u8; 2];
        section.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"56");
    }
}
