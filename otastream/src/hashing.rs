// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use sha2::{Digest, Sha256};
use std::io::{self, Read, Write};

/// A passthrough writer that feeds every byte written through SHA-256 before
/// forwarding it to the inner writer. Used when a payload's final hash must
/// be known without buffering the whole payload in memory twice.
pub struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, hasher: Sha256::new() }
    }

    /// Consumes the writer and returns the final digest alongside the inner
    /// writer.
    pub fn finish(self) -> ([u8; 32], W) {
        let digest = self.hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        (out, self.inner)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// The read-side counterpart of `HashingWriter`, used to validate a declared
/// `data_sha256_hash` while streaming install-operation data rather than
/// hashing it up front in a separate pass.
pub struct HashingReader<R> {
    inner: R,
    hasher: Sha256,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, hasher: Sha256::new() }
    }

    pub fn finish(self) -> [u8; 32] {
        let digest = self.hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_writer_matches_direct_digest() {
        let mut w = HashingWriter::new(Vec::new());
        w.write_all(b"the quick brown fox").unwrap();
        let (digest, buf) = w.finish();
        assert_eq!(buf, b"the quick brown fox");
        assert_eq!(digest, Sha256::digest(b"the quick brown fox").as_slice());
    }

    #[test]
    fn hashing_reader_matches_direct_digest() {
        let mut r = HashingReader::new(&b"0123456789"[..]);
        let mut buf = Vec::new();
        r.read_to_end(&mut buf).unwrap();
        assert_eq!(r.finish(), Sha256::digest(b"0123456789").as_slice());
    }
}
