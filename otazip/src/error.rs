// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use thiserror::Error;

/// Maps onto the orchestrator's `MALFORMED_ARCHIVE` error kind.
#[derive(Debug, Error)]
pub enum ZipError {
    #[error("required entry missing from archive: {0}")]
    MissingEntry(&'static str),

    #[error("entry {name} must be stored uncompressed, found {found:?}")]
    MustBeStored { name: String, found: zip::CompressionMethod },

    #[error("entry {name} ({size} bytes) would require ZIP64, which the OTA installer rejects for this entry")]
    Zip64NotAllowed { name: String, size: u64 },

    #[error("no valid local file header found at offset {offset}")]
    BadLocalHeader { offset: u64 },

    #[error("no end-of-central-directory record found at the expected tail offset")]
    BadEocd,

    #[error("archive comment of {size} bytes exceeds the 65535-byte ZIP comment-length field")]
    CommentTooLarge { size: usize },

    #[error("zip read error: {0}")]
    Read(#[from] zip::result::ZipError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ZipError>;
