// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use thiserror::Error;

/// Maps onto the orchestrator's `METADATA_OFFSETS` error kind.
#[derive(Debug, Error)]
pub enum MetaError {
    #[error("failed to parse legacy metadata text: {0}")]
    LegacyParse(String),

    #[error(
        "regenerated entry {name} changed size ({expected} -> {actual} bytes); \
         fixed-width offset encoding invariant violated"
    )]
    SizeDrift { name: String, expected: u64, actual: u64 },

    #[error("entry recorded at offset {offset} in the output archive is not '{expected}'")]
    OffsetMismatch { offset: u64, expected: String },

    #[error("metadata recorded size {recorded} for '{name}', but the written entry is {actual} bytes")]
    SizeMismatch { name: String, recorded: u64, actual: u64 },

    #[error(transparent)]
    Zip(#[from] otazip::ZipError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MetaError>;
