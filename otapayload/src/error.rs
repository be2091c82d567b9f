// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use thiserror::Error;

/// Maps onto the orchestrator's `MALFORMED_PAYLOAD`, `UNSUPPORTED_OP`,
/// `HASH_MISMATCH` and `SIGNATURE` error kinds.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("bad payload magic, expected 'CrAU'")]
    BadMagic,

    #[error("unsupported payload format version {0}")]
    UnsupportedVersion(u64),

    #[error("failed to parse payload manifest: {0}")]
    ManifestParse(String),

    #[error("partition {partition} references install operation type {op_type:?}, which is not implemented")]
    UnsupportedOp { partition: String, op_type: i32 },

    #[error("partition {partition} operation data failed SHA-256 validation")]
    HashMismatch { partition: String },

    #[error("partition {0} not found in manifest")]
    PartitionNotFound(String),

    #[error("manifest signature inconsistent: {0}")]
    Signature(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Key(#[from] otakeys::KeyError),
}

pub type Result<T> = std::result::Result<T, PayloadError>;
