// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use thiserror::Error;

/// Maps onto the orchestrator's `VBMETA_INCOMPATIBLE` and `SIGNATURE`
/// error kinds.
#[derive(Debug, Error)]
pub enum VbmetaError {
    #[error("bad vbmeta magic, expected 'AVB0'")]
    BadHeaderMagic,

    #[error("bad AVB footer magic, expected 'AVBf'")]
    BadFooterMagic,

    #[error("unrecognized AVB algorithm type {0}")]
    UnknownAlgorithm(u32),

    #[error("vbmeta image is truncated or malformed: {0}")]
    Truncated(String),

    #[error("original root vbmeta cannot be re-homed to the supplied key: {0}")]
    Incompatible(String),

    #[error(transparent)]
    Sign(#[from] otakeys::KeyError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Binrw(#[from] binrw::Error),
}

pub type Result<T> = std::result::Result<T, VbmetaError>;
