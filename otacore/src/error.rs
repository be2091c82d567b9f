// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use thiserror::Error;

/// The orchestrator's own error kinds, naming every user-visible failure
/// category plus the wrapped leaf-crate errors that realize the rest of
/// them. `KeyMismatch` is split out from `otakeys::KeyError` by hand at its
/// one call site, since `CertKeyMismatch` and every other `KeyError`
/// variant map onto two different kinds here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid arguments: {0}")]
    BadArguments(String),

    #[error("OTA certificate does not match the OTA private key")]
    KeyMismatch,

    #[error(transparent)]
    Archive(#[from] otazip::ZipError),

    #[error(transparent)]
    Payload(#[from] otapayload::PayloadError),

    #[error(transparent)]
    Role(#[from] otapayload::RoleError),

    #[error(transparent)]
    Boot(#[from] otaboot::BootError),

    #[error(transparent)]
    Vbmeta(#[from] otavbmeta::VbmetaError),

    #[error(transparent)]
    Signature(#[from] otakeys::KeyError),

    #[error(transparent)]
    Metadata(#[from] otameta::MetaError),

    #[error("internal layout inconsistency: {0}")]
    Internal(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
