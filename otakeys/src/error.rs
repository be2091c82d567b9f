// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use thiserror::Error;

/// Errors raised while loading keys/certificates or producing signatures.
/// These map onto the orchestrator's `SIGNATURE` and `KEY_MISMATCH` error
/// kinds; the orchestrator is responsible for wrapping them.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to read {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("unrecognized private key format in {path}")]
    UnrecognizedKeyFormat { path: String },

    #[error("private key at {path} is encrypted and no passphrase was supplied")]
    PassphraseRequired { path: String },

    #[error("failed to decrypt private key at {path}: wrong passphrase or corrupt file")]
    Decrypt { path: String },

    #[error("unrecognized certificate format in {path}")]
    UnrecognizedCertFormat { path: String },

    #[error("certificate does not match the private key's public key")]
    CertKeyMismatch,

    #[error("signing operation failed: {0}")]
    Sign(String),
}

pub type Result<T> = std::result::Result<T, KeyError>;
