// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::{KeyError, Result};
use crate::passphrase;
use p256::ecdsa::SigningKey as EcSigningKey;
use pkcs8::{DecodePrivateKey, EncryptedPrivateKeyInfo, LineEnding, PrivateKeyInfo};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};
use signature::Signer;
use std::path::Path;

/// A loaded private key, either RSA or NIST P-256. AVB and OTA signing both
/// accept either family; which one is in use is determined entirely by what
/// the caller's PEM file contains.
pub enum PrivateKey {
    Rsa(Box<RsaPrivateKey>),
    Ec(Box<EcSigningKey>),
}

impl PrivateKey {
    /// Loads a PKCS#1 or PKCS#8 PEM private key from `path`, prompting for a
    /// passphrase (or reading the sidecar passphrase-file env var) if the
    /// key turns out to be encrypted.
    pub fn load(path: &Path) -> Result<Self> {
        let pem = std::fs::read_to_string(path).map_err(|source| KeyError::Io {
            path: path.display().to_string(),
            source,
        })?;

        if pem.contains("ENCRYPTED") {
            let passphrase = passphrase::obtain(path).map_err(|source| KeyError::Io {
                path: path.display().to_string(),
                source,
            })?;
            return Self::load_encrypted(path, &pem, passphrase.as_bytes());
        }

        if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(&pem) {
            return Ok(Self::Rsa(Box::new(key)));
        }
        if let Ok(key) = RsaPrivateKey::from_pkcs1_pem(&pem) {
            return Ok(Self::Rsa(Box::new(key)));
        }
        if let Ok(key) = EcSigningKey::from_pkcs8_pem(&pem) {
            return Ok(Self::Ec(Box::new(key)));
        }
        if let Ok(key) = EcSigningKey::from_sec1_pem(&pem) {
            return Ok(Self::Ec(Box::new(key)));
        }

        Err(KeyError::UnrecognizedKeyFormat { path: path.display().to_string() })
    }

    fn load_encrypted(path: &Path, pem: &str, passphrase: &[u8]) -> Result<Self> {
        let der = pem_rfc7468::decode_vec(pem.as_bytes())
            .map_err(|_| KeyError::UnrecognizedKeyFormat { path: path.display().to_string() })?
            .1;
        let encrypted = EncryptedPrivateKeyInfo::try_from(der.as_slice())
            .map_err(|_| KeyError::UnrecognizedKeyFormat { path: path.display().to_string() })?;
        let decrypted = encrypted
            .decrypt(passphrase)
            .map_err(|_| KeyError::Decrypt { path: path.display().to_string() })?;
        let info = PrivateKeyInfo::try_from(decrypted.as_bytes())
            .map_err(|_| KeyError::Decrypt { path: path.display().to_string() })?;

        if let Ok(key) = RsaPrivateKey::try_from(info) {
            return Ok(Self::Rsa(Box::new(key)));
        }
        if let Ok(key) = EcSigningKey::try_from(info) {
            return Ok(Self::Ec(Box::new(key)));
        }
        Err(KeyError::UnrecognizedKeyFormat { path: path.display().to_string() })
    }

    /// Re-encodes the key's own public half as DER-encoded `SubjectPublicKeyInfo`,
    /// used to check it matches a caller-supplied certificate.
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        match self {
            Self::Rsa(key) => {
                use rsa::pkcs8::EncodePublicKey;
                key.to_public_key()
                    .to_public_key_der()
                    .map(|d| d.as_bytes().to_vec())
                    .map_err(|e| KeyError::Sign(e.to_string()))
            }
            Self::Ec(key) => {
                use p256::pkcs8::EncodePublicKey;
                key.verifying_key()
                    .to_public_key_der()
                    .map(|d| d.as_bytes().to_vec())
                    .map_err(|e| KeyError::Sign(e.to_string()))
            }
        }
    }

    /// Produces a raw RSASSA-PKCS1-v1_5 (RSA) or ECDSA (P-256) signature
    /// over the SHA-256 digest of `data`. This is the signature format AVB
    /// footers and the update-payload manifest both expect.
    pub fn sign_raw(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Rsa(key) => {
                let digest = Sha256::digest(data);
                let padding = rsa::Pkcs1v15Sign::new::<Sha256>();
                key.sign(padding, &digest).map_err(|e| KeyError::Sign(e.to_string()))
            }
            Self::Ec(key) => {
                let sig: p256::ecdsa::Signature = key.sign(data);
                Ok(sig.to_der().as_bytes().to_vec())
            }
        }
    }

    pub fn is_rsa(&self) -> bool {
        matches!(self, Self::Rsa(_))
    }

    /// The RSA modulus size in bytes, i.e. the exact length `sign_raw` will
    /// produce for this key. `None` for EC keys, which have no fixed
    /// byte-for-byte signature length callers can rely on ahead of signing.
    pub fn rsa_modulus_len(&self) -> Option<usize> {
        match self {
            Self::Rsa(key) => Some(rsa::traits::PublicKeyParts::size(key.as_ref())),
            Self::Ec(_) => None,
        }
    }
}

/// Re-exported purely so downstream crates can write PEM out deterministically
/// (used when repacking `otacerts.zip`, see `otaboot`).
pub fn write_cert_pem(der: &[u8]) -> String {
    pem_rfc7468::encode_string("CERTIFICATE", LineEnding::LF, der)
        .expect("DER certificate bytes always re-encode to PEM")
}
