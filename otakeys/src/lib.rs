// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Cryptographic adapters: load a private key (prompting for a passphrase
//! when it is encrypted), verify a certificate matches it, and produce a
//! raw signature or a detached PKCS#7/CMS signature over a byte range.
//!
//! Everything downstream of "bytes go in, a signature comes out" — the
//! arithmetic of RSA/ECDSA and SHA hashing — is delegated to `rsa`, `p256`
//! and `sha2`; this crate only adapts those primitives to the PEM/X.509/
//! PKCS#7 shapes Android's OTA and AVB signing expect.

mod cert;
mod error;
mod key;
mod passphrase;
mod sign;

pub use cert::LoadedCert;
pub use error::{KeyError, Result};
pub use key::PrivateKey;
pub use sign::pkcs7_detached;
