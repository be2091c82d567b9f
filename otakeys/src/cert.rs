// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::{KeyError, Result};
use crate::key::PrivateKey;
use std::path::Path;
use x509_cert::der::{Decode, Encode};
use x509_cert::Certificate;

/// A loaded X.509 certificate, kept around both as the parsed structure
/// (for embedding in the PKCS#7 signature) and as its original DER bytes
/// (so otacert replacement can write back byte-identical content when the
/// input was already DER-canonical).
pub struct LoadedCert {
    pub certificate: Certificate,
    pub der: Vec<u8>,
}

impl LoadedCert {
    pub fn load(path: &Path) -> Result<Self> {
        let pem = std::fs::read_to_string(path).map_err(|source| KeyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let der = pem_rfc7468::decode_vec(pem.as_bytes())
            .map_err(|_| KeyError::UnrecognizedCertFormat { path: path.display().to_string() })?
            .1;
        let certificate = Certificate::from_der(&der)
            .map_err(|_| KeyError::UnrecognizedCertFormat { path: path.display().to_string() })?;
        Ok(Self { certificate, der })
    }

    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        let certificate = Certificate::from_der(&der)
            .map_err(|_| KeyError::UnrecognizedCertFormat { path: "<embedded>".to_string() })?;
        Ok(Self { certificate, der })
    }

    pub fn to_pem(&self) -> String {
        crate::key::write_cert_pem(&self.der)
    }

    fn public_key_der(&self) -> Result<Vec<u8>> {
        self.certificate
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| KeyError::Sign(e.to_string()))
    }

    /// Validates that this certificate's embedded public key matches the
    /// given private key, implementing the `KEY_MISMATCH` check required
    /// before the OTA signer is trusted with the key.
    pub fn matches_key(&self, key: &PrivateKey) -> Result<()> {
        let cert_spki = self.public_key_der()?;
        let key_spki = key.public_key_der()?;
        if cert_spki == key_spki {
            Ok(())
        } else {
            Err(KeyError::CertKeyMismatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::EncodePublicKey;
    use rsa::RsaPrivateKey;
    use sha2::{Digest, Sha256};
    use x509_cert::der::asn1::{BitString, UtcTime};
    use x509_cert::der::Encode;
    use x509_cert::name::Name;
    use x509_cert::serial_number::SerialNumber;
    use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
    use x509_cert::time::{Time, Validity};
    use x509_cert::{Certificate, TbsCertificate, Version};

    /// Builds a minimal self-signed certificate wrapping `key`'s public
    /// half, DER-encoded. Good enough for `matches_key`; real certificate
    /// loading/parsing paths are exercised via `LoadedCert::load` elsewhere.
    fn self_signed_cert_der(key: &RsaPrivateKey) -> Vec<u8> {
        let spki_der = key.to_public_key().to_public_key_der().unwrap();
        let spki = SubjectPublicKeyInfoOwned::try_from(spki_der.as_bytes()).unwrap();
        let subject: Name = "CN=otakeys-test".parse().unwrap();
        let not_before = Time::UtcTime(
            UtcTime::from_unix_duration(std::time::Duration::from_secs(1_700_000_000)).unwrap(),
        );
        let not_after = Time::UtcTime(
            UtcTime::from_unix_duration(std::time::Duration::from_secs(2_000_000_000)).unwrap(),
        );
        let signature_alg = AlgorithmIdentifierOwned {
            oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
            parameters: Some(x509_cert::der::Any::NULL),
        };
        let tbs = TbsCertificate {
            version: Version::V3,
            serial_number: SerialNumber::new(&[1u8]).unwrap(),
            signature: signature_alg.clone(),
            issuer: subject.clone(),
            validity: Validity { not_before, not_after },
            subject,
            subject_public_key_info: spki,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: None,
        };
        let tbs_der = tbs.to_der().unwrap();
        let digest = Sha256::digest(&tbs_der);
        let padding = rsa::Pkcs1v15Sign::new::<Sha256>();
        let signature = key.sign(padding, &digest).unwrap();
        let cert = Certificate {
            tbs_certificate: tbs,
            signature_algorithm: signature_alg,
            signature: BitString::from_bytes(&signature).unwrap(),
        };
        cert.to_der().unwrap()
    }

    #[test]
    fn matching_cert_and_key_are_accepted() {
        let mut rng = rand::thread_rng();
        let rsa_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let cert = LoadedCert::from_der(self_signed_cert_der(&rsa_key)).unwrap();
        let key = PrivateKey::Rsa(Box::new(rsa_key));
        assert!(cert.matches_key(&key).is_ok());
    }

    #[test]
    fn mismatched_cert_and_key_are_rejected() {
        let mut rng = rand::thread_rng();
        let cert_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let other_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let cert = LoadedCert::from_der(self_signed_cert_der(&cert_key)).unwrap();
        let key = PrivateKey::Rsa(Box::new(other_key));
        assert!(matches!(cert.matches_key(&key), Err(KeyError::CertKeyMismatch)));
    }
}
