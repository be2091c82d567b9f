// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The patch orchestrator: ties `otazip`/`otakeys`/`otaboot`/`otavbmeta`/
//! `otapayload`/`otameta` together into the two entry points the CLI binary
//! (`otapatch`) calls. Kept as a library so the pipeline is
//! unit-testable without spawning a process, the same `lib`-plus-thin-`bin`
//! split the retrieval pack's `coreos-installer` uses.

mod error;
mod extract;
mod options;
mod patch;
mod progress;

pub use error::{Error, Result};
pub use extract::run_extract;
pub use options::{ExtractOptions, PatchOptions, RootPatchArg};
pub use patch::run_patch;

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
    use rsa::RsaPrivateKey;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    /// An RSA keypair plus a self-signed certificate, shared across every
    /// test in this module rather than generated per case (RSA keygen is
    /// slow and unrelated to what each test is actually checking).
    struct Fixture {
        dir: tempfile::TempDir,
        avb_key_path: std::path::PathBuf,
        ota_key_path: std::path::PathBuf,
        ota_cert_path: std::path::PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mut rng = rand::thread_rng();
            let avb_rsa = RsaPrivateKey::new(&mut rng, 2048).unwrap();
            let ota_rsa = RsaPrivateKey::new(&mut rng, 2048).unwrap();

            let avb_key_path = dir.path().join("avb.pem");
            std::fs::write(&avb_key_path, avb_rsa.to_pkcs8_pem(LineEnding::LF).unwrap().as_bytes())
                .unwrap();
            let ota_key_path = dir.path().join("ota.pem");
            std::fs::write(&ota_key_path, ota_rsa.to_pkcs8_pem(LineEnding::LF).unwrap().as_bytes())
                .unwrap();

            let ota_cert_path = dir.path().join("ota.x509.pem");
            std::fs::write(&ota_cert_path, self_signed_cert_pem(&ota_rsa)).unwrap();

            Self { dir, avb_key_path, ota_key_path, ota_cert_path }
        }

        fn mismatched_cert_path(&self) -> std::path::PathBuf {
            let mut rng = rand::thread_rng();
            let other = RsaPrivateKey::new(&mut rng, 2048).unwrap();
            let path = self.dir.path().join("other.x509.pem");
            std::fs::write(&path, self_signed_cert_pem(&other)).unwrap();
            path
        }
    }

    /// Builds a minimal self-signed X.509 certificate wrapping `key`'s
    /// public half, PEM-encoded. Good enough for `LoadedCert::load` and the
    /// `matches_key`/`pkcs7_detached` paths this module exercises; real
    /// certificate-content assertions belong to `otakeys`'s own tests.
    fn self_signed_cert_pem(key: &RsaPrivateKey) -> String {
        use sha2::{Digest, Sha256};
        use x509_cert::der::asn1::{BitString, UtcTime};
        use x509_cert::der::Encode;
        use x509_cert::name::Name;
        use x509_cert::serial_number::SerialNumber;
        use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
        use x509_cert::time::{Time, Validity};
        use x509_cert::{Certificate, TbsCertificate, Version};

        let spki_der = key.to_public_key().to_public_key_der().unwrap();
        let spki = SubjectPublicKeyInfoOwned::try_from(spki_der.as_bytes()).unwrap();
        let subject: Name = "CN=otacore-test".parse().unwrap();
        let not_before =
            Time::UtcTime(UtcTime::from_unix_duration(std::time::Duration::from_secs(1_700_000_000)).unwrap());
        let not_after =
            Time::UtcTime(UtcTime::from_unix_duration(std::time::Duration::from_secs(2_000_000_000)).unwrap());
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
        pem_rfc7468::encode_string("CERTIFICATE", pem_rfc7468::LineEnding::LF, &cert.to_der().unwrap())
            .unwrap()
    }

    fn archive_missing(path: &std::path::Path, omit: &str) {
        let file = std::fs::File::create(path).unwrap();
        let mut w = ZipWriter::new(file);
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
        for name in otazip::REQUIRED_ENTRIES.iter().filter(|n| **n != omit) {
            w.start_file(*name, stored).unwrap();
            w.write_all(b"stub").unwrap();
        }
        w.finish().unwrap();
    }

    #[test]
    fn missing_metadata_pb_is_rejected_before_any_key_material_is_touched() {
        let fixture = Fixture::new();
        let input_path = fixture.dir.path().join("bad.zip");
        archive_missing(&input_path, otazip::METADATA_PB);

        let options = PatchOptions {
            input: input_path,
            output: fixture.dir.path().join("out.zip"),
            avb_key_path: fixture.avb_key_path.clone(),
            ota_key_path: fixture.ota_key_path.clone(),
            ota_cert_path: fixture.ota_cert_path.clone(),
            root_patch: RootPatchArg::Prepatched(fixture.dir.path().join("nope.img")),
            clear_vbmeta_flags: false,
            boot_partition: "gki_ramdisk".to_string(),
        };
        let err = run_patch(&options).unwrap_err();
        assert!(matches!(err, Error::Archive(otazip::ZipError::MissingEntry(name)) if name == otazip::METADATA_PB));
    }

    #[test]
    fn cert_key_mismatch_is_rejected_before_any_archive_work() {
        let fixture = Fixture::new();
        let input_path = fixture.dir.path().join("whatever.zip");
        archive_missing(&input_path, "nothing-to-omit");

        let options = PatchOptions {
            input: input_path,
            output: fixture.dir.path().join("out.zip"),
            avb_key_path: fixture.avb_key_path.clone(),
            ota_key_path: fixture.ota_key_path.clone(),
            ota_cert_path: fixture.mismatched_cert_path(),
            root_patch: RootPatchArg::Prepatched(fixture.dir.path().join("nope.img")),
            clear_vbmeta_flags: false,
            boot_partition: "gki_ramdisk".to_string(),
        };
        let err = run_patch(&options).unwrap_err();
        assert!(matches!(err, Error::KeyMismatch));
    }

    #[test]
    fn extract_rejects_archive_missing_payload_properties() {
        let fixture = Fixture::new();
        let input_path = fixture.dir.path().join("bad.zip");
        archive_missing(&input_path, otazip::PAYLOAD_PROPERTIES);

        let options = ExtractOptions {
            input: input_path,
            directory: fixture.dir.path().join("out"),
            all: true,
            boot_partition: "gki_ramdisk".to_string(),
        };
        let err = run_extract(&options).unwrap_err();
        assert!(matches!(
            err,
            Error::Archive(otazip::ZipError::MissingEntry(name)) if name == otazip::PAYLOAD_PROPERTIES
        ));
    }

    #[test]
    fn patch_surfaces_unreadable_avb_key_path() {
        let fixture = Fixture::new();
        let options = PatchOptions {
            input: fixture.dir.path().join("does-not-exist.zip"),
            output: fixture.dir.path().join("out.zip"),
            avb_key_path: fixture.dir.path().join("missing-key.pem"),
            ota_key_path: fixture.ota_key_path.clone(),
            ota_cert_path: fixture.ota_cert_path.clone(),
            root_patch: RootPatchArg::Prepatched(fixture.dir.path().join("nope.img")),
            clear_vbmeta_flags: false,
            boot_partition: "gki_ramdisk".to_string(),
        };
        let err = run_patch(&options).unwrap_err();
        assert!(matches!(err, Error::Signature(_)));
    }
}
