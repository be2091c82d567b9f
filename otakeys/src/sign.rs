// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::cert::LoadedCert;
use crate::error::{KeyError, Result};
use crate::key::PrivateKey;
use rasn::types::{Integer, Oid};
use rasn::Encode;
use rasn_cms::algorithms::{RSA, SHA256};
use rasn_cms::{
    pkcs7_compat::{EncapsulatedContentInfo, SignedData},
    AlgorithmIdentifier, Certificate as CmsCertificate, CertificateChoices, ContentInfo,
    IssuerAndSerialNumber, SignerIdentifier, SignerInfo,
};

const OID_PKCS7_DATA: &Oid = Oid::ISO_MEMBER_BODY_US_RSADSI_PKCS7_DATA;
const OID_PKCS7_SIGNED_DATA: &Oid = Oid::ISO_MEMBER_BODY_US_RSADSI_PKCS7_SIGNED_DATA;

/// Builds a detached PKCS#7/CMS `SignedData` over `content`, the format the
/// Android recovery updater expects for the outer OTA signature appended to
/// the archive's central directory. The signature itself
/// is a raw signature over the SHA-256 digest of `content`, produced by
/// `key`; `cert` is embedded so the device can locate the matching trust
/// anchor without a separate lookup.
pub fn pkcs7_detached(content: &[u8], key: &PrivateKey, cert: &LoadedCert) -> Result<Vec<u8>> {
    if !key.is_rsa() {
        // Android's recovery-side PKCS#7 verifier only understands RSA
        // signer infos for the outer OTA signature; AVB is the layer that
        // accepts EC keys.
        return Err(KeyError::Sign(
            "OTA signing key must be RSA; AVB root key may be RSA or EC".to_string(),
        ));
    }

    let signature = key.sign_raw(content)?;

    let cms_cert = CmsCertificate::from_der(&cert.der)
        .map_err(|e| KeyError::Sign(format!("re-parsing certificate for CMS: {e}")))?;

    let signer_info = SignerInfo {
        version: Integer::from(1),
        sid: SignerIdentifier::IssuerAndSerialNumber(Box::new(IssuerAndSerialNumber {
            issuer: cms_cert.tbs_certificate.issuer.clone(),
            serial_number: cms_cert.tbs_certificate.serial_number.clone(),
        })),
        digest_algorithm: AlgorithmIdentifier { algorithm: SHA256.into(), parameters: None },
        signed_attrs: None,
        signature_algorithm: AlgorithmIdentifier { algorithm: RSA.into(), parameters: None },
        signature: signature.into(),
        unsigned_attrs: None,
    };

    let signed_data = SignedData {
        version: Integer::from(1),
        digest_algorithms: [AlgorithmIdentifier { algorithm: SHA256.into(), parameters: None }]
            .into_iter()
            .collect(),
        encap_content_info: EncapsulatedContentInfo {
            content_type: OID_PKCS7_DATA.into(),
            content: None,
        },
        certificates: Some([CertificateChoices::Certificate(Box::new(cms_cert))].into_iter().collect()),
        crls: None,
        signer_infos: [signer_info].into_iter().collect(),
    };

    let inner = signed_data
        .encode_to_vec()
        .map_err(|e| KeyError::Sign(format!("encoding SignedData: {e}")))?;

    let wrapper = ContentInfo {
        content_type: OID_PKCS7_SIGNED_DATA.into(),
        content: rasn::types::Any::new(inner),
    };

    wrapper
        .encode_to_vec()
        .map_err(|e| KeyError::Sign(format!("encoding ContentInfo: {e}")))
}
