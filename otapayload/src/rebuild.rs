// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::{PayloadError, Result};
use crate::header::PayloadHeader;
use crate::manifest::proto::{install_operation::Type as OpType, Signature, Signatures};
use crate::manifest::{
    passthrough_fields, DeltaArchiveManifest, Extent, InstallOperation, Manifest, PartitionInfo,
};
use otakeys::PrivateKey;
use otastream::{PayloadSource, SectionReader};
use prost::Message;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Read;

/// A freshly-rebuilt payload, plus the values `payload_properties.txt`
/// needs.
pub struct RebuiltPayload {
    pub bytes: Vec<u8>,
    pub file_hash: [u8; 32],
    pub file_size: u64,
    pub metadata_hash: [u8; 32],
    pub metadata_size: u64,
}

/// Rebuilds the payload, substituting `patched_images` (partition name ->
/// path to the new image) in for their original operation lists, and
/// copying every other partition's bytes through unchanged from the
/// original blob.
pub fn rebuild_payload(
    original: &Manifest,
    original_blob_source: &impl PayloadSource,
    original_blob_offset: u64,
    patched_images: &HashMap<String, std::path::PathBuf>,
    ota_key: &PrivateKey,
) -> Result<RebuiltPayload> {
    if !ota_key.is_rsa() {
        return Err(PayloadError::Signature(
            "payload manifest signing requires an RSA OTA key".to_string(),
        ));
    }
    let sig_len = rsa_signature_len(ota_key)?;

    let mut manifest = original.manifest.clone();
    let mut blob_body = Vec::new();
    let mut reader = original_blob_source.open()?;

    for partition in &mut manifest.partitions {
        if let Some(image_path) = patched_images.get(&partition.partition_name) {
            let image = std::fs::read(image_path)?;
            let hash = Sha256::digest(&image).to_vec();
            let size = image.len() as u64;
            let offset = blob_body.len() as u64;
            partition.operations = vec![InstallOperation {
                r#type: OpType::Replace as i32,
                data_offset: Some(offset),
                data_length: Some(size),
                dst_extents: vec![Extent {
                    start_block: Some(0),
                    num_blocks: Some(size.div_ceil(manifest.block_size() as u64)),
                }],
                data_sha256_hash: Some(Sha256::digest(&image).to_vec()),
                ..Default::default()
            }];
            partition.new_partition_info = Some(PartitionInfo { size: Some(size), hash: Some(hash) });
            blob_body.extend_from_slice(&image);
        } else {
            for op in &mut partition.operations {
                let len = op.data_length.unwrap_or(0);
                if len == 0 {
                    continue;
                }
                let mut section = SectionReader::new(
                    &mut *reader,
                    original_blob_offset + op.data_offset.unwrap_or(0),
                    len,
                )?;
                let new_offset = blob_body.len() as u64;
                let before = blob_body.len();
                blob_body.resize(before + len as usize, 0);
                section.read_exact(&mut blob_body[before..])?;
                op.data_offset = Some(new_offset);
            }
        }
    }

    manifest.signatures_offset = Some(blob_body.len() as u64);
    let placeholder_sig_message = encode_signature_message(&vec![0u8; sig_len]);
    manifest.signatures_size = Some(placeholder_sig_message.len() as u64);

    // Only fields 4 (signatures_offset), 5 (signatures_size), and 13
    // (partitions) are regenerated here; every other top-level field —
    // including any this crate's `.proto` copy doesn't model — is carried
    // forward byte for byte from the original manifest so rebuilding never
    // silently drops them.
    const REGENERATED_FIELDS: &[u32] = &[4, 5, 13];
    let regenerated = DeltaArchiveManifest {
        signatures_offset: manifest.signatures_offset,
        signatures_size: manifest.signatures_size,
        partitions: manifest.partitions,
        ..Default::default()
    };
    let manifest_bytes = {
        let mut bytes = passthrough_fields(&original.raw, REGENERATED_FIELDS)?;
        bytes.extend_from_slice(&regenerated.encode_to_vec());
        bytes
    };

    let metadata_sig_placeholder = encode_signature_message(&vec![0u8; sig_len]);
    let header_prefix_len_without_sig =
        4 + 8 + 8 + 4 + manifest_bytes.len(); // magic+version+manifest_size+metadata_sig_size+manifest
    let to_sign_for_metadata = {
        let mut v = Vec::with_capacity(header_prefix_len_without_sig);
        v.extend_from_slice(b"CrAU");
        v.extend_from_slice(&original.version.to_be_bytes());
        v.extend_from_slice(&(manifest_bytes.len() as u64).to_be_bytes());
        v.extend_from_slice(&(metadata_sig_placeholder.len() as u32).to_be_bytes());
        v.extend_from_slice(&manifest_bytes);
        v
    };
    let metadata_signature_raw = ota_key.sign_raw(&to_sign_for_metadata)?;
    let metadata_signature = encode_signature_message(&metadata_signature_raw);
    debug_assert_eq!(metadata_signature.len(), metadata_sig_placeholder.len());

    let header_prefix =
        PayloadHeader::encode(original.version, &manifest_bytes, &metadata_signature);

    let mut to_sign_for_payload = Vec::with_capacity(header_prefix.len() + blob_body.len());
    to_sign_for_payload.extend_from_slice(&header_prefix);
    to_sign_for_payload.extend_from_slice(&blob_body);
    let payload_signature_raw = ota_key.sign_raw(&to_sign_for_payload)?;
    let payload_signature_message = encode_signature_message(&payload_signature_raw);
    debug_assert_eq!(payload_signature_message.len(), placeholder_sig_message.len());

    let mut full = header_prefix;
    full.extend_from_slice(&blob_body);
    full.extend_from_slice(&payload_signature_message);

    let file_hash = Sha256::digest(&full).into();
    let file_size = full.len() as u64;
    let metadata_len = to_sign_for_metadata.len() as u64;
    let metadata_hash = Sha256::digest(&full[..metadata_len as usize]).into();

    Ok(RebuiltPayload { bytes: full, file_hash, file_size, metadata_hash, metadata_size: metadata_len })
}

fn encode_signature_message(raw: &[u8]) -> Vec<u8> {
    let signatures = Signatures {
        signatures: vec![Signature {
            version: Some(1),
            data: Some(raw.to_vec()),
            unpadded_signature_size: Some(raw.len() as u32),
        }],
    };
    signatures.encode_to_vec()
}

fn rsa_signature_len(key: &PrivateKey) -> Result<usize> {
    // The signature produced by `sign_raw` on an RSA key is exactly the
    // key's modulus size in bytes (RSASSA-PKCS1-v1_5); computing it ahead
    // of signing is what lets the manifest's `signatures_size` field be
    // correct on the very first pass (no placeholder-then-overwrite dance
    // needed here, unlike the ZIP metadata entries in `otameta`).
    key.rsa_modulus_len().ok_or_else(|| {
        PayloadError::Signature("expected an RSA key for payload signing".to_string())
    })
}

#[cfg(test)]
mod tests {
    // Exercising the full rebuild path requires a real RSA keypair; that
    // is covered by `otacore`'s end-to-end orchestrator tests, which
    // generate one fixture keypair and reuse it across every crate's
    // signing-dependent assertions rather than duplicating key generation
    // here.
}
