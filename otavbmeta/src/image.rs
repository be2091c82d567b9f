// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::descriptor::Descriptor;
use crate::error::{Result, VbmetaError};
use crate::header::{AlgorithmType, VbmetaHeader, HEADER_SIZE};
use binrw::{BinRead, BinWrite};
use otakeys::PrivateKey;
use sha2::{Digest, Sha256};
use std::io::Cursor;

/// A fully parsed vbmeta image: header, descriptors from the auxiliary
/// block, and the public key that signed it.
#[derive(Clone, Debug)]
pub struct VbmetaImage {
    pub header: VbmetaHeader,
    pub descriptors: Vec<Descriptor>,
    pub public_key: Vec<u8>,
}

fn pad_to_8(len: usize) -> usize {
    (8 - (len % 8)) % 8
}

impl VbmetaImage {
    /// Parses a vbmeta image from its in-memory bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let header = VbmetaHeader::read(&mut cursor).map_err(|_| VbmetaError::BadHeaderMagic)?;
        let aux_start = (HEADER_SIZE + header.authentication_data_block_size) as usize;
        let aux_end = aux_start + header.auxiliary_data_block_size as usize;
        if aux_end > bytes.len() {
            return Err(VbmetaError::Truncated("auxiliary data block".to_string()));
        }
        let aux = &bytes[aux_start..aux_end];

        let desc_start = header.descriptors_offset as usize;
        let desc_end = desc_start + header.descriptors_size as usize;
        if desc_end > aux.len() {
            return Err(VbmetaError::Truncated("descriptors block".to_string()));
        }
        let descriptors = Descriptor::decode_all(&aux[desc_start..desc_end])?;

        let key_start = header.public_key_offset as usize;
        let key_end = key_start + header.public_key_size as usize;
        if key_end > aux.len() {
            return Err(VbmetaError::Truncated("public key block".to_string()));
        }
        let public_key = aux[key_start..key_end].to_vec();

        Ok(Self { header, descriptors, public_key })
    }

    /// Assembles and signs a new vbmeta image from scratch: descriptor set,
    /// `flags`, the rollback index to carry forward, and the key to sign
    /// with.
    pub fn build_and_sign(
        descriptors: &[Descriptor],
        flags: u32,
        rollback_index: u64,
        key: &PrivateKey,
        public_key_der: &[u8],
    ) -> Result<Vec<u8>> {
        let algorithm = algorithm_for_key(key)?;

        let mut descriptors_bytes = Vec::new();
        for d in descriptors {
            descriptors_bytes.extend_from_slice(&d.encode());
        }
        let desc_pad = pad_to_8(descriptors_bytes.len());
        descriptors_bytes.extend(std::iter::repeat(0u8).take(desc_pad));

        let key_pad = pad_to_8(public_key_der.len());
        let mut aux = Vec::new();
        // Public key first, descriptors after, matching the offsets we
        // record below.
        aux.extend_from_slice(public_key_der);
        aux.extend(std::iter::repeat(0u8).take(key_pad));
        let descriptors_offset = aux.len() as u64;
        aux.extend_from_slice(&descriptors_bytes);

        let hash_size = 32u64;
        let signature_size = algorithm.signature_size() as u64;
        let auth_block_size = hash_size + signature_size;
        let auth_pad = pad_to_8(auth_block_size as usize) as u64;

        let header = VbmetaHeader {
            required_libavb_version_major: 1,
            required_libavb_version_minor: 0,
            authentication_data_block_size: auth_block_size + auth_pad,
            auxiliary_data_block_size: aux.len() as u64,
            algorithm_type: algorithm.to_raw(),
            hash_offset: 0,
            hash_size,
            signature_offset: hash_size,
            signature_size,
            public_key_offset: 0,
            public_key_size: public_key_der.len() as u64,
            public_key_metadata_offset: 0,
            public_key_metadata_size: 0,
            descriptors_offset,
            descriptors_size: descriptors_bytes.len() as u64,
            rollback_index,
            flags,
            rollback_index_location: 0,
            release_string: b"otapatch".to_vec(),
            reserved: vec![0u8; 89],
        };

        let mut header_bytes = Cursor::new(Vec::new());
        header.write(&mut header_bytes)?;
        let header_bytes = header_bytes.into_inner();

        if algorithm == AlgorithmType::None {
            let mut out = header_bytes;
            out.extend(std::iter::repeat(0u8).take((auth_block_size + auth_pad) as usize));
            out.extend_from_slice(&aux);
            return Ok(out);
        }

        let mut to_sign = header_bytes.clone();
        to_sign.extend_from_slice(&aux);
        let digest = Sha256::digest(&to_sign);
        let signature = key.sign_raw(&to_sign)?;
        if signature.len() as u64 != signature_size {
            return Err(VbmetaError::Incompatible(format!(
                "signature length {} did not match expected {signature_size} for {algorithm:?}",
                signature.len()
            )));
        }

        let mut auth = Vec::with_capacity((auth_block_size + auth_pad) as usize);
        auth.extend_from_slice(&digest);
        auth.extend_from_slice(&signature);
        auth.extend(std::iter::repeat(0u8).take(auth_pad as usize));

        let mut out = header_bytes;
        out.extend_from_slice(&auth);
        out.extend_from_slice(&aux);
        Ok(out)
    }
}

fn algorithm_for_key(key: &PrivateKey) -> Result<AlgorithmType> {
    match key.rsa_modulus_len() {
        Some(256) => Ok(AlgorithmType::Sha256Rsa2048),
        Some(512) => Ok(AlgorithmType::Sha256Rsa4096),
        Some(other) => {
            Err(VbmetaError::Incompatible(format!("unsupported RSA modulus size {other} bytes")))
        }
        None => Ok(AlgorithmType::Sha256Ecdsa),
    }
}
