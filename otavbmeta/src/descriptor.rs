// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::{Result, VbmetaError};

const TAG_CHAIN_PARTITION: u64 = 4;
const TAG_HASH: u64 = 2;

/// One auxiliary-block descriptor. `Hash` and `Chain` are the two variants
/// this crate builds; anything else round-trips verbatim as `Unknown` so a
/// future descriptor type never silently corrupts the vbmeta image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Descriptor {
    Hash(HashDescriptor),
    Chain(ChainDescriptor),
    Unknown { tag: u64, raw: Vec<u8> },
}

/// `AVB_DESCRIPTOR_TAG_HASH`: a SHA-256 digest over one partition's content,
/// used for every patched non-vbmeta, non-chained partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashDescriptor {
    pub image_size: u64,
    pub hash_algorithm: String,
    pub partition_name: String,
    pub salt: Vec<u8>,
    pub digest: Vec<u8>,
    pub flags: u32,
}

/// `AVB_DESCRIPTOR_TAG_CHAIN_PARTITION`: a pointer to another partition's own
/// vbmeta, preserved verbatim for partitions the root vbmeta chains rather
/// than hashes directly, preserved as-is rather than collapsed into a hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainDescriptor {
    pub rollback_index_location: u32,
    pub partition_name: String,
    pub public_key: Vec<u8>,
}

fn pad_to_8(len: usize) -> usize {
    (8 - (len % 8)) % 8
}

impl Descriptor {
    pub fn tag(&self) -> u64 {
        match self {
            Self::Hash(_) => TAG_HASH,
            Self::Chain(_) => TAG_CHAIN_PARTITION,
            Self::Unknown { tag, .. } => *tag,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let body = match self {
            Self::Hash(h) => h.encode_body(),
            Self::Chain(c) => c.encode_body(),
            Self::Unknown { raw, .. } => raw.clone(),
        };
        let pad = pad_to_8(body.len());
        let mut out = Vec::with_capacity(16 + body.len() + pad);
        out.extend_from_slice(&self.tag().to_be_bytes());
        out.extend_from_slice(&((body.len() + pad) as u64).to_be_bytes());
        out.extend_from_slice(&body);
        out.extend(std::iter::repeat(0u8).take(pad));
        out
    }

    /// Decodes every descriptor packed back-to-back in `data` (the
    /// descriptors block of the auxiliary data).
    pub fn decode_all(data: &[u8]) -> Result<Vec<Descriptor>> {
        let mut out = Vec::new();
        let mut pos = 0usize;
        while pos < data.len() {
            if data.len() - pos < 16 {
                return Err(VbmetaError::Truncated("descriptor header".to_string()));
            }
            let tag = u64::from_be_bytes(data[pos..pos + 8].try_into().unwrap());
            let num_bytes_following =
                u64::from_be_bytes(data[pos + 8..pos + 16].try_into().unwrap()) as usize;
            let body_start = pos + 16;
            let body_end = body_start + num_bytes_following;
            if body_end > data.len() {
                return Err(VbmetaError::Truncated("descriptor body".to_string()));
            }
            let body = &data[body_start..body_end];
            out.push(match tag {
                TAG_HASH => Descriptor::Hash(HashDescriptor::decode_body(body)?),
                TAG_CHAIN_PARTITION => Descriptor::Chain(ChainDescriptor::decode_body(body)?),
                other => Descriptor::Unknown { tag: other, raw: body.to_vec() },
            });
            pos = body_end;
        }
        Ok(out)
    }

    pub fn partition_name(&self) -> Option<&str> {
        match self {
            Self::Hash(h) => Some(&h.partition_name),
            Self::Chain(c) => Some(&c.partition_name),
            Self::Unknown { .. } => None,
        }
    }
}

impl HashDescriptor {
    /// Computes a hash descriptor over `image`, the whole content of a
    /// patched partition image file.
    pub fn compute(partition_name: &str, image: &[u8], salt: &[u8]) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(image);
        Self {
            image_size: image.len() as u64,
            hash_algorithm: "sha256".to_string(),
            partition_name: partition_name.to_string(),
            salt: salt.to_vec(),
            digest: hasher.finalize().to_vec(),
            flags: 0,
        }
    }

    fn encode_body(&self) -> Vec<u8> {
        let mut algo = [0u8; 32];
        let name_bytes = self.hash_algorithm.as_bytes();
        algo[..name_bytes.len().min(32)].copy_from_slice(&name_bytes[..name_bytes.len().min(32)]);

        let mut out = Vec::new();
        out.extend_from_slice(&self.image_size.to_be_bytes());
        out.extend_from_slice(&algo);
        out.extend_from_slice(&(self.partition_name.len() as u32).to_be_bytes());
        out.extend_from_slice(&(self.salt.len() as u32).to_be_bytes());
        out.extend_from_slice(&(self.digest.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.flags.to_be_bytes());
        out.extend_from_slice(&[0u8; 60]);
        out.extend_from_slice(self.partition_name.as_bytes());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.digest);
        out
    }

    fn decode_body(body: &[u8]) -> Result<Self> {
        if body.len() < 116 {
            return Err(VbmetaError::Truncated("hash descriptor fixed fields".to_string()));
        }
        let image_size = u64::from_be_bytes(body[0..8].try_into().unwrap());
        let algo_raw = &body[8..40];
        let hash_algorithm = String::from_utf8_lossy(algo_raw)
            .trim_end_matches('\0')
            .to_string();
        let name_len = u32::from_be_bytes(body[40..44].try_into().unwrap()) as usize;
        let salt_len = u32::from_be_bytes(body[44..48].try_into().unwrap()) as usize;
        let digest_len = u32::from_be_bytes(body[48..52].try_into().unwrap()) as usize;
        let flags = u32::from_be_bytes(body[52..56].try_into().unwrap());
        let mut cursor = 116usize;
        let partition_name = read_str(body, &mut cursor, name_len)?;
        let salt = read_bytes(body, &mut cursor, salt_len)?;
        let digest = read_bytes(body, &mut cursor, digest_len)?;
        Ok(Self { image_size, hash_algorithm, partition_name, salt, digest, flags })
    }
}

impl ChainDescriptor {
    fn encode_body(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.rollback_index_location.to_be_bytes());
        out.extend_from_slice(&(self.partition_name.len() as u32).to_be_bytes());
        out.extend_from_slice(&(self.public_key.len() as u32).to_be_bytes());
        out.extend_from_slice(&[0u8; 64]);
        out.extend_from_slice(self.partition_name.as_bytes());
        out.extend_from_slice(&self.public_key);
        out
    }

    fn decode_body(body: &[u8]) -> Result<Self> {
        if body.len() < 76 {
            return Err(VbmetaError::Truncated("chain descriptor fixed fields".to_string()));
        }
        let rollback_index_location = u32::from_be_bytes(body[0..4].try_into().unwrap());
        let name_len = u32::from_be_bytes(body[4..8].try_into().unwrap()) as usize;
        let key_len = u32::from_be_bytes(body[8..12].try_into().unwrap()) as usize;
        let mut cursor = 76usize;
        let partition_name = read_str(body, &mut cursor, name_len)?;
        let public_key = read_bytes(body, &mut cursor, key_len)?;
        Ok(Self { rollback_index_location, partition_name, public_key })
    }
}

fn read_bytes(body: &[u8], cursor: &mut usize, len: usize) -> Result<Vec<u8>> {
    let end = *cursor + len;
    if end > body.len() {
        return Err(VbmetaError::Truncated("descriptor variable data".to_string()));
    }
    let out = body[*cursor..end].to_vec();
    *cursor = end;
    Ok(out)
}

fn read_str(body: &[u8], cursor: &mut usize, len: usize) -> Result<String> {
    Ok(String::from_utf8_lossy(&read_bytes(body, cursor, len)?).to_string())
}
