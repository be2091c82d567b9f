// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::{PayloadError, Result};
use std::io::{Read, Seek, SeekFrom};

const MAGIC: &[u8; 4] = b"CrAU";
const MAX_SUPPORTED_VERSION: u64 = 2;

/// The fixed-layout prefix of a `payload.bin`: magic, version, and the
/// lengths needed to locate the manifest, its signature, and the start of
/// the data blob region.
///
/// ```text
/// char magic[4] = "CrAU";
/// uint64 file_format_version;
/// uint64 manifest_size;
/// uint32 metadata_signature_size;  // only if file_format_version >= 2
/// char manifest[manifest_size];
/// char metadata_signature_message[metadata_signature_size];
/// // blob_offset starts here
/// ```
#[derive(Debug, Clone)]
pub struct PayloadHeader {
    pub version: u64,
    pub manifest_raw: Vec<u8>,
    pub metadata_signature: Vec<u8>,
    /// Absolute offset of the data blob region within the payload stream.
    pub blob_offset: u64,
}

impl PayloadHeader {
    pub fn parse(mut r: impl Read + Seek) -> Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(PayloadError::BadMagic);
        }

        let version = read_u64_be(&mut r)?;
        if version == 0 || version > MAX_SUPPORTED_VERSION {
            return Err(PayloadError::UnsupportedVersion(version));
        }

        let manifest_size = read_u64_be(&mut r)?;
        let metadata_signature_size = if version >= 2 { read_u32_be(&mut r)? } else { 0 };

        let mut manifest_raw = vec![0u8; manifest_size as usize];
        r.read_exact(&mut manifest_raw)?;

        let mut metadata_signature = vec![0u8; metadata_signature_size as usize];
        r.read_exact(&mut metadata_signature)?;

        let blob_offset = r.stream_position()?;

        Ok(Self { version, manifest_raw, metadata_signature, blob_offset })
    }

    /// Re-serializes the fixed-layout prefix (header + manifest +
    /// metadata signature) for a rebuilt payload, given a freshly encoded
    /// manifest and signature.
    pub fn encode(version: u64, manifest: &[u8], metadata_signature: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(24 + manifest.len() + metadata_signature.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&version.to_be_bytes());
        out.extend_from_slice(&(manifest.len() as u64).to_be_bytes());
        if version >= 2 {
            out.extend_from_slice(&(metadata_signature.len() as u32).to_be_bytes());
        }
        out.extend_from_slice(manifest);
        out.extend_from_slice(metadata_signature);
        out
    }
}

fn read_u64_be(r: &mut impl Read) -> Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

fn read_u32_be(r: &mut impl Read) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}
