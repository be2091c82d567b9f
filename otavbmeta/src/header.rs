// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::{Result, VbmetaError};
use binrw::binrw;

/// AVB signing algorithm. Only the SHA256-digest families are implemented;
/// that is what `otakeys` produces signatures for; the algorithm is always
/// preserved from the original image rather than chosen anew.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlgorithmType {
    None,
    Sha256Rsa2048,
    Sha256Rsa4096,
    Sha256Ecdsa,
}

impl AlgorithmType {
    pub fn from_raw(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(Self::None),
            1 => Ok(Self::Sha256Rsa2048),
            3 => Ok(Self::Sha256Rsa4096),
            6 => Ok(Self::Sha256Ecdsa),
            other => Err(VbmetaError::UnknownAlgorithm(other)),
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Sha256Rsa2048 => 1,
            Self::Sha256Rsa4096 => 3,
            Self::Sha256Ecdsa => 6,
        }
    }

    /// Size in bytes of the raw signature this algorithm produces, used to
    /// size the authentication block ahead of signing.
    pub fn signature_size(self) -> usize {
        match self {
            Self::None => 0,
            Self::Sha256Rsa2048 => 256,
            Self::Sha256Rsa4096 => 512,
            Self::Sha256Ecdsa => 72, // DER-encoded P-256 signature, upper bound
        }
    }
}

/// Fixed 256-byte vbmeta header, preceding the authentication block and the
/// auxiliary (descriptor) block.
#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big, magic = b"AVB0")]
pub struct VbmetaHeader {
    pub required_libavb_version_major: u32,
    pub required_libavb_version_minor: u32,
    pub authentication_data_block_size: u64,
    pub auxiliary_data_block_size: u64,
    pub algorithm_type: u32,
    pub hash_offset: u64,
    pub hash_size: u64,
    pub signature_offset: u64,
    pub signature_size: u64,
    pub public_key_offset: u64,
    pub public_key_size: u64,
    pub public_key_metadata_offset: u64,
    pub public_key_metadata_size: u64,
    pub descriptors_offset: u64,
    pub descriptors_size: u64,
    pub rollback_index: u64,
    pub flags: u32,
    pub rollback_index_location: u32,
    #[bw(pad_size_to = 47)]
    #[br(count = 47)]
    pub release_string: Vec<u8>,
    #[bw(pad_size_to = 89)]
    #[br(count = 89)]
    pub reserved: Vec<u8>,
}

/// Total on-disk size of a `VbmetaHeader`, magic included.
pub const HEADER_SIZE: u64 = 256;

impl VbmetaHeader {
    pub fn algorithm(&self) -> Result<AlgorithmType> {
        AlgorithmType::from_raw(self.algorithm_type)
    }
}
