// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Ramdisk compression codec, detected by magic bytes the way the retrieval
//! pack's `RuaFlashTool` detects ramdisk formats before patching.

use crate::error::Result;
use std::io::{Read, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RamdiskCodec {
    Gzip,
    Xz,
    Bzip2,
    Lz4,
    Zstd,
    Raw,
}

impl RamdiskCodec {
    /// Detects the codec a compressed ramdisk blob was encoded with by
    /// inspecting its leading magic bytes. Falls back to `Raw` for anything
    /// unrecognized or too short to carry a magic.
    pub fn detect(data: &[u8]) -> Self {
        match data {
            [0x1f, 0x8b, ..] => Self::Gzip,
            [0xfd, b'7', b'z', b'X', b'Z', 0x00, ..] => Self::Xz,
            [b'B', b'Z', b'h', ..] => Self::Bzip2,
            [0x04, 0x22, 0x4d, 0x18, ..] => Self::Lz4,
            [0x28, 0xb5, 0x2f, 0xfd, ..] => Self::Zstd,
            _ => Self::Raw,
        }
    }

    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Self::Gzip => {
                flate2::read::GzDecoder::new(data).read_to_end(&mut out)?;
            }
            Self::Xz => {
                xz2::read::XzDecoder::new(data).read_to_end(&mut out)?;
            }
            Self::Bzip2 => {
                bzip2::read::BzDecoder::new(data).read_to_end(&mut out)?;
            }
            Self::Lz4 => {
                lz4_flex::frame::FrameDecoder::new(data).read_to_end(&mut out)?;
            }
            Self::Zstd => {
                out = zstd::stream::decode_all(data)?;
            }
            Self::Raw => out.extend_from_slice(data),
        }
        Ok(out)
    }

    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Self::Gzip => {
                let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
                enc.write_all(data)?;
                out = enc.finish()?;
            }
            Self::Xz => {
                let mut enc = xz2::write::XzEncoder::new(Vec::new(), 6);
                enc.write_all(data)?;
                out = enc.finish()?;
            }
            Self::Bzip2 => {
                let mut enc =
                    bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
                enc.write_all(data)?;
                out = enc.finish()?;
            }
            Self::Lz4 => {
                let mut enc = lz4_flex::frame::FrameEncoder::new(Vec::new());
                enc.write_all(data)?;
                out = enc.finish()?;
            }
            Self::Zstd => {
                out = zstd::stream::encode_all(data, 0)?;
            }
            Self::Raw => out.extend_from_slice(data),
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_codec() {
        let original = b"ramdisk payload bytes, repeated repeated repeated".repeat(4);
        for codec in [
            RamdiskCodec::Gzip,
            RamdiskCodec::Xz,
            RamdiskCodec::Bzip2,
            RamdiskCodec::Lz4,
            RamdiskCodec::Zstd,
            RamdiskCodec::Raw,
        ] {
            let compressed = codec.compress(&original).unwrap();
            if codec != RamdiskCodec::Raw {
                assert_eq!(RamdiskCodec::detect(&compressed), codec);
            }
            let decompressed = codec.decompress(&compressed).unwrap();
            assert_eq!(decompressed, original);
        }
    }

    #[test]
    fn unknown_magic_is_treated_as_raw() {
        let data = b"plain cpio bytes".to_vec();
        assert_eq!(RamdiskCodec::detect(&data), RamdiskCodec::Raw);
    }
}
