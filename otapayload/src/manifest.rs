// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::{PayloadError, Result};
use prost::Message;

#[allow(clippy::all)]
pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/otapayload.chromeos_update_engine.rs"));
}

pub use proto::install_operation::Type as OpType;
pub use proto::{DeltaArchiveManifest, Extent, InstallOperation, PartitionInfo, PartitionUpdate};

/// A decoded manifest alongside the raw bytes it was decoded from. Keeping
/// the raw bytes lets the rebuild path re-sign over byte-identical content
/// for every partition it does not touch, and lets tooling fall back to
/// the original bytes if a future manifest field this schema doesn't know
/// about needs to be inspected.
pub struct Manifest {
    pub manifest: DeltaArchiveManifest,
    pub raw: Vec<u8>,
    /// The payload format version this manifest was read from; carried
    /// along so a rebuilt payload keeps the same header version.
    pub version: u64,
}

impl Manifest {
    pub fn decode(raw: Vec<u8>, version: u64) -> Result<Self> {
        let manifest = DeltaArchiveManifest::decode(raw.as_slice())
            .map_err(|e| PayloadError::ManifestParse(e.to_string()))?;
        Ok(Self { manifest, raw, version })
    }

    pub fn block_size(&self) -> u32 {
        self.manifest.block_size()
    }

    pub fn partition(&self, name: &str) -> Option<&PartitionUpdate> {
        self.manifest.partitions.iter().find(|p| p.partition_name == name)
    }

    pub fn partition_names(&self) -> Vec<&str> {
        self.manifest.partitions.iter().map(|p| p.partition_name.as_str()).collect()
    }
}

/// Reads a protobuf varint starting at `pos`, returning its value and the
/// position just past it.
fn read_varint(data: &[u8], pos: usize) -> Result<(u64, usize)> {
    let mut value = 0u64;
    let mut shift = 0u32;
    let mut i = pos;
    loop {
        let byte = *data
            .get(i)
            .ok_or_else(|| PayloadError::ManifestParse("truncated varint in manifest".to_string()))?;
        value |= ((byte & 0x7f) as u64) << shift;
        i += 1;
        if byte & 0x80 == 0 {
            return Ok((value, i));
        }
        shift += 7;
        if shift >= 64 {
            return Err(PayloadError::ManifestParse("varint too long in manifest".to_string()));
        }
    }
}

/// Returns the byte range `raw[start..]` spans for the field whose tag
/// begins at `start`, i.e. the tag varint plus whatever its wire type says
/// follows it.
fn field_end(raw: &[u8], start: usize) -> Result<(u32, usize)> {
    let (tag, after_tag) = read_varint(raw, start)?;
    let field_number = (tag >> 3) as u32;
    let wire_type = tag & 0x7;
    let end = match wire_type {
        0 => read_varint(raw, after_tag)?.1,
        1 => after_tag + 8,
        2 => {
            let (len, after_len) = read_varint(raw, after_tag)?;
            after_len + len as usize
        }
        5 => after_tag + 4,
        other => {
            return Err(PayloadError::ManifestParse(format!(
                "unsupported protobuf wire type {other} in manifest"
            )))
        }
    };
    if end > raw.len() {
        return Err(PayloadError::ManifestParse(
            "field payload runs past end of manifest".to_string(),
        ));
    }
    Ok((field_number, end))
}

/// Walks the top-level fields of an encoded `DeltaArchiveManifest` and
/// returns the concatenation of every field whose number is not in
/// `exclude`, verbatim, byte for byte.
///
/// This is how the rebuild path carries forward fields it doesn't itself
/// regenerate — including ones this crate's `.proto` copy doesn't model —
/// instead of dropping them by routing everything through a decode/re-encode
/// of the typed `DeltaArchiveManifest`.
pub(crate) fn passthrough_fields(raw: &[u8], exclude: &[u32]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < raw.len() {
        let field_start = pos;
        let (field_number, end) = field_end(raw, pos)?;
        if !exclude.contains(&field_number) {
            out.extend_from_slice(&raw[field_start..end]);
        }
        pos = end;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encodes a single length-delimited field (wire type 2) by hand.
    fn encode_bytes_field(field_number: u32, payload: &[u8]) -> Vec<u8> {
        let tag = (field_number << 3) | 2;
        let mut out = encode_varint(tag as u64);
        out.extend_from_slice(&encode_varint(payload.len() as u64));
        out.extend_from_slice(payload);
        out
    }

    /// Encodes a single varint field (wire type 0) by hand.
    fn encode_varint_field(field_number: u32, value: u64) -> Vec<u8> {
        let tag = (field_number << 3) | 0;
        let mut out = encode_varint(tag as u64);
        out.extend_from_slice(&encode_varint(value));
        out
    }

    fn encode_varint(mut value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                out.push(byte);
                break;
            }
            out.push(byte | 0x80);
        }
        out
    }

    #[test]
    fn passthrough_keeps_unexcluded_fields_including_unknown_ones() {
        // Field 13 stands in for `partitions`, which rebuild regenerates and
        // excludes; field 99 is not defined anywhere in this crate's
        // `.proto` copy, standing in for a future field the schema doesn't
        // model yet.
        let mut raw = Vec::new();
        raw.extend(encode_bytes_field(13, b"old partitions"));
        raw.extend(encode_varint_field(99, 4242));
        raw.extend(encode_bytes_field(26, b"2026-07-01"));

        let kept = passthrough_fields(&raw, &[4, 5, 13]).unwrap();

        let mut expected = Vec::new();
        expected.extend(encode_varint_field(99, 4242));
        expected.extend(encode_bytes_field(26, b"2026-07-01"));
        assert_eq!(kept, expected);
    }

    #[test]
    fn passthrough_rejects_truncated_field() {
        let mut raw = encode_bytes_field(13, b"partitions");
        raw.truncate(raw.len() - 1);
        assert!(passthrough_fields(&raw, &[13]).is_err());
    }
}
