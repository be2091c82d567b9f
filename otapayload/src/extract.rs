// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::{PayloadError, Result};
use crate::manifest::{InstallOperation, Manifest, OpType};
use indicatif::ProgressBar;
use otastream::{PayloadSource, SectionReader};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Replays every partition's install-operation list against a fresh
/// `source` handle, writing the result to `dir/<name>.img`. One worker per
/// partition; each worker opens its own reader via `source` so there is no
/// shared seek position to race on. `progress`, if given, is advanced by one
/// tick per partition as its worker finishes.
pub fn extract_partitions(
    manifest: &Manifest,
    source: &(impl PayloadSource + Sync),
    blob_offset: u64,
    dir: &Path,
    names: &[String],
    progress: Option<&ProgressBar>,
) -> Result<()> {
    names
        .par_iter()
        .map(|name| {
            let result = extract_one(manifest, source, blob_offset, dir, name);
            if result.is_ok() {
                if let Some(pb) = progress {
                    pb.inc(1);
                }
            }
            result
        })
        .collect::<Result<Vec<()>>>()?;
    Ok(())
}

fn extract_one(
    manifest: &Manifest,
    source: &impl PayloadSource,
    blob_offset: u64,
    dir: &Path,
    name: &str,
) -> Result<()> {
    let partition = manifest
        .partition(name)
        .ok_or_else(|| PayloadError::PartitionNotFound(name.to_string()))?;
    let block_size = manifest.block_size() as u64;
    let declared_size = partition
        .new_partition_info
        .as_ref()
        .and_then(|i| i.size)
        .unwrap_or(0);

    let out_path = dir.join(format!("{name}.img"));
    let mut out = File::create(&out_path)?;
    out.set_len(declared_size)?;

    let mut reader = source.open()?;
    for op in &partition.operations {
        apply_operation(name, &mut *reader, blob_offset, op, block_size, &mut out)?;
    }
    Ok(())
}

fn apply_operation(
    partition: &str,
    src: &mut (impl Read + Seek + ?Sized),
    blob_offset: u64,
    op: &InstallOperation,
    block_size: u64,
    dst: &mut File,
) -> Result<()> {
    let op_type = op.r#type();
    let data_len = op.data_length.unwrap_or(0);
    let data_offset = op.data_offset.unwrap_or(0);

    let data = if data_len > 0 {
        let mut section =
            SectionReader::new(&mut *src, blob_offset + data_offset, data_len)?;
        let mut buf = Vec::with_capacity(data_len as usize);
        section.read_to_end(&mut buf)?;
        if let Some(expected) = &op.data_sha256_hash {
            let actual = Sha256::digest(&buf);
            if actual.as_slice() != expected.as_slice() {
                return Err(PayloadError::HashMismatch { partition: partition.to_string() });
            }
        }
        Some(buf)
    } else {
        None
    };

    let dst_len_blocks: u64 = op.dst_extents.iter().filter_map(|e| e.num_blocks).sum();
    let dst_len = dst_len_blocks * block_size;

    let plain = match op_type {
        OpType::Replace => data.ok_or_else(|| PayloadError::UnsupportedOp {
            partition: partition.to_string(),
            op_type: op_type as i32,
        })?,
        OpType::ReplaceBz => {
            let mut decoder = bzip2::read::BzDecoder::new(std::io::Cursor::new(
                data.ok_or_else(|| PayloadError::UnsupportedOp {
                    partition: partition.to_string(),
                    op_type: op_type as i32,
                })?,
            ));
            let mut out = Vec::with_capacity(dst_len as usize);
            decoder.read_to_end(&mut out)?;
            out
        }
        OpType::ReplaceXz => {
            let mut decoder = xz2::read::XzDecoder::new(std::io::Cursor::new(
                data.ok_or_else(|| PayloadError::UnsupportedOp {
                    partition: partition.to_string(),
                    op_type: op_type as i32,
                })?,
            ));
            let mut out = Vec::with_capacity(dst_len as usize);
            decoder.read_to_end(&mut out)?;
            out
        }
        OpType::Zero => {
            write_extents_zero(dst, &op.dst_extents, block_size)?;
            return Ok(());
        }
        OpType::Discard => return Ok(()),
        OpType::Move
        | OpType::SourceCopy
        | OpType::Bsdiff
        | OpType::SourceBsdiff
        | OpType::Puffdiff
        | OpType::BrotliBsdiff => {
            return Err(PayloadError::UnsupportedOp {
                partition: partition.to_string(),
                op_type: op_type as i32,
            })
        }
    };

    write_extents(dst, &op.dst_extents, block_size, &plain)
}

fn write_extents(
    dst: &mut File,
    extents: &[crate::manifest::Extent],
    block_size: u64,
    data: &[u8],
) -> Result<()> {
    let mut cursor = 0usize;
    for extent in extents {
        let start = extent.start_block.unwrap_or(0) * block_size;
        let len = (extent.num_blocks.unwrap_or(0) * block_size) as usize;
        dst.seek(SeekFrom::Start(start))?;
        let end = (cursor + len).min(data.len());
        dst.write_all(&data[cursor..end])?;
        if end - cursor < len {
            // Zero-pad out to block size, matching REPLACE semantics.
            let pad = len - (end - cursor);
            dst.write_all(&vec![0u8; pad])?;
        }
        cursor = end;
    }
    Ok(())
}

fn write_extents_zero(
    dst: &mut File,
    extents: &[crate::manifest::Extent],
    block_size: u64,
) -> Result<()> {
    for extent in extents {
        let start = extent.start_block.unwrap_or(0) * block_size;
        let len = extent.num_blocks.unwrap_or(0) * block_size;
        dst.seek(SeekFrom::Start(start))?;
        dst.write_all(&vec![0u8; len as usize])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::proto::{
        install_operation::Type as RawOpType, DeltaArchiveManifest, Extent, InstallOperation,
        PartitionInfo, PartitionUpdate,
    };
    use otastream::MemSource;

    fn build_payload(block_size: u64, data: &[u8]) -> (Manifest, otastream::MemSource, u64) {
        let op = InstallOperation {
            r#type: RawOpType::Replace as i32,
            data_offset: Some(0),
            data_length: Some(data.len() as u64),
            dst_extents: vec![Extent { start_block: Some(0), num_blocks: Some(1) }],
            data_sha256_hash: Some(Sha256::digest(data).to_vec()),
            ..Default::default()
        };
        let partition = PartitionUpdate {
            partition_name: "boot".to_string(),
            operations: vec![op],
            new_partition_info: Some(PartitionInfo { size: Some(block_size), hash: None }),
            ..Default::default()
        };
        let manifest = DeltaArchiveManifest {
            block_size: Some(block_size as u32),
            partitions: vec![partition],
            ..Default::default()
        };
        let manifest = Manifest { manifest, raw: Vec::new(), version: 2 };
        let source = MemSource::new(data.to_vec());
        (manifest, source, 0)
    }

    #[test]
    fn replace_op_writes_bytes_at_extent() {
        let block_size = 16u64;
        let mut payload = vec![0u8; block_size as usize];
        payload[..5].copy_from_slice(b"hello");
        let (manifest, source, blob_offset) = build_payload(block_size, &payload);

        let dir = tempfile::tempdir().unwrap();
        extract_partitions(&manifest, &source, blob_offset, dir.path(), &["boot".to_string()], None)
            .unwrap();

        let out = std::fs::read(dir.path().join("boot.img")).unwrap();
        assert_eq!(out.len(), block_size as usize);
        assert_eq!(&out[..5], b"hello");
    }

    #[test]
    fn hash_mismatch_is_rejected() {
        let block_size = 16u64;
        let payload = vec![0u8; block_size as usize];
        let (mut manifest, source, blob_offset) = build_payload(block_size, &payload);
        manifest.manifest.partitions[0].operations[0].data_sha256_hash =
            Some(vec![0xffu8; 32]);

        let dir = tempfile::tempdir().unwrap();
        let err = extract_partitions(
            &manifest,
            &source,
            blob_offset,
            dir.path(),
            &["boot".to_string()],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, PayloadError::HashMismatch { .. }));
    }
}
