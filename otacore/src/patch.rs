// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Drives one `patch` invocation end to end: role resolution, parallel
//! per-image patching, vbmeta and payload rebuild, archive repack, outer
//! signature, and metadata regeneration.

use crate::error::{Error, Result};
use crate::options::{PatchOptions, RootPatchArg};
use crate::progress::partition_bar;
use otakeys::{LoadedCert, PrivateKey};
use otapayload::{Manifest, PayloadHeader, RequiredImages};
use otastream::FileSource;
use otazip::{
    local_header_size, CentralDirectoryRange, EntryAction, OtaArchiveReader, OtaArchiveWriter,
    METADATA, METADATA_PB, OTACERT, PAYLOAD, PAYLOAD_PROPERTIES,
};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use zip::CompressionMethod;

/// Runs one `patch` invocation.
pub fn run_patch(options: &PatchOptions) -> Result<()> {
    let avb_key = PrivateKey::load(&options.avb_key_path).map_err(Error::Signature)?;
    let ota_key = PrivateKey::load(&options.ota_key_path).map_err(Error::Signature)?;
    let ota_cert = LoadedCert::load(&options.ota_cert_path).map_err(Error::Signature)?;
    match ota_cert.matches_key(&ota_key) {
        Ok(()) => {}
        Err(otakeys::KeyError::CertKeyMismatch) => return Err(Error::KeyMismatch),
        Err(other) => return Err(Error::Signature(other)),
    }
    let avb_public_key_der = avb_key.public_key_der().map_err(Error::Signature)?;

    let scratch = tempfile::TempDir::new()?;
    let mut reader = OtaArchiveReader::open(&options.input)?;

    let payload_path = scratch.path().join("payload.bin");
    {
        let mut out = File::create(&payload_path)?;
        reader.read_entry_to(PAYLOAD, &mut out)?;
    }
    let source = FileSource::new(&payload_path);

    let header = {
        let mut f = File::open(&payload_path)?;
        PayloadHeader::parse(&mut f)?
    };
    let manifest = Manifest::decode(header.manifest_raw.clone(), header.version)?;

    let required = RequiredImages::resolve(&manifest, &options.boot_partition)?;
    let boot_names = required.unique_non_vbmeta();
    let mut all_names = boot_names.clone();
    all_names.push(required.vbmeta.clone());
    let extract_pb = partition_bar(all_names.len() as u64, "extracting partitions");
    otapayload::extract_partitions(
        &manifest,
        &source,
        header.blob_offset,
        scratch.path(),
        &all_names,
        Some(&extract_pb),
    )?;
    extract_pb.finish_with_message("partitions extracted");

    let vbmeta_bytes = std::fs::read(scratch.path().join(format!("{}.img", required.vbmeta)))?;
    let vbmeta_image = otavbmeta::VbmetaImage::parse(&vbmeta_bytes)?;

    let root_patch = build_root_patch(&options.root_patch)?;
    let otacert_pem = std::fs::read(&options.ota_cert_path)?;

    let patch_pb = partition_bar(boot_names.len() as u64, "patching boot images");
    let patched_bytes: HashMap<String, Vec<u8>> = boot_names
        .par_iter()
        .map(|name| -> Result<(String, Vec<u8>)> {
            let image = std::fs::read(scratch.path().join(format!("{name}.img")))?;
            let root_patch_arg =
                if *name == required.root_patch { root_patch.as_ref() } else { None };
            let otacert_arg =
                if *name == required.otacerts { Some(otacert_pem.as_slice()) } else { None };
            let salt = otavbmeta::salt_for(&vbmeta_image, name);
            let patched = otaboot::patch_boot_image(
                &image,
                root_patch_arg,
                otacert_arg,
                name,
                &salt,
                &avb_key,
                &avb_public_key_der,
            )?;
            patch_pb.inc(1);
            Ok((name.clone(), patched))
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .collect();
    patch_pb.finish_with_message("boot images patched");

    let new_vbmeta = otavbmeta::rebuild_root(
        &vbmeta_image,
        &patched_bytes,
        &avb_key,
        &avb_public_key_der,
        options.clear_vbmeta_flags,
    )?;

    let mut patched_paths: HashMap<String, PathBuf> = HashMap::new();
    for (name, bytes) in &patched_bytes {
        let path = scratch.path().join(format!("{name}.patched.img"));
        std::fs::write(&path, bytes)?;
        patched_paths.insert(name.clone(), path);
    }
    let vbmeta_path = scratch.path().join(format!("{}.patched.img", required.vbmeta));
    std::fs::write(&vbmeta_path, &new_vbmeta)?;
    patched_paths.insert(required.vbmeta.clone(), vbmeta_path);

    let rebuilt = otapayload::rebuild_payload(
        &manifest,
        &source,
        header.blob_offset,
        &patched_paths,
        &ota_key,
    )?;
    let properties_text = otapayload::render_properties(&rebuilt);

    let output_path = write_output_archive(
        &mut reader,
        &rebuilt.bytes,
        &properties_text,
        &otacert_pem,
        scratch.path(),
        &ota_key,
        &ota_cert,
    )?;

    persist(&output_path, &options.output)?;
    Ok(())
}

fn build_root_patch(arg: &RootPatchArg) -> Result<Option<otaboot::RootPatch>> {
    match arg {
        RootPatchArg::Magisk { apk_path, ignore_version } => {
            let apk_bytes = std::fs::read(apk_path)?;
            let assets = otaboot::MagiskAssets::load(&apk_bytes, *ignore_version)?;
            if *ignore_version {
                let (min, max) = otaboot::magisk_version_bounds();
                if !(min..max).contains(&assets.version_code) {
                    log::warn!(
                        "Magisk version {} is outside the supported range [{min}, {max}); \
                         proceeding because --ignore-magisk-version was set",
                        assets.version_code
                    );
                }
            }
            Ok(Some(otaboot::RootPatch::Magisk(assets)))
        }
        RootPatchArg::Prepatched(path) => {
            let bytes = std::fs::read(path)?;
            Ok(Some(otaboot::RootPatch::Prepatched(bytes)))
        }
    }
}

/// Writes the rewritten archive to a scratch file and returns its path:
/// predicted layout (so the two metadata entries can be regenerated with
/// real offsets in a single write pass),
/// a forward write of every entry, the outer PKCS#7 signature over the
/// central directory, and a post-write offset verification.
#[allow(clippy::too_many_arguments)]
fn write_output_archive(
    reader: &mut OtaArchiveReader,
    payload_bytes: &[u8],
    properties_text: &str,
    otacert_pem: &[u8],
    scratch_dir: &Path,
    ota_key: &PrivateKey,
    ota_cert: &LoadedCert,
) -> Result<PathBuf> {
    let entry_names = reader.entry_names();
    let payload_index = entry_names.iter().position(|n| n == PAYLOAD);
    let properties_index = entry_names.iter().position(|n| n == PAYLOAD_PROPERTIES);
    match (payload_index, properties_index) {
        (Some(p), Some(q)) if p < q => {}
        _ => {
            return Err(Error::Internal(
                "payload.bin must precede payload_properties.txt in the input archive".to_string(),
            ))
        }
    }

    let original_metadata_text = String::from_utf8(reader.read_entry(METADATA)?)
        .map_err(|_| Error::Internal("metadata entry is not valid UTF-8".to_string()))?;
    let placeholder = otameta::placeholder(&original_metadata_text, &[PAYLOAD, PAYLOAD_PROPERTIES]);

    // Pass 1: predict every entry's local-file-header offset without
    // writing anything, using the placeholder metadata lengths (guaranteed
    // identical to the real content's length).
    let mut running_offset = 0u64;
    let mut payload_offset = 0u64;
    let mut properties_offset = 0u64;
    for name in &entry_names {
        let size = match name.as_str() {
            PAYLOAD => payload_bytes.len() as u64,
            PAYLOAD_PROPERTIES => properties_text.len() as u64,
            OTACERT => otacert_pem.len() as u64,
            METADATA => placeholder.metadata_text.len() as u64,
            METADATA_PB => placeholder.metadata_pb.len() as u64,
            _ => reader.entry_compressed_size(name)?,
        };
        if name == PAYLOAD {
            payload_offset = running_offset;
        }
        if name == PAYLOAD_PROPERTIES {
            properties_offset = running_offset;
        }
        running_offset += local_header_size(name) + size;
    }

    let real_entries = vec![
        otameta::PropertyFileEntry {
            name: PAYLOAD.to_string(),
            offset: payload_offset,
            size: payload_bytes.len() as u64,
        },
        otameta::PropertyFileEntry {
            name: PAYLOAD_PROPERTIES.to_string(),
            offset: properties_offset,
            size: properties_text.len() as u64,
        },
    ];
    let real_metadata = otameta::regenerate(
        &original_metadata_text,
        &real_entries,
        (placeholder.metadata_text.len(), placeholder.metadata_pb.len()),
    )?;

    // Pass 2: the one real write, entries in the original archive's order.
    let output_path = scratch_dir.join("output.zip");
    let file = File::create(&output_path)?;
    let mut writer = OtaArchiveWriter::new(file);
    for name in &entry_names {
        match name.as_str() {
            PAYLOAD => writer.write_bytes(name, payload_bytes, CompressionMethod::Stored)?,
            PAYLOAD_PROPERTIES => {
                writer.write_bytes(name, properties_text.as_bytes(), CompressionMethod::Stored)?
            }
            OTACERT => writer.write_bytes(name, otacert_pem, CompressionMethod::Stored)?,
            METADATA => writer.write_bytes(name, &real_metadata.metadata_text, CompressionMethod::Stored)?,
            METADATA_PB => {
                writer.write_bytes(name, &real_metadata.metadata_pb, CompressionMethod::Stored)?
            }
            _ => writer.write_entry(name, EntryAction::Copy, reader)?,
        }
    }

    let cd_start = writer.begin_central_directory()?;
    let (mut file, range) = writer.finish(cd_start)?;

    let signature = sign_central_directory(&mut file, range, ota_key, ota_cert)?;
    otazip::append_comment(&mut file, &signature)?;
    drop(file);

    otameta::verify_metadata(&output_path, &real_entries)?;
    Ok(output_path)
}

fn sign_central_directory(
    file: &mut File,
    range: CentralDirectoryRange,
    ota_key: &PrivateKey,
    ota_cert: &LoadedCert,
) -> Result<Vec<u8>> {
    file.seek(SeekFrom::Start(range.start))?;
    let mut buf = vec![0u8; (range.end - range.start) as usize];
    file.read_exact(&mut buf)?;
    Ok(otakeys::pkcs7_detached(&buf, ota_key, ota_cert).map_err(Error::Signature)?)
}

/// Moves the freshly written archive from scratch storage to its final
/// destination, falling back to copy-then-remove when the two paths live on
/// different filesystems (`rename` cannot cross a mount point).
fn persist(scratch_path: &Path, destination: &Path) -> Result<()> {
    if std::fs::rename(scratch_path, destination).is_ok() {
        return Ok(());
    }
    std::fs::copy(scratch_path, destination)?;
    std::fs::remove_file(scratch_path)?;
    Ok(())
}
