// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Magisk root-patch injection: parses the Magisk APK's assets, validates
//! its version, and rewrites a boot image's ramdisk so the device boots
//! into Magisk's `init`.

use crate::cpio::CpioEntry;
use crate::error::{BootError, Result};
use crate::image::BootImage;
use sha2::{Digest, Sha256};
use std::io::Read;

/// Half-open range of supported Magisk version codes.
pub const MAGISK_MIN_VERSION: i64 = 22000;
pub const MAGISK_MAX_VERSION: i64 = 25300;

pub struct MagiskAssets {
    pub version_code: i64,
    pub magiskinit: Vec<u8>,
    pub magisk32: Vec<u8>,
    pub magisk64: Vec<u8>,
    pub stub: Vec<u8>,
}

impl MagiskAssets {
    /// Extracts the assets this patch needs from a Magisk APK and validates
    /// its version code, unless `ignore_version` is set via
    /// `--ignore-magisk-version`.
    pub fn load(apk_bytes: &[u8], ignore_version: bool) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(apk_bytes))?;

        let version_code = read_magisk_version(&mut archive)?;
        if !ignore_version && !(MAGISK_MIN_VERSION..MAGISK_MAX_VERSION).contains(&version_code) {
            return Err(BootError::MagiskVersion {
                found: version_code,
                min: MAGISK_MIN_VERSION,
                max: MAGISK_MAX_VERSION,
            });
        }

        let mut magiskinit = Vec::new();
        let mut magisk32 = Vec::new();
        let mut magisk64 = Vec::new();
        let mut stub = Vec::new();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            if name.contains("libmagiskinit.so") && name.contains("arm64-v8a") {
                entry.read_to_end(&mut magiskinit)?;
            } else if name == "assets/magisk32" {
                entry.read_to_end(&mut magisk32)?;
            } else if name == "assets/magisk64" {
                entry.read_to_end(&mut magisk64)?;
            } else if name == "assets/stub.apk" {
                entry.read_to_end(&mut stub)?;
            }
        }

        if magiskinit.is_empty() {
            return Err(BootError::MagiskAssetMissing(
                "arm64-v8a libmagiskinit.so".to_string(),
            ));
        }

        Ok(Self { version_code, magiskinit, magisk32, magisk64, stub })
    }
}

fn read_magisk_version<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
) -> Result<i64> {
    let mut script = String::new();
    archive.by_name("assets/util_functions.sh")?.read_to_string(&mut script)?;
    for line in script.lines() {
        if let Some(value) = line.strip_prefix("MAGISK_VER_CODE=") {
            return value
                .trim()
                .parse()
                .map_err(|_| BootError::MagiskVersionUnreadable);
        }
    }
    Err(BootError::MagiskVersionUnreadable)
}

/// Applies a Magisk root patch to an already-parsed boot image, rewriting
/// its ramdisk in place.
pub fn apply(image: &mut BootImage, assets: &MagiskAssets, original_boot_image: &[u8]) {
    let original_ramdisk = crate::cpio::encode(&image.ramdisk_entries);
    let original_init =
        image.ramdisk_entries.iter().find(|e| e.name == "init").cloned();

    image.ramdisk_entries.retain(|e| e.name != "init" && !e.name.starts_with(".backup"));

    image.ramdisk_entries.push(CpioEntry::regular("init", 0o750, assets.magiskinit.clone()));
    if let Some(original_init) = original_init {
        image.ramdisk_entries.push(CpioEntry {
            name: ".backup/init".to_string(),
            mode: original_init.mode,
            data: original_init.data,
        });
    }

    image.ramdisk_entries.retain(|e| !e.name.starts_with("overlay.d/"));
    if !assets.magisk64.is_empty() {
        image.ramdisk_entries.push(xz_entry("overlay.d/sbin/magisk64.xz", &assets.magisk64));
    }
    if !assets.magisk32.is_empty() {
        image.ramdisk_entries.push(xz_entry("overlay.d/sbin/magisk32.xz", &assets.magisk32));
    }
    if !assets.stub.is_empty() {
        image.ramdisk_entries.push(xz_entry("overlay.d/sbin/stub.xz", &assets.stub));
    }
    image
        .ramdisk_entries
        .push(xz_entry(".backup/ramdisk.cpio.xz", &original_ramdisk));

    let sha256 = hex::encode(Sha256::digest(original_boot_image));
    let config = format!(
        "KEEPVERITY=false\nKEEPFORCEENCRYPT=false\nRECOVERYMODE=false\nSHA256={sha256}\n"
    );
    image.ramdisk_entries.push(CpioEntry::regular(".backup/.magisk", 0o000, config.into_bytes()));
}

fn xz_entry(name: &str, data: &[u8]) -> CpioEntry {
    use std::io::Write;
    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
    encoder.write_all(data).expect("writing to an in-memory XZ encoder cannot fail");
    let compressed = encoder.finish().expect("finishing an in-memory XZ encoder cannot fail");
    CpioEntry::regular(name, 0o644, compressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_outside_range_is_rejected_unless_ignored() {
        let result = MagiskAssets::load(&build_fake_apk(21000), false);
        assert!(matches!(result, Err(BootError::MagiskVersion { found: 21000, .. })));

        let assets = MagiskAssets::load(&build_fake_apk(21000), true).unwrap();
        assert_eq!(assets.version_code, 21000);
    }

    #[test]
    fn version_inside_range_is_accepted() {
        let assets = MagiskAssets::load(&build_fake_apk(24000), false).unwrap();
        assert_eq!(assets.version_code, 24000);
        assert_eq!(assets.magiskinit, b"fake magiskinit");
    }

    #[test]
    fn apply_replaces_init_and_backs_up_the_original() {
        let assets = MagiskAssets::load(&build_fake_apk(24000), false).unwrap();
        let mut image = fake_boot_image();
        let original_boot = vec![0u8; 16];
        apply(&mut image, &assets, &original_boot);

        let init = image.ramdisk_entries.iter().find(|e| e.name == "init").unwrap();
        assert_eq!(init.data, assets.magiskinit);
        assert!(image.ramdisk_entries.iter().any(|e| e.name == ".backup/init"));
        assert!(image.ramdisk_entries.iter().any(|e| e.name == ".backup/.magisk"));
        assert!(image.ramdisk_entries.iter().any(|e| e.name == ".backup/ramdisk.cpio.xz"));
    }

    fn fake_boot_image() -> BootImage {
        use crate::codec::RamdiskCodec;
        use crate::header::{Header, HeaderV3};
        BootImage {
            header: Header::V3(HeaderV3 {
                kernel_size: 0,
                ramdisk_size: 0,
                os_version_and_patch: 0,
                cmdline: Box::new([0u8; 1536]),
                v4_signature_size: None,
            }),
            kernel: Vec::new(),
            codec: RamdiskCodec::Gzip,
            ramdisk_entries: vec![CpioEntry::regular("init", 0o750, b"original init".to_vec())],
            tail: Vec::new(),
        }
    }

    fn build_fake_apk(version_code: i64) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let options = zip::write::FileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            zip.start_file("assets/util_functions.sh", options).unwrap();
            std::io::Write::write_all(
                &mut zip,
                format!("MAGISK_VER_CODE={version_code}\n").as_bytes(),
            )
            .unwrap();
            zip.start_file("lib/arm64-v8a/libmagiskinit.so", options).unwrap();
            std::io::Write::write_all(&mut zip, b"fake magiskinit").unwrap();
            zip.start_file("assets/magisk64", options).unwrap();
            std::io::Write::write_all(&mut zip, b"fake magisk64").unwrap();
            zip.finish().unwrap();
        }
        buf
    }
}
