// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Locates and replaces the OTA update certificate embedded in a boot
//! image's ramdisk.

use crate::cpio::CpioEntry;
use crate::error::{BootError, Result};
use crate::image::BootImage;
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const OTACERTS_PATH: &str = "system/etc/security/otacerts.zip";

/// Replaces the PEM certificate inside `otacerts.zip`, repacking it
/// deterministically (fixed timestamps, stable entry order).
pub fn apply(image: &mut BootImage, cert_pem: &[u8]) -> Result<()> {
    let entry_index = image
        .ramdisk_entries
        .iter()
        .position(|e| e.name == OTACERTS_PATH)
        .ok_or_else(|| BootError::OtacertsNotFound(OTACERTS_PATH.to_string()))?;

    let repacked = repack_otacerts(&image.ramdisk_entries[entry_index].data, cert_pem)?;
    image.ramdisk_entries[entry_index] = CpioEntry {
        name: OTACERTS_PATH.to_string(),
        mode: image.ramdisk_entries[entry_index].mode,
        data: repacked,
    };
    Ok(())
}

fn repack_otacerts(original_zip: &[u8], cert_pem: &[u8]) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(original_zip))?;
    if archive.len() == 0 {
        return Err(BootError::OtacertMissingEntry);
    }

    let fixed_time = zip::DateTime::from_date_and_time(1980, 1, 1, 0, 0, 0)
        .expect("1980-01-01 00:00:00 is a valid MS-DOS timestamp");

    let mut out = Vec::new();
    {
        let mut writer = ZipWriter::new(Cursor::new(&mut out));
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            let options = FileOptions::default()
                .compression_method(CompressionMethod::Stored)
                .last_modified_time(fixed_time);

            writer.start_file(&name, options)?;
            if name.ends_with(".pem") || name.ends_with(".x509.pem") {
                writer.write_all(cert_pem)?;
            } else {
                let mut buf = Vec::new();
                entry.read_to_end(&mut buf)?;
                writer.write_all(&buf)?;
            }
        }
        writer.finish()?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RamdiskCodec;
    use crate::header::{Header, HeaderV3};

    fn fake_otacerts_zip(pem: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buf));
            let options = FileOptions::default().compression_method(CompressionMethod::Stored);
            zip.start_file("ota.x509.pem", options).unwrap();
            zip.write_all(pem).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    fn image_with_otacerts(pem: &[u8]) -> BootImage {
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
            ramdisk_entries: vec![CpioEntry::regular(
                OTACERTS_PATH,
                0o644,
                fake_otacerts_zip(pem),
            )],
            tail: Vec::new(),
        }
    }

    #[test]
    fn replaces_the_inner_certificate() {
        let mut image = image_with_otacerts(b"-----BEGIN CERTIFICATE-----\nold\n-----END CERTIFICATE-----\n");
        let new_cert = b"-----BEGIN CERTIFICATE-----\nnew\n-----END CERTIFICATE-----\n";
        apply(&mut image, new_cert).unwrap();

        let entry = &image.ramdisk_entries[0];
        let mut archive = ZipArchive::new(Cursor::new(&entry.data)).unwrap();
        let mut contents = Vec::new();
        archive.by_name("ota.x509.pem").unwrap().read_to_end(&mut contents).unwrap();
        assert_eq!(contents, new_cert);
    }

    #[test]
    fn repacking_is_deterministic() {
        let image_a = image_with_otacerts(b"cert-a");
        let mut a = image_a;
        apply(&mut a, b"new-cert").unwrap();

        let image_b = image_with_otacerts(b"cert-a");
        let mut b = image_b;
        apply(&mut b, b"new-cert").unwrap();

        assert_eq!(a.ramdisk_entries[0].data, b.ramdisk_entries[0].data);
    }

    #[test]
    fn missing_otacerts_entry_is_an_error() {
        let mut image = BootImage {
            header: Header::V3(HeaderV3 {
                kernel_size: 0,
                ramdisk_size: 0,
                os_version_and_patch: 0,
                cmdline: Box::new([0u8; 1536]),
                v4_signature_size: None,
            }),
            kernel: Vec::new(),
            codec: RamdiskCodec::Gzip,
            ramdisk_entries: vec![],
            tail: Vec::new(),
        };
        assert!(matches!(apply(&mut image, b"cert"), Err(BootError::OtacertsNotFound(_))));
    }
}
