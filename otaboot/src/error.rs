// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use thiserror::Error;

/// Maps onto the orchestrator's `BOOT_IMAGE` and `MAGISK_VERSION` error
/// kinds.
#[derive(Debug, Error)]
pub enum BootError {
    #[error("bad boot image magic, expected 'ANDROID!'")]
    BadMagic,

    #[error("unrecognized boot image header version {0}")]
    UnknownHeaderVersion(u32),

    #[error("boot image is truncated or malformed: {0}")]
    Truncated(String),

    #[error(
        "unsupported Magisk version {found} (supported: >={min}, <{max})"
    )]
    MagiskVersion { found: i64, min: i64, max: i64 },

    #[error("could not determine Magisk version from assets/util_functions.sh")]
    MagiskVersionUnreadable,

    #[error("Magisk APK is missing a required asset: {0}")]
    MagiskAssetMissing(String),

    #[error("no otacerts.zip found in ramdisk at {0}")]
    OtacertsNotFound(String),

    #[error("otacerts.zip does not contain a PEM certificate entry")]
    OtacertMissingEntry,

    #[error("cpio archive is truncated or malformed: {0}")]
    Cpio(String),

    #[error(transparent)]
    Vbmeta(#[from] otavbmeta::VbmetaError),

    #[error(transparent)]
    Key(#[from] otakeys::KeyError),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Binrw(#[from] binrw::Error),
}

pub type Result<T> = std::result::Result<T, BootError>;
