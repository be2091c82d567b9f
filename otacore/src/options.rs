// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::path::PathBuf;

/// The root-patch variant the caller selected, mirroring `otaboot::RootPatch`
/// but at the argument layer (before the Magisk APK's assets are loaded or
/// the prepatched image's bytes are read off disk).
pub enum RootPatchArg {
    Magisk { apk_path: PathBuf, ignore_version: bool },
    Prepatched(PathBuf),
}

/// Arguments for one `patch` run. `output` is always set by the
/// caller; the CLI binary is responsible for filling in the
/// `<input>.patched` default before constructing this struct.
pub struct PatchOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub avb_key_path: PathBuf,
    pub ota_key_path: PathBuf,
    pub ota_cert_path: PathBuf,
    pub root_patch: RootPatchArg,
    pub clear_vbmeta_flags: bool,
    pub boot_partition: String,
}

/// Arguments for one `extract` run.
pub struct ExtractOptions {
    pub input: PathBuf,
    pub directory: PathBuf,
    pub all: bool,
    pub boot_partition: String,
}
