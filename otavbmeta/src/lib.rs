// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Android Verified Boot: the root `vbmeta` image and the per-partition AVB
//! footer appended to `boot`/`init_boot`/etc. images.
//!
//! `avb_bindgen` only builds inside the Soong tree, so the
//! footer/header/descriptor binary layouts are reimplemented here as plain
//! structured binary I/O over the public AVB wire format, the same approach
//! the retrieval pack takes for Android boot images
//! (`abootimg-oxide::HeaderV0`/`HeaderV3`).

mod descriptor;
mod error;
mod footer;
mod footer_image;
mod header;
mod image;
mod root;

pub use descriptor::{ChainDescriptor, Descriptor, HashDescriptor};
pub use error::{Result, VbmetaError};
pub use footer::{AvbFooter, FOOTER_SIZE};
pub use footer_image::append_footer_and_vbmeta;
pub use header::{AlgorithmType, VbmetaHeader};
pub use image::VbmetaImage;
pub use root::{rebuild_root, salt_for};

/// Bit in `VbmetaHeader::flags` that disables verification entirely.
pub const FLAGS_VERIFICATION_DISABLED: u32 = 1 << 0;
