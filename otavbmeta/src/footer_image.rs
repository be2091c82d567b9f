// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::descriptor::{Descriptor, HashDescriptor};
use crate::error::Result;
use crate::footer::AvbFooter;
use crate::image::VbmetaImage;
use binrw::BinWrite;
use otakeys::PrivateKey;
use std::io::Cursor;

/// Appends a fresh per-image vbmeta blob plus `AvbFooter` to a patched
/// partition image, the footer-protected counterpart of `rebuild_root` for
/// images that carry their own AVB footer rather than being hashed by the
/// root vbmeta.
///
/// `salt` should be the original descriptor's salt when one is available, to
/// keep the digest deterministic across re-runs with unchanged input;
/// callers with no prior descriptor to inherit from fall back to a
/// derived salt, as `rebuild_root` does for newly introduced partitions.
pub fn append_footer_and_vbmeta(
    image: &[u8],
    partition_name: &str,
    salt: &[u8],
    key: &PrivateKey,
    public_key_der: &[u8],
) -> Result<Vec<u8>> {
    let descriptor = Descriptor::Hash(HashDescriptor::compute(partition_name, image, salt));
    let vbmeta = VbmetaImage::build_and_sign(&[descriptor], 0, 0, key, public_key_der)?;

    let footer = AvbFooter::new(image.len() as u64, vbmeta.len() as u64);
    let mut footer_bytes = Cursor::new(Vec::new());
    footer.write(&mut footer_bytes)?;

    let mut out = Vec::with_capacity(image.len() + vbmeta.len() + footer_bytes.get_ref().len());
    out.extend_from_slice(image);
    out.extend_from_slice(&vbmeta);
    out.extend_from_slice(footer_bytes.get_ref());
    Ok(out)
}
