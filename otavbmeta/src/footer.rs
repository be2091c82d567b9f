// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use binrw::binrw;

/// Fixed-size footer appended at the very end of an AVB-protected partition
/// image (the last 64 bytes of the partition, not the image file itself —
/// callers pad the image out to `original_image_size` plus the appended
/// vbmeta blob before writing this). Points back at the vbmeta blob that
/// was appended just after the original image content.
#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(big, magic = b"AVBf")]
pub struct AvbFooter {
    pub major_version: u32,
    pub minor_version: u32,
    /// Size of the partition content before the vbmeta blob was appended.
    pub original_image_size: u64,
    /// Offset of the vbmeta blob, relative to `original_image_size`.
    pub vbmeta_offset: u64,
    pub vbmeta_size: u64,
    #[bw(pad_size_to = 28)]
    #[br(count = 28)]
    pub reserved: Vec<u8>,
}

/// Total on-disk size of an `AvbFooter`, including its magic.
pub const FOOTER_SIZE: u64 = 64;

impl AvbFooter {
    pub fn new(original_image_size: u64, vbmeta_size: u64) -> Self {
        Self {
            major_version: 1,
            minor_version: 0,
            original_image_size,
            vbmeta_offset: original_image_size,
            vbmeta_size,
            reserved: vec![0u8; 28],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binrw::{BinRead, BinWrite};
    use std::io::Cursor;

    #[test]
    fn round_trips_through_binrw() {
        let footer = AvbFooter::new(4096, 2048);
        let mut buf = Cursor::new(Vec::new());
        footer.write(&mut buf).unwrap();
        assert_eq!(buf.get_ref().len() as u64, FOOTER_SIZE);

        let mut read_buf = Cursor::new(buf.into_inner());
        let parsed = AvbFooter::read(&mut read_buf).unwrap();
        assert_eq!(parsed, footer);
    }
}
