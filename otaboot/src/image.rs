// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Ties the header, ramdisk codec, and cpio archive together into one
//! parse/patch/rebuild cycle over a whole boot image file.

use crate::codec::RamdiskCodec;
use crate::cpio::{self, CpioEntry};
use crate::error::Result;
use crate::header::Header;
use binrw::BinRead;
use otavbmeta::{AvbFooter, FOOTER_SIZE};
use std::io::Cursor;

fn page_pad(data: &mut Vec<u8>, page_size: usize) {
    let padding = (page_size - (data.len() & (page_size - 1))) & (page_size - 1);
    data.resize(data.len() + padding, 0);
}

/// A parsed boot image, with any trailing AVB footer already detached.
pub struct BootImage {
    pub header: Header,
    pub kernel: Vec<u8>,
    pub codec: RamdiskCodec,
    pub ramdisk_entries: Vec<CpioEntry>,
    /// Bytes following the ramdisk (second-stage bootloader, recovery
    /// DTBO/ACPIO, DTB, or a v4 boot signature), carried verbatim.
    pub tail: Vec<u8>,
}

impl BootImage {
    /// Parses a boot image, stripping any trailing AVB footer + vbmeta blob
    /// first so `content` below is exactly the mkbootimg-defined sections.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let content = strip_footer(bytes);

        let mut cursor = Cursor::new(content);
        let header = Header::parse(&mut cursor)?;
        let page_size = header.page_size();

        let kernel_start = header.kernel_position();
        let kernel_end = kernel_start + header.kernel_size() as usize;
        let kernel = content[kernel_start..kernel_end].to_vec();

        let ramdisk_start = header.ramdisk_position();
        let ramdisk_end = ramdisk_start + header.ramdisk_size() as usize;
        let ramdisk_raw = &content[ramdisk_start..ramdisk_end];
        let codec = RamdiskCodec::detect(ramdisk_raw);
        let ramdisk_plain = codec.decompress(ramdisk_raw)?;
        let ramdisk_entries = cpio::decode(&ramdisk_plain)?;

        let tail_padding = (page_size - (header.ramdisk_size() as usize & (page_size - 1)))
            & (page_size - 1);
        let tail_start = ramdisk_end + tail_padding;
        let tail = content.get(tail_start..).unwrap_or(&[]).to_vec();

        Ok(Self { header, kernel, codec, ramdisk_entries, tail })
    }

    /// Recompresses the (possibly patched) ramdisk with its original codec,
    /// rebuilds the boot image sections, and returns the unsigned image
    /// bytes — callers append the AVB footer separately via `otavbmeta`.
    pub fn rebuild(&self) -> Result<Vec<u8>> {
        let ramdisk_plain = cpio::encode(&self.ramdisk_entries);
        let ramdisk_compressed = self.codec.compress(&ramdisk_plain)?;

        let mut header = self.header.clone();
        header.set_ramdisk_size(ramdisk_compressed.len() as u32);
        let page_size = header.page_size();

        let mut out = Vec::new();
        header.write(&mut out)?;
        page_pad(&mut out, page_size);

        out.extend_from_slice(&self.kernel);
        page_pad(&mut out, page_size);

        out.extend_from_slice(&ramdisk_compressed);
        page_pad(&mut out, page_size);

        out.extend_from_slice(&self.tail);
        Ok(out)
    }
}

pub(crate) fn strip_footer(bytes: &[u8]) -> &[u8] {
    if (bytes.len() as u64) < FOOTER_SIZE {
        return bytes;
    }
    let footer_start = bytes.len() - FOOTER_SIZE as usize;
    let mut cursor = Cursor::new(&bytes[footer_start..]);
    match AvbFooter::read(&mut cursor) {
        Ok(footer) => &bytes[..footer.original_image_size as usize],
        Err(_) => bytes,
    }
}
