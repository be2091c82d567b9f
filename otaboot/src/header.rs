// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Android boot image header versions 0 through 4, following the on-disk
//! layout AOSP's `mkbootimg` defines. Modeled on the retrieval pack's
//! `abootimg-oxide` crate, which solves the identical problem for the same
//! wire format.

use crate::error::{BootError, Result};
use binrw::{binrw, BinRead, BinWrite};
use std::io::{Read, Seek, SeekFrom};

/// Boot image header for versions 0, 1, and 2: kernel, ramdisk, second-stage
/// bootloader, and (v1+) a recovery DTBO/ACPIO, (v2) a DTB.
#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(little, magic = b"ANDROID!")]
pub struct HeaderV0 {
    pub kernel_size: u32,
    pub kernel_addr: u32,
    pub ramdisk_size: u32,
    pub ramdisk_addr: u32,
    pub second_bootloader_size: u32,
    pub second_bootloader_addr: u32,
    pub tags_addr: u32,
    pub page_size: u32,
    #[br(temp)]
    #[bw(calc = self.header_version())]
    header_version: u32,
    pub os_version_and_patch: u32,
    pub board_name: [u8; 16],
    pub cmdline_part_1: Box<[u8; 512]>,
    pub hash_digest: [u8; 32],
    pub cmdline_part_2: Box<[u8; 1024]>,
    #[br(args(header_version))]
    pub versioned: HeaderV0Versioned,
}

impl HeaderV0 {
    fn padding(&self, size: usize) -> usize {
        let page_size = self.page_size as usize;
        (page_size - (size & (page_size - 1))) & (page_size - 1)
    }

    pub fn header_version(&self) -> u32 {
        match self.versioned {
            HeaderV0Versioned::V0 => 0,
            HeaderV0Versioned::V1 { .. } => 1,
            HeaderV0Versioned::V2 { .. } => 2,
        }
    }

    pub fn kernel_position(&self) -> usize {
        1660 + self.padding(1660)
    }

    pub fn ramdisk_position(&self) -> usize {
        self.kernel_position() + self.kernel_size as usize + self.padding(self.kernel_size as usize)
    }

    pub fn second_bootloader_position(&self) -> usize {
        self.ramdisk_position()
            + self.ramdisk_size as usize
            + self.padding(self.ramdisk_size as usize)
    }
}

#[binrw]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[br(import(header_version: u32))]
pub enum HeaderV0Versioned {
    #[br(pre_assert(header_version == 0))]
    V0,
    #[br(pre_assert(header_version == 1))]
    V1 {
        recovery_dtbo_size: u32,
        recovery_dtbo_addr: u64,
        #[br(temp, assert(header_size == 1648))]
        #[bw(calc = 1648)]
        header_size: u32,
    },
    #[br(pre_assert(header_version == 2))]
    V2 {
        recovery_dtbo_size: u32,
        recovery_dtbo_addr: u64,
        #[br(temp, assert(header_size == 1660))]
        #[bw(calc = 1660)]
        header_size: u32,
        dtb_size: u32,
        dtb_addr: u64,
    },
}

/// Boot image header for versions 3 and 4: no second-stage bootloader or
/// board name, fixed 4096-byte pages, ramdisk and (v4) boot signature only.
#[binrw]
#[derive(Clone, Debug, PartialEq, Eq)]
#[brw(little, magic = b"ANDROID!")]
#[br(assert(header_size == self.header_size()))]
pub struct HeaderV3 {
    pub kernel_size: u32,
    pub ramdisk_size: u32,
    pub os_version_and_patch: u32,
    #[br(temp)]
    #[bw(calc = self.header_size())]
    header_size: u32,
    #[brw(pad_before = 16)]
    #[br(temp)]
    #[bw(calc = self.header_version())]
    header_version: u32,
    pub cmdline: Box<[u8; 1024 + 512]>,
    #[br(if(header_version == 4))]
    pub v4_signature_size: Option<u32>,
}

impl HeaderV3 {
    pub const PAGE_SIZE: usize = 4096;

    pub fn header_version(&self) -> u32 {
        if self.v4_signature_size.is_some() {
            4
        } else {
            3
        }
    }

    fn header_size(&self) -> u32 {
        if self.v4_signature_size.is_some() {
            1584
        } else {
            1580
        }
    }

    fn padding(size: usize) -> usize {
        (Self::PAGE_SIZE - (size & (Self::PAGE_SIZE - 1))) & (Self::PAGE_SIZE - 1)
    }

    pub const fn kernel_position() -> usize {
        Self::PAGE_SIZE
    }

    pub fn ramdisk_position(&self) -> usize {
        Self::kernel_position() + self.kernel_size as usize + Self::padding(self.kernel_size as usize)
    }

    pub fn bootsig_position(&self) -> usize {
        self.ramdisk_position()
            + self.ramdisk_size as usize
            + Self::padding(self.ramdisk_size as usize)
    }
}

/// A parsed boot image header, either of the v0-v2 family or the v3-v4
/// family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Header {
    V0(HeaderV0),
    V3(HeaderV3),
}

impl Header {
    pub fn parse<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0x28))?;
        let mut version_buf = [0u8; 4];
        reader.read_exact(&mut version_buf)?;
        reader.seek(SeekFrom::Start(0))?;

        Ok(match u32::from_le_bytes(version_buf) {
            0..=2 => Self::V0(HeaderV0::read(reader)?),
            3 | 4 => Self::V3(HeaderV3::read(reader)?),
            version => return Err(BootError::UnknownHeaderVersion(version)),
        })
    }

    pub fn write<W: std::io::Write>(&self, writer: &mut W) -> Result<()> {
        let writer = &mut binrw::io::NoSeek::new(writer);
        match self {
            Self::V0(hdr) => hdr.write(writer)?,
            Self::V3(hdr) => hdr.write(writer)?,
        }
        Ok(())
    }

    pub fn header_version(&self) -> u32 {
        match self {
            Self::V0(hdr) => hdr.header_version(),
            Self::V3(hdr) => hdr.header_version(),
        }
    }

    pub fn kernel_position(&self) -> usize {
        match self {
            Self::V0(hdr) => hdr.kernel_position(),
            Self::V3(_) => HeaderV3::kernel_position(),
        }
    }

    pub fn kernel_size(&self) -> u32 {
        match self {
            Self::V0(hdr) => hdr.kernel_size,
            Self::V3(hdr) => hdr.kernel_size,
        }
    }

    pub fn ramdisk_position(&self) -> usize {
        match self {
            Self::V0(hdr) => hdr.ramdisk_position(),
            Self::V3(hdr) => hdr.ramdisk_position(),
        }
    }

    pub fn ramdisk_size(&self) -> u32 {
        match self {
            Self::V0(hdr) => hdr.ramdisk_size,
            Self::V3(hdr) => hdr.ramdisk_size,
        }
    }

    pub fn set_ramdisk_size(&mut self, size: u32) {
        match self {
            Self::V0(hdr) => hdr.ramdisk_size = size,
            Self::V3(hdr) => hdr.ramdisk_size = size,
        }
    }

    pub fn page_size(&self) -> usize {
        match self {
            Self::V0(hdr) => hdr.page_size as usize,
            Self::V3(_) => HeaderV3::PAGE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_v3(ramdisk_size: u32) -> HeaderV3 {
        HeaderV3 {
            kernel_size: 8192,
            ramdisk_size,
            os_version_and_patch: 0,
            cmdline: Box::new([0u8; 1536]),
            v4_signature_size: None,
        }
    }

    #[test]
    fn v3_round_trips_and_reports_positions() {
        let header = sample_v3(4096);
        let mut buf = Cursor::new(Vec::new());
        header.write(&mut binrw::io::NoSeek::new(&mut buf)).unwrap();
        assert_eq!(buf.get_ref().len(), 1580);

        let mut read_buf = Cursor::new(buf.into_inner());
        let parsed = Header::parse(&mut read_buf).unwrap();
        assert_eq!(parsed.header_version(), 3);
        assert_eq!(parsed.kernel_position(), 4096);
        assert_eq!(parsed.ramdisk_position(), 4096 + 8192);
        assert_eq!(parsed.ramdisk_size(), 4096);
    }

    #[test]
    fn set_ramdisk_size_updates_in_place() {
        let mut header = Header::V3(sample_v3(4096));
        header.set_ramdisk_size(9000);
        assert_eq!(header.ramdisk_size(), 9000);
    }
}
