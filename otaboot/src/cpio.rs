// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! newc-format cpio archive codec, just enough to add, replace, and remove
//! ramdisk entries, built on the registry `cpio` crate rather than hand-
//! parsing the wire format: the retrieval pack's `coreos-installer` depends
//! on the same crate (`cpio = ">= 0.2.1, < 0.3"`) for this exact format.

use crate::error::{BootError, Result};
use std::io::{Cursor, Read, Write};

/// Decodes every entry in a newc cpio archive, stopping at `TRAILER!!!`.
pub fn decode(data: &[u8]) -> Result<Vec<CpioEntry>> {
    let mut entries = Vec::new();
    let mut inner: Box<dyn Read> = Box::new(Cursor::new(data.to_vec()));

    loop {
        let mut reader =
            cpio::newc::NewcReader::new(inner).map_err(|e| BootError::Cpio(e.to_string()))?;
        let (name, mode, is_trailer) = {
            let entry = reader.entry();
            (entry.name().to_string(), entry.mode(), entry.is_trailer())
        };
        if is_trailer {
            break;
        }
        let mut body = Vec::new();
        reader.read_to_end(&mut body).map_err(|e| BootError::Cpio(e.to_string()))?;
        entries.push(CpioEntry { name, mode, data: body });
        inner = reader.finish().map_err(|e| BootError::Cpio(e.to_string()))?;
    }

    Ok(entries)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CpioEntry {
    pub name: String,
    pub mode: u32,
    pub data: Vec<u8>,
}

impl CpioEntry {
    pub fn regular(name: impl Into<String>, mode: u32, data: Vec<u8>) -> Self {
        Self { name: name.into(), mode: 0o100000 | mode, data }
    }

    pub fn symlink(name: impl Into<String>, target: &str) -> Self {
        Self { name: name.into(), mode: 0o120000 | 0o777, data: target.as_bytes().to_vec() }
    }
}

/// Re-encodes a set of entries plus the `TRAILER!!!` sentinel back into a
/// newc cpio archive, the inverse of [`decode`].
pub fn encode(entries: &[CpioEntry]) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    let mut ino = 1u32;

    for entry in entries {
        let builder = cpio::newc::Builder::new(&entry.name).mode(entry.mode).ino(ino).nlink(1);
        let mut writer = builder.write(out, entry.data.len() as u32);
        writer.write_all(&entry.data).expect("writing to an in-memory cpio buffer cannot fail");
        out = writer.finish().expect("finishing an in-memory cpio writer cannot fail");
        ino += 1;
    }

    cpio::newc::trailer(out).expect("writing the cpio trailer to an in-memory buffer cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_entries_in_order() {
        let entries = vec![
            CpioEntry::regular("init", 0o750, b"init binary bytes".to_vec()),
            CpioEntry::symlink("init.real", "/system/bin/init"),
            CpioEntry::regular("overlay.d/sbin/magisk.xz", 0o644, vec![1, 2, 3]),
        ];
        let encoded = encode(&entries);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, entries);
    }

    #[test]
    fn empty_archive_round_trips() {
        let encoded = encode(&[]);
        assert!(decode(&encoded).unwrap().is_empty());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = encode(&[CpioEntry::regular("a", 0o644, vec![1])]);
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes), Err(BootError::Cpio(_))));
    }
}
