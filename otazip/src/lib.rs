// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Reads an OTA ZIP archive for random access, and rewrites one with
//! selected entries replaced, while enforcing Android's OTA-specific ZIP64
//! policy: `payload.bin` is always written STORED and is never allowed to
//! carry a ZIP64 extra field, because recovery's installer rejects ZIP64 on
//! that entry specifically. All other entries may use ZIP64 when `zip`
//! decides they need it.
//!
//! The "global ZIP64 limit" toggle the upstream Python tool flips on a
//! library-global is replaced here with a plain per-call check: before
//! writing `payload.bin` we refuse sizes that would force the `zip` crate
//! to emit a ZIP64 extra field, rather than mutating any process-wide
//! state.

mod eocd;
mod error;
mod local_header;
mod read;
mod write;

pub use eocd::append_comment;
pub use error::{Result, ZipError};
pub use local_header::{read_local_header, LocalHeaderInfo};
pub use read::OtaArchiveReader;
pub use write::{CentralDirectoryRange, EntryAction, OtaArchiveWriter};

/// Fixed byte cost of one entry's local file header: the 30-byte fixed
/// fields plus its filename, with no extra field (the `zip` crate does not
/// emit one for a small `Stored` entry with no zip64 fields). Used to
/// predict an entry's eventual local-file-header offset before the archive
/// is written.
pub fn local_header_size(name: &str) -> u64 {
    30 + name.len() as u64
}

/// Path of the update payload inside the archive.
pub const PAYLOAD: &str = "payload.bin";
/// Path of the payload's text properties manifest.
pub const PAYLOAD_PROPERTIES: &str = "payload_properties.txt";
/// Path of the PEM OTA certificate the device trusts.
pub const OTACERT: &str = "META-INF/com/android/otacert";
/// Path of the legacy text metadata entry.
pub const METADATA: &str = "META-INF/com/android/metadata";
/// Path of the binary (protobuf) metadata entry.
pub const METADATA_PB: &str = "META-INF/com/android/metadata.pb";

/// The five entries every OTA archive must carry.
pub const REQUIRED_ENTRIES: [&str; 5] =
    [PAYLOAD, PAYLOAD_PROPERTIES, OTACERT, METADATA, METADATA_PB];

/// Entries that must be STORED (uncompressed) on input.
pub const MUST_BE_STORED: [&str; 2] = [PAYLOAD, PAYLOAD_PROPERTIES];

/// The largest size `payload.bin` may have while still being written
/// without a ZIP64 extra field. The `zip` crate only emits ZIP64 fields
/// once a local/central-directory field would overflow 32 bits, so this is
/// simply `u32::MAX`.
pub const MAX_PAYLOAD_SIZE_WITHOUT_ZIP64: u64 = u32::MAX as u64;
