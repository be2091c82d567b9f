// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Regenerates the two OTA metadata entries (`metadata` and
//! `metadata.pb`) so the byte offsets they record for `payload.bin` and
//! `payload_properties.txt` match the just-written archive.
//!
//! Both entries encode offset/size fields at a fixed width (`fixed64` in
//! the protobuf, zero-padded decimal in the legacy text), so a placeholder
//! built before the real offsets are known and the real content computed
//! afterward are guaranteed to occupy exactly the same number of bytes.
//! That sidesteps the chicken-and-egg problem without a second pass of
//! file I/O: the orchestrator predicts every entry's
//! eventual offset analytically from the placeholder's length, builds the
//! real metadata content from those offsets, and then performs exactly
//! one write per entry with the real content — never writing a
//! placeholder's bytes to the output file at all, since overwriting an
//! entry's data in place after the central directory is finalized would
//! leave that entry's recorded CRC32 stale.

mod error;
mod layout;
mod legacy;

#[allow(clippy::all)]
mod proto {
    include!(concat!(env!("OUT_DIR"), "/otameta.ota_metadata.rs"));
}

pub use error::{MetaError, Result};
pub use layout::{placeholder, regenerate, verify_metadata, PropertyFileEntry, RegeneratedMetadata};
pub use legacy::parse_property_files;
