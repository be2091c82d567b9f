// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Regenerates `payload_properties.txt`, the small text manifest that
//! records the rebuilt payload's own hash/size so the device can validate
//! `payload.bin` before streaming it.

use crate::rebuild::RebuiltPayload;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Renders the four key/value lines Android's updater reads out of
/// `payload_properties.txt`. Hashes are base64, matching the encoding the
/// real payload generator uses so the file is a drop-in replacement.
pub fn render(payload: &RebuiltPayload) -> String {
    format!(
        "FILE_HASH={}\nFILE_SIZE={}\nMETADATA_HASH={}\nMETADATA_SIZE={}\n",
        BASE64.encode(payload.file_hash),
        payload.file_size,
        BASE64.encode(payload.metadata_hash),
        payload.metadata_size,
    )
}
