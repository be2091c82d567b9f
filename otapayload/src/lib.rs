// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The update-payload engine: `payload.bin`'s header/manifest/blob layout,
//! per-partition extraction, and payload rebuild with patched partitions
//! spliced in, grounded on the retrieval pack's
//! `payload-dumper-rust`/`android-ota-extractor`/`otaripper`, all three of
//! which independently converge on `prost`+`prost-build` for this exact
//! `chromeos_update_engine` schema.

mod error;
mod extract;
mod header;
mod manifest;
mod properties;
mod rebuild;
mod roles;

pub use error::{PayloadError, Result};
pub use extract::extract_partitions;
pub use header::PayloadHeader;
pub use manifest::{Manifest, OpType};
pub use properties::render as render_properties;
pub use rebuild::{rebuild_payload, RebuiltPayload};
pub use roles::{resolve_roles, PartitionRole, RequiredImages, RoleError};
