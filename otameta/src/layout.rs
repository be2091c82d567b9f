// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::{MetaError, Result};
use crate::legacy;
use crate::proto::{OtaMetadata, PropertyFile};
use otazip::read_local_header;
use prost::Message;
use std::fs::File;
use std::path::Path;

/// One entry's recorded byte range: its local-file-header offset and its
/// declared (uncompressed) size within the final archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFileEntry {
    pub name: String,
    pub offset: u64,
    pub size: u64,
}

/// The two regenerated metadata entries' content, ready to write.
pub struct RegeneratedMetadata {
    pub metadata_text: Vec<u8>,
    pub metadata_pb: Vec<u8>,
}

/// Placeholder content, used only to learn the two metadata entries'
/// exact byte length before any real offset is known; its bytes are never
/// written to the output archive. `names` gives the placeholder the same
/// entries the real content will carry (so its length matches), all with
/// offset/size zero.
pub fn placeholder(original_legacy_text: &str, names: &[&str]) -> RegeneratedMetadata {
    let entries: Vec<PropertyFileEntry> =
        names.iter().map(|n| PropertyFileEntry { name: n.to_string(), offset: 0, size: 0 }).collect();
    build(original_legacy_text, &entries)
}

/// The real content, once every entry's offset and size is known. Must be
/// exactly as long as the `placeholder` call it replaces (enforced by
/// `SizeDrift`): the caller predicts every entry's offset from the
/// placeholder's length before writing anything, so a length mismatch here
/// would mean every offset written after this entry is wrong.
pub fn regenerate(
    original_legacy_text: &str,
    entries: &[PropertyFileEntry],
    placeholder_lengths: (usize, usize),
) -> Result<RegeneratedMetadata> {
    let real = build(original_legacy_text, entries);
    if real.metadata_text.len() != placeholder_lengths.0 {
        return Err(MetaError::SizeDrift {
            name: "metadata".to_string(),
            expected: placeholder_lengths.0 as u64,
            actual: real.metadata_text.len() as u64,
        });
    }
    if real.metadata_pb.len() != placeholder_lengths.1 {
        return Err(MetaError::SizeDrift {
            name: "metadata.pb".to_string(),
            expected: placeholder_lengths.1 as u64,
            actual: real.metadata_pb.len() as u64,
        });
    }
    Ok(real)
}

fn build(original_legacy_text: &str, entries: &[PropertyFileEntry]) -> RegeneratedMetadata {
    RegeneratedMetadata {
        metadata_text: legacy::render(original_legacy_text, entries).into_bytes(),
        metadata_pb: encode_pb(entries),
    }
}

fn encode_pb(entries: &[PropertyFileEntry]) -> Vec<u8> {
    let metadata = OtaMetadata {
        ota_type: Some("AB".to_string()),
        wipe: Some(false),
        downgrade: Some(false),
        property_files: entries
            .iter()
            .map(|e| PropertyFile { name: Some(e.name.clone()), offset: Some(e.offset), size: Some(e.size) })
            .collect(),
    };
    metadata.encode_to_vec()
}

/// Re-reads the just-written archive and confirms every recorded property
/// file's offset really is that entry's local-file-header offset, with a
/// matching declared size.
pub fn verify_metadata(output_path: &Path, entries: &[PropertyFileEntry]) -> Result<()> {
    let mut file = File::open(output_path)?;
    for entry in entries {
        let header = read_local_header(&mut file, entry.offset)?;
        if header.name != entry.name {
            return Err(MetaError::OffsetMismatch { offset: entry.offset, expected: entry.name.clone() });
        }
        if header.uncompressed_size != entry.size {
            return Err(MetaError::SizeMismatch {
                name: entry.name.clone(),
                recorded: entry.size,
                actual: header.uncompressed_size,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_and_regenerated_content_match_in_length() {
        let names = ["payload.bin", "payload_properties.txt"];
        let ph = placeholder("ota-type=AB\n", &names);

        let real_entries = vec![
            PropertyFileEntry { name: "payload.bin".to_string(), offset: 512, size: 8_000_000 },
            PropertyFileEntry { name: "payload_properties.txt".to_string(), offset: 8_000_600, size: 97 },
        ];
        let real = regenerate(
            "ota-type=AB\n",
            &real_entries,
            (ph.metadata_text.len(), ph.metadata_pb.len()),
        )
        .unwrap();
        assert_eq!(real.metadata_text.len(), ph.metadata_text.len());
        assert_eq!(real.metadata_pb.len(), ph.metadata_pb.len());
    }

    #[test]
    fn size_drift_is_caught() {
        let err = regenerate("", &[], (5, 5)).unwrap_err();
        assert!(matches!(err, MetaError::SizeDrift { .. }));
    }
}
