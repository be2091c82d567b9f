// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The legacy `META-INF/com/android/metadata` text entry: `key=value`
//! lines, one of which (`ota-property-files`) records the byte ranges of
//! `payload.bin` and `payload_properties.txt`.

use crate::error::{MetaError, Result};
use crate::layout::PropertyFileEntry;

/// Width every offset/size decimal is zero-padded to. Large enough for any
/// real OTA archive (an exabyte archive would still fit) while keeping the
/// line's length independent of the actual values it carries, which is
/// what lets a placeholder and the real content end up the same length.
const FIELD_WIDTH: usize = 20;

/// Replaces (or appends) the `ota-property-files` line in `original`,
/// leaving every other line untouched.
pub fn render(original: &str, entries: &[PropertyFileEntry]) -> String {
    let mut lines: Vec<&str> =
        original.lines().filter(|line| !line.starts_with("ota-property-files=")).collect();
    let rendered = property_files_line(entries);
    lines.push(&rendered);
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn property_files_line(entries: &[PropertyFileEntry]) -> String {
    let parts: Vec<String> = entries
        .iter()
        .map(|e| format!("{}:{:0width$}:{:0width$}", e.name, e.offset, e.size, width = FIELD_WIDTH))
        .collect();
    format!("ota-property-files={}", parts.join(","))
}

/// Parses the `ota-property-files` line back out, used by `extract` and by
/// tests to confirm a rendered line round-trips.
pub fn parse_property_files(text: &str) -> Result<Vec<PropertyFileEntry>> {
    let line = text
        .lines()
        .find(|l| l.starts_with("ota-property-files="))
        .ok_or_else(|| MetaError::LegacyParse("missing ota-property-files line".to_string()))?;
    let value = &line["ota-property-files=".len()..];

    value
        .split(',')
        .map(|part| {
            let mut fields = part.splitn(3, ':');
            let name = fields
                .next()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| MetaError::LegacyParse(format!("malformed entry: {part}")))?;
            let offset = fields
                .next()
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| MetaError::LegacyParse(format!("bad offset in: {part}")))?;
            let size = fields
                .next()
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| MetaError::LegacyParse(format!("bad size in: {part}")))?;
            Ok(PropertyFileEntry { name: name.to_string(), offset, size })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_existing_line_and_keeps_others() {
        let original = "ota-type=AB\nota-property-files=stale:0:0\nota-required-cache=0\n";
        let entries = vec![PropertyFileEntry { name: "payload.bin".to_string(), offset: 1024, size: 2048 }];
        let rendered = render(original, &entries);
        assert!(rendered.contains("ota-type=AB"));
        assert!(rendered.contains("ota-required-cache=0"));
        assert!(!rendered.contains("stale"));
        assert!(rendered.contains("payload.bin"));
    }

    #[test]
    fn placeholder_and_real_lines_are_the_same_length() {
        let original = "ota-type=AB\n";
        let placeholder = vec![
            PropertyFileEntry { name: "payload.bin".to_string(), offset: 0, size: 0 },
            PropertyFileEntry { name: "payload_properties.txt".to_string(), offset: 0, size: 0 },
        ];
        let real = vec![
            PropertyFileEntry { name: "payload.bin".to_string(), offset: 9_876_543_210, size: 123_456_789 },
            PropertyFileEntry { name: "payload_properties.txt".to_string(), offset: 9_999_999_999, size: 97 },
        ];
        assert_eq!(render(original, &placeholder).len(), render(original, &real).len());
    }

    #[test]
    fn parse_round_trips_a_rendered_line() {
        let entries = vec![
            PropertyFileEntry { name: "payload.bin".to_string(), offset: 55, size: 909090 },
            PropertyFileEntry { name: "payload_properties.txt".to_string(), offset: 909145, size: 97 },
        ];
        let rendered = render("", &entries);
        let parsed = parse_property_files(&rendered).unwrap();
        assert_eq!(parsed, entries);
    }
}
