// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Drives one `extract` invocation: unpack `payload.bin`'s partitions to a
//! directory, either the default role set or every partition with `--all`.

use crate::error::Result;
use crate::options::ExtractOptions;
use crate::progress::partition_bar;
use otapayload::{Manifest, PayloadHeader, RequiredImages};
use otastream::FileSource;
use otazip::{OtaArchiveReader, PAYLOAD};
use std::fs::File;

/// Runs one `extract` invocation.
pub fn run_extract(options: &ExtractOptions) -> Result<()> {
    let mut reader = OtaArchiveReader::open(&options.input)?;

    let scratch = tempfile::TempDir::new()?;
    let payload_path = scratch.path().join("payload.bin");
    {
        let mut out = File::create(&payload_path)?;
        reader.read_entry_to(PAYLOAD, &mut out)?;
    }
    let source = FileSource::new(&payload_path);

    let header = {
        let mut f = File::open(&payload_path)?;
        PayloadHeader::parse(&mut f)?
    };
    let manifest = Manifest::decode(header.manifest_raw.clone(), header.version)?;

    let names: Vec<String> = if options.all {
        manifest.partition_names().into_iter().map(String::from).collect()
    } else {
        let required = RequiredImages::resolve(&manifest, &options.boot_partition)?;
        let mut names = required.unique_non_vbmeta();
        if !names.contains(&required.vbmeta) {
            names.push(required.vbmeta.clone());
        }
        names
    };

    std::fs::create_dir_all(&options.directory)?;
    let pb = partition_bar(names.len() as u64, "extracting partitions");
    otapayload::extract_partitions(
        &manifest,
        &source,
        header.blob_offset,
        &options.directory,
        &names,
        Some(&pb),
    )?;
    pb.finish_with_message("partitions extracted");
    Ok(())
}
