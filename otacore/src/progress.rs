// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Progress bars for the pipeline's two parallel phases (partition
//! extraction, boot image patching), styled the way the retrieval pack's
//! `payload-dumper-rust` styles its own per-partition spinners.

use indicatif::{ProgressBar, ProgressStyle};

/// A bar ticked once per completed item in a `rayon` `par_iter` fan-out.
pub fn partition_bar(len: u64, message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb.set_message(message);
    pb
}
