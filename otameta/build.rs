// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

fn main() {
    println!("cargo:rerun-if-changed=proto/ota_metadata.proto");
    prost_build::Config::new()
        .compile_protos(&["proto/ota_metadata.proto"], &["proto/"])
        .expect("compiling ota_metadata.proto");
}
