// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::descriptor::{ChainDescriptor, Descriptor, HashDescriptor};
use crate::error::Result;
use crate::image::VbmetaImage;
use crate::FLAGS_VERIFICATION_DISABLED;
use otakeys::PrivateKey;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Rebuilds the root vbmeta image, replacing descriptors for every patched
/// partition and preserving everything else verbatim.
///
/// `patched_images` maps partition name to the patched image's full bytes.
/// For a partition the original vbmeta hashed directly, a fresh hash
/// descriptor is computed over the new bytes, reusing the original salt so
/// the result stays deterministic given identical inputs. For a
/// partition the original vbmeta chained instead, only the embedded public
/// key is re-pointed at the new AVB key — the chained partition's own
/// footer is what actually gets re-signed, by `otaboot`.
pub fn rebuild_root(
    original: &VbmetaImage,
    patched_images: &HashMap<String, Vec<u8>>,
    key: &PrivateKey,
    public_key_der: &[u8],
    clear_flags: bool,
) -> Result<Vec<u8>> {
    let mut remaining: HashMap<&str, &[u8]> =
        patched_images.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();

    let mut descriptors = Vec::with_capacity(original.descriptors.len());
    for descriptor in &original.descriptors {
        let Some(name) = descriptor.partition_name() else {
            descriptors.push(descriptor.clone());
            continue;
        };
        let Some(image) = remaining.remove(name) else {
            descriptors.push(descriptor.clone());
            continue;
        };

        match descriptor {
            Descriptor::Hash(h) => {
                descriptors.push(Descriptor::Hash(HashDescriptor::compute(name, image, &h.salt)));
            }
            Descriptor::Chain(c) => {
                descriptors.push(Descriptor::Chain(ChainDescriptor {
                    rollback_index_location: c.rollback_index_location,
                    partition_name: c.partition_name.clone(),
                    public_key: public_key_der.to_vec(),
                }));
            }
            // `partition_name()` only returns `Some` for `Hash`/`Chain`.
            Descriptor::Unknown { .. } => unreachable!(),
        }
    }

    // Any patched partition the original root said nothing about (new to
    // this vbmeta) gets a freshly computed hash descriptor.
    let mut leftover: Vec<&str> = remaining.keys().copied().collect();
    leftover.sort_unstable();
    for name in leftover.drain(..) {
        let image = patched_images[name].as_slice();
        let salt = deterministic_salt(name);
        descriptors.push(Descriptor::Hash(HashDescriptor::compute(name, image, &salt)));
    }

    let flags = if clear_flags && original.header.flags & FLAGS_VERIFICATION_DISABLED != 0 {
        original.header.flags & !FLAGS_VERIFICATION_DISABLED
    } else {
        original.header.flags
    };

    VbmetaImage::build_and_sign(
        &descriptors,
        flags,
        original.header.rollback_index,
        key,
        public_key_der,
    )
}

/// Derives a stable salt for a partition that has no prior descriptor to
/// inherit one from, keeping the whole pipeline free of nondeterministic
/// inputs; there is no RNG in this crate's dependency stack.
fn deterministic_salt(partition_name: &str) -> Vec<u8> {
    Sha256::digest(format!("otapatch-vbmeta-salt:{partition_name}").as_bytes()).to_vec()
}

/// The salt `otaboot` should reuse when it appends a fresh per-image AVB
/// footer to `partition_name`: the original root vbmeta's hash descriptor
/// salt for that partition if one exists, or the same deterministic
/// fallback `rebuild_root` uses for a partition with no prior descriptor.
pub fn salt_for(original: &VbmetaImage, partition_name: &str) -> Vec<u8> {
    for descriptor in &original.descriptors {
        if let Descriptor::Hash(h) = descriptor {
            if h.partition_name == partition_name {
                return h.salt.clone();
            }
        }
    }
    deterministic_salt(partition_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{AlgorithmType, VbmetaHeader};

    fn unsigned_image(descriptors: &[Descriptor], flags: u32) -> VbmetaImage {
        VbmetaImage {
            header: VbmetaHeader {
                required_libavb_version_major: 1,
                required_libavb_version_minor: 0,
                authentication_data_block_size: 0,
                auxiliary_data_block_size: 0,
                algorithm_type: AlgorithmType::None.to_raw(),
                hash_offset: 0,
                hash_size: 0,
                signature_offset: 0,
                signature_size: 0,
                public_key_offset: 0,
                public_key_size: 0,
                public_key_metadata_offset: 0,
                public_key_metadata_size: 0,
                descriptors_offset: 0,
                descriptors_size: 0,
                rollback_index: 7,
                flags,
                rollback_index_location: 0,
                release_string: Vec::new(),
                reserved: vec![0u8; 89],
            },
            descriptors: descriptors.to_vec(),
            public_key: Vec::new(),
        }
    }

    #[test]
    fn unrelated_descriptors_pass_through_verbatim() {
        // `Unknown` descriptors carry no partition name, so they can never
        // collide with a patched image; an unpatched `Hash` descriptor for a
        // partition not present in `patched_images` should also survive
        // untouched.
        let unknown = Descriptor::Unknown { tag: 999, raw: vec![1, 2, 3, 4] };
        let untouched_hash =
            Descriptor::Hash(HashDescriptor::compute("system", b"original bytes", b"salt"));
        let original = unsigned_image(&[unknown.clone(), untouched_hash.clone()], 0);

        let mut patched = HashMap::new();
        patched.insert("boot".to_string(), vec![0u8; 16]);

        let mut remaining: HashMap<&str, &[u8]> =
            patched.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
        let mut descriptors = Vec::new();
        for d in &original.descriptors {
            match d.partition_name().and_then(|name| remaining.remove(name)) {
                Some(_) => unreachable!("neither descriptor names a patched partition"),
                None => descriptors.push(d.clone()),
            }
        }
        assert_eq!(descriptors, vec![unknown, untouched_hash]);
    }

    #[test]
    fn deterministic_salt_is_stable_across_calls() {
        assert_eq!(deterministic_salt("boot"), deterministic_salt("boot"));
        assert_ne!(deterministic_salt("boot"), deterministic_salt("vbmeta"));
    }
}
