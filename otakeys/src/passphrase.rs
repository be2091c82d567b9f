// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::path::Path;
use zeroize::Zeroizing;

/// Obtains the passphrase for `key_path`: prefer a sidecar
/// `<PEM-path>_PASSPHRASE_FILE` environment variable when present (used in
/// non-interactive/CI invocations), otherwise prompt on the controlling
/// TTY. The returned string is wrapped so it is wiped from memory on drop.
pub fn obtain(key_path: &Path) -> std::io::Result<Zeroizing<String>> {
    if let Some(contents) = read_from_sidecar_env(key_path)? {
        return Ok(contents);
    }
    let prompt = format!("Passphrase for {}: ", key_path.display());
    let entered = rpassword::prompt_password(prompt)?;
    Ok(Zeroizing::new(entered))
}

fn read_from_sidecar_env(key_path: &Path) -> std::io::Result<Option<Zeroizing<String>>> {
    let var_name = format!(
        "{}_PASSPHRASE_FILE",
        key_path.to_string_lossy().to_uppercase().replace(['/', '.', '-'], "_")
    );
    let Ok(file_path) = std::env::var(&var_name) else {
        return Ok(None);
    };
    let raw = std::fs::read_to_string(file_path)?;
    Ok(Some(Zeroizing::new(raw.trim_end_matches(['\n', '\r']).to_string())))
}
