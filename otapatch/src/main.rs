// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Thin CLI front end over `otacore`: parses arguments, builds one
//! `PatchOptions`/`ExtractOptions`, and hands off to `otacore::run_patch` or
//! `otacore::run_extract`. All pipeline logic lives in `otacore` so it can
//! be exercised without a process boundary.

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use otacore::{ExtractOptions, PatchOptions, RootPatchArg};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "otapatch", version, about = "Re-sign an Android OTA under a new AVB trust root")]
struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Re-sign an OTA archive under a new AVB root, optionally injecting root.
    Patch(PatchArgs),
    /// Unpack one or more partition images out of an OTA's payload.
    Extract(ExtractArgs),
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("root_source")
        .args(["magisk", "prepatched"])
        .required(true)
))]
struct PatchArgs {
    /// Input OTA archive (a signed target_files ZIP as shipped to devices).
    #[arg(long)]
    input: PathBuf,

    /// Output path for the patched archive. Defaults to `<input>.patched`.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Private key (PEM, RSA or EC) used to re-sign vbmeta and boot images.
    #[arg(long, value_name = "PEM")]
    privkey_avb: PathBuf,

    /// Private key (PEM, RSA only) used to re-sign the outer OTA archive.
    #[arg(long, value_name = "PEM")]
    privkey_ota: PathBuf,

    /// Certificate (PEM) matching `--privkey-ota`; becomes the device's new
    /// trusted OTA certificate.
    #[arg(long, value_name = "PEM")]
    cert_ota: PathBuf,

    /// Root the device using this Magisk APK.
    #[arg(long, value_name = "APK")]
    magisk: Option<PathBuf>,

    /// Skip the supported-version check on `--magisk` and proceed anyway.
    #[arg(long, requires = "magisk")]
    ignore_magisk_version: bool,

    /// Root the device by installing this pre-patched boot/init_boot image
    /// verbatim, instead of patching a stock image with Magisk.
    #[arg(long, value_name = "IMAGE")]
    prepatched: Option<PathBuf>,

    /// Clear the vbmeta verification-disabled flag instead of preserving it.
    #[arg(long)]
    clear_vbmeta_flags: bool,

    /// Which GKI partition role carries the generic ramdisk: `init_boot` on
    /// devices that split it out, `boot` otherwise.
    #[arg(long, default_value = "gki_ramdisk")]
    boot_partition: String,
}

#[derive(Args)]
struct ExtractArgs {
    /// Input OTA archive to read the payload from.
    #[arg(long)]
    input: PathBuf,

    /// Directory to extract partition images into. Defaults to the current
    /// directory.
    #[arg(long)]
    directory: Option<PathBuf>,

    /// Extract every partition in the payload instead of just the ones the
    /// patch pipeline touches (vbmeta, boot/init_boot, otacerts host).
    #[arg(long)]
    all: bool,

    /// Which GKI partition role carries the generic ramdisk, as in `patch`.
    #[arg(long, default_value = "gki_ramdisk")]
    boot_partition: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    match cli.command {
        Command::Patch(args) => run_patch(args),
        Command::Extract(args) => run_extract(args),
    }
}

fn run_patch(args: PatchArgs) -> Result<()> {
    let output = args.output.clone().unwrap_or_else(|| default_patched_path(&args.input));

    let root_patch = match (args.magisk, args.prepatched) {
        (Some(apk_path), None) => {
            RootPatchArg::Magisk { apk_path, ignore_version: args.ignore_magisk_version }
        }
        (None, Some(image_path)) => RootPatchArg::Prepatched(image_path),
        // The `root_source` ArgGroup already enforces exactly one of these.
        _ => bail!("exactly one of --magisk or --prepatched must be given"),
    };

    let options = PatchOptions {
        input: args.input,
        output,
        avb_key_path: args.privkey_avb,
        ota_key_path: args.privkey_ota,
        ota_cert_path: args.cert_ota,
        root_patch,
        clear_vbmeta_flags: args.clear_vbmeta_flags,
        boot_partition: args.boot_partition,
    };

    otacore::run_patch(&options).map_err(error_report).context("patch failed")?;
    log::info!("wrote patched archive to {}", options.output.display());
    Ok(())
}

fn run_extract(args: ExtractArgs) -> Result<()> {
    let directory = args.directory.unwrap_or_else(|| PathBuf::from("."));
    let options = ExtractOptions {
        input: args.input,
        directory: directory.clone(),
        all: args.all,
        boot_partition: args.boot_partition,
    };

    otacore::run_extract(&options).map_err(error_report).context("extract failed")?;
    log::info!("extracted partitions to {}", directory.display());
    Ok(())
}

/// Re-wraps an `otacore::Error` so its `Display` text (already a precise,
/// user-facing description of what went wrong) surfaces directly instead of
/// behind anyhow's default debug formatting.
fn error_report(err: otacore::Error) -> anyhow::Error {
    anyhow::anyhow!("{err}")
}

fn default_patched_path(input: &std::path::Path) -> PathBuf {
    let mut name = input.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".patched");
    input.with_file_name(name)
}
