use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::debug;
use upgrade_pack::commands::{build_command, inspect_command, targets_command, verify_command};
use upgrade_pack::log_level;

/// Firmware upgrade pack builder.
///
/// This CLI is a thin wrapper around `pack-core` (exposed in code as `pack_core`).
/// Pack assembly, signing and verification all live in the library.
#[derive(Parser, Debug)]
#[command(
    name = "upgrade-pack",
    version,
    about = "Build, inspect and verify signed firmware upgrade packs",
    long_about = None
)]
struct Cli {
    /// Increase log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build, sign and self-verify a pack described by a manifest.
    ///
    /// The output file is only written once the pack has been verified.
    Build {
        /// Pack manifest (YAML, or JSON when the name ends in `.json`).
        #[arg(long)]
        manifest: PathBuf,

        /// Where to write the pack.
        #[arg(long)]
        output: PathBuf,

        /// Optional JSON build report.
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Decode and print the layout of an existing pack.
    Inspect {
        /// Pack file to inspect.
        pack: PathBuf,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Check a pack's signature and image authentication with a manifest's keys.
    Verify {
        /// Manifest holding the signer and security keys.
        #[arg(long)]
        manifest: PathBuf,

        /// Pack file to verify.
        pack: PathBuf,
    },

    /// List the targets a manifest declares.
    Targets {
        /// Pack manifest.
        #[arg(long)]
        manifest: PathBuf,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let env = env_logger::Env::default().default_filter_or(log_level(cli.verbose));
    env_logger::Builder::from_env(env).init();
    debug!("pack-core {}", pack_core::version());

    match cli.command {
        Command::Build { manifest, output, report } => {
            build_command(&manifest, &output, report.as_deref())?
        }
        Command::Inspect { pack, json } => inspect_command(&pack, json)?,
        Command::Verify { manifest, pack } => verify_command(&manifest, &pack)?,
        Command::Targets { manifest, json } => targets_command(&manifest, json)?,
    }

    Ok(())
}
