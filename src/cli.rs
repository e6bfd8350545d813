use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "fwgate",
    about = "Firmware gate - update an attached device when the bundled firmware is newer",
    version,
    author
)]
pub struct Cli {
    /// Directory searched for the manifest, update tool and firmware images
    #[arg(short, long, default_value = ".", global = true)]
    pub root: PathBuf,

    /// Path to a TOML config file (defaults to <root>/fwgate.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the attached device and run the update tool if its firmware is outdated
    Update {
        #[command(flatten)]
        device: DeviceArgs,

        /// Resolve the update tool and image without flashing
        #[arg(long)]
        dry_run: bool,

        /// Kill the update tool if it runs longer than this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Report whether the attached device needs a firmware update
    Check {
        #[command(flatten)]
        device: DeviceArgs,

        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// List files below the root that a name lookup would consider
    Locate {
        /// File name to look for, e.g. rs-fw-update.exe
        #[arg(value_name = "NAME")]
        name: String,
    },
}

/// Where the attached device information comes from
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Firmware version reported by the attached device
    #[arg(long, requires = "product_line", conflicts_with = "devices")]
    pub firmware_version: Option<String>,

    /// Product line reported by the attached device (e.g. D400, L500)
    #[arg(long, requires = "firmware_version", conflicts_with = "devices")]
    pub product_line: Option<String>,

    /// JSON inventory of attached devices
    #[arg(long, value_name = "FILE")]
    pub devices: Option<PathBuf>,
}
