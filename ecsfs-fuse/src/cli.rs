use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
pub struct Cli {
    /// Disk image
    #[arg(long, short, global = true, default_value = "fs.img")]
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Lay out an empty volume
    Format {
        /// Create a fresh image holding this many data blocks; without it the
        /// existing image is formatted in place, filling all of its blocks
        #[arg(long, short)]
        data_blocks: Option<usize>,
    },

    #[command(flatten)]
    Volume(VolumeCommand),
}

/// Commands run on a mounted volume
#[derive(Subcommand)]
pub enum VolumeCommand {
    /// Show volume geometry and free space
    Info,

    /// List files in the root directory
    Ls,

    /// Copy a host file into the image
    Add {
        /// Host file
        source: PathBuf,

        /// Name inside the image, defaults to the host file name
        #[arg(long, short)]
        name: Option<String>,
    },

    /// Print a file from the image
    Cat { name: String },

    /// Remove a file from the image
    Rm { name: String },

    /// Show the size of a file
    Stat { name: String },
}
