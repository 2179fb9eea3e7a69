//! Command-line argument parsing for Simplay.

use std::path::PathBuf;

use clap::Parser;


/// Simplay - browse and play audio from a directory listing server.
#[derive( Parser, Debug )]
#[command( name = "simplay" )]
#[command( version, about, long_about = None )]
pub struct Args {
    /// Server URL, e.g. http://localhost:8080/
    #[arg( short, long )]
    pub server: Option<String>,

    /// Base directory on the server; navigation never goes above it.
    #[arg( short, long )]
    pub base: Option<String>,

    /// Comma-separated audio extensions to list as tracks.
    #[arg( short, long, value_delimiter = ',' )]
    pub extensions: Option<Vec<String>>,

    /// Write logs to this file instead of the default location.
    #[arg( long )]
    pub log_file: Option<PathBuf>,
}
