//! Log setup.
//!
//! The terminal belongs to the UI, so logs go to a file. The filter is
//! read from `SIMPLAY_LOG` (same syntax as `RUST_LOG`) and defaults to
//! `info`.

use std::fs::{ self, OpenOptions };
use std::path::{ Path, PathBuf };
use std::sync::Mutex;

use anyhow::{ anyhow, Context, Result };
use tracing_subscriber::EnvFilter;


const LOG_ENV: &str = "SIMPLAY_LOG";


/// Default log location under the local data directory.
pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else( std::env::temp_dir )
        .join( "simplay" )
        .join( "simplay.log" )
}


/// Installs the global subscriber. Returns the file logs are written to.
pub fn init( log_file: Option<&Path> ) -> Result<PathBuf> {
    let path = log_file.map( Path::to_path_buf ).unwrap_or_else( default_log_path );

    if let Some( parent ) = path.parent() {
        fs::create_dir_all( parent )
            .with_context( || format!( "Failed to create log directory {}", parent.display() ) )?;
    }

    let file = OpenOptions::new()
        .create( true )
        .append( true )
        .open( &path )
        .with_context( || format!( "Failed to open log file {}", path.display() ) )?;

    let filter = EnvFilter::try_from_env( LOG_ENV )
        .unwrap_or_else( |_| EnvFilter::new( "info" ) );

    tracing_subscriber::fmt()
        .with_env_filter( filter )
        .with_writer( Mutex::new( file ) )
        .with_ansi( false )
        .try_init()
        .map_err( |e| anyhow!( "Failed to install logger: {}", e ) )?;

    Ok( path )
}
