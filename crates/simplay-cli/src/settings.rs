//! Application settings
//!
//! Settings live in `<config dir>/simplay/settings.json`. Command-line
//! arguments take precedence over the file.

use std::fs;
use std::path::PathBuf;

use serde::{ Deserialize, Serialize };

use simplay_core::listing::DEFAULT_EXTENSIONS;
use simplay_core::AudioExtensions;

use crate::cli::Args;


/// Application settings.
#[derive( Debug, Clone, PartialEq, Serialize, Deserialize )]
#[serde( default )]
pub struct Settings {
    /// URL of the listing server
    pub server: String,

    /// Directory the browser starts in and cannot leave
    pub base_dir: String,

    /// File extensions listed as tracks
    pub extensions: Vec<String>,
}


impl Default for Settings {
    fn default() -> Self {
        Self {
            server: "http://localhost:8080/".to_string(),
            base_dir: "/music".to_string(),
            extensions: DEFAULT_EXTENSIONS.iter().map( |e| e.to_string() ).collect(),
        }
    }
}


impl Settings {
    /// Returns the path to the settings file.
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map( |p| p.join( "simplay" ).join( "settings.json" ) )
    }


    /// Loads settings from disk, or returns defaults if not found.
    pub fn load() -> Self {
        let path = match Self::settings_path() {
            Some( p ) => p,
            None => return Self::default(),
        };

        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string( &path ) {
            Ok( contents ) => Self::parse( &contents ),
            Err( e ) => {
                tracing::warn!( "Failed to read settings: {}", e );
                Self::default()
            }
        }
    }


    fn parse( contents: &str ) -> Self {
        match serde_json::from_str( contents ) {
            Ok( settings ) => settings,
            Err( e ) => {
                tracing::warn!( "Ignoring malformed settings: {}", e );
                Self::default()
            }
        }
    }


    /// Applies command-line overrides.
    pub fn with_args( mut self, args: &Args ) -> Self {
        if let Some( server ) = &args.server {
            self.server = server.clone();
        }
        if let Some( base ) = &args.base {
            self.base_dir = base.clone();
        }
        if let Some( extensions ) = &args.extensions {
            self.extensions = extensions.clone();
        }
        self
    }


    /// Recognized audio extensions, falling back to the defaults when the
    /// configured list is empty.
    pub fn audio_extensions( &self ) -> AudioExtensions {
        let extensions = AudioExtensions::new( &self.extensions );
        if extensions.as_slice().is_empty() {
            AudioExtensions::default()
        } else {
            extensions
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::parse( r#"{ "base_dir": "/srv/audio" }"# );
        assert_eq!( settings.base_dir, "/srv/audio" );
        assert_eq!( settings.server, Settings::default().server );
        assert_eq!( settings.extensions, vec![ "mp3", "ogg" ] );
    }


    #[test]
    fn test_malformed_file_falls_back() {
        assert_eq!( Settings::parse( "{ nope" ), Settings::default() );
    }


    #[test]
    fn test_args_override() {
        let args = Args {
            server: Some( "http://nas:9000/".into() ),
            base: None,
            extensions: Some( vec![ "flac".into() ] ),
            log_file: None,
        };
        let settings = Settings::default().with_args( &args );
        assert_eq!( settings.server, "http://nas:9000/" );
        assert_eq!( settings.base_dir, "/music" );
        assert!( settings.audio_extensions().matches( "a.FLAC" ) );
        assert!( !settings.audio_extensions().matches( "a.mp3" ) );
    }


    #[test]
    fn test_empty_extensions_use_defaults() {
        let settings = Settings { extensions: Vec::new(), ..Settings::default() };
        assert!( settings.audio_extensions().matches( "a.ogg" ) );
    }
}
