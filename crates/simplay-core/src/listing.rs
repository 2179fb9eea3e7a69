//! Directory listings
//!
//! Parses the JSON listing the server returns for a directory and splits
//! it into playable tracks and subdirectories.

use serde::Deserialize;
use thiserror::Error;


/// Extensions recognized as audio when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &[ "mp3", "ogg" ];


/// Errors that can occur while loading a directory listing.
#[derive( Debug, Error )]
pub enum ListingError {
    #[error( "Network error: {0}" )]
    Network( #[from] reqwest::Error ),

    #[error( "Server returned {status} for {url}" )]
    Status { status: u16, url: String },

    #[error( "Invalid URL: {0}" )]
    InvalidUrl( String ),

    #[error( "Malformed listing: {0}" )]
    Decode( #[from] serde_json::Error ),

    #[error( "Unhandled entry type '{kind}' for '{name}'" )]
    UnknownEntryKind { kind: String, name: String },
}


/// Kind of a listing entry.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum EntryKind {
    File,
    Directory,
}


/// A single entry of a directory listing.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct ListingEntry {
    pub kind: EntryKind,
    pub name: String,
}


/// Entry as it appears on the wire. The kind stays a string so that an
/// unknown value can be reported verbatim.
#[derive( Debug, Deserialize )]
struct RawEntry {
    #[serde( rename = "type" )]
    kind: String,
    name: String,
}


impl ListingEntry {
    /// Creates a file entry.
    pub fn file( name: impl Into<String> ) -> Self {
        Self { kind: EntryKind::File, name: name.into() }
    }


    /// Creates a directory entry.
    pub fn directory( name: impl Into<String> ) -> Self {
        Self { kind: EntryKind::Directory, name: name.into() }
    }
}


impl TryFrom<RawEntry> for ListingEntry {
    type Error = ListingError;


    fn try_from( raw: RawEntry ) -> Result<Self, Self::Error> {
        let kind = match raw.kind.as_str() {
            "file" => EntryKind::File,
            "directory" => EntryKind::Directory,
            _ => {
                return Err( ListingError::UnknownEntryKind {
                    kind: raw.kind,
                    name: raw.name,
                });
            }
        };

        Ok( Self { kind, name: raw.name } )
    }
}


/// Parses a listing response body.
///
/// The whole body is rejected if any entry has an unknown kind.
pub fn parse_listing( body: &[u8] ) -> Result<Vec<ListingEntry>, ListingError> {
    let raw: Vec<RawEntry> = serde_json::from_slice( body )?;
    raw.into_iter().map( ListingEntry::try_from ).collect()
}


/// Set of file extensions treated as playable audio.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct AudioExtensions {
    extensions: Vec<String>,
}


impl AudioExtensions {
    /// Creates a set from a list of extensions, with or without leading dots.
    pub fn new<I, S>( extensions: I ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map( |e| e.as_ref().trim().trim_start_matches( '.' ).to_lowercase() )
            .filter( |e| !e.is_empty() )
            .collect();

        Self { extensions }
    }


    /// Checks whether a file name ends in a recognized extension.
    pub fn matches( &self, name: &str ) -> bool {
        name.rsplit_once( '.' )
            .map( |( _, ext )| self.extensions.iter().any( |e| e.eq_ignore_ascii_case( ext ) ) )
            .unwrap_or( false )
    }


    /// Returns the recognized extensions.
    pub fn as_slice( &self ) -> &[String] {
        &self.extensions
    }
}


impl Default for AudioExtensions {
    fn default() -> Self {
        Self::new( DEFAULT_EXTENSIONS )
    }
}


/// Tracks and subdirectories of one directory, in listing order.
#[derive( Debug, Clone, Default, PartialEq, Eq )]
pub struct Listing {
    pub tracks: Vec<String>,
    pub directories: Vec<String>,
}


impl Listing {
    /// Splits entries into tracks and subdirectories.
    ///
    /// Files without a recognized extension are dropped.
    pub fn partition( entries: Vec<ListingEntry>, extensions: &AudioExtensions ) -> Self {
        let mut listing = Self::default();

        for entry in entries {
            match entry.kind {
                EntryKind::File => {
                    if extensions.matches( &entry.name ) {
                        listing.tracks.push( entry.name );
                    }
                }
                EntryKind::Directory => {
                    if is_plain_name( &entry.name ) {
                        listing.directories.push( entry.name );
                    } else {
                        tracing::warn!( "Skipping directory entry '{}'", entry.name );
                    }
                }
            }
        }

        listing
    }


    /// Returns true if the directory has neither tracks nor subdirectories.
    pub fn is_empty( &self ) -> bool {
        self.tracks.is_empty() && self.directories.is_empty()
    }
}


/// A single path segment that stays inside its parent directory.
fn is_plain_name( name: &str ) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains( '/' )
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_parse_listing() {
        let body = br#"[
            { "type": "directory", "name": "Live" },
            { "type": "file", "name": "01 Intro.mp3" }
        ]"#;

        let entries = parse_listing( body ).unwrap();
        assert_eq!( entries, vec![
            ListingEntry::directory( "Live" ),
            ListingEntry::file( "01 Intro.mp3" ),
        ]);
    }


    #[test]
    fn test_parse_ignores_extra_fields() {
        let body = br#"[{ "type": "file", "name": "a.ogg", "size": 1024, "mtime": "x" }]"#;
        let entries = parse_listing( body ).unwrap();
        assert_eq!( entries, vec![ ListingEntry::file( "a.ogg" ) ] );
    }


    #[test]
    fn test_parse_unknown_kind_is_fatal() {
        let body = br#"[
            { "type": "file", "name": "a.mp3" },
            { "type": "symlink", "name": "b" }
        ]"#;

        match parse_listing( body ) {
            Err( ListingError::UnknownEntryKind { kind, name } ) => {
                assert_eq!( kind, "symlink" );
                assert_eq!( name, "b" );
            }
            other => panic!( "expected unknown kind error, got {:?}", other ),
        }
    }


    #[test]
    fn test_parse_malformed() {
        assert!( matches!( parse_listing( b"{ not json" ), Err( ListingError::Decode( _ ) ) ) );
        assert!( matches!( parse_listing( br#"[{ "name": "a.mp3" }]"# ), Err( ListingError::Decode( _ ) ) ) );
    }


    #[test]
    fn test_extension_matching() {
        let ext = AudioExtensions::default();
        assert!( ext.matches( "song.mp3" ) );
        assert!( ext.matches( "SONG.OGG" ) );
        assert!( !ext.matches( "cover.jpg" ) );
        assert!( !ext.matches( "mp3" ) );
        assert!( !ext.matches( "notes.mp3.txt" ) );
    }


    #[test]
    fn test_custom_extensions() {
        let ext = AudioExtensions::new( [ ".FLAC", " opus ", "" ] );
        assert_eq!( ext.as_slice(), &[ "flac".to_string(), "opus".to_string() ] );
        assert!( ext.matches( "a.flac" ) );
        assert!( !ext.matches( "a.mp3" ) );
    }


    #[test]
    fn test_partition_keeps_order() {
        let entries = vec![
            ListingEntry::file( "b.mp3" ),
            ListingEntry::directory( "z" ),
            ListingEntry::file( "readme.txt" ),
            ListingEntry::file( "a.ogg" ),
            ListingEntry::directory( "a" ),
        ];

        let listing = Listing::partition( entries, &AudioExtensions::default() );
        assert_eq!( listing.tracks, vec![ "b.mp3", "a.ogg" ] );
        assert_eq!( listing.directories, vec![ "z", "a" ] );
    }


    #[test]
    fn test_partition_skips_escaping_directories() {
        let entries = vec![
            ListingEntry::directory( ".." ),
            ListingEntry::directory( "." ),
            ListingEntry::directory( "a/../.." ),
            ListingEntry::directory( "" ),
            ListingEntry::directory( "..Hidden Gems" ),
            ListingEntry::file( "a.mp3" ),
        ];

        let listing = Listing::partition( entries, &AudioExtensions::default() );
        assert_eq!( listing.directories, vec![ "..Hidden Gems" ] );
        assert_eq!( listing.tracks, vec![ "a.mp3" ] );
    }
}
