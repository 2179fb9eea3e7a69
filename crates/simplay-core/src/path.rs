//! Slash-delimited directory paths as served by the listing server.


/// Appends a child segment to a directory path.
pub fn join( dir: &str, name: &str ) -> String {
    if dir.ends_with( '/' ) {
        format!( "{}{}", dir, name )
    } else {
        format!( "{}/{}", dir, name )
    }
}


/// Removes the last `/`-segment of a path.
///
/// A path without any slash has an empty parent.
pub fn parent( path: &str ) -> String {
    let trimmed = path.strip_suffix( '/' ).unwrap_or( path );
    match trimmed.rsplit_once( '/' ) {
        Some(( "", _ )) if path.starts_with( '/' ) => "/".to_string(),
        Some(( head, _ )) => head.to_string(),
        None => String::new(),
    }
}


/// Builds the media source for a track: the directory followed by the
/// percent-encoded track name.
pub fn track_source( dir: &str, name: &str ) -> String {
    join( dir, &urlencoding::encode( name ) )
}


/// Normalizes a configured base directory by dropping trailing slashes.
pub fn normalize( path: &str ) -> String {
    let trimmed = path.trim_end_matches( '/' );
    if trimmed.is_empty() && path.starts_with( '/' ) {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_join() {
        assert_eq!( join( "/music", "Live" ), "/music/Live" );
        assert_eq!( join( "/", "music" ), "/music" );
        assert_eq!( join( "music", "a b" ), "music/a b" );
    }


    #[test]
    fn test_parent() {
        assert_eq!( parent( "/music/Live/1999" ), "/music/Live" );
        assert_eq!( parent( "/music" ), "/" );
        assert_eq!( parent( "music/Live" ), "music" );
        assert_eq!( parent( "music" ), "" );
    }


    #[test]
    fn test_track_source_encodes_name_only() {
        assert_eq!( track_source( "/music/A B", "01 Intro.mp3" ), "/music/A B/01%20Intro.mp3" );
        assert_eq!( track_source( "/music", "what?#1.ogg" ), "/music/what%3F%231.ogg" );
    }


    #[test]
    fn test_normalize() {
        assert_eq!( normalize( "/music/" ), "/music" );
        assert_eq!( normalize( "/" ), "/" );
        assert_eq!( normalize( "music" ), "music" );
    }
}
