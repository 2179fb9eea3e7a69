//! Render model for front-ends.
//!
//! A `View` is a snapshot of what the user should see: the path label, the
//! track list with the active track marked, and the directory list with
//! the synthetic parent and base entries.

use crate::state::PlayerState;


/// Where clicking a directory row leads.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum DirectoryTarget {
    /// One level up.
    Up,

    /// Back to the base directory.
    Base,

    /// Subdirectory at this index of the listing.
    Child( usize ),
}


/// A row of the track list.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct TrackRow {
    pub index: usize,
    pub name: String,
    pub current: bool,
}


/// A row of the directory list.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct DirectoryRow {
    pub label: String,
    pub target: DirectoryTarget,
}


/// Snapshot of the UI surface.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct View {
    pub path: String,
    pub tracks: Vec<TrackRow>,
    pub directories: Vec<DirectoryRow>,
    pub now_playing: Option<String>,
    pub error: Option<String>,
    pub halted: bool,
    pub loading: bool,
}


impl View {
    /// Builds the view for the given state.
    pub fn render( state: &PlayerState ) -> Self {
        let current = state.current();

        let tracks = state.tracks()
            .iter()
            .enumerate()
            .map( |( index, name )| TrackRow {
                index,
                name: name.clone(),
                current: current == Some( index ),
            })
            .collect();

        let mut directories = Vec::with_capacity( state.directories().len() + 2 );
        if !state.is_at_base() {
            directories.push( DirectoryRow {
                label: "..".to_string(),
                target: DirectoryTarget::Up,
            });
            directories.push( DirectoryRow {
                label: format!( "to {}", state.base() ),
                target: DirectoryTarget::Base,
            });
        }
        directories.extend( state.directories().iter().enumerate().map( |( idx, name )| DirectoryRow {
            label: name.clone(),
            target: DirectoryTarget::Child( idx ),
        }));

        Self {
            path: state.directory().to_string(),
            tracks,
            directories,
            now_playing: state.now_playing().map( str::to_string ),
            error: state.last_error().map( str::to_string ),
            halted: state.is_halted(),
            loading: state.is_loading(),
        }
    }


    /// Index of the row marked current, if any.
    pub fn current_row( &self ) -> Option<usize> {
        self.tracks.iter().position( |t| t.current )
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::listing::Listing;


    fn state_at( dir: &str, tracks: &[&str], dirs: &[&str] ) -> PlayerState {
        let mut state = PlayerState::new( "/music" );
        let request = state.begin_directory( dir );
        state.apply_listing( request.generation, Listing {
            tracks: tracks.iter().map( |s| s.to_string() ).collect(),
            directories: dirs.iter().map( |s| s.to_string() ).collect(),
        });
        state
    }


    #[test]
    fn test_base_has_no_synthetic_rows() {
        let view = View::render( &state_at( "/music", &[], &[ "Live", "Studio" ] ) );
        let labels: Vec<_> = view.directories.iter().map( |d| d.label.as_str() ).collect();
        assert_eq!( labels, vec![ "Live", "Studio" ] );
        assert_eq!( view.directories[ 1 ].target, DirectoryTarget::Child( 1 ) );
    }


    #[test]
    fn test_subdirectory_has_up_then_base() {
        let view = View::render( &state_at( "/music/Live", &[], &[ "1999" ] ) );
        let targets: Vec<_> = view.directories.iter().map( |d| d.target ).collect();
        assert_eq!( targets, vec![
            DirectoryTarget::Up,
            DirectoryTarget::Base,
            DirectoryTarget::Child( 0 ),
        ]);
        assert_eq!( view.directories[ 1 ].label, "to /music" );
        assert_eq!( view.path, "/music/Live" );
    }


    #[test]
    fn test_current_marker() {
        let mut state = state_at( "/music", &[ "a.mp3", "b.mp3" ], &[] );
        state.select( 1 );

        let view = View::render( &state );
        assert!( !view.tracks[ 0 ].current );
        assert!( view.tracks[ 1 ].current );
        assert_eq!( view.current_row(), Some( 1 ) );
        assert!( !view.loading );
    }
}
