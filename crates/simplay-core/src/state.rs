//! Navigation and playlist state
//!
//! `PlayerState` tracks the current directory, its tracks and
//! subdirectories, the selected track and the set of tracks that failed
//! to play. It performs no I/O; the controller turns its decisions into
//! playback and fetch effects.

use std::collections::BTreeSet;

use crate::listing::Listing;
use crate::path;


/// A directory listing fetch issued on directory change.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct ListingRequest {
    /// Generation the listing belongs to. Results for older generations
    /// are stale.
    pub generation: u64,
    pub path: String,
}


/// Outcome of computing the next track.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum Advance {
    /// No tracks in the current directory.
    Empty,

    /// Move to this index.
    To( usize ),

    /// Every track failed during the current cycle; stop advancing.
    Halted,
}


/// State of the directory being browsed and the track being played.
#[derive( Debug, Clone )]
pub struct PlayerState {
    base: String,
    directory: String,
    tracks: Vec<String>,
    directories: Vec<String>,
    current: Option<usize>,
    errors: BTreeSet<usize>,
    generation: u64,
    loading: bool,
    halted: bool,
    now_playing: Option<String>,
    last_error: Option<String>,
}


impl PlayerState {
    /// Creates a state rooted at `base`. Nothing is loaded until the first
    /// directory change.
    pub fn new( base: &str ) -> Self {
        let base = path::normalize( base );
        Self {
            directory: base.clone(),
            base,
            tracks: Vec::new(),
            directories: Vec::new(),
            current: None,
            errors: BTreeSet::new(),
            generation: 0,
            loading: false,
            halted: false,
            now_playing: None,
            last_error: None,
        }
    }


    /// Switches to `path` and returns the listing fetch for it.
    ///
    /// Clears tracks, subdirectories, the selection and the error set.
    pub fn begin_directory( &mut self, path: &str ) -> ListingRequest {
        self.directory = path.to_string();
        self.tracks.clear();
        self.directories.clear();
        self.current = None;
        self.errors.clear();
        self.halted = false;
        self.loading = true;
        self.generation += 1;

        ListingRequest {
            generation: self.generation,
            path: self.directory.clone(),
        }
    }


    /// Returns true if `generation` is the one of the latest directory change.
    pub fn is_current_generation( &self, generation: u64 ) -> bool {
        generation == self.generation
    }


    /// Installs a loaded listing.
    ///
    /// Returns `None` without touching anything if the listing is stale.
    /// Otherwise returns the index to select: `Some( 0 )` when the
    /// directory has tracks.
    pub fn apply_listing( &mut self, generation: u64, listing: Listing ) -> Option<usize> {
        if !self.is_current_generation( generation ) {
            return None;
        }

        self.tracks = listing.tracks;
        self.directories = listing.directories;
        self.errors.clear();
        self.loading = false;
        self.last_error = None;

        if self.tracks.is_empty() {
            None
        } else {
            Some( 0 )
        }
    }


    /// Records a failed listing load for the current generation.
    pub fn fail_listing( &mut self, generation: u64, message: String ) -> bool {
        if !self.is_current_generation( generation ) {
            return false;
        }
        self.loading = false;
        self.last_error = Some( message );
        true
    }


    /// Computes the track after the current one.
    ///
    /// Wrapping around to the first track starts a new retry cycle and
    /// clears the error set, unless every track is already in it.
    pub fn next_index( &mut self ) -> Advance {
        let len = self.tracks.len();
        if len == 0 {
            return Advance::Empty;
        }

        let next = self.current.map( |c| ( c + 1 ) % len ).unwrap_or( 0 );
        if next == 0 {
            if self.errors.len() >= len {
                return Advance::Halted;
            }
            self.errors.clear();
        }

        Advance::To( next )
    }


    /// Computes the track before the current one.
    pub fn previous_index( &self ) -> Option<usize> {
        let len = self.tracks.len();
        if len == 0 {
            return None;
        }

        // shift into a range where modulo works
        Some( self.current.map( |c| ( c + len - 1 ) % len ).unwrap_or( 0 ) )
    }


    /// Marks the current track as failed.
    pub fn mark_error( &mut self ) {
        if let Some( current ) = self.current {
            self.errors.insert( current );
        }
    }


    /// Sets the current track. Callers pass indices taken from the track list.
    pub fn select( &mut self, idx: usize ) {
        debug_assert!( idx < self.tracks.len() );
        self.current = Some( idx );
        self.halted = false;
    }


    /// Flags that advancement stopped because every track failed.
    pub fn set_halted( &mut self ) {
        self.halted = true;
    }


    /// Media source for the track at `idx`.
    pub fn track_source( &self, idx: usize ) -> Option<String> {
        self.tracks.get( idx ).map( |name| path::track_source( &self.directory, name ) )
    }


    /// Path of the subdirectory at `idx`.
    pub fn child_directory( &self, idx: usize ) -> Option<String> {
        self.directories.get( idx ).map( |name| path::join( &self.directory, name ) )
    }


    /// Path one level up, or `None` when already at the base directory.
    ///
    /// Never climbs above the base.
    pub fn parent_directory( &self ) -> Option<String> {
        if self.is_at_base() {
            return None;
        }

        let parent = path::parent( &self.directory );
        if parent.len() < self.base.len() || !parent.starts_with( &self.base ) {
            Some( self.base.clone() )
        } else {
            Some( parent )
        }
    }


    /// Updates the label of the track reported as playing.
    pub fn set_now_playing( &mut self, name: Option<String> ) {
        self.now_playing = name;
    }


    pub fn base( &self ) -> &str {
        &self.base
    }


    pub fn directory( &self ) -> &str {
        &self.directory
    }


    pub fn is_at_base( &self ) -> bool {
        self.directory == self.base
    }


    pub fn tracks( &self ) -> &[String] {
        &self.tracks
    }


    pub fn directories( &self ) -> &[String] {
        &self.directories
    }


    pub fn current( &self ) -> Option<usize> {
        self.current
    }


    /// Name of the selected track.
    pub fn current_track( &self ) -> Option<&str> {
        self.current.and_then( |i| self.tracks.get( i ) ).map( String::as_str )
    }


    pub fn errors( &self ) -> &BTreeSet<usize> {
        &self.errors
    }


    pub fn generation( &self ) -> u64 {
        self.generation
    }


    pub fn is_loading( &self ) -> bool {
        self.loading
    }


    pub fn is_halted( &self ) -> bool {
        self.halted
    }


    pub fn now_playing( &self ) -> Option<&str> {
        self.now_playing.as_deref()
    }


    pub fn last_error( &self ) -> Option<&str> {
        self.last_error.as_deref()
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    fn loaded( tracks: &[&str], current: usize ) -> PlayerState {
        let mut state = PlayerState::new( "/music" );
        let request = state.begin_directory( "/music" );
        let listing = Listing {
            tracks: tracks.iter().map( |t| t.to_string() ).collect(),
            directories: Vec::new(),
        };
        state.apply_listing( request.generation, listing );
        if !tracks.is_empty() {
            state.select( current );
        }
        state
    }


    #[test]
    fn test_next_wraps_and_clears_errors() {
        let mut state = loaded( &[ "a.mp3", "b.mp3", "c.mp3" ], 1 );
        state.mark_error();
        state.select( 2 );

        assert_eq!( state.next_index(), Advance::To( 0 ) );
        assert!( state.errors().is_empty() );
    }


    #[test]
    fn test_next_halts_when_all_failed() {
        let mut state = loaded( &[ "a.mp3", "b.mp3", "c.mp3" ], 0 );
        for i in 0..3 {
            state.select( i );
            state.mark_error();
        }

        assert_eq!( state.next_index(), Advance::Halted );
        assert_eq!( state.current(), Some( 2 ) );
        assert_eq!( state.errors().len(), 3 );
    }


    #[test]
    fn test_next_does_not_clear_errors_mid_cycle() {
        let mut state = loaded( &[ "a.mp3", "b.mp3", "c.mp3" ], 0 );
        state.mark_error();

        assert_eq!( state.next_index(), Advance::To( 1 ) );
        assert_eq!( state.errors().len(), 1 );
    }


    #[test]
    fn test_previous_wraps() {
        let state = loaded( &[ "a.mp3", "b.mp3", "c.mp3" ], 0 );
        assert_eq!( state.previous_index(), Some( 2 ) );
    }


    #[test]
    fn test_empty_directory() {
        let mut state = loaded( &[], 0 );
        assert_eq!( state.current(), None );
        assert_eq!( state.next_index(), Advance::Empty );
        assert_eq!( state.previous_index(), None );
    }


    #[test]
    fn test_begin_directory_resets() {
        let mut state = loaded( &[ "a.mp3", "b.mp3" ], 1 );
        state.mark_error();
        state.set_halted();

        let request = state.begin_directory( "/music/Live" );
        assert_eq!( request.path, "/music/Live" );
        assert_eq!( request.generation, 2 );
        assert!( state.tracks().is_empty() );
        assert!( state.errors().is_empty() );
        assert_eq!( state.current(), None );
        assert!( !state.is_halted() );
        assert!( state.is_loading() );
    }


    #[test]
    fn test_stale_listing_is_ignored() {
        let mut state = PlayerState::new( "/music" );
        let first = state.begin_directory( "/music/a" );
        let second = state.begin_directory( "/music/b" );

        let stale = Listing { tracks: vec![ "old.mp3".into() ], directories: Vec::new() };
        assert_eq!( state.apply_listing( first.generation, stale ), None );
        assert!( state.tracks().is_empty() );
        assert!( state.is_loading() );

        let fresh = Listing { tracks: vec![ "new.mp3".into() ], directories: Vec::new() };
        assert_eq!( state.apply_listing( second.generation, fresh ), Some( 0 ) );
        assert_eq!( state.tracks(), &[ "new.mp3".to_string() ] );
    }


    #[test]
    fn test_parent_directory() {
        let mut state = PlayerState::new( "/music/" );
        assert_eq!( state.base(), "/music" );
        assert_eq!( state.parent_directory(), None );

        state.begin_directory( "/music/Live/1999" );
        assert_eq!( state.parent_directory().as_deref(), Some( "/music/Live" ) );

        state.begin_directory( "/music/Live" );
        assert_eq!( state.parent_directory().as_deref(), Some( "/music" ) );
    }


    #[test]
    fn test_track_source() {
        let mut state = PlayerState::new( "/music" );
        let request = state.begin_directory( "/music/Best Of" );
        state.apply_listing( request.generation, Listing {
            tracks: vec![ "01 One & Two.mp3".into() ],
            directories: vec![ "Disc 2".into() ],
        });

        assert_eq!( state.track_source( 0 ).as_deref(), Some( "/music/Best Of/01%20One%20%26%20Two.mp3" ) );
        assert_eq!( state.child_directory( 0 ).as_deref(), Some( "/music/Best Of/Disc 2" ) );
        assert_eq!( state.track_source( 1 ), None );
    }
}
