//! Event dispatch
//!
//! The `Controller` owns the player state and the playback capability and
//! reacts to the three event sources: completed listing fetches, media
//! events and user actions. Directory changes yield a [`ListingRequest`]
//! that the caller is expected to execute and feed back as
//! [`Event::Listing`].

use thiserror::Error;

use crate::listing::{ AudioExtensions, Listing, ListingEntry, ListingError };
use crate::playback::{ MediaEvent, Playback };
use crate::state::{ Advance, ListingRequest, PlayerState };


/// Errors surfaced while handling an event.
#[derive( Debug, Error )]
pub enum ControllerError {
    #[error( "Failed to load {path}: {source}" )]
    Listing {
        path: String,
        #[source]
        source: ListingError,
    },

    #[error( "No track at index {0}" )]
    NoSuchTrack( usize ),

    #[error( "No directory at index {0}" )]
    NoSuchDirectory( usize ),
}


/// User actions, as triggered from the rendered view.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum UiAction {
    /// Clicked a track: select it and start playing.
    PlayTrack( usize ),

    /// Clicked a subdirectory.
    EnterDirectory( usize ),

    Up,
    ToBase,
    Next,
    Previous,
    TogglePause,
    Refresh,
}


/// Everything the controller reacts to.
#[derive( Debug )]
pub enum Event {
    Listing {
        generation: u64,
        result: Result<Vec<ListingEntry>, ListingError>,
    },
    Media( MediaEvent ),
    Ui( UiAction ),
}


/// Drives a [`Playback`] from directory listings and events.
#[derive( Debug )]
pub struct Controller<P> {
    state: PlayerState,
    playback: P,
    extensions: AudioExtensions,
}


impl<P: Playback> Controller<P> {
    /// Creates a controller rooted at `base`. Call [`Controller::start`] to
    /// load the base directory.
    pub fn new( base: &str, extensions: AudioExtensions, playback: P ) -> Self {
        Self {
            state: PlayerState::new( base ),
            playback,
            extensions,
        }
    }


    /// Loads the base directory.
    pub fn start( &mut self ) -> ListingRequest {
        let base = self.state.base().to_string();
        self.change_directory( &base )
    }


    /// Handles one event.
    ///
    /// Returns the listing fetch to run if the event changed directory.
    pub fn dispatch( &mut self, event: Event ) -> Result<Option<ListingRequest>, ControllerError> {
        match event {
            Event::Listing { generation, result } => {
                self.on_listing_loaded( generation, result )?;
                Ok( None )
            }
            Event::Media( media ) => {
                match media {
                    MediaEvent::Playing => self.on_playing(),
                    MediaEvent::Ended => self.on_playback_ended(),
                    MediaEvent::Error( reason ) => self.on_playback_error( &reason ),
                    MediaEvent::Abort => self.on_abort(),
                }
                Ok( None )
            }
            Event::Ui( action ) => self.on_action( action ),
        }
    }


    fn on_action( &mut self, action: UiAction ) -> Result<Option<ListingRequest>, ControllerError> {
        match action {
            UiAction::PlayTrack( idx ) => {
                self.play_track( idx )?;
                Ok( None )
            }
            UiAction::EnterDirectory( idx ) => self.enter_directory( idx ).map( Some ),
            UiAction::Up => Ok( self.navigate_up() ),
            UiAction::ToBase => Ok( self.navigate_to_base() ),
            UiAction::Next => {
                self.advance_next();
                Ok( None )
            }
            UiAction::Previous => {
                self.advance_previous();
                Ok( None )
            }
            UiAction::TogglePause => {
                self.toggle_pause();
                Ok( None )
            }
            UiAction::Refresh => Ok( Some( self.refresh() ) ),
        }
    }


    /// Switches to `path`: pauses, clears the current listing and returns
    /// the fetch for the new one.
    pub fn change_directory( &mut self, path: &str ) -> ListingRequest {
        if !self.playback.is_paused() {
            self.playback.pause();
        }

        let request = self.state.begin_directory( path );
        tracing::info!( "Changing directory: {} (generation {})", path, request.generation );
        request
    }


    /// Applies the result of a listing fetch.
    ///
    /// Results for a superseded directory are dropped. A failed or
    /// malformed listing is recorded as the last error and returned;
    /// nothing from it is applied.
    pub fn on_listing_loaded(
        &mut self,
        generation: u64,
        result: Result<Vec<ListingEntry>, ListingError>,
    ) -> Result<(), ControllerError> {
        if !self.state.is_current_generation( generation ) {
            tracing::debug!(
                "Dropping stale listing (generation {}, current {})",
                generation,
                self.state.generation()
            );
            return Ok(());
        }

        let entries = match result {
            Ok( entries ) => entries,
            Err( source ) => {
                let path = self.state.directory().to_string();
                tracing::error!( "Failed to load {}: {}", path, source );
                self.state.fail_listing( generation, source.to_string() );
                return Err( ControllerError::Listing { path, source } );
            }
        };

        let listing = Listing::partition( entries, &self.extensions );
        tracing::info!(
            "Loaded {}: {} tracks, {} directories",
            self.state.directory(),
            listing.tracks.len(),
            listing.directories.len()
        );

        if let Some( first ) = self.state.apply_listing( generation, listing ) {
            self.select( first );
        }

        Ok(())
    }


    /// Selects a track and points the playback at it. Playback continues
    /// if it was running before.
    pub fn select_track( &mut self, idx: usize ) -> Result<(), ControllerError> {
        if self.select( idx ) {
            Ok(())
        } else {
            Err( ControllerError::NoSuchTrack( idx ) )
        }
    }


    fn select( &mut self, idx: usize ) -> bool {
        let Some( source ) = self.state.track_source( idx ) else {
            return false;
        };

        let paused = self.playback.is_paused();

        self.state.select( idx );
        tracing::debug!( "Selected track {}: {}", idx, source );
        self.playback.set_source( &source );

        if !paused {
            self.playback.play();
        }
        true
    }


    /// Selects a track and starts playing it regardless of the previous
    /// paused state.
    pub fn play_track( &mut self, idx: usize ) -> Result<(), ControllerError> {
        self.select_track( idx )?;
        self.playback.play();
        Ok(())
    }


    /// Moves to the next track.
    ///
    /// Returns false if there is nothing to move to, including when every
    /// track failed during the current cycle; playback is halted then.
    pub fn advance_next( &mut self ) -> bool {
        match self.state.next_index() {
            Advance::Empty => false,
            Advance::Halted => {
                tracing::warn!(
                    "All {} tracks in {} failed to play, stopping",
                    self.state.tracks().len(),
                    self.state.directory()
                );
                self.state.set_halted();
                if !self.playback.is_paused() {
                    self.playback.pause();
                }
                false
            }
            Advance::To( idx ) => self.select( idx ),
        }
    }


    /// Moves to the previous track.
    pub fn advance_previous( &mut self ) -> bool {
        match self.state.previous_index() {
            Some( idx ) => self.select( idx ),
            None => false,
        }
    }


    /// The current track played to its end.
    pub fn on_playback_ended( &mut self ) {
        if self.state.tracks().is_empty() {
            return;
        }

        if self.advance_next() {
            self.playback.play();
        }
    }


    /// The current track failed; remember it and skip ahead.
    pub fn on_playback_error( &mut self, reason: &str ) {
        tracing::warn!(
            "Playback failed for {}: {}",
            self.state.current_track().unwrap_or( "<none>" ),
            reason
        );

        self.state.mark_error();
        if self.advance_next() {
            self.playback.play();
        }
    }


    /// Playback actually started; show the current track.
    pub fn on_playing( &mut self ) {
        let name = self.state.current_track().map( str::to_string );
        self.state.set_now_playing( name );
    }


    /// Loading was aborted; nothing is playing.
    pub fn on_abort( &mut self ) {
        self.state.set_now_playing( None );
    }


    /// Descends into the subdirectory at `idx`.
    pub fn enter_directory( &mut self, idx: usize ) -> Result<ListingRequest, ControllerError> {
        let path = self.state
            .child_directory( idx )
            .ok_or( ControllerError::NoSuchDirectory( idx ) )?;
        Ok( self.change_directory( &path ) )
    }


    /// Goes one level up. Does nothing at the base directory.
    pub fn navigate_up( &mut self ) -> Option<ListingRequest> {
        let parent = self.state.parent_directory()?;
        Some( self.change_directory( &parent ) )
    }


    /// Returns to the base directory. Does nothing when already there.
    pub fn navigate_to_base( &mut self ) -> Option<ListingRequest> {
        if self.state.is_at_base() {
            return None;
        }
        let base = self.state.base().to_string();
        Some( self.change_directory( &base ) )
    }


    /// Reloads the current directory.
    pub fn refresh( &mut self ) -> ListingRequest {
        let dir = self.state.directory().to_string();
        self.change_directory( &dir )
    }


    /// Pauses if playing, otherwise plays the selected track.
    pub fn toggle_pause( &mut self ) {
        if !self.playback.is_paused() {
            self.playback.pause();
        } else if self.state.current().is_some() {
            self.playback.play();
        }
    }


    pub fn state( &self ) -> &PlayerState {
        &self.state
    }


    pub fn playback( &self ) -> &P {
        &self.playback
    }


    pub fn playback_mut( &mut self ) -> &mut P {
        &mut self.playback
    }


    pub fn extensions( &self ) -> &AudioExtensions {
        &self.extensions
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    /// Records calls and mimics a media element's paused flag.
    #[derive( Debug, Default )]
    struct FakePlayback {
        paused: bool,
        source: Option<String>,
        calls: Vec<String>,
    }


    impl FakePlayback {
        fn new() -> Self {
            Self { paused: true, ..Self::default() }
        }
    }


    impl Playback for FakePlayback {
        fn play( &mut self ) {
            self.paused = false;
            self.calls.push( "play".into() );
        }

        fn pause( &mut self ) {
            self.paused = true;
            self.calls.push( "pause".into() );
        }

        fn is_paused( &self ) -> bool {
            self.paused
        }

        fn set_source( &mut self, source: &str ) {
            self.paused = true;
            self.source = Some( source.to_string() );
            self.calls.push( format!( "src {}", source ) );
        }
    }


    fn controller_with( tracks: &[&str], dirs: &[&str] ) -> Controller<FakePlayback> {
        let mut controller = Controller::new( "/music", AudioExtensions::default(), FakePlayback::new() );
        let request = controller.start();
        let mut entries: Vec<ListingEntry> = dirs.iter().map( |d| ListingEntry::directory( *d ) ).collect();
        entries.extend( tracks.iter().map( |t| ListingEntry::file( *t ) ) );
        controller.on_listing_loaded( request.generation, Ok( entries ) ).unwrap();
        controller.playback_mut().calls.clear();
        controller
    }


    #[test]
    fn test_listing_selects_first_track_without_playing() {
        let controller = controller_with( &[ "a.mp3", "b.mp3" ], &[] );
        assert_eq!( controller.state().current(), Some( 0 ) );
        assert_eq!( controller.playback().source.as_deref(), Some( "/music/a.mp3" ) );
        assert!( controller.playback().paused );
    }


    #[test]
    fn test_select_resumes_when_playing() {
        let mut controller = controller_with( &[ "a.mp3", "b.mp3" ], &[] );
        controller.playback_mut().paused = false;

        controller.select_track( 1 ).unwrap();
        assert_eq!( controller.playback().calls, vec![ "src /music/b.mp3", "play" ] );
    }


    #[test]
    fn test_select_stays_paused() {
        let mut controller = controller_with( &[ "a.mp3", "b.mp3" ], &[] );
        controller.select_track( 1 ).unwrap();
        assert_eq!( controller.playback().calls, vec![ "src /music/b.mp3" ] );
    }


    #[test]
    fn test_select_out_of_range() {
        let mut controller = controller_with( &[ "a.mp3" ], &[] );
        assert!( matches!( controller.select_track( 4 ), Err( ControllerError::NoSuchTrack( 4 ) ) ) );
        assert_eq!( controller.state().current(), Some( 0 ) );
    }


    #[test]
    fn test_play_track_always_plays() {
        let mut controller = controller_with( &[ "a.mp3", "b.mp3" ], &[] );
        controller.dispatch( Event::Ui( UiAction::PlayTrack( 1 ) ) ).unwrap();
        assert_eq!( controller.playback().calls, vec![ "src /music/b.mp3", "play" ] );
        assert!( !controller.playback().paused );
    }


    #[test]
    fn test_ended_advances_and_plays() {
        let mut controller = controller_with( &[ "a.mp3", "b.mp3" ], &[] );
        controller.play_track( 0 ).unwrap();
        controller.playback_mut().calls.clear();

        controller.dispatch( Event::Media( MediaEvent::Ended ) ).unwrap();
        assert_eq!( controller.state().current(), Some( 1 ) );
        assert_eq!( controller.playback().calls.last().map( String::as_str ), Some( "play" ) );
    }


    #[test]
    fn test_ended_without_tracks() {
        let mut controller = controller_with( &[], &[ "Live" ] );
        controller.dispatch( Event::Media( MediaEvent::Ended ) ).unwrap();
        assert!( controller.playback().calls.is_empty() );
    }


    #[test]
    fn test_error_skips_and_halts_after_full_cycle() {
        let mut controller = controller_with( &[ "a.mp3", "b.mp3", "c.mp3" ], &[] );
        controller.play_track( 0 ).unwrap();

        controller.on_playback_error( "decode" );
        controller.on_playback_error( "decode" );
        assert_eq!( controller.state().current(), Some( 2 ) );
        assert_eq!( controller.state().errors().len(), 2 );

        controller.playback_mut().calls.clear();
        controller.on_playback_error( "decode" );

        assert_eq!( controller.state().current(), Some( 2 ) );
        assert!( controller.state().is_halted() );
        assert!( controller.playback().paused );
        assert_eq!( controller.playback().calls, vec![ "pause" ] );
    }


    #[test]
    fn test_error_after_partial_failure_retries_cycle() {
        let mut controller = controller_with( &[ "a.mp3", "b.mp3", "c.mp3" ], &[] );
        controller.play_track( 1 ).unwrap();
        controller.on_playback_error( "decode" );
        assert_eq!( controller.state().current(), Some( 2 ) );

        controller.on_playback_ended();
        assert_eq!( controller.state().current(), Some( 0 ) );
        assert!( controller.state().errors().is_empty() );
    }


    #[test]
    fn test_change_directory_pauses_and_resets() {
        let mut controller = controller_with( &[ "a.mp3", "b.mp3" ], &[ "Live" ] );
        controller.play_track( 1 ).unwrap();
        controller.on_playback_error( "x" );
        controller.playback_mut().calls.clear();

        let request = controller.dispatch( Event::Ui( UiAction::EnterDirectory( 0 ) ) ).unwrap().unwrap();
        assert_eq!( request.path, "/music/Live" );
        assert_eq!( controller.playback().calls, vec![ "pause" ] );
        assert!( controller.state().errors().is_empty() );
        assert_eq!( controller.state().current(), None );
    }


    #[test]
    fn test_navigation_at_base_is_noop() {
        let mut controller = controller_with( &[ "a.mp3" ], &[] );
        assert_eq!( controller.dispatch( Event::Ui( UiAction::Up ) ).unwrap(), None );
        assert_eq!( controller.dispatch( Event::Ui( UiAction::ToBase ) ).unwrap(), None );
        assert_eq!( controller.state().generation(), 1 );
    }


    #[test]
    fn test_listing_failure_is_surfaced() {
        let mut controller = Controller::new( "/music", AudioExtensions::default(), FakePlayback::new() );
        let request = controller.start();

        let result = controller.dispatch( Event::Listing {
            generation: request.generation,
            result: Err( ListingError::Status { status: 404, url: "http://host/music".into() } ),
        });

        assert!( matches!( result, Err( ControllerError::Listing { .. } ) ) );
        assert!( controller.state().last_error().unwrap().contains( "404" ) );
        assert!( !controller.state().is_loading() );
    }


    #[test]
    fn test_stale_listing_failure_is_ignored() {
        let mut controller = Controller::new( "/music", AudioExtensions::default(), FakePlayback::new() );
        let first = controller.start();
        controller.refresh();

        let result = controller.on_listing_loaded(
            first.generation,
            Err( ListingError::InvalidUrl( "x".into() ) ),
        );
        assert!( result.is_ok() );
        assert_eq!( controller.state().last_error(), None );
    }


    #[test]
    fn test_now_playing_label() {
        let mut controller = controller_with( &[ "a.mp3", "b.mp3" ], &[] );
        controller.dispatch( Event::Media( MediaEvent::Playing ) ).unwrap();
        assert_eq!( controller.state().now_playing(), Some( "a.mp3" ) );

        controller.dispatch( Event::Media( MediaEvent::Abort ) ).unwrap();
        assert_eq!( controller.state().now_playing(), None );
    }


    #[test]
    fn test_toggle_pause() {
        let mut controller = controller_with( &[ "a.mp3" ], &[] );
        controller.toggle_pause();
        controller.toggle_pause();
        assert_eq!( controller.playback().calls, vec![ "play", "pause" ] );
    }
}
