use std::cell::RefCell;
use std::rc::Rc;

use simplay_core::{
    AudioExtensions, Controller, DirectoryTarget, Event, ListingEntry, ListingError, MediaEvent,
    Playback, UiAction, View,
};


/// Playback double that shares its log with the test.
#[derive( Clone, Default )]
struct Recorder {
    log: Rc<RefCell<Vec<String>>>,
    paused: Rc<RefCell<bool>>,
}


impl Recorder {
    fn new() -> Self {
        let recorder = Self::default();
        *recorder.paused.borrow_mut() = true;
        recorder
    }


    fn take( &self ) -> Vec<String> {
        std::mem::take( &mut *self.log.borrow_mut() )
    }
}


impl Playback for Recorder {
    fn play( &mut self ) {
        *self.paused.borrow_mut() = false;
        self.log.borrow_mut().push( "play".into() );
    }

    fn pause( &mut self ) {
        *self.paused.borrow_mut() = true;
        self.log.borrow_mut().push( "pause".into() );
    }

    fn is_paused( &self ) -> bool {
        *self.paused.borrow()
    }

    fn set_source( &mut self, source: &str ) {
        *self.paused.borrow_mut() = true;
        self.log.borrow_mut().push( format!( "src {}", source ) );
    }
}


fn entries( json: &str ) -> Vec<ListingEntry> {
    simplay_core::listing::parse_listing( json.as_bytes() ).unwrap()
}


#[test]
fn browse_play_and_descend() {
    let recorder = Recorder::new();
    let mut controller = Controller::new( "/music", AudioExtensions::default(), recorder.clone() );

    let root = controller.start();
    assert_eq!( root.path, "/music" );

    controller.dispatch( Event::Listing {
        generation: root.generation,
        result: Ok( entries( r#"[
            { "type": "file", "name": "cover.jpg" },
            { "type": "file", "name": "One.mp3" },
            { "type": "directory", "name": "Live" },
            { "type": "file", "name": "Two.ogg" }
        ]"# ) ),
    }).unwrap();

    let view = View::render( controller.state() );
    assert_eq!( view.tracks.len(), 2 );
    assert_eq!( view.current_row(), Some( 0 ) );
    assert_eq!( view.directories.len(), 1 );
    assert_eq!( recorder.take(), vec![ "src /music/One.mp3" ] );

    // Clicking the second track plays it, finishing it wraps to the first.
    controller.dispatch( Event::Ui( UiAction::PlayTrack( 1 ) ) ).unwrap();
    controller.dispatch( Event::Media( MediaEvent::Playing ) ).unwrap();
    assert_eq!( controller.state().now_playing(), Some( "Two.ogg" ) );
    // A media element is paused again once it reaches the end.
    *recorder.paused.borrow_mut() = true;
    controller.dispatch( Event::Media( MediaEvent::Ended ) ).unwrap();
    assert_eq!( controller.state().current(), Some( 0 ) );
    assert_eq!( recorder.take(), vec![
        "src /music/Two.ogg",
        "play",
        "src /music/One.mp3",
        "play",
    ]);

    // Descending pauses and waits for the new listing.
    let live = controller.dispatch( Event::Ui( UiAction::EnterDirectory( 0 ) ) ).unwrap().unwrap();
    assert_eq!( live.path, "/music/Live" );
    assert_eq!( recorder.take(), vec![ "pause" ] );
    assert!( View::render( controller.state() ).loading );

    controller.dispatch( Event::Listing {
        generation: live.generation,
        result: Ok( entries( r#"[{ "type": "file", "name": "Encore #1.mp3" }]"# ) ),
    }).unwrap();
    assert_eq!( recorder.take(), vec![ "src /music/Live/Encore%20%231.mp3" ] );

    let view = View::render( controller.state() );
    assert_eq!( view.directories[ 0 ].target, DirectoryTarget::Up );
    assert_eq!( view.directories[ 1 ].target, DirectoryTarget::Base );

    let up = controller.dispatch( Event::Ui( UiAction::Up ) ).unwrap().unwrap();
    assert_eq!( up.path, "/music" );
}


#[test]
fn slow_listing_does_not_overwrite_newer_directory() {
    let recorder = Recorder::new();
    let mut controller = Controller::new( "/music", AudioExtensions::default(), recorder.clone() );

    let root = controller.start();
    controller.dispatch( Event::Listing {
        generation: root.generation,
        result: Ok( vec![ ListingEntry::directory( "A" ), ListingEntry::directory( "B" ) ] ),
    }).unwrap();

    let a = controller.enter_directory( 0 ).unwrap();
    let _ = controller.navigate_to_base();
    let b = controller.enter_directory( 1 );
    assert!( b.is_err(), "base listing not loaded yet, no directory to enter" );

    // The answer for A arrives after the user already moved on.
    controller.dispatch( Event::Listing {
        generation: a.generation,
        result: Ok( vec![ ListingEntry::file( "a.mp3" ) ] ),
    }).unwrap();

    assert_eq!( controller.state().directory(), "/music" );
    assert!( controller.state().tracks().is_empty() );
    assert!( controller.state().is_loading() );
}


#[test]
fn unknown_entry_kind_applies_nothing() {
    let recorder = Recorder::new();
    let mut controller = Controller::new( "/music", AudioExtensions::default(), recorder.clone() );
    let root = controller.start();

    let result = simplay_core::listing::parse_listing(
        br#"[{ "type": "file", "name": "a.mp3" }, { "type": "fifo", "name": "pipe" }]"#
    );
    assert!( matches!( result, Err( ListingError::UnknownEntryKind { .. } ) ) );

    let err = controller.dispatch( Event::Listing { generation: root.generation, result } ).unwrap_err();
    assert!( err.to_string().contains( "fifo" ) );
    assert!( controller.state().tracks().is_empty() );
    assert!( View::render( controller.state() ).error.is_some() );
    assert!( recorder.take().is_empty() );
}


#[test]
fn every_track_failing_stops_after_one_retry_cycle() {
    let recorder = Recorder::new();
    let mut controller = Controller::new( "/music", AudioExtensions::default(), recorder.clone() );
    let root = controller.start();
    controller.dispatch( Event::Listing {
        generation: root.generation,
        result: Ok( vec![ ListingEntry::file( "a.mp3" ), ListingEntry::file( "b.mp3" ) ] ),
    }).unwrap();

    controller.dispatch( Event::Ui( UiAction::PlayTrack( 0 ) ) ).unwrap();
    let mut errors = 0;
    while !controller.state().is_halted() {
        controller.dispatch( Event::Media( MediaEvent::Error( "unsupported".into() ) ) ).unwrap();
        errors += 1;
        assert!( errors <= 2, "error loop did not terminate" );
    }

    assert_eq!( errors, 2 );
    assert!( View::render( controller.state() ).halted );
    assert_eq!( recorder.take().last().map( String::as_str ), Some( "pause" ) );

    // Picking a track by hand clears the halt.
    controller.dispatch( Event::Ui( UiAction::PlayTrack( 0 ) ) ).unwrap();
    assert!( !controller.state().is_halted() );
}
