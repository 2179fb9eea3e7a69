//! Audio playback backend
//!
//! `AudioPlayer` behaves like a media element: it holds one source, plays
//! and pauses it, and reports `Playing`, `Ended`, `Error` and `Abort`
//! through a channel. Each play of a fresh source runs a session thread
//! that downloads the track, decodes it and feeds the output device.
//!
//! Every event carries the id of the session it belongs to. Replacing the
//! source or starting a new session moves the epoch, so events already
//! queued by an older session are rejected by [`AudioPlayer::accepts`].

mod decoder;
mod output;
mod resample;

use std::sync::atomic::{ AtomicBool, AtomicU64, Ordering };
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::runtime::Handle;

use simplay_core::{ MediaEvent, Playback, ServerClient };

use decoder::Decoder;
use output::{ AudioOutput, SampleBuffer };
use resample::Resampler;


/// A media event tagged with the session that produced it.
#[derive( Debug, Clone, PartialEq )]
pub struct SessionEvent {
    pub session: u64,
    pub event: MediaEvent,
}


/// Flags shared between the player and one session thread.
#[derive( Default )]
struct SessionControl {
    paused: AtomicBool,
    stopped: AtomicBool,
    finished: AtomicBool,
}


struct Session {
    control: Arc<SessionControl>,
}


impl Session {
    fn is_finished( &self ) -> bool {
        self.control.finished.load( Ordering::Acquire )
    }
}


/// Network-backed audio element.
pub struct AudioPlayer {
    client: ServerClient,
    runtime: Handle,
    events: Sender<SessionEvent>,
    source: Option<String>,
    session: Option<Session>,
    /// Moves on every source change and session start.
    epoch: Arc<AtomicU64>,
}


impl AudioPlayer {
    pub fn new( client: ServerClient, runtime: Handle, events: Sender<SessionEvent> ) -> Self {
        Self {
            client,
            runtime,
            events,
            source: None,
            session: None,
            epoch: Arc::new( AtomicU64::new( 0 ) ),
        }
    }


    /// Id of the newest session.
    pub fn epoch( &self ) -> u64 {
        self.epoch.load( Ordering::Acquire )
    }


    /// Returns true if `event` should reach the controller. Events of
    /// superseded sessions are dropped. `Abort` always passes; it is queued
    /// ahead of anything the next session sends.
    pub fn accepts( &self, event: &SessionEvent ) -> bool {
        matches!( event.event, MediaEvent::Abort ) || event.session == self.epoch()
    }


    fn send( &self, session: u64, event: MediaEvent ) {
        let _ = self.events.send( SessionEvent { session, event } );
    }


    /// Moves the epoch, invalidating everything older sessions queued.
    fn next_epoch( &self ) -> u64 {
        self.epoch.fetch_add( 1, Ordering::AcqRel ) + 1
    }


    fn stop_session( &mut self ) {
        let previous = self.epoch();
        self.next_epoch();

        if let Some( session ) = self.session.take() {
            session.control.stopped.store( true, Ordering::Release );
            if !session.is_finished() {
                self.send( previous, MediaEvent::Abort );
            }
        }
    }


    fn start_session( &mut self, source: String ) {
        let id = self.next_epoch();
        let control = Arc::new( SessionControl::default() );

        let task = SessionTask {
            id,
            source,
            client: self.client.clone(),
            runtime: self.runtime.clone(),
            control: Arc::clone( &control ),
            events: self.events.clone(),
            epoch: Arc::clone( &self.epoch ),
        };

        let spawned = thread::Builder::new()
            .name( format!( "simplay-session-{}", id ) )
            .spawn( move || task.run() );

        match spawned {
            Ok( _ ) => self.session = Some( Session { control } ),
            Err( e ) => {
                tracing::error!( "Failed to spawn playback thread: {}", e );
                self.send( id, MediaEvent::Error( e.to_string() ) );
            }
        }
    }
}


impl Playback for AudioPlayer {
    fn play( &mut self ) {
        let Some( source ) = self.source.clone() else {
            return;
        };

        match &self.session {
            Some( session ) if !session.is_finished() => {
                if session.control.paused.swap( false, Ordering::AcqRel ) {
                    tracing::info!( "Resumed" );
                    self.send( self.epoch(), MediaEvent::Playing );
                }
            }
            _ => {
                tracing::info!( "Playing: {}", source );
                self.start_session( source );
            }
        }
    }


    fn pause( &mut self ) {
        if let Some( session ) = &self.session {
            session.control.paused.store( true, Ordering::Release );
            tracing::info!( "Paused" );
        }
    }


    fn is_paused( &self ) -> bool {
        match &self.session {
            Some( session ) => session.is_finished() || session.control.paused.load( Ordering::Acquire ),
            None => true,
        }
    }


    fn set_source( &mut self, source: &str ) {
        self.stop_session();
        self.source = Some( source.to_string() );
    }
}


impl Drop for AudioPlayer {
    fn drop( &mut self ) {
        if let Some( session ) = self.session.take() {
            session.control.stopped.store( true, Ordering::Release );
        }
    }
}


/// Everything a session thread needs.
struct SessionTask {
    id: u64,
    source: String,
    client: ServerClient,
    runtime: Handle,
    control: Arc<SessionControl>,
    events: Sender<SessionEvent>,
    epoch: Arc<AtomicU64>,
}


impl SessionTask {
    fn emit( &self, event: MediaEvent ) {
        if self.epoch.load( Ordering::Acquire ) == self.id && !self.stopped() {
            let _ = self.events.send( SessionEvent { session: self.id, event } );
        }
    }


    fn stopped( &self ) -> bool {
        self.control.stopped.load( Ordering::Acquire )
    }


    fn fail( &self, reason: String ) {
        tracing::warn!( "Cannot play {}: {}", self.source, reason );
        self.control.finished.store( true, Ordering::Release );
        self.emit( MediaEvent::Error( reason ) );
    }


    fn run( self ) {
        let bytes = match self.runtime.block_on( self.client.track( &self.source ) ) {
            Ok( bytes ) => bytes,
            Err( e ) => return self.fail( e.to_string() ),
        };
        if self.stopped() {
            return;
        }

        let extension = self.source.rsplit_once( '.' ).map( |( _, ext )| ext );
        let mut decoder = match Decoder::from_bytes( bytes, extension ) {
            Ok( decoder ) => decoder,
            Err( e ) => return self.fail( e.to_string() ),
        };

        let channels = decoder.channels();
        let ( output, buffer ) = match AudioOutput::new( decoder.sample_rate(), channels as u16 ) {
            Ok( pair ) => pair,
            Err( e ) => return self.fail( e.to_string() ),
        };

        let mut resampler = if output.sample_rate() != decoder.sample_rate() {
            tracing::info!( "Resampling: {} Hz -> {} Hz", decoder.sample_rate(), output.sample_rate() );
            match Resampler::new( decoder.sample_rate(), output.sample_rate(), channels ) {
                Ok( r ) => Some( r ),
                Err( e ) => return self.fail( e.to_string() ),
            }
        } else {
            None
        };

        if let Err( e ) = output.play() {
            return self.fail( e.to_string() );
        }
        self.emit( MediaEvent::Playing );

        // keep about 50ms decoded ahead of the device
        let target = output.sample_rate() as usize * channels / 20;

        loop {
            if self.stopped() {
                tracing::debug!( "Session {}: stopped", self.id );
                return;
            }

            let paused = self.control.paused.load( Ordering::Acquire );
            buffer.set_paused( paused );
            if paused || buffer.len() > target {
                thread::sleep( Duration::from_millis( if paused { 10 } else { 5 } ) );
                continue;
            }

            match decoder.decode_next() {
                Ok( Some( samples ) ) => {
                    let samples = match resampler.as_mut() {
                        Some( r ) => r.process( &samples ),
                        None => samples,
                    };
                    self.feed( &buffer, &samples );
                }
                Ok( None ) => {
                    if let Some( r ) = resampler.as_mut() {
                        let tail = r.flush();
                        self.feed( &buffer, &tail );
                    }
                    while !buffer.is_empty() && !self.stopped() {
                        thread::sleep( Duration::from_millis( 10 ) );
                    }
                    tracing::info!( "Reached end of {}", self.source );
                    self.control.finished.store( true, Ordering::Release );
                    self.emit( MediaEvent::Ended );
                    return;
                }
                Err( e ) => return self.fail( e.to_string() ),
            }
        }
    }


    /// Pushes all of `samples`, waiting for room.
    fn feed( &self, buffer: &SampleBuffer, samples: &[f32] ) {
        let mut offset = 0;
        while offset < samples.len() && !self.stopped() {
            let pushed = buffer.push( &samples[ offset.. ] );
            offset += pushed;
            if pushed == 0 {
                thread::sleep( Duration::from_millis( 5 ) );
            }
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;

    use std::sync::mpsc::{ self, Receiver };

    use tokio::runtime::Runtime;


    fn player() -> ( AudioPlayer, Receiver<SessionEvent>, Runtime ) {
        let runtime = Runtime::new().unwrap();
        let client = ServerClient::new( "http://127.0.0.1:9/" ).unwrap();
        let ( tx, rx ) = mpsc::channel();
        let player = AudioPlayer::new( client, runtime.handle().clone(), tx );
        ( player, rx, runtime )
    }


    /// Installs a session as if `play()` had started one.
    fn install( player: &mut AudioPlayer, finished: bool, paused: bool ) -> ( u64, Arc<SessionControl> ) {
        let id = player.next_epoch();
        let control = Arc::new( SessionControl::default() );
        control.finished.store( finished, Ordering::Release );
        control.paused.store( paused, Ordering::Release );
        player.source = Some( "/music/a.mp3".to_string() );
        player.session = Some( Session { control: Arc::clone( &control ) } );
        ( id, control )
    }


    #[test]
    fn test_new_player_is_paused() {
        let ( player, _rx, _rt ) = player();
        assert!( player.is_paused() );
    }


    #[test]
    fn test_set_source_stops_and_aborts_running_session() {
        let ( mut player, rx, _rt ) = player();
        let ( id, control ) = install( &mut player, false, false );
        assert!( !player.is_paused() );

        player.set_source( "/music/b.mp3" );

        assert!( player.is_paused() );
        assert!( control.stopped.load( Ordering::Acquire ) );
        assert_eq!( rx.try_recv().unwrap(), SessionEvent { session: id, event: MediaEvent::Abort } );
        assert_eq!( player.source.as_deref(), Some( "/music/b.mp3" ) );
    }


    #[test]
    fn test_finished_session_is_paused_and_not_aborted() {
        let ( mut player, rx, _rt ) = player();
        install( &mut player, true, false );
        assert!( player.is_paused() );

        player.set_source( "/music/b.mp3" );

        assert!( player.is_paused() );
        assert!( rx.try_recv().is_err() );
    }


    #[test]
    fn test_play_resumes_paused_session() {
        let ( mut player, rx, _rt ) = player();
        let ( id, control ) = install( &mut player, false, true );
        assert!( player.is_paused() );

        player.play();

        assert!( !player.is_paused() );
        assert!( !control.paused.load( Ordering::Acquire ) );
        assert_eq!( player.epoch(), id );
        let session = player.session.as_ref().unwrap();
        assert!( Arc::ptr_eq( &session.control, &control ) );
        assert_eq!( rx.try_recv().unwrap(), SessionEvent { session: id, event: MediaEvent::Playing } );
    }


    #[test]
    fn test_pause_keeps_session() {
        let ( mut player, _rx, _rt ) = player();
        let ( _, control ) = install( &mut player, false, false );

        player.pause();

        assert!( player.is_paused() );
        assert!( control.paused.load( Ordering::Acquire ) );
        assert!( !control.stopped.load( Ordering::Acquire ) );
    }


    #[test]
    fn test_queued_end_of_replaced_source_is_rejected() {
        let ( mut player, _rx, _rt ) = player();
        let ( id, _ ) = install( &mut player, true, false );

        // queued by the finished session before the user picked another track
        let stale = SessionEvent { session: id, event: MediaEvent::Ended };
        assert!( player.accepts( &stale ) );

        player.set_source( "/music/c.mp3" );

        assert!( !player.accepts( &stale ) );
        assert!( !player.accepts( &SessionEvent { session: id, event: MediaEvent::Error( "bad".into() ) } ) );
        assert!( player.accepts( &SessionEvent { session: id, event: MediaEvent::Abort } ) );
        assert!( player.accepts( &SessionEvent { session: player.epoch(), event: MediaEvent::Playing } ) );
    }


    #[test]
    fn test_session_emits_only_while_current() {
        let ( mut player, rx, rt ) = player();
        let ( id, control ) = install( &mut player, false, false );

        let task = SessionTask {
            id,
            source: "/music/a.mp3".to_string(),
            client: player.client.clone(),
            runtime: rt.handle().clone(),
            control,
            events: player.events.clone(),
            epoch: Arc::clone( &player.epoch ),
        };

        task.emit( MediaEvent::Playing );
        assert_eq!( rx.try_recv().unwrap(), SessionEvent { session: id, event: MediaEvent::Playing } );

        player.set_source( "/music/b.mp3" );
        assert_eq!( rx.try_recv().unwrap().event, MediaEvent::Abort );

        task.emit( MediaEvent::Ended );
        assert!( rx.try_recv().is_err() );
    }
}
