//! Application state and event routing for the terminal front-end.

use std::sync::mpsc::{ self, Receiver, Sender, TryRecvError };
use std::time::{ Duration, Instant };

use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::widgets::ListState;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use simplay_core::{
    Command, Controller, DirectoryTarget, Event, ListingRequest, Playback,
    ServerClient, UiAction, View,
};

use crate::audio::{ AudioPlayer, SessionEvent };
use crate::input::{ InputBuffer, InputMode };
use crate::settings::Settings;


const STATUS_TIMEOUT: Duration = Duration::from_secs( 4 );


/// Which list receives navigation keys.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum Focus {
    #[default]
    Directories,
    Tracks,
}


impl Focus {
    fn toggle( self ) -> Self {
        match self {
            Focus::Directories => Focus::Tracks,
            Focus::Tracks => Focus::Directories,
        }
    }
}


/// Application state.
pub struct App {
    controller: Controller<AudioPlayer>,
    client: ServerClient,
    runtime: Handle,

    listing_tx: Sender<Event>,
    listing_rx: Receiver<Event>,
    media_rx: Receiver<SessionEvent>,
    fetch: Option<JoinHandle<()>>,

    // Render state
    pub view: View,
    rendered_generation: u64,
    pub focus: Focus,
    pub directory_state: ListState,
    pub track_state: ListState,
    pub show_help: bool,

    // Input state
    pub input_mode: InputMode,
    pub input_buffer: InputBuffer,

    pub status_message: Option<String>,
    status_clear_at: Option<Instant>,

    pub should_quit: bool,
}


impl App {
    /// Creates the app and issues the listing fetch for the base directory.
    pub fn new( settings: &Settings, runtime: Handle ) -> Result<Self> {
        let client = ServerClient::new( &settings.server )?;

        let ( media_tx, media_rx ) = mpsc::channel();
        let ( listing_tx, listing_rx ) = mpsc::channel();

        let player = AudioPlayer::new( client.clone(), runtime.clone(), media_tx );
        let controller = Controller::new( &settings.base_dir, settings.audio_extensions(), player );
        let view = View::render( controller.state() );

        let mut app = Self {
            controller,
            client,
            runtime,
            listing_tx,
            listing_rx,
            media_rx,
            fetch: None,
            view,
            rendered_generation: 0,
            focus: Focus::default(),
            directory_state: ListState::default(),
            track_state: ListState::default(),
            show_help: false,
            input_mode: InputMode::Normal,
            input_buffer: InputBuffer::new(),
            status_message: None,
            status_clear_at: None,
            should_quit: false,
        };

        let request = app.controller.start();
        app.fetch_listing( request );
        app.refresh_view();

        Ok( app )
    }


    /// Runs the listing fetch in the background. A fetch still in flight
    /// for a previous directory is aborted.
    fn fetch_listing( &mut self, request: ListingRequest ) {
        if let Some( previous ) = self.fetch.take() {
            previous.abort();
        }

        let client = self.client.clone();
        let tx = self.listing_tx.clone();

        self.fetch = Some( self.runtime.spawn( async move {
            let result = client.listing( &request.path ).await;
            let _ = tx.send( Event::Listing { generation: request.generation, result } );
        }));
    }


    /// Feeds one event to the controller and applies its effects.
    fn dispatch( &mut self, event: Event ) {
        match self.controller.dispatch( event ) {
            Ok( Some( request ) ) => self.fetch_listing( request ),
            Ok( None ) => {}
            Err( e ) => self.set_status( format!( "Error: {}", e ) ),
        }
        self.refresh_view();
    }


    fn action( &mut self, action: UiAction ) {
        self.dispatch( Event::Ui( action ) );
    }


    /// Pulls pending listing and media events. Called once per frame.
    pub fn tick( &mut self ) {
        loop {
            match self.listing_rx.try_recv() {
                Ok( event ) => self.dispatch( event ),
                Err( TryRecvError::Empty ) | Err( TryRecvError::Disconnected ) => break,
            }
        }

        loop {
            match self.media_rx.try_recv() {
                Ok( msg ) => {
                    // a dispatch may replace the source, so check each one
                    if self.controller.playback().accepts( &msg ) {
                        self.dispatch( Event::Media( msg.event ) );
                    } else {
                        tracing::debug!( "Dropping {:?} from superseded session {}", msg.event, msg.session );
                    }
                }
                Err( TryRecvError::Empty ) | Err( TryRecvError::Disconnected ) => break,
            }
        }

        if self.status_clear_at.is_some_and( |t| Instant::now() >= t ) {
            self.status_message = None;
            self.status_clear_at = None;
        }
    }


    fn refresh_view( &mut self ) {
        self.view = View::render( self.controller.state() );

        let generation = self.controller.state().generation();
        let listing_arrived = !self.view.loading && self.rendered_generation != generation;

        if listing_arrived {
            self.rendered_generation = generation;
            self.directory_state.select( ( !self.view.directories.is_empty() ).then_some( 0 ) );
            self.track_state.select( self.view.current_row() );
            if self.view.directories.is_empty() && !self.view.tracks.is_empty() {
                self.focus = Focus::Tracks;
            }
        } else if self.view.loading {
            self.directory_state.select( None );
            self.track_state.select( None );
        }

        clamp( &mut self.directory_state, self.view.directories.len() );
        clamp( &mut self.track_state, self.view.tracks.len() );
    }


    pub fn set_status( &mut self, msg: impl Into<String> ) {
        self.status_message = Some( msg.into() );
        self.status_clear_at = Some( Instant::now() + STATUS_TIMEOUT );
    }


    pub fn is_paused( &self ) -> bool {
        self.controller.playback().is_paused()
    }


    /// Handles a key press.
    pub fn handle_key( &mut self, code: KeyCode ) {
        match self.input_mode {
            InputMode::Normal => self.handle_normal_key( code ),
            InputMode::Command => self.handle_command_key( code ),
        }
    }


    fn handle_normal_key( &mut self, code: KeyCode ) {
        if self.show_help {
            if matches!( code, KeyCode::Esc | KeyCode::Char( '?' ) | KeyCode::Char( 'q' ) ) {
                self.show_help = false;
            }
            return;
        }

        match code {
            KeyCode::Char( 'q' ) => self.should_quit = true,
            KeyCode::Char( '/' ) => {
                self.input_mode = InputMode::Command;
                self.input_buffer.clear();
            }
            KeyCode::Char( '?' ) => self.show_help = true,
            KeyCode::Tab | KeyCode::BackTab => self.focus = self.focus.toggle(),
            KeyCode::Up | KeyCode::Char( 'k' ) => self.move_selection( -1 ),
            KeyCode::Down | KeyCode::Char( 'j' ) => self.move_selection( 1 ),
            KeyCode::Enter => self.activate_selected(),
            KeyCode::Char( 'n' ) => self.action( UiAction::Next ),
            KeyCode::Char( 'p' ) => self.action( UiAction::Previous ),
            KeyCode::Char( ' ' ) => self.action( UiAction::TogglePause ),
            KeyCode::Backspace => self.action( UiAction::Up ),
            KeyCode::Char( '~' ) => self.action( UiAction::ToBase ),
            KeyCode::Char( 'r' ) => self.action( UiAction::Refresh ),
            _ => {}
        }
    }


    fn handle_command_key( &mut self, code: KeyCode ) {
        match code {
            KeyCode::Enter => {
                let input = self.input_buffer.content().to_string();
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
                self.execute_command( &input );
            }
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
            }
            KeyCode::Backspace => {
                if self.input_buffer.is_empty() {
                    self.input_mode = InputMode::Normal;
                } else {
                    self.input_buffer.backspace();
                }
            }
            KeyCode::Delete => self.input_buffer.delete(),
            KeyCode::Left => self.input_buffer.move_left(),
            KeyCode::Right => self.input_buffer.move_right(),
            KeyCode::Home => self.input_buffer.move_home(),
            KeyCode::End => self.input_buffer.move_end(),
            KeyCode::Char( c ) => self.input_buffer.insert( c ),
            _ => {}
        }
    }


    fn execute_command( &mut self, input: &str ) {
        let cmd = match Command::parse( input ) {
            Ok( cmd ) => cmd,
            Err( e ) => {
                self.set_status( format!( "Error: {}", e ) );
                return;
            }
        };

        if let Some( action ) = cmd.action() {
            self.action( action );
            return;
        }

        match cmd {
            Command::Play { track: None } => {
                let idx = self.track_state.selected().or( self.view.current_row() );
                match idx {
                    Some( idx ) => self.action( UiAction::PlayTrack( idx ) ),
                    None => self.set_status( "No track selected" ),
                }
            }
            Command::Pause => {
                if !self.is_paused() {
                    self.action( UiAction::TogglePause );
                }
            }
            Command::Cd { name } => match find_directory( self.controller.state().directories(), &name ) {
                Some( idx ) => self.action( UiAction::EnterDirectory( idx ) ),
                None => self.set_status( format!( "No directory named '{}'", name ) ),
            },
            Command::Help => self.show_help = true,
            Command::Quit => self.should_quit = true,
            _ => {}
        }
    }


    fn move_selection( &mut self, delta: isize ) {
        let ( state, len ) = match self.focus {
            Focus::Directories => ( &mut self.directory_state, self.view.directories.len() ),
            Focus::Tracks => ( &mut self.track_state, self.view.tracks.len() ),
        };
        if len == 0 {
            return;
        }

        let current = state.selected().unwrap_or( 0 ) as isize;
        let next = ( current + delta ).clamp( 0, len as isize - 1 );
        state.select( Some( next as usize ) );
    }


    fn activate_selected( &mut self ) {
        match self.focus {
            Focus::Directories => {
                let target = self.directory_state
                    .selected()
                    .and_then( |i| self.view.directories.get( i ) )
                    .map( |row| row.target );

                match target {
                    Some( DirectoryTarget::Up ) => self.action( UiAction::Up ),
                    Some( DirectoryTarget::Base ) => self.action( UiAction::ToBase ),
                    Some( DirectoryTarget::Child( idx ) ) => self.action( UiAction::EnterDirectory( idx ) ),
                    None => {}
                }
            }
            Focus::Tracks => {
                if let Some( idx ) = self.track_state.selected() {
                    self.action( UiAction::PlayTrack( idx ) );
                }
            }
        }
    }
}


/// Keeps a list selection inside `len` items.
fn clamp( state: &mut ListState, len: usize ) {
    match state.selected() {
        Some( _ ) if len == 0 => state.select( None ),
        Some( i ) if i >= len => state.select( Some( len - 1 ) ),
        _ => {}
    }
}


/// Finds a subdirectory by exact name, then case-insensitively.
fn find_directory( directories: &[String], name: &str ) -> Option<usize> {
    directories.iter().position( |d| d == name )
        .or_else( || directories.iter().position( |d| d.eq_ignore_ascii_case( name ) ) )
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_find_directory() {
        let dirs = vec![ "Live".to_string(), "live".to_string(), "Studio".to_string() ];
        assert_eq!( find_directory( &dirs, "live" ), Some( 1 ) );
        assert_eq!( find_directory( &dirs, "STUDIO" ), Some( 2 ) );
        assert_eq!( find_directory( &dirs, "Demos" ), None );
    }


    #[test]
    fn test_clamp_selection() {
        let mut state = ListState::default();
        state.select( Some( 5 ) );
        clamp( &mut state, 3 );
        assert_eq!( state.selected(), Some( 2 ) );

        clamp( &mut state, 0 );
        assert_eq!( state.selected(), None );
    }


    #[test]
    fn test_focus_toggle() {
        assert_eq!( Focus::Directories.toggle(), Focus::Tracks );
        assert_eq!( Focus::Tracks.toggle(), Focus::Directories );
    }
}
