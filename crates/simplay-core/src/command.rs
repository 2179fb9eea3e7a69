//! Slash command parsing.
//!
//! Commands typed into a front-end's command line are parsed into
//! [`Command`]s, most of which map directly onto a [`UiAction`].

use thiserror::Error;

use crate::controller::UiAction;


/// Errors that can occur during command parsing.
#[derive( Debug, Error )]
pub enum CommandError {
    #[error( "Unknown command: {0}" )]
    Unknown( String ),

    #[error( "Invalid argument: {0}" )]
    InvalidArgument( String ),

    #[error( "Missing argument: {0}" )]
    MissingArgument( String ),
}


/// Parsed slash command.
#[derive( Debug, Clone, PartialEq, Eq )]
pub enum Command {
    // Playback
    Next,
    Prev,
    Play { track: Option<usize> },
    Pause,

    // Navigation
    Up,
    Base,
    Cd { name: String },
    Refresh,

    // UI
    Help,
    Quit,
}


impl Command {
    /// Parses a command string (without the leading `/`).
    ///
    /// Track numbers are 1-based, as shown in the track list.
    pub fn parse( input: &str ) -> Result<Self, CommandError> {
        let input = input.trim();
        let mut parts = input.splitn( 2, ' ' );
        let cmd = parts.next().unwrap_or( "" ).to_lowercase();
        let args = parts.next().map( |s| s.trim() ).filter( |s| !s.is_empty() );

        match cmd.as_str() {
            "next" | "n" => Ok( Command::Next ),
            "prev" | "previous" | "p" => Ok( Command::Prev ),
            "play" | "pl" => {
                let track = args.map( parse_track_number ).transpose()?;
                Ok( Command::Play { track } )
            }
            "pause" | "pa" => Ok( Command::Pause ),

            "up" | ".." => Ok( Command::Up ),
            "base" | "home" | "~" => Ok( Command::Base ),
            "cd" | "open" => {
                let name = args
                    .ok_or_else( || CommandError::MissingArgument( "directory name".into() ) )?;
                Ok( Command::Cd { name: name.to_string() } )
            }
            "refresh" | "r" => Ok( Command::Refresh ),

            "help" | "h" | "?" => Ok( Command::Help ),
            "quit" | "q" | "exit" => Ok( Command::Quit ),

            "" => Err( CommandError::Unknown( "empty command".into() ) ),
            other => Err( CommandError::Unknown( other.to_string() ) ),
        }
    }


    /// Returns the action for commands that map directly onto one.
    ///
    /// `Play` without a track, `Cd`, `Help` and `Quit` need front-end
    /// context and return `None`.
    pub fn action( &self ) -> Option<UiAction> {
        match self {
            Command::Next => Some( UiAction::Next ),
            Command::Prev => Some( UiAction::Previous ),
            Command::Play { track: Some( n ) } => Some( UiAction::PlayTrack( n - 1 ) ),
            Command::Up => Some( UiAction::Up ),
            Command::Base => Some( UiAction::ToBase ),
            Command::Refresh => Some( UiAction::Refresh ),
            _ => None,
        }
    }


    /// Returns a brief description of the command for help text.
    pub fn description( &self ) -> &'static str {
        match self {
            Command::Next => "Next track",
            Command::Prev => "Previous track",
            Command::Play { .. } => "Play selected or numbered track",
            Command::Pause => "Pause playback",
            Command::Up => "Go one directory up",
            Command::Base => "Go to the base directory",
            Command::Cd { .. } => "Enter a subdirectory",
            Command::Refresh => "Reload the current directory",
            Command::Help => "Show help",
            Command::Quit => "Quit application",
        }
    }
}


fn parse_track_number( s: &str ) -> Result<usize, CommandError> {
    match s.parse::<usize>() {
        Ok( n ) if n > 0 => Ok( n ),
        _ => Err( CommandError::InvalidArgument(
            format!( "Invalid track number: '{}'", s )
        )),
    }
}


/// Returns help text listing all available commands and keys.
pub fn help_text() -> &'static str {
    r#"Playback:
  /next           Next track                [n]
  /prev           Previous track            [p]
  /play [n]       Play selected or track n  [Enter]
  /pause          Pause / resume            [Space]

Navigation:
  /up             One directory up          [Backspace]
  /base           Back to base directory    [~]
  /cd <name>      Enter a subdirectory
  /refresh        Reload current directory  [r]

Other:
  /help           Show this help            [?]
  /quit           Exit simplay              [q]

  Tab switches between directories and tracks."#
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_parse_play_numbered() {
        let cmd = Command::parse( "play 3" ).unwrap();
        assert_eq!( cmd, Command::Play { track: Some( 3 ) } );
        assert_eq!( cmd.action(), Some( UiAction::PlayTrack( 2 ) ) );
    }


    #[test]
    fn test_parse_play_selected() {
        let cmd = Command::parse( "play" ).unwrap();
        assert_eq!( cmd, Command::Play { track: None } );
        assert_eq!( cmd.action(), None );
    }


    #[test]
    fn test_parse_play_invalid() {
        assert!( matches!( Command::parse( "play 0" ), Err( CommandError::InvalidArgument( _ ) ) ) );
        assert!( matches!( Command::parse( "play x" ), Err( CommandError::InvalidArgument( _ ) ) ) );
    }


    #[test]
    fn test_parse_cd_keeps_spaces() {
        let cmd = Command::parse( "cd  Live at Leeds " ).unwrap();
        assert_eq!( cmd, Command::Cd { name: "Live at Leeds".into() } );
    }


    #[test]
    fn test_parse_aliases() {
        assert_eq!( Command::parse( "N" ).unwrap(), Command::Next );
        assert_eq!( Command::parse( ".." ).unwrap(), Command::Up );
        assert_eq!( Command::parse( "~" ).unwrap().action(), Some( UiAction::ToBase ) );
    }


    #[test]
    fn test_parse_unknown() {
        let result = Command::parse( "foobar" );
        assert!( matches!( result, Err( CommandError::Unknown( _ ) ) ) );
    }


    #[test]
    fn test_parse_missing_arg() {
        let result = Command::parse( "cd" );
        assert!( matches!( result, Err( CommandError::MissingArgument( _ ) ) ) );
    }
}
