//! Terminal drawing.

use ratatui::{
    layout::{ Constraint, Direction, Layout, Rect },
    style::{ Color, Style, Stylize },
    text::{ Line, Span },
    widgets::{ Block, Borders, List, ListItem, Paragraph, Wrap },
    Frame,
};

use simplay_core::command::help_text;
use simplay_core::DirectoryTarget;

use crate::app::{ App, Focus };
use crate::input::InputMode;


/// Draws the whole screen.
pub fn draw( frame: &mut Frame, app: &mut App ) {
    let chunks = Layout::default()
        .direction( Direction::Vertical )
        .constraints([
            Constraint::Length( 2 ),  // Header
            Constraint::Min( 0 ),     // Main content
            Constraint::Length( 4 ),  // Now playing
            Constraint::Length( 1 ),  // Status bar
        ])
        .split( frame.area() );

    let loading = if app.view.loading { "  (loading...)" } else { "" };
    let header = Paragraph::new( format!( "  SIMPLAY - {}{}", app.view.path, loading ) )
        .style( Style::default().fg( Color::Cyan ).bold() )
        .block( Block::default().borders( Borders::BOTTOM ) );
    frame.render_widget( header, chunks[0] );

    if app.show_help {
        draw_help( frame, chunks[1] );
    } else {
        let panes = Layout::default()
            .direction( Direction::Horizontal )
            .constraints([ Constraint::Percentage( 35 ), Constraint::Percentage( 65 ) ])
            .split( chunks[1] );

        draw_directories( frame, app, panes[0] );
        draw_tracks( frame, app, panes[1] );
    }

    draw_now_playing( frame, app, chunks[2] );
    draw_status_bar( frame, app, chunks[3] );
}


fn pane_block( title: &'static str, focused: bool ) -> Block<'static> {
    let border = if focused {
        Style::default().fg( Color::Cyan )
    } else {
        Style::default().fg( Color::DarkGray )
    };
    Block::default().title( title ).borders( Borders::ALL ).border_style( border )
}


fn draw_directories( frame: &mut Frame, app: &mut App, area: Rect ) {
    let items: Vec<ListItem> = app.view.directories
        .iter()
        .map( |row| {
            let style = match row.target {
                DirectoryTarget::Up | DirectoryTarget::Base => Style::default().fg( Color::DarkGray ),
                DirectoryTarget::Child( _ ) => Style::default().fg( Color::Blue ),
            };
            ListItem::new( format!( " {}/", row.label ) ).style( style )
        })
        .collect();

    let list = List::new( items )
        .block( pane_block( " Directories ", app.focus == Focus::Directories ) )
        .highlight_style( Style::default().bg( Color::DarkGray ) );

    frame.render_stateful_widget( list, area, &mut app.directory_state );
}


fn draw_tracks( frame: &mut Frame, app: &mut App, area: Rect ) {
    let items: Vec<ListItem> = app.view.tracks
        .iter()
        .map( |row| {
            let marker = if row.current { "▶" } else { " " };
            let style = if row.current {
                Style::default().fg( Color::Yellow ).bold()
            } else {
                Style::default()
            };
            ListItem::new( format!( "{} {:>3}. {}", marker, row.index + 1, row.name ) ).style( style )
        })
        .collect();

    let title = if app.view.tracks.is_empty() && !app.view.loading {
        " Tracks (none) "
    } else {
        " Tracks "
    };

    let list = List::new( items )
        .block( pane_block( title, app.focus == Focus::Tracks ) )
        .highlight_style( Style::default().bg( Color::DarkGray ) );

    frame.render_stateful_widget( list, area, &mut app.track_state );
}


fn draw_help( frame: &mut Frame, area: Rect ) {
    let help = Paragraph::new( help_text() )
        .block( Block::default()
            .title( " Help (? or Esc to close) " )
            .borders( Borders::ALL ))
        .wrap( Wrap { trim: false } );

    frame.render_widget( help, area );
}


fn draw_now_playing( frame: &mut Frame, app: &App, area: Rect ) {
    let state_str = if app.view.halted {
        "■"
    } else if app.is_paused() {
        "⏸"
    } else {
        "▶"
    };

    let title = app.view.now_playing.as_deref().unwrap_or( "No track" );
    let mut lines = vec![
        Line::from( Span::styled( format!( " {} {} ", state_str, title ), Style::default().bold() ) ),
    ];

    if app.view.halted {
        lines.push( Line::from( Span::styled(
            "   Every track in this directory failed; playback stopped",
            Style::default().fg( Color::Red ),
        )));
    } else if let Some( ref err ) = app.view.error {
        lines.push( Line::from( Span::styled( format!( "   {}", err ), Style::default().fg( Color::Red ) ) ) );
    }

    let now_playing = Paragraph::new( lines )
        .block( Block::default().title( " Now Playing " ).borders( Borders::ALL ) );

    frame.render_widget( now_playing, area );
}


fn draw_status_bar( frame: &mut Frame, app: &App, area: Rect ) {
    let ( text, style ) = match app.input_mode {
        InputMode::Command => {
            ( format!( "/{}", app.input_buffer.content() ), Style::default().fg( Color::Yellow ) )
        }
        InputMode::Normal => match app.status_message {
            Some( ref msg ) => ( msg.clone(), Style::default().fg( Color::Green ) ),
            None => {
                let hint = if app.show_help {
                    " [?]Close [Esc]Close "
                } else {
                    " [/]Cmd [Tab]Pane [Enter]Open/Play [Space]Pause [n/p]Skip [Bksp]Up [~]Base [?]Help [q]Quit "
                };
                ( hint.to_string(), Style::default().fg( Color::DarkGray ) )
            }
        },
    };

    frame.render_widget( Paragraph::new( text ).style( style ), area );

    if app.input_mode == InputMode::Command {
        let cursor_x = area.x + 1 + app.input_buffer.cursor_char_pos() as u16;
        frame.set_cursor_position(( cursor_x, area.y ));
    }
}
