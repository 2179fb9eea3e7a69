//! Simplay - terminal audio browser for directory listing servers.

mod app;
mod audio;
mod cli;
mod input;
mod logging;
mod settings;
mod ui;

use std::io;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{ self, Event, KeyEventKind },
    terminal::{ disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen },
    ExecutableCommand,
};
use ratatui::{ backend::CrosstermBackend, Terminal };

use app::App;
use cli::Args;
use settings::Settings;


fn main() -> Result<()> {
    let args = Args::parse();

    let log_path = logging::init( args.log_file.as_deref() )?;
    let settings = Settings::load().with_args( &args );
    tracing::info!(
        "Starting simplay: server {}, base {}, logging to {}",
        settings.server,
        settings.base_dir,
        log_path.display()
    );

    // Listing fetches and track downloads run here
    let runtime = tokio::runtime::Runtime::new()?;
    let mut app = App::new( &settings, runtime.handle().clone() )?;

    // Setup terminal
    enable_raw_mode()?;
    io::stdout().execute( EnterAlternateScreen )?;
    let mut terminal = Terminal::new( CrosstermBackend::new( io::stdout() ) )?;

    let result = run( &mut terminal, &mut app );

    // Cleanup
    disable_raw_mode()?;
    io::stdout().execute( LeaveAlternateScreen )?;

    if let Err( ref e ) = result {
        tracing::error!( "Exiting with error: {:#}", e );
    }
    result
}


fn run( terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App ) -> Result<()> {
    loop {
        app.tick();

        terminal.draw( |frame| ui::draw( frame, app ) )?;

        if event::poll( Duration::from_millis( 100 ) )? {
            if let Event::Key( key ) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key( key.code );
                }
            }
        }

        if app.should_quit {
            tracing::info!( "Quitting" );
            return Ok(());
        }
    }
}
