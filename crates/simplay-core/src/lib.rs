//! Simplay Core - directory browsing and playback sequencing
//!
//! This crate provides the player state machine, the event controller
//! that drives a playback capability, the HTTP client for directory
//! listings, and the render model used by front-ends.

pub mod client;
pub mod command;
pub mod controller;
pub mod listing;
pub mod path;
pub mod playback;
pub mod state;
pub mod view;

pub use client::ServerClient;
pub use command::{ Command, CommandError };
pub use controller::{ Controller, ControllerError, Event, UiAction };
pub use listing::{ AudioExtensions, EntryKind, Listing, ListingEntry, ListingError };
pub use playback::{ MediaEvent, Playback };
pub use state::{ Advance, ListingRequest, PlayerState };
pub use view::{ DirectoryTarget, View };
