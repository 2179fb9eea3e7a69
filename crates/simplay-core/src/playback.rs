//! Media playback capability
//!
//! The controller drives audio through this trait and learns about
//! progress through [`MediaEvent`]s delivered by the implementation.


/// Events reported by a playback implementation.
#[derive( Debug, Clone, PartialEq, Eq )]
pub enum MediaEvent {
    /// Audio started (or resumed) coming out.
    Playing,

    /// The source played to its end.
    Ended,

    /// The source could not be fetched or decoded.
    Error( String ),

    /// Loading of the source was aborted.
    Abort,
}


/// A single audio element: one source at a time, play/pause control.
pub trait Playback {
    /// Starts or resumes playback of the current source.
    fn play( &mut self );

    /// Pauses playback.
    fn pause( &mut self );

    /// Returns true if playback is paused or nothing is loaded.
    fn is_paused( &self ) -> bool;

    /// Replaces the source. Any current stream stops and the element is
    /// left paused.
    fn set_source( &mut self, source: &str );
}
