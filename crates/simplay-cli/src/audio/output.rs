//! Audio output via cpal
//!
//! A `SampleBuffer` sits between the session thread (producer) and the
//! device callback (consumer) and adapts the channel layout.

use std::collections::VecDeque;
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::{ Arc, Mutex, MutexGuard, PoisonError };

use cpal::traits::{ DeviceTrait, HostTrait, StreamTrait };
use thiserror::Error;


/// Errors that can occur with audio output.
#[derive( Debug, Error )]
pub enum OutputError {
    #[error( "No output device available" )]
    NoDevice,

    #[error( "Failed to get stream config: {0}" )]
    StreamConfig( String ),

    #[error( "Failed to build output stream: {0}" )]
    BuildStream( String ),

    #[error( "Failed to play stream: {0}" )]
    PlayStream( String ),
}


/// Bounded interleaved sample queue shared with the device callback.
pub struct SampleBuffer {
    buffer: Mutex<VecDeque<f32>>,
    capacity: usize,
    paused: AtomicBool,
    source_channels: usize,
    output_channels: usize,
}


impl SampleBuffer {
    pub fn new( capacity: usize, source_channels: u16, output_channels: u16 ) -> Self {
        Self {
            buffer: Mutex::new( VecDeque::with_capacity( capacity ) ),
            capacity,
            paused: AtomicBool::new( false ),
            source_channels: source_channels.max( 1 ) as usize,
            output_channels: output_channels.max( 1 ) as usize,
        }
    }


    fn queue( &self ) -> MutexGuard<'_, VecDeque<f32>> {
        self.buffer.lock().unwrap_or_else( PoisonError::into_inner )
    }


    /// Pushes as many samples as fit. Returns the number pushed.
    pub fn push( &self, samples: &[f32] ) -> usize {
        let mut buf = self.queue();
        let room = self.capacity.saturating_sub( buf.len() );
        let count = samples.len().min( room );
        buf.extend( samples[ ..count ].iter().copied() );
        count
    }


    /// Fills `output` with whole frames, converting channel layout, and
    /// pads with silence. Returns the number of samples written from the
    /// queue.
    pub fn pop( &self, output: &mut [f32] ) -> usize {
        if self.paused.load( Ordering::Relaxed ) {
            output.fill( 0.0 );
            return 0;
        }

        let src = self.source_channels;
        let out = self.output_channels;
        let mut buf = self.queue();

        let frames = ( output.len() / out ).min( buf.len() / src );

        // runs on the device thread: read in place, no allocation
        for i in 0..frames {
            let start = i * src;
            let target = &mut output[ i * out..( i + 1 ) * out ];
            if out == 1 && src > 1 {
                target[ 0 ] = ( start..start + src ).map( |j| buf[ j ] ).sum::<f32>() / src as f32;
            } else {
                // extra output channels repeat the last source channel
                for ( ch, sample ) in target.iter_mut().enumerate() {
                    *sample = buf[ start + ch.min( src - 1 ) ];
                }
            }
        }
        buf.drain( ..frames * src );

        let written = frames * out;
        output[ written.. ].fill( 0.0 );
        written
    }


    pub fn len( &self ) -> usize {
        self.queue().len()
    }


    pub fn is_empty( &self ) -> bool {
        self.queue().is_empty()
    }


    pub fn set_paused( &self, paused: bool ) {
        self.paused.store( paused, Ordering::Relaxed );
    }
}


/// An open output stream.
///
/// Holds a `cpal::Stream`, which must stay on the thread that created it.
pub struct AudioOutput {
    stream: cpal::Stream,
    sample_rate: u32,
}


impl AudioOutput {
    /// Opens the default output device, preferring a configuration that
    /// matches the source. Returns the output and the buffer to feed.
    pub fn new(
        source_sample_rate: u32,
        source_channels: u16,
    ) -> Result<( Self, Arc<SampleBuffer> ), OutputError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or( OutputError::NoDevice )?;

        tracing::info!( "Using output device: {:?}", device.name() );

        let supported: Vec<_> = device
            .supported_output_configs()
            .map_err( |e| OutputError::StreamConfig( e.to_string() ) )?
            .collect();

        let supports_rate = |c: &cpal::SupportedStreamConfigRange| {
            c.min_sample_rate().0 <= source_sample_rate && c.max_sample_rate().0 >= source_sample_rate
        };

        let config = match supported
            .iter()
            .find( |&c| c.channels() == source_channels && supports_rate( c ) )
            .or_else( || supported.iter().find( |&c| supports_rate( c ) ) )
        {
            Some( range ) => range.clone().with_sample_rate( cpal::SampleRate( source_sample_rate ) ).config(),
            None => {
                // device cannot run at the source rate; the session resamples
                device
                    .default_output_config()
                    .map_err( |e| OutputError::StreamConfig( e.to_string() ) )?
                    .config()
            }
        };

        tracing::info!(
            "Audio output config: {} Hz, {} channels (source {} Hz, {} channels)",
            config.sample_rate.0,
            config.channels,
            source_sample_rate,
            source_channels
        );

        // about half a second of audio at the device rate
        let capacity = config.sample_rate.0 as usize * source_channels.max( 1 ) as usize / 2;
        let buffer = Arc::new( SampleBuffer::new( capacity, source_channels, config.channels ) );
        let callback_buffer = Arc::clone( &buffer );

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    callback_buffer.pop( data );
                },
                |err| {
                    tracing::error!( "Audio output error: {}", err );
                },
                None,
            )
            .map_err( |e| OutputError::BuildStream( e.to_string() ) )?;

        Ok((
            Self {
                stream,
                sample_rate: config.sample_rate.0,
            },
            buffer,
        ))
    }


    /// Starts the device callback.
    pub fn play( &self ) -> Result<(), OutputError> {
        self.stream
            .play()
            .map_err( |e| OutputError::PlayStream( e.to_string() ) )
    }


    /// Sample rate the device runs at.
    pub fn sample_rate( &self ) -> u32 {
        self.sample_rate
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_push_respects_capacity() {
        let buffer = SampleBuffer::new( 4, 2, 2 );
        assert_eq!( buffer.push( &[ 0.1; 6 ] ), 4 );
        assert_eq!( buffer.push( &[ 0.1 ] ), 0 );
        assert_eq!( buffer.len(), 4 );
    }


    #[test]
    fn test_pop_mono_to_stereo() {
        let buffer = SampleBuffer::new( 16, 1, 2 );
        buffer.push( &[ 0.25, 0.5 ] );

        let mut out = [ 1.0; 6 ];
        assert_eq!( buffer.pop( &mut out ), 4 );
        assert_eq!( out, [ 0.25, 0.25, 0.5, 0.5, 0.0, 0.0 ] );
        assert!( buffer.is_empty() );
    }


    #[test]
    fn test_pop_stereo_to_mono() {
        let buffer = SampleBuffer::new( 16, 2, 1 );
        buffer.push( &[ 0.5, 0.25, 1.0, 0.0 ] );

        let mut out = [ 1.0; 3 ];
        assert_eq!( buffer.pop( &mut out ), 2 );
        assert_eq!( out, [ 0.375, 0.5, 0.0 ] );
    }


    #[test]
    fn test_pop_only_whole_frames() {
        let buffer = SampleBuffer::new( 16, 2, 2 );
        buffer.push( &[ 0.5, 0.5, 0.5 ] );

        let mut out = [ 1.0; 4 ];
        assert_eq!( buffer.pop( &mut out ), 2 );
        assert_eq!( buffer.len(), 1 );
    }


    #[test]
    fn test_paused_outputs_silence() {
        let buffer = SampleBuffer::new( 16, 2, 2 );
        buffer.push( &[ 0.5; 4 ] );
        buffer.set_paused( true );

        let mut out = [ 1.0; 4 ];
        assert_eq!( buffer.pop( &mut out ), 0 );
        assert_eq!( out, [ 0.0; 4 ] );
        assert_eq!( buffer.len(), 4 );
    }


    #[test]
    fn test_pop_passthrough_keeps_frame_order() {
        let buffer = SampleBuffer::new( 16, 2, 2 );
        buffer.push( &[ 0.1, 0.2, 0.3, 0.4, 0.5, 0.6 ] );

        let mut out = [ 0.0; 4 ];
        assert_eq!( buffer.pop( &mut out ), 4 );
        assert_eq!( out, [ 0.1, 0.2, 0.3, 0.4 ] );

        let mut rest = [ 1.0; 4 ];
        assert_eq!( buffer.pop( &mut rest ), 2 );
        assert_eq!( rest, [ 0.5, 0.6, 0.0, 0.0 ] );
        assert!( buffer.is_empty() );
    }


    #[test]
    fn test_pop_drops_surplus_source_channels() {
        let buffer = SampleBuffer::new( 16, 3, 2 );
        buffer.push( &[ 0.1, 0.2, 0.9, 0.3, 0.4, 0.9 ] );

        let mut out = [ 0.0; 4 ];
        assert_eq!( buffer.pop( &mut out ), 4 );
        assert_eq!( out, [ 0.1, 0.2, 0.3, 0.4 ] );
        assert!( buffer.is_empty() );
    }
}
