//! Audio decoding via Symphonia
//!
//! Tracks are downloaded whole, so the decoder reads from memory.

use std::io::Cursor;

use symphonia::core::audio::{ Channels, SampleBuffer };
use symphonia::core::codecs::{ Decoder as SymphoniaDecoder, DecoderOptions, CODEC_TYPE_NULL };
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{ FormatOptions, FormatReader };
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;


/// Errors that can occur during decoding.
#[derive( Debug, Error )]
pub enum DecoderError {
    #[error( "Unsupported format" )]
    UnsupportedFormat,

    #[error( "No audio tracks found" )]
    NoAudioTrack,

    #[error( "Decoder creation failed: {0}" )]
    DecoderCreation( String ),

    #[error( "Decode error: {0}" )]
    Decode( String ),
}


/// Decoder for one in-memory track.
pub struct Decoder {
    format_reader: Box<dyn FormatReader>,
    decoder: Box<dyn SymphoniaDecoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
    sample_buf: Option<SampleBuffer<f32>>,
}


impl Decoder {
    /// Probes `bytes` and prepares the first audio track for decoding.
    ///
    /// `extension` is only a hint; the content decides the format.
    pub fn from_bytes( bytes: Vec<u8>, extension: Option<&str> ) -> Result<Self, DecoderError> {
        let mss = MediaSourceStream::new( Box::new( Cursor::new( bytes ) ), Default::default() );

        let mut hint = Hint::new();
        if let Some( ext ) = extension {
            hint.with_extension( ext );
        }

        let probed = symphonia::default::get_probe()
            .format( &hint, mss, &FormatOptions::default(), &MetadataOptions::default() )
            .map_err( |_| DecoderError::UnsupportedFormat )?;
        let format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find( |t| t.codec_params.codec != CODEC_TYPE_NULL )
            .ok_or( DecoderError::NoAudioTrack )?;

        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.unwrap_or( 44100 );
        let channels = channel_count( track.codec_params.channels );

        let decoder = symphonia::default::get_codecs()
            .make( &track.codec_params, &DecoderOptions::default() )
            .map_err( |e| DecoderError::DecoderCreation( e.to_string() ) )?;

        tracing::info!( "Opened audio: {} Hz, {} channels", sample_rate, channels );

        Ok( Self {
            format_reader,
            decoder,
            track_id,
            sample_rate,
            channels,
            sample_buf: None,
        })
    }


    pub fn sample_rate( &self ) -> u32 {
        self.sample_rate
    }


    pub fn channels( &self ) -> usize {
        self.channels
    }


    /// Decodes the next packet into interleaved f32 samples.
    ///
    /// Returns `None` at the end of the stream.
    pub fn decode_next( &mut self ) -> Result<Option<Vec<f32>>, DecoderError> {
        loop {
            let packet = match self.format_reader.next_packet() {
                Ok( packet ) => packet,
                Err( SymphoniaError::IoError( ref e ) )
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok( None );
                }
                Err( SymphoniaError::ResetRequired ) => return Ok( None ),
                Err( e ) => return Err( DecoderError::Decode( e.to_string() ) ),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode( &packet ) {
                Ok( decoded ) => decoded,
                // corrupt frame, skip it
                Err( SymphoniaError::DecodeError( _ ) ) => continue,
                Err( e ) => return Err( DecoderError::Decode( e.to_string() ) ),
            };

            let spec = *decoded.spec();
            let frames = decoded.capacity() as u64;

            let needed = decoded.capacity() * spec.channels.count();

            if self.sample_buf.as_ref().is_some_and( |b| b.capacity() < needed ) {
                self.sample_buf = None;
            }
            let sample_buf = self.sample_buf.get_or_insert_with( || SampleBuffer::new( frames, spec ) );
            sample_buf.copy_interleaved_ref( decoded );

            return Ok( Some( sample_buf.samples().to_vec() ) );
        }
    }
}


/// Channel count from codec parameters. A missing or empty channel mask
/// is treated as stereo.
fn channel_count( channels: Option<Channels> ) -> usize {
    match channels.map( |c| c.count() ) {
        Some( n ) if n > 0 => n,
        _ => 2,
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_channel_count_fallback() {
        assert_eq!( channel_count( None ), 2 );
        assert_eq!( channel_count( Some( Channels::empty() ) ), 2 );
        assert_eq!( channel_count( Some( Channels::FRONT_LEFT ) ), 1 );
        assert_eq!( channel_count( Some( Channels::FRONT_LEFT | Channels::FRONT_RIGHT ) ), 2 );
    }


    #[test]
    fn test_garbage_is_unsupported() {
        let result = Decoder::from_bytes( vec![ 0x42; 64 ], Some( "mp3" ) );
        assert!( matches!( result, Err( DecoderError::UnsupportedFormat ) ) );
    }
}
