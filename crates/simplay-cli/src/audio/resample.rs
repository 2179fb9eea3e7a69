//! Sample rate conversion for devices that cannot run at the source rate.

use rubato::{ FastFixedOut, PolynomialDegree, Resampler as _ };


/// Output chunk size handed to rubato, in frames.
const CHUNK_FRAMES: usize = 1024;


/// Buffers interleaved input and emits interleaved resampled output.
pub struct Resampler {
    inner: FastFixedOut<f32>,
    pending: Vec<Vec<f32>>,
}


impl Resampler {
    pub fn new( from_rate: u32, to_rate: u32, channels: usize ) -> Result<Self, rubato::ResamplerConstructionError> {
        let channels = channels.max( 1 );
        let inner = FastFixedOut::<f32>::new(
            to_rate as f64 / from_rate as f64,
            2.0,
            PolynomialDegree::Cubic,
            CHUNK_FRAMES,
            channels,
        )?;

        Ok( Self {
            inner,
            pending: vec![ Vec::new(); channels ],
        })
    }


    /// Queues interleaved samples and returns whatever full chunks could be
    /// resampled.
    pub fn process( &mut self, interleaved: &[f32] ) -> Vec<f32> {
        let channels = self.pending.len();
        for frame in interleaved.chunks_exact( channels ) {
            for ( ch, sample ) in frame.iter().enumerate() {
                self.pending[ ch ].push( *sample );
            }
        }

        let mut out = Vec::new();
        while self.pending[ 0 ].len() >= self.inner.input_frames_next() {
            let needed = self.inner.input_frames_next();
            let chunk: Vec<Vec<f32>> = self.pending
                .iter_mut()
                .map( |ch| ch.drain( ..needed ).collect() )
                .collect();

            match self.inner.process( &chunk, None ) {
                Ok( resampled ) => interleave_into( &resampled, &mut out ),
                Err( e ) => {
                    tracing::error!( "Resample error: {}", e );
                    break;
                }
            }
        }
        out
    }


    /// Resamples whatever input is left at the end of the stream.
    pub fn flush( &mut self ) -> Vec<f32> {
        let mut out = Vec::new();
        if self.pending[ 0 ].is_empty() {
            return out;
        }

        match self.inner.process_partial( Some( self.pending.as_slice() ), None ) {
            Ok( resampled ) => interleave_into( &resampled, &mut out ),
            Err( e ) => tracing::error!( "Final resample error: {}", e ),
        }
        for ch in &mut self.pending {
            ch.clear();
        }
        out
    }
}


/// Appends planar channels to `out` as interleaved frames.
fn interleave_into( channels: &[Vec<f32>], out: &mut Vec<f32> ) {
    let Some( frames ) = channels.first().map( Vec::len ) else {
        return;
    };

    out.reserve( frames * channels.len() );
    for f in 0..frames {
        for ch in channels {
            out.push( ch[ f ] );
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_interleave() {
        let mut out = vec![ 9.0 ];
        interleave_into( &[ vec![ 1.0, 2.0 ], vec![ 3.0, 4.0 ] ], &mut out );
        assert_eq!( out, vec![ 9.0, 1.0, 3.0, 2.0, 4.0 ] );
    }


    #[test]
    fn test_upsampling_produces_more_frames() {
        let mut resampler = Resampler::new( 22050, 44100, 2 ).unwrap();
        let input = vec![ 0.0_f32; 2 * 4096 ];

        let mut out = resampler.process( &input );
        out.extend( resampler.flush() );

        assert_eq!( out.len() % 2, 0 );
        assert!( out.len() > input.len() );
    }


    #[test]
    fn test_zero_channels_does_not_panic() {
        let mut resampler = Resampler::new( 22050, 44100, 0 ).unwrap();
        let mut out = resampler.process( &[ 0.0; 16 ] );
        out.extend( resampler.flush() );
        assert!( !out.is_empty() );
    }
}
