//! Collects a synthesis run into a single sample buffer.

use tracing::debug;

use crate::{AudioChunk, SynthesisError};

/// Pull every chunk to completion and concatenate them in arrival order.
///
/// The first upstream error aborts assembly. A run that produced no chunks
/// at all is reported as [`SynthesisError::NoAudio`], never as an empty buffer.
pub fn assemble<I>(chunks: I) -> Result<Vec<f32>, SynthesisError>
where
    I: IntoIterator<Item = anyhow::Result<AudioChunk>>,
{
    let mut samples: Vec<f32> = Vec::new();
    let mut chunk_count = 0usize;

    for chunk in chunks {
        let chunk = chunk.map_err(SynthesisError::Upstream)?;
        samples.extend_from_slice(&chunk.samples);
        chunk_count += 1;
    }

    if chunk_count == 0 {
        return Err(SynthesisError::NoAudio);
    }

    debug!("Assembled {} chunks into {} samples", chunk_count, samples.len());
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(samples: &[f32]) -> anyhow::Result<AudioChunk> {
        Ok(AudioChunk::new(samples.to_vec()))
    }

    #[test]
    fn test_assemble_preserves_order_and_length() {
        let chunks = vec![ok(&[1.0, 2.0]), ok(&[3.0]), ok(&[4.0, 5.0, 6.0])];
        let samples = assemble(chunks).unwrap();
        assert_eq!(samples, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_assemble_empty_sequence_is_no_audio() {
        let result = assemble(Vec::<anyhow::Result<AudioChunk>>::new());
        assert!(matches!(result, Err(SynthesisError::NoAudio)));
    }

    #[test]
    fn test_assemble_keeps_zero_length_chunks() {
        // A chunk was produced, so this is not a "no audio" failure.
        let samples = assemble(vec![ok(&[])]).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_assemble_stops_at_first_error() {
        let mut pulled = 0;
        let chunks = (0..5).map(|i| {
            pulled += 1;
            if i == 1 {
                Err(anyhow::anyhow!("phonemizer crashed"))
            } else {
                Ok(AudioChunk::new(vec![i as f32]))
            }
        });
        let err = assemble(chunks).unwrap_err();
        assert_eq!(err.to_string(), "phonemizer crashed");
        assert_eq!(pulled, 2);
    }
}
