use std::io::Cursor;

use crate::SynthesisError;

/// Encode mono f32 samples as a complete 16-bit PCM WAV file.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, SynthesisError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    // WAV header (44 bytes) + 2 bytes per sample
    let mut cursor = Cursor::new(Vec::<u8>::with_capacity(44 + samples.len() * 2));

    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| SynthesisError::Encoding(e.to_string()))?;

        const I16_MAX_F32: f32 = i16::MAX as f32;

        for &s in samples {
            let v = (s.clamp(-1.0, 1.0) * I16_MAX_F32) as i16;
            writer
                .write_sample(v)
                .map_err(|e| SynthesisError::Encoding(e.to_string()))?;
        }

        writer
            .finalize()
            .map_err(|e| SynthesisError::Encoding(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
