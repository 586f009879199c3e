mod assembly;
mod piper;
mod wav;

pub use assembly::assemble;
pub use piper::{PiperPipeline, VoiceEntry};
pub use wav::encode_wav;

use thiserror::Error;

/// Output rate used when a voice config does not state one.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// One incremental block of mono samples from the synthesis pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl From<Vec<f32>> for AudioChunk {
    fn from(samples: Vec<f32>) -> Self {
        Self { samples }
    }
}

/// Lazy chunk sequence for one utterance.
pub type AudioChunks<'a> = Box<dyn Iterator<Item = anyhow::Result<AudioChunk>> + 'a>;

/// A started synthesis: the rate every chunk is sampled at, plus the chunks.
pub struct Synthesis<'a> {
    pub sample_rate: u32,
    pub chunks: AudioChunks<'a>,
}

/// Boundary to the speech synthesis pipeline.
///
/// Implementations are constructed once at startup and shared read-only
/// across requests. `synthesize` is blocking; callers on an async runtime
/// should run it on a blocking thread.
pub trait SpeechSynthesizer: Send + Sync {
    /// Voice ids this pipeline can synthesize with, sorted.
    fn voices(&self) -> Vec<String>;

    /// Voice used when a request names none.
    fn default_voice(&self) -> &str;

    /// Start synthesizing `text` with `voice`. Chunks are produced lazily.
    fn synthesize(&self, text: &str, voice: &str) -> anyhow::Result<Synthesis<'_>>;

    fn has_voice(&self, voice: &str) -> bool {
        self.voices().iter().any(|v| v == voice)
    }
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("No audio generated")]
    NoAudio,

    #[error("{0:#}")]
    Upstream(anyhow::Error),

    #[error("WAV encoding error: {0}")]
    Encoding(String),
}

/// Encoded result of one synthesis request.
#[derive(Debug, Clone)]
pub struct SpeechAudio {
    pub wav: Vec<u8>,
    pub sample_rate: u32,
    pub sample_count: usize,
}

impl SpeechAudio {
    pub fn duration_ms(&self) -> u64 {
        (self.sample_count as f64 / self.sample_rate as f64 * 1000.0) as u64
    }
}

/// Run the pipeline to completion and encode the result as one WAV payload.
pub fn synthesize_wav(
    synth: &dyn SpeechSynthesizer,
    text: &str,
    voice: &str,
) -> Result<SpeechAudio, SynthesisError> {
    let Synthesis {
        sample_rate,
        chunks,
    } = synth.synthesize(text, voice).map_err(SynthesisError::Upstream)?;

    let samples = assemble(chunks)?;
    let wav = encode_wav(&samples, sample_rate)?;

    Ok(SpeechAudio {
        wav,
        sample_rate,
        sample_count: samples.len(),
    })
}
