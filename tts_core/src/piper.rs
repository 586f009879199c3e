//! Piper-backed synthesis pipeline.
//!
//! Voices come from a JSON map of voice id -> model config path, either as a
//! bare string or as `{ "config": "..." }`. Models are loaded on first use
//! and kept for the life of the pipeline.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use anyhow::Context;
use dashmap::{mapref::entry::Entry, DashMap};
use piper_rs::synth::{PiperSpeechStreamParallel, PiperSpeechSynthesizer};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{AudioChunk, SpeechSynthesizer, Synthesis, DEFAULT_SAMPLE_RATE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceEntry {
    pub config: PathBuf,
}

#[derive(Clone)]
struct CachedSynth {
    synth: Arc<RwLock<PiperSpeechSynthesizer>>,
    sample_rate: u32,
}

pub struct PiperPipeline {
    voices: BTreeMap<String, VoiceEntry>,
    default_voice: String,
    // config path -> loaded synthesizer
    cache: DashMap<PathBuf, CachedSynth>,
}

impl std::fmt::Debug for PiperPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PiperPipeline")
            .field("voices", &self.voices)
            .field("default_voice", &self.default_voice)
            .field("loaded", &self.cache.len())
            .finish()
    }
}

impl PiperPipeline {
    /// Create from a prebuilt voice map.
    ///
    /// `default_voice` falls back to the first voice id in sorted order.
    pub fn new(
        voices: BTreeMap<String, VoiceEntry>,
        default_voice: Option<String>,
    ) -> anyhow::Result<Self> {
        let default_voice = match default_voice {
            Some(voice) if voices.contains_key(&voice) => voice,
            Some(voice) => {
                anyhow::bail!(
                    "default voice '{}' is not in the voice map. Available voices: {}",
                    voice,
                    voices.keys().cloned().collect::<Vec<_>>().join(", ")
                );
            }
            None => voices
                .keys()
                .next()
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("voice map is empty"))?,
        };

        Ok(Self {
            voices,
            default_voice,
            cache: DashMap::new(),
        })
    }

    /// Load the voice map from a JSON file. Relative config paths resolve
    /// against the map file's directory.
    pub fn from_mapfile<P: AsRef<Path>>(
        path: P,
        default_voice: Option<String>,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let voices = parse_voice_map(&text, base)?;
        info!("Loaded {} voice(s) from {}", voices.len(), path.display());
        Self::new(voices, default_voice)
    }

    fn entry(&self, voice: &str) -> anyhow::Result<&VoiceEntry> {
        self.voices.get(voice).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown voice '{}'. Available voices: {}",
                voice,
                self.voices.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })
    }

    /// Get or load the synthesizer for a model config.
    fn synth_for(&self, cfg_path: &Path) -> anyhow::Result<(Arc<RwLock<PiperSpeechSynthesizer>>, u32)> {
        let cached = load_once(&self.cache, cfg_path, || {
            let sample_rate = read_sample_rate(cfg_path)?;
            let model = piper_rs::from_config_path(cfg_path)
                .map_err(|e| anyhow::anyhow!("piper load error: {e}"))?;
            let synth = Arc::new(RwLock::new(PiperSpeechSynthesizer::new(model)?));
            info!("Loaded piper model {} ({} Hz)", cfg_path.display(), sample_rate);
            Ok(CachedSynth { synth, sample_rate })
        })?;
        Ok((cached.synth, cached.sample_rate))
    }
}

/// Return the cached value for `key`, running `load` on a miss.
///
/// The shard stays locked while `load` runs, so concurrent first requests
/// for the same key load it once. A failed load leaves nothing cached.
fn load_once<V, F>(cache: &DashMap<PathBuf, V>, key: &Path, load: F) -> anyhow::Result<V>
where
    V: Clone,
    F: FnOnce() -> anyhow::Result<V>,
{
    if let Some(cached) = cache.get(key) {
        return Ok(cached.value().clone());
    }
    match cache.entry(key.to_path_buf()) {
        Entry::Occupied(entry) => Ok(entry.get().clone()),
        Entry::Vacant(entry) => {
            let value = load()?;
            entry.insert(value.clone());
            Ok(value)
        }
    }
}

impl SpeechSynthesizer for PiperPipeline {
    fn voices(&self) -> Vec<String> {
        self.voices.keys().cloned().collect()
    }

    fn default_voice(&self) -> &str {
        &self.default_voice
    }

    fn synthesize(&self, text: &str, voice: &str) -> anyhow::Result<Synthesis<'_>> {
        let entry = self.entry(voice)?;
        let (synth, sample_rate) = self.synth_for(&entry.config)?;

        let stream: PiperSpeechStreamParallel = {
            let synth = synth.read().map_err(|_| {
                anyhow::anyhow!("Synthesizer lock poisoned - this indicates a previous panic. Please restart the server.")
            })?;
            synth
                .synthesize_parallel(text.to_string(), None)
                .map_err(|e| anyhow::anyhow!("piper synth error: {e}"))?
        };

        let chunks = stream.map(|part| {
            part.map(|samples| AudioChunk::new(samples.into_vec()))
                .map_err(|e| anyhow::anyhow!("chunk error: {e}"))
        });

        Ok(Synthesis {
            sample_rate,
            chunks: Box::new(chunks),
        })
    }
}

/// Parse a voice map document.
pub(crate) fn parse_voice_map(text: &str, base: &Path) -> anyhow::Result<BTreeMap<String, VoiceEntry>> {
    let json: serde_json::Value =
        serde_json::from_str(text).with_context(|| "voice map is not valid JSON")?;
    let obj = json
        .as_object()
        .ok_or_else(|| anyhow::anyhow!("voice map must be a JSON object"))?;

    let mut voices = BTreeMap::new();
    for (voice, v) in obj {
        let config = match v {
            serde_json::Value::String(path) => path.as_str(),
            serde_json::Value::Object(o) => o
                .get("config")
                .and_then(|x| x.as_str())
                .ok_or_else(|| anyhow::anyhow!("missing 'config' for voice {}", voice))?,
            _ => {
                anyhow::bail!(
                    "invalid entry for voice {} (expected string or object)",
                    voice
                );
            }
        };

        let config = Path::new(config);
        let config = if config.is_absolute() {
            config.to_path_buf()
        } else {
            base.join(config)
        };
        voices.insert(voice.clone(), VoiceEntry { config });
    }
    Ok(voices)
}

/// Read `audio.sample_rate` from a piper model config.
fn read_sample_rate(cfg_path: &Path) -> anyhow::Result<u32> {
    let text = fs::read_to_string(cfg_path)
        .with_context(|| format!("Failed to read config file: {}", cfg_path.display()))?;
    Ok(sample_rate_from_config(&text, cfg_path))
}

fn sample_rate_from_config(text: &str, cfg_path: &Path) -> u32 {
    let rate = serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|json| json.get("audio")?.get("sample_rate")?.as_u64())
        .and_then(|sr| u32::try_from(sr).ok());

    match rate {
        Some(rate) => rate,
        None => {
            warn!(
                "No audio.sample_rate in {}, using {} Hz",
                cfg_path.display(),
                DEFAULT_SAMPLE_RATE
            );
            DEFAULT_SAMPLE_RATE
        }
    }
}
