use std::sync::Arc;

use llm_core::TextGenerator;
use tts_core::SpeechSynthesizer;

use crate::config::ServerConfig;
use crate::metrics::AppMetrics;

/// Shared application state. The synthesizer and generator are built once
/// at startup and only read afterwards.
#[derive(Clone)]
pub struct AppState {
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub generator: Arc<dyn TextGenerator>,
    pub metrics: AppMetrics,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        generator: Arc<dyn TextGenerator>,
        config: ServerConfig,
    ) -> Self {
        Self {
            synthesizer,
            generator,
            metrics: AppMetrics::new(),
            config,
        }
    }
}
