//! Common utilities for integration tests

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use futures_util::{stream, StreamExt};
use gateway::{build_router, config::ServerConfig, state::AppState};
use llm_core::{FragmentStream, TextGenerator};
use tokio::sync::mpsc;
use tower::ServiceExt;
use tts_core::{AudioChunk, SpeechSynthesizer, Synthesis};

pub const SAMPLE_RATE: u32 = 24_000;

/// Synthesizer that replays fixed chunks.
pub struct FakeSynth {
    pub chunks: Vec<Vec<f32>>,
    pub failure: Option<String>,
}

impl FakeSynth {
    pub fn with_chunks(chunks: Vec<Vec<f32>>) -> Self {
        Self {
            chunks,
            failure: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            chunks: Vec::new(),
            failure: Some(message.to_string()),
        }
    }
}

impl SpeechSynthesizer for FakeSynth {
    fn voices(&self) -> Vec<String> {
        vec!["af_heart".to_string(), "bf_emma".to_string()]
    }

    fn default_voice(&self) -> &str {
        "af_heart"
    }

    fn synthesize(&self, _text: &str, _voice: &str) -> anyhow::Result<Synthesis<'_>> {
        if let Some(message) = &self.failure {
            anyhow::bail!("{}", message);
        }
        Ok(Synthesis {
            sample_rate: SAMPLE_RATE,
            chunks: Box::new(self.chunks.iter().cloned().map(|c| Ok(AudioChunk::new(c)))),
        })
    }
}

/// Generator that replays scripted fragments and counts how many were pulled.
#[derive(Clone, Default)]
pub struct FakeGenerator {
    pub fragments: Vec<Result<String, String>>,
    pub open_error: Option<String>,
    pub pulls: Arc<AtomicUsize>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl FakeGenerator {
    pub fn with_fragments(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| Ok(f.to_string())).collect(),
            ..Self::default()
        }
    }

    pub fn scripted(fragments: Vec<Result<String, String>>) -> Self {
        Self {
            fragments,
            ..Self::default()
        }
    }

    pub fn failing_on_open(message: &str) -> Self {
        Self {
            open_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate_stream(&self, prompt: &str) -> anyhow::Result<FragmentStream> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(message) = &self.open_error {
            anyhow::bail!("{}", message);
        }
        let pulls = self.pulls.clone();
        let stream = stream::iter(self.fragments.clone())
            .inspect(move |_| {
                pulls.fetch_add(1, Ordering::SeqCst);
            })
            .map(|item| item.map_err(|e| anyhow::anyhow!(e)));
        Ok(stream.boxed())
    }
}

/// Generator whose single stream is fed by the test through a channel.
pub struct ChannelGenerator {
    receiver: Mutex<Option<mpsc::UnboundedReceiver<anyhow::Result<String>>>>,
}

impl ChannelGenerator {
    pub fn new() -> (Self, mpsc::UnboundedSender<anyhow::Result<String>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let generator = Self {
            receiver: Mutex::new(Some(rx)),
        };
        (generator, tx)
    }
}

#[async_trait]
impl TextGenerator for ChannelGenerator {
    async fn generate_stream(&self, _prompt: &str) -> anyhow::Result<FragmentStream> {
        let rx = self
            .receiver
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| anyhow::anyhow!("stream already taken"))?;
        let stream = stream::unfold(rx, |mut rx| async move {
            let item = rx.recv().await?;
            Some((item, rx))
        });
        Ok(stream.boxed())
    }
}

pub fn test_state(synth: FakeSynth, generator: FakeGenerator) -> AppState {
    AppState::new(Arc::new(synth), Arc::new(generator), ServerConfig::default())
}

/// Create a test app instance
pub fn create_test_app(synth: FakeSynth, generator: FakeGenerator) -> Router {
    build_router(test_state(synth, generator))
}

pub fn default_app() -> Router {
    create_test_app(
        FakeSynth::with_chunks(vec![vec![0.25; 240], vec![-0.25; 120]]),
        FakeGenerator::with_fragments(&["Hello ", "world", "!"]),
    )
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
