use std::time::Instant;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::{stream, StreamExt};
use llm_core::BoundedRelay;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::metrics::{EndpointMetrics, MetricsResponse, SystemMetrics};
use crate::state::AppState;
use crate::validation::{
    json_body, validate_generate_request, validate_speech_text, GenerateRequest, SpeechRequest,
};

pub const X_TEXT_LENGTH: &str = "x-text-length";

fn record<T>(endpoint: &EndpointMetrics, started: Instant, result: &Result<T, ApiError>) {
    endpoint.record_request(started.elapsed().as_millis() as u64);
    if result.is_err() {
        endpoint.record_error();
    }
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_voices(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.synthesizer.voices())
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Json<MetricsResponse> {
    let system = SystemMetrics::collect(&state.metrics);
    Json(state.metrics.snapshot(system))
}

/// `POST /text-to-speech`: synthesize the whole text and return one WAV file.
pub async fn text_to_speech(
    State(state): State<AppState>,
    payload: Result<Json<SpeechRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let started = Instant::now();
    let result = synthesize(&state, payload).await;
    record(&state.metrics.text_to_speech, started, &result);
    result
}

async fn synthesize(
    state: &AppState,
    payload: Result<Json<SpeechRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let req = json_body(payload)?;
    let text = validate_speech_text(req.text.as_deref())?.to_string();

    let voice = match req.voice {
        Some(voice) if state.synthesizer.has_voice(&voice) => voice,
        Some(voice) => {
            return Err(ApiError::InvalidInput(format!(
                "Unknown voice '{}'. Use /voices to list.",
                voice
            )));
        }
        None => state.synthesizer.default_voice().to_string(),
    };

    info!("TTS request: {} chars, voice={}", text.chars().count(), voice);

    let synth = state.synthesizer.clone();
    let synthesis_started = Instant::now();
    let audio = tokio::task::spawn_blocking(move || {
        tts_core::synthesize_wav(synth.as_ref(), &text, &voice)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Task join error: {e}")))??;

    let synthesis_ms = synthesis_started.elapsed().as_millis() as u64;
    state
        .metrics
        .synthesis
        .record_synthesis(synthesis_ms, audio.sample_count);
    info!(
        "Synthesized {} ms of audio in {} ms ({} bytes)",
        audio.duration_ms(),
        synthesis_ms,
        audio.wav.len()
    );

    Ok(([(header::CONTENT_TYPE, "audio/wav")], audio.wav).into_response())
}

/// `POST /generate-response`: relay generated text live, cut at `max_length`.
pub async fn generate_response(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let started = Instant::now();
    let result = generate(&state, payload).await;
    record(&state.metrics.generate_response, started, &result);
    result
}

async fn generate(
    state: &AppState,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let params = validate_generate_request(json_body(payload)?)?;
    info!(
        "Generation request: {} chars, max_length={}",
        params.text.chars().count(),
        params.max_length
    );

    // Upstream failures before the first fragment still get a proper status.
    let open = async {
        let upstream = state
            .generator
            .generate_stream(&params.text)
            .await
            .map_err(ApiError::Upstream)?;
        let mut relay = BoundedRelay::new(upstream, params.max_length);
        let first = relay.next().await.transpose().map_err(ApiError::Upstream)?;
        Ok::<_, ApiError>((relay, first))
    };
    let (relay, first) = match tokio::time::timeout(state.config.llm_timeout(), open).await {
        Ok(opened) => opened?,
        Err(_) => {
            return Err(ApiError::Upstream(anyhow::anyhow!(
                "Generation timed out after {} seconds",
                state.config.llm_timeout().as_secs()
            )));
        }
    };

    let generation = state.metrics.generation.clone();
    generation.record_stream_start();
    if let Some(fragment) = &first {
        generation.record_fragment(fragment.chars().count());
    }

    let rest = stream::unfold(relay, move |mut relay| {
        let generation = generation.clone();
        async move {
            match relay.next().await {
                Some(Ok(fragment)) => {
                    generation.record_fragment(fragment.chars().count());
                    Some((Ok(fragment), relay))
                }
                Some(Err(e)) => {
                    warn!("Generation stream failed after {} chars: {:#}", relay.accumulated(), e);
                    generation.record_stream_error();
                    Some((Err(e), relay))
                }
                None => {
                    if relay.truncated() {
                        generation.record_truncation();
                    }
                    info!("Generation stream finished: {} chars", relay.accumulated());
                    None
                }
            }
        }
    });
    let body = stream::iter(first.map(Ok::<_, anyhow::Error>)).chain(rest);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(X_TEXT_LENGTH, params.max_length.to_string())
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(body))
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {e}")))
}
