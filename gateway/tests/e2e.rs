//! End-to-end tests: the full service stack with the real Gemini client
//! talking to a local SSE server.
//! Run with: cargo test --test e2e

mod common;

use std::sync::Arc;

use axum::{http::StatusCode, response::IntoResponse, routing::post, Router};
use gateway::{build_app, config::ServerConfig, state::AppState};
use llm_core::{GeminiClient, GeminiConfig};
use serde_json::json;
use tokio::net::TcpListener;

use common::*;

fn sse_body(texts: &[&str]) -> String {
    texts
        .iter()
        .map(|text| {
            let chunk = json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] });
            format!("data: {chunk}\n\n")
        })
        .collect()
}

async fn spawn_gemini(status: StatusCode, body: String) -> String {
    let app = Router::new().route(
        "/v1beta/models/{call}",
        post(move || {
            let body = body.clone();
            async move { (status, [("content-type", "text/event-stream")], body).into_response() }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/v1beta")
}

async fn gateway_against(status: StatusCode, fragments: &[&str]) -> Router {
    let base_url = spawn_gemini(status, sse_body(fragments)).await;
    let mut gemini = GeminiConfig::new("e2e-key");
    gemini.base_url = base_url;

    let state = AppState::new(
        Arc::new(FakeSynth::with_chunks(vec![vec![0.1; 480]])),
        Arc::new(GeminiClient::new(gemini).unwrap()),
        ServerConfig::default(),
    );
    build_app(state).unwrap()
}

#[tokio::test]
async fn test_generation_pipeline_truncates_live_stream() {
    let app = gateway_against(StatusCode::OK, &["The quick ", "brown fox ", "jumps"]).await;

    let response = send(
        app,
        post_json("/generate-response", json!({ "text": "Tell a story", "max_length": 15 })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-text-length"], "15");
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(body_bytes(response).await, b"The quick brown");
}

#[tokio::test]
async fn test_generation_pipeline_relays_full_short_answer() {
    let app = gateway_against(StatusCode::OK, &["Yes", "."]).await;

    let response = send(app, post_json("/api/generate-response", json!({ "text": "Ok?" }))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"Yes.");
}

#[tokio::test]
async fn test_generation_pipeline_upstream_rejection() {
    let app = gateway_against(StatusCode::FORBIDDEN, &[]).await;

    let response = send(app, post_json("/generate-response", json!({ "text": "hi" }))).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = body_json(response).await;
    assert!(error["error"]
        .as_str()
        .unwrap()
        .starts_with("Gemini API error 403"));
}

#[tokio::test]
async fn test_speech_pipeline_through_full_stack() {
    let app = gateway_against(StatusCode::OK, &[]).await;

    let response = send(app, post_json("/text-to-speech", json!({ "text": "Guten Tag" }))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "audio/wav");
    let wav = body_bytes(response).await;
    let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
    assert_eq!(reader.duration(), 480);
}
