use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use serde::Deserialize;

use crate::error::ApiError;

/// Maximum text length for speech requests, in characters
pub const MAX_SPEECH_TEXT_LENGTH: usize = 10_000;
/// Output budget when a generation request does not set one
pub const DEFAULT_MAX_LENGTH: usize = 500;

const NO_TEXT: &str = "No text provided";

#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    pub text: Option<String>,
    pub voice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub text: Option<String>,
    pub max_length: Option<usize>,
}

/// Validated generation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateParams {
    pub text: String,
    pub max_length: usize,
}

/// Unwrap a JSON body. An oversized body is a 413 and any other rejection a
/// 400; a body that is not JSON at all counts as missing text.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::JsonDataError(e)) => Err(ApiError::InvalidInput(format!(
            "Invalid request body: {}",
            e.body_text()
        ))),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            Err(ApiError::BodyTooLarge)
        }
        Err(rejection) => {
            tracing::debug!("Rejected request body: {}", rejection.body_text());
            Err(ApiError::InvalidInput(NO_TEXT.to_string()))
        }
    }
}

/// Validate speech request text
pub fn validate_speech_text(text: Option<&str>) -> Result<&str, ApiError> {
    let text = match text {
        Some(text) if !text.is_empty() => text,
        _ => return Err(ApiError::InvalidInput(NO_TEXT.to_string())),
    };
    if text.chars().count() > MAX_SPEECH_TEXT_LENGTH {
        return Err(ApiError::TextTooLong);
    }
    Ok(text)
}

/// Validate generation request
pub fn validate_generate_request(req: GenerateRequest) -> Result<GenerateParams, ApiError> {
    let text = match req.text {
        Some(text) if !text.is_empty() => text,
        _ => return Err(ApiError::InvalidInput(NO_TEXT.to_string())),
    };
    Ok(GenerateParams {
        text,
        max_length: req.max_length.unwrap_or(DEFAULT_MAX_LENGTH),
    })
}
