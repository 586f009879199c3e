use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tts_core::SynthesisError;

/// API Error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Text too long (max 10,000 characters)")]
    TextTooLong,

    #[error("Request body too large")]
    BodyTooLarge,

    /// Failure raised by the synthesis pipeline or the generation service.
    /// The message reaches the client unchanged.
    #[error("{0:#}")]
    Upstream(anyhow::Error),

    #[error("No audio generated")]
    NoAudio,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::TextTooLong | ApiError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream(_) | ApiError::NoAudio | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<SynthesisError> for ApiError {
    fn from(err: SynthesisError) -> Self {
        match err {
            SynthesisError::NoAudio => ApiError::NoAudio,
            SynthesisError::Upstream(e) => ApiError::Upstream(e),
            SynthesisError::Encoding(msg) => ApiError::Internal(format!("WAV encoding error: {msg}")),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.to_string();

        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status.as_u16(), error);
        }

        let body = Json(ErrorResponse {
            error,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::InvalidInput("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::TextTooLong.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ApiError::BodyTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ApiError::NoAudio.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            ApiError::Upstream(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ApiError::TextTooLong.to_string(),
            "Text too long (max 10,000 characters)"
        );
        assert_eq!(ApiError::NoAudio.to_string(), "No audio generated");

        let upstream = anyhow::anyhow!("connection refused").context("Gemini request failed");
        assert_eq!(
            ApiError::Upstream(upstream).to_string(),
            "Gemini request failed: connection refused"
        );
    }

    #[test]
    fn test_from_synthesis_error() {
        assert!(matches!(ApiError::from(SynthesisError::NoAudio), ApiError::NoAudio));
        assert!(matches!(
            ApiError::from(SynthesisError::Upstream(anyhow::anyhow!("x"))),
            ApiError::Upstream(_)
        ));
        assert!(matches!(
            ApiError::from(SynthesisError::Encoding("disk".into())),
            ApiError::Internal(_)
        ));
    }
}
