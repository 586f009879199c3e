pub mod gemini;
pub mod relay;
mod sse;

pub use gemini::{GeminiClient, GeminiConfig};
pub use relay::BoundedRelay;

use async_trait::async_trait;
use futures::stream::BoxStream;

/// Generated text arriving one fragment at a time.
pub type FragmentStream = BoxStream<'static, anyhow::Result<String>>;

/// Boundary to a streaming text generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Open a generation stream for a single user prompt.
    ///
    /// Errors returned here happen before any fragment exists; errors
    /// yielded by the stream happen while it is being consumed.
    async fn generate_stream(&self, prompt: &str) -> anyhow::Result<FragmentStream>;
}
