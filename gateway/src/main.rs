use std::{net::SocketAddr, sync::Arc};

use gateway::{build_app, config::ServerConfig, state::AppState};
use llm_core::GeminiClient;
use tokio::net::TcpListener;
use tracing::info;
use tts_core::{PiperPipeline, SpeechSynthesizer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    async_main().await
}

async fn async_main() -> anyhow::Result<()> {
    info!("Starting speech/generation gateway...");

    let config = ServerConfig::from_env();
    info!(
        "Server configuration loaded: port={}, rate_limit={}/min, llm_timeout={}s",
        config.port, config.rate_limit_per_minute, config.llm_timeout_secs
    );

    // A missing API key stops startup here.
    let generator = Arc::new(GeminiClient::from_env()?);

    info!("Loading TTS voices from {}", config.voice_map_path.display());
    let synthesizer = Arc::new(PiperPipeline::from_mapfile(
        &config.voice_map_path,
        config.default_voice.clone(),
    )?);
    info!(
        "Loaded {} TTS voice(s), default '{}'",
        synthesizer.voices().len(),
        synthesizer.default_voice()
    );

    let state = AppState::new(synthesizer, generator, config.clone());
    let app = build_app(state)?;

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT.")
    })?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
