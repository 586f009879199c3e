// Configuration for the server

use std::{path::PathBuf, time::Duration};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub rate_limit_per_minute: u32,
    pub request_timeout_secs: u64,
    pub llm_timeout_secs: u64,
    pub voice_map_path: PathBuf,
    pub default_voice: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5050,
            rate_limit_per_minute: 60,
            request_timeout_secs: 120,
            llm_timeout_secs: 60,
            voice_map_path: PathBuf::from("models/map.json"),
            default_voice: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env_parse("PORT").unwrap_or(defaults.port);
        let rate_limit_per_minute =
            env_parse("RATE_LIMIT_PER_MINUTE").unwrap_or(defaults.rate_limit_per_minute);
        let request_timeout_secs =
            env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(defaults.request_timeout_secs);
        let llm_timeout_secs = env_parse("LLM_TIMEOUT_SECS").unwrap_or(defaults.llm_timeout_secs);

        let voice_map_path = std::env::var("TTS_VOICE_MAP")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.voice_map_path);

        let default_voice = std::env::var("TTS_VOICE")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Self {
            port,
            rate_limit_per_minute,
            request_timeout_secs,
            llm_timeout_secs,
            voice_map_path,
            default_voice,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Bound on opening a generation stream, i.e. until the first fragment.
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}
