// Metrics collection and tracking

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Latency samples kept per endpoint for percentiles
const MAX_LATENCY_SAMPLES: usize = 1000;

/// Per-endpoint metrics
#[derive(Debug, Clone)]
pub struct EndpointMetrics {
    pub request_count: Arc<AtomicU64>,
    pub error_count: Arc<AtomicU64>,
    pub total_latency_ms: Arc<AtomicU64>,
    pub min_latency_ms: Arc<AtomicU64>,
    pub max_latency_ms: Arc<AtomicU64>,
    pub latency_samples: Arc<std::sync::Mutex<Vec<u64>>>,
}

impl EndpointMetrics {
    pub fn new() -> Self {
        Self {
            request_count: Arc::new(AtomicU64::new(0)),
            error_count: Arc::new(AtomicU64::new(0)),
            total_latency_ms: Arc::new(AtomicU64::new(0)),
            min_latency_ms: Arc::new(AtomicU64::new(u64::MAX)),
            max_latency_ms: Arc::new(AtomicU64::new(0)),
            latency_samples: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn record_request(&self, latency_ms: u64) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.min_latency_ms.fetch_min(latency_ms, Ordering::Relaxed);
        self.max_latency_ms.fetch_max(latency_ms, Ordering::Relaxed);

        if let Ok(mut samples) = self.latency_samples.lock() {
            samples.push(latency_ms);
            if samples.len() > MAX_LATENCY_SAMPLES {
                samples.remove(0);
            }
        }
    }

    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn avg_latency_ms(&self) -> f64 {
        let count = self.request_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        total as f64 / count as f64
    }

    fn percentile(&self, p: u8) -> u64 {
        if let Ok(samples) = self.latency_samples.lock() {
            if samples.is_empty() {
                return 0;
            }
            let mut sorted = samples.clone();
            sorted.sort_unstable();
            let index = (sorted.len() * p as usize / 100).min(sorted.len() - 1);
            sorted[index]
        } else {
            0
        }
    }

    pub fn stats(&self) -> EndpointStats {
        let min = self.min_latency_ms.load(Ordering::Relaxed);
        EndpointStats {
            request_count: self.request_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            avg_latency_ms: self.avg_latency_ms(),
            min_latency_ms: if min == u64::MAX { 0 } else { min },
            max_latency_ms: self.max_latency_ms.load(Ordering::Relaxed),
            p50_latency_ms: self.percentile(50),
            p95_latency_ms: self.percentile(95),
            p99_latency_ms: self.percentile(99),
        }
    }
}

impl Default for EndpointMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Speech synthesis metrics
#[derive(Debug, Clone, Default)]
pub struct SynthesisMetrics {
    pub synthesis_count: Arc<AtomicU64>,
    pub total_synthesis_time_ms: Arc<AtomicU64>,
    pub total_samples: Arc<AtomicU64>,
}

impl SynthesisMetrics {
    pub fn record_synthesis(&self, time_ms: u64, samples: usize) {
        self.synthesis_count.fetch_add(1, Ordering::Relaxed);
        self.total_synthesis_time_ms.fetch_add(time_ms, Ordering::Relaxed);
        self.total_samples.fetch_add(samples as u64, Ordering::Relaxed);
    }

    pub fn avg_synthesis_time_ms(&self) -> f64 {
        let count = self.synthesis_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let total = self.total_synthesis_time_ms.load(Ordering::Relaxed);
        total as f64 / count as f64
    }
}

/// Text generation stream metrics
#[derive(Debug, Clone, Default)]
pub struct GenerationMetrics {
    pub streams_started: Arc<AtomicU64>,
    pub streams_truncated: Arc<AtomicU64>,
    pub stream_errors: Arc<AtomicU64>,
    pub characters_emitted: Arc<AtomicU64>,
}

impl GenerationMetrics {
    pub fn record_stream_start(&self) {
        self.streams_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fragment(&self, chars: usize) {
        self.characters_emitted.fetch_add(chars as u64, Ordering::Relaxed);
    }

    pub fn record_truncation(&self) {
        self.streams_truncated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stream_error(&self) {
        self.stream_errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Comprehensive metrics structure
#[derive(Debug, Clone)]
pub struct AppMetrics {
    pub started_at: Instant,
    pub text_to_speech: EndpointMetrics,
    pub generate_response: EndpointMetrics,
    pub synthesis: SynthesisMetrics,
    pub generation: GenerationMetrics,
}

impl AppMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            text_to_speech: EndpointMetrics::new(),
            generate_response: EndpointMetrics::new(),
            synthesis: SynthesisMetrics::default(),
            generation: GenerationMetrics::default(),
        }
    }

    pub fn request_count(&self) -> u64 {
        self.text_to_speech.request_count.load(Ordering::Relaxed)
            + self.generate_response.request_count.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn snapshot(&self, system: SystemMetrics) -> MetricsResponse {
        let load = |counter: &Arc<AtomicU64>| counter.load(Ordering::Relaxed);
        MetricsResponse {
            timestamp: Utc::now(),
            system,
            endpoints: EndpointMetricsResponse {
                text_to_speech: self.text_to_speech.stats(),
                generate_response: self.generate_response.stats(),
            },
            synthesis: SynthesisMetricsResponse {
                synthesis_count: load(&self.synthesis.synthesis_count),
                avg_synthesis_time_ms: self.synthesis.avg_synthesis_time_ms(),
                total_samples: load(&self.synthesis.total_samples),
            },
            generation: GenerationMetricsResponse {
                streams_started: load(&self.generation.streams_started),
                streams_truncated: load(&self.generation.streams_truncated),
                stream_errors: load(&self.generation.stream_errors),
                characters_emitted: load(&self.generation.characters_emitted),
            },
        }
    }
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
pub struct MetricsResponse {
    pub timestamp: DateTime<Utc>,
    pub system: SystemMetrics,
    pub endpoints: EndpointMetricsResponse,
    pub synthesis: SynthesisMetricsResponse,
    pub generation: GenerationMetricsResponse,
}

#[derive(Serialize)]
pub struct SystemMetrics {
    pub cpu_usage_percent: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub memory_usage_percent: f32,
    pub request_count: u64,
    pub uptime_seconds: u64,
    pub system_load: Option<f64>,
}

impl SystemMetrics {
    /// Sample host CPU and memory.
    pub fn collect(metrics: &AppMetrics) -> Self {
        let mut system = sysinfo::System::new();
        system.refresh_cpu();
        system.refresh_memory();

        let cpu_usage = system.global_cpu_info().cpu_usage();
        let memory_used = system.used_memory();
        let memory_total = system.total_memory();
        let memory_usage_percent = if memory_total > 0 {
            (memory_used as f64 / memory_total as f64 * 100.0) as f32
        } else {
            0.0
        };

        let load = sysinfo::System::load_average().one;

        Self {
            cpu_usage_percent: cpu_usage,
            memory_used_mb: memory_used / 1024 / 1024,
            memory_total_mb: memory_total / 1024 / 1024,
            memory_usage_percent,
            request_count: metrics.request_count(),
            uptime_seconds: metrics.uptime_seconds(),
            system_load: if cfg!(unix) { Some(load) } else { None },
        }
    }
}

#[derive(Serialize)]
pub struct EndpointMetricsResponse {
    pub text_to_speech: EndpointStats,
    pub generate_response: EndpointStats,
}

#[derive(Debug, Serialize)]
pub struct EndpointStats {
    pub request_count: u64,
    pub error_count: u64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub p50_latency_ms: u64,
    pub p95_latency_ms: u64,
    pub p99_latency_ms: u64,
}

#[derive(Serialize)]
pub struct SynthesisMetricsResponse {
    pub synthesis_count: u64,
    pub avg_synthesis_time_ms: f64,
    pub total_samples: u64,
}

#[derive(Serialize)]
pub struct GenerationMetricsResponse {
    pub streams_started: u64,
    pub streams_truncated: u64,
    pub stream_errors: u64,
    pub characters_emitted: u64,
}
