use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::ServiceConfig;

const SNAPSHOT_TIMEOUT_SECS: u64 = 3;

/// Point-in-time reading of a service, as consumed by the detectors.
/// An unreachable service still yields a snapshot with `reachable = false`
/// so the health-check detector sees it like any other input.
#[derive(Debug, Clone)]
pub struct ServiceSnapshot {
    pub service: String,
    pub observed_at: DateTime<Utc>,
    pub reachable: bool,
    pub http_status: Option<u16>,
    pub failure_reason: Option<String>,
    pub cpu_percent: f64,
    pub memory_mb: u64,
    pub error_rate: f64,
    pub requests: u64,
    pub errors: u64,
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
}

impl ServiceSnapshot {
    pub fn unreachable(service: &str, reason: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            service: service.to_string(),
            observed_at: now,
            reachable: false,
            http_status: None,
            failure_reason: Some(reason.into()),
            cpu_percent: 0.0,
            memory_mb: 0,
            error_rate: 0.0,
            requests: 0,
            errors: 0,
            p50_ms: None,
            p95_ms: None,
            p99_ms: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn healthy(service: &str, now: DateTime<Utc>) -> Self {
        Self {
            service: service.to_string(),
            observed_at: now,
            reachable: true,
            http_status: Some(200),
            failure_reason: None,
            cpu_percent: 20.0,
            memory_mb: 128,
            error_rate: 0.0,
            requests: 100,
            errors: 0,
            p50_ms: Some(40),
            p95_ms: Some(90),
            p99_ms: Some(120),
        }
    }
}

/// Wire shape of the health endpoint payload.
#[derive(Debug, Deserialize)]
struct HealthPayload {
    #[serde(default)]
    metrics: HealthMetrics,
}

#[derive(Debug, Default, Deserialize)]
struct HealthMetrics {
    #[serde(default)]
    cpu_usage_percent: f64,
    #[serde(default)]
    memory_usage_mb: u64,
    #[serde(default)]
    error_rate: f64,
    #[serde(default)]
    total_requests: u64,
    #[serde(default)]
    total_errors: u64,
    #[serde(default)]
    response_time_p50_ms: Option<u64>,
    #[serde(default)]
    response_time_p95_ms: Option<u64>,
    #[serde(default)]
    response_time_p99_ms: Option<u64>,
}

pub trait MetricsProvider {
    async fn get_snapshot(&self, service: &ServiceConfig, now: DateTime<Utc>) -> ServiceSnapshot;
}

pub enum ActiveMetricsProvider {
    Http(HttpMetricsProvider),
    Simulated(SimulatedMetricsProvider),
    #[cfg(test)]
    Mock(MockMetricsProvider),
}

impl ActiveMetricsProvider {
    pub fn new(simulation_enabled: bool) -> Self {
        if simulation_enabled {
            Self::Simulated(SimulatedMetricsProvider::new())
        } else {
            Self::Http(HttpMetricsProvider::new())
        }
    }
}

impl MetricsProvider for ActiveMetricsProvider {
    async fn get_snapshot(&self, service: &ServiceConfig, now: DateTime<Utc>) -> ServiceSnapshot {
        match self {
            ActiveMetricsProvider::Http(provider) => provider.get_snapshot(service, now).await,
            ActiveMetricsProvider::Simulated(provider) => provider.get_snapshot(service, now).await,
            #[cfg(test)]
            ActiveMetricsProvider::Mock(provider) => provider.get_snapshot(service, now).await,
        }
    }
}

pub struct HttpMetricsProvider {
    client: reqwest::Client,
}

impl HttpMetricsProvider {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(SNAPSHOT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

impl MetricsProvider for HttpMetricsProvider {
    async fn get_snapshot(&self, service: &ServiceConfig, now: DateTime<Utc>) -> ServiceSnapshot {
        let response = match self.client.get(&service.metrics_url).send().await {
            Ok(response) => response,
            Err(error) => {
                let reason = if error.is_timeout() {
                    "timeout".to_string()
                } else if error.is_connect() {
                    "connection_refused".to_string()
                } else {
                    error.to_string()
                };
                return ServiceSnapshot::unreachable(&service.name, reason, now);
            }
        };

        let status = response.status().as_u16();
        if status >= 500 {
            let mut snapshot =
                ServiceSnapshot::unreachable(&service.name, format!("http_{}", status), now);
            snapshot.http_status = Some(status);
            return snapshot;
        }

        let payload: HealthPayload = match response.json().await {
            Ok(payload) => payload,
            Err(error) => {
                return ServiceSnapshot::unreachable(
                    &service.name,
                    format!("invalid_payload: {}", error),
                    now,
                );
            }
        };

        let metrics = payload.metrics;
        ServiceSnapshot {
            service: service.name.clone(),
            observed_at: now,
            reachable: true,
            http_status: Some(status),
            failure_reason: None,
            cpu_percent: metrics.cpu_usage_percent,
            memory_mb: metrics.memory_usage_mb,
            error_rate: metrics.error_rate,
            requests: metrics.total_requests,
            errors: metrics.total_errors,
            p50_ms: metrics.response_time_p50_ms,
            p95_ms: metrics.response_time_p95_ms,
            p99_ms: metrics.response_time_p99_ms,
        }
    }
}

/// Synthesizes per-service metrics with periodic fault injection so the full
/// loop can run without any real services behind it.
pub struct SimulatedMetricsProvider {
    tick: AtomicU64,
}

impl SimulatedMetricsProvider {
    pub fn new() -> Self {
        Self {
            tick: AtomicU64::new(0),
        }
    }
}

impl MetricsProvider for SimulatedMetricsProvider {
    async fn get_snapshot(&self, service: &ServiceConfig, now: DateTime<Utc>) -> ServiceSnapshot {
        let tick = self.tick.fetch_add(1, Ordering::Relaxed) + 1;
        let phase = tick as f64 / 8.0;

        let mut cpu = 45.0 + phase.sin() * 20.0;
        let mut error_rate = (0.02 + (phase * 0.5).sin().abs() * 0.05).clamp(0.0, 1.0);
        let mut p95 = 120 + ((phase * 0.7).sin().abs() * 80.0) as u64;

        if tick.is_multiple_of(30) {
            cpu = 95.0;
        }
        if tick.is_multiple_of(47) {
            error_rate = 0.5;
        }
        if tick.is_multiple_of(83) {
            p95 = 1500;
        }
        if tick.is_multiple_of(113) {
            return ServiceSnapshot::unreachable(&service.name, "simulated_outage", now);
        }

        let requests = 100 + tick % 50;
        ServiceSnapshot {
            service: service.name.clone(),
            observed_at: now,
            reachable: true,
            http_status: Some(200),
            failure_reason: None,
            cpu_percent: cpu.clamp(0.0, 100.0),
            memory_mb: 256 + (tick % 64),
            error_rate,
            requests,
            errors: (requests as f64 * error_rate) as u64,
            p50_ms: Some(p95 / 3),
            p95_ms: Some(p95),
            p99_ms: Some(p95 * 2),
        }
    }
}

#[cfg(test)]
pub(crate) struct MockMetricsProvider {
    sequence: std::sync::Mutex<Vec<ServiceSnapshot>>,
}

#[cfg(test)]
impl MockMetricsProvider {
    pub(crate) fn new(sequence: Vec<ServiceSnapshot>) -> Self {
        Self {
            sequence: std::sync::Mutex::new(sequence),
        }
    }
}

#[cfg(test)]
impl MetricsProvider for MockMetricsProvider {
    async fn get_snapshot(&self, service: &ServiceConfig, now: DateTime<Utc>) -> ServiceSnapshot {
        let mut sequence = self.sequence.lock().expect("mock sequence lock");
        if sequence.is_empty() {
            return ServiceSnapshot::unreachable(&service.name, "mock_exhausted", now);
        }
        sequence.remove(0)
    }
}
