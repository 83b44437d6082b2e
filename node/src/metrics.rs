//! # Prometheus Metrics
//!
//! Exposes operational metrics for the ordering/YAC core. Scraped by
//! Prometheus at the `/metrics` HTTP endpoint on the configured metrics
//! port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so
//! they do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (wraps `Arc` internally via prometheus handles) so it can
/// be shared across request handlers and background tasks.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Total synchronization events processed by the gate.
    pub sync_events_total: IntCounter,
    /// Total proposals served by the ordering service.
    pub proposals_served_total: IntCounter,
    /// Current block round (the committed side of `Round`).
    pub block_round: IntGauge,
    /// Current reject round within the current block round.
    pub reject_round: IntGauge,
    /// Number of ledger peers known from the most recent round switch.
    pub ledger_peer_count: IntGauge,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("nova".into()), None)
            .expect("failed to create prometheus registry");

        macro_rules! counter {
            ($name:literal, $help:literal) => {{
                let c = IntCounter::new($name, $help).expect("metric creation");
                registry
                    .register(Box::new(c.clone()))
                    .expect("metric registration");
                c
            }};
        }

        macro_rules! gauge {
            ($name:literal, $help:literal) => {{
                let g = IntGauge::new($name, $help).expect("metric creation");
                registry
                    .register(Box::new(g.clone()))
                    .expect("metric registration");
                g
            }};
        }

        Self {
            sync_events_total: counter!(
                "sync_events_total",
                "Total synchronization events processed by the gate"
            ),
            proposals_served_total: counter!(
                "proposals_served_total",
                "Total proposals served by the ordering service"
            ),
            block_round: gauge!("block_round", "Current block round"),
            reject_round: gauge!("reject_round", "Current reject round within the block round"),
            ledger_peer_count: gauge!(
                "ledger_peer_count",
                "Number of ledger peers known from the most recent round switch"
            ),
            registry,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

/// Shared metrics state passed to axum handlers via extension.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_encode_without_panicking() {
        let m = NodeMetrics::new();
        m.sync_events_total.inc();
        m.block_round.set(7);
        let text = m.encode().unwrap();
        assert!(text.contains("nova_sync_events_total"));
        assert!(text.contains("nova_block_round"));
    }
}
