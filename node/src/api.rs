//! # Status API
//!
//! Builds the axum router that exposes the validator node's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path         | Description                                |
//! |--------|--------------|---------------------------------------------|
//! | GET    | `/health`    | Liveness probe                              |
//! | GET    | `/status`    | Node status summary (round, gate state)     |
//! | GET    | `/peers`     | Current role→peer bindings, if resolved     |
//! | GET    | `/ws`        | WebSocket stream of round/proposal events   |

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use nova_protocol::ordering::{ConnectionManager, Gate, GateState, Role};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Whether this node was started with `--dev`.
    pub dev_mode: bool,
    /// The round state machine, read-only from the API's perspective.
    pub gate: Arc<Gate>,
    /// Resolved role→peer bindings, read-only from the API's perspective.
    pub connection_manager: Arc<ConnectionManager>,
    /// Broadcast channel for live event notifications (round switches,
    /// proposals becoming ready).
    pub event_tx: broadcast::Sender<NodeEvent>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

/// Events pushed to WebSocket subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeEvent {
    /// The gate switched to a new round.
    #[serde(rename = "round_switch")]
    RoundSwitch { block_round: u64, reject_round: u32 },
    /// A proposal became ready for the current round.
    #[serde(rename = "proposal_ready")]
    ProposalReady {
        block_round: u64,
        reject_round: u32,
        tx_count: usize,
    },
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
///
/// The returned router is ready to be served on the configured RPC port.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/peers", get(peers_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub dev_mode: bool,
    pub gate_state: String,
    pub block_round: Option<u64>,
    pub reject_round: Option<u32>,
    pub timestamp: String,
}

/// One role→peer binding in the `GET /peers` response.
#[derive(Debug, Serialize)]
pub struct PeerBinding {
    pub role: String,
    pub address: String,
    pub public_key: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the node is alive.
///
/// This is the liveness probe for orchestrators (k8s, systemd, etc.). It
/// intentionally does not check gate/connection state — that belongs in
/// `/status`.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — returns node status summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (gate_state, block_round, reject_round) = match state.gate.state() {
        GateState::Idle => ("idle".to_string(), None, None),
        GateState::AwaitingProposal(round) => (
            "awaiting_proposal".to_string(),
            Some(round.block_round),
            Some(round.reject_round),
        ),
        GateState::ProposalReady(round, _) => (
            "proposal_ready".to_string(),
            Some(round.block_round),
            Some(round.reject_round),
        ),
    };

    Json(StatusResponse {
        version: state.version.clone(),
        dev_mode: state.dev_mode,
        gate_state,
        block_round,
        reject_round,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `GET /peers` — returns the current role→peer bindings, if the connection
/// manager has resolved any yet (it hasn't before the first synchronization
/// event).
async fn peers_handler(State(state): State<AppState>) -> impl IntoResponse {
    let Some(current) = state.connection_manager.current_peers() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "no role bindings resolved yet" })),
        )
            .into_response();
    };

    let bindings: Vec<PeerBinding> = [
        (Role::Issuer, "issuer"),
        (Role::RejectRejectConsumer, "reject_reject_consumer"),
        (Role::CommitRejectConsumer, "commit_reject_consumer"),
        (Role::RejectCommitConsumer, "reject_commit_consumer"),
        (Role::CommitCommitConsumer, "commit_commit_consumer"),
    ]
    .into_iter()
    .map(|(role, label)| {
        let peer = current.get(role);
        PeerBinding {
            role: label.to_string(),
            address: peer.address.clone(),
            public_key: peer.public_key.to_hex(),
        }
    })
    .collect();

    Json(bindings).into_response()
}

/// `GET /ws` — WebSocket upgrade for live round/proposal event streaming.
///
/// Clients receive JSON-encoded [`NodeEvent`] messages. The connection is
/// read-only from the server's perspective; client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Drives a single WebSocket connection, forwarding broadcast events until
/// the client disconnects or the channel is closed.
async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {
                        // Client messages are ignored — this is a push-only channel.
                    }
                    _ => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use nova_protocol::ordering::{AlwaysCreate, BlockHash, OrderingService, Peer, Presence, Proposal, ProposalOutcome, ProposalRequester, Round, TxPresenceCache};
    use tower::ServiceExt;

    struct EmptyRequester;

    #[async_trait::async_trait]
    impl ProposalRequester for EmptyRequester {
        async fn request_proposal(&self, _peer: &Peer, round: Round) -> Option<Proposal> {
            Some(Proposal::empty(round))
        }
    }

    struct NoPresence;

    impl TxPresenceCache for NoPresence {
        fn check(&self, _hash: &[u8; 32]) -> Presence {
            Presence::Unknown
        }

        fn evict(&self, _hashes: &[[u8; 32]]) {}
    }

    fn test_state() -> AppState {
        let connection_manager = Arc::new(ConnectionManager::new([BlockHash::zero(), BlockHash::zero()]));
        let requester: Arc<dyn ProposalRequester> = Arc::new(EmptyRequester);
        let presence: Arc<dyn TxPresenceCache> = Arc::new(NoPresence);
        let gate = Arc::new(Gate::new(
            Arc::clone(&connection_manager),
            requester,
            presence,
            std::time::Duration::from_secs(5),
        ));
        let (event_tx, _) = broadcast::channel(8);
        AppState {
            version: "test".to_string(),
            dev_mode: true,
            gate,
            connection_manager,
            event_tx,
            metrics: Arc::new(crate::metrics::NodeMetrics::new()),
        }
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let router = create_router(test_state());
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_reports_idle_before_any_synchronization_event() {
        let router = create_router(test_state());
        let response = router
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["gate_state"], "idle");
        assert!(json["block_round"].is_null());
    }

    #[tokio::test]
    async fn peers_returns_service_unavailable_before_resolution() {
        let router = create_router(test_state());
        let response = router
            .oneshot(Request::builder().uri("/peers").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
