// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # NOVA Validator Node
//!
//! Entry point for the `nova-node` binary. Parses CLI arguments, initializes
//! logging and metrics, wires the ordering/YAC core, and serves the status
//! HTTP/WS API.
//!
//! The binary supports four subcommands:
//!
//! - `run`     — start the validator node
//! - `init`    — initialize data directory and generate keys
//! - `status`  — query a running node's status endpoint
//! - `version` — print build version information

mod api;
mod cli;
mod config;
mod local;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{broadcast, mpsc};

use nova_protocol::crypto::keys::NovaKeypair;
use nova_protocol::ordering::{
    AlwaysCreate, BlockHash, ConnectionManager, Gate, GateOutput, LedgerState, OrderingService,
    Peer, Round, SyncOutcome, SynchronizationEvent,
};
use nova_protocol::storage::HashLogDb;
use nova_protocol::yac::YacTransport;

use api::{AppState, NodeEvent};
use cli::{Commands, NovaNodeCli};
use config::AppConfig;
use local::{InMemoryPresence, LoggingVoteSender, LoopbackRequester};
use logging::LogFormat;
use metrics::NodeMetrics;

/// Broadcast channel capacity for live event streaming.
/// Large enough to absorb short bursts without dropping events for
/// connected WebSocket clients.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Channel depth between the gate and its output consumer. The gate never
/// blocks on a full channel for long — see `Gate::on_synchronization_event`.
const GATE_OUTPUT_CHANNEL_CAPACITY: usize = 64;

/// Dev-mode synchronization cadence: how often the self-dialed loop
/// manufactures a new round when no real synchronizer is attached.
const DEV_ROUND_INTERVAL: std::time::Duration = std::time::Duration::from_millis(2_000);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = NovaNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// run — Full validator startup sequence
// ---------------------------------------------------------------------------

/// Starts the full validator node: ordering core, YAC transport, status API,
/// and metrics endpoint.
///
/// Startup sequence:
/// 1.  Build `AppConfig` from CLI/env.
/// 2.  Initialize logging.
/// 3.  Open the hash-log database (temporary in dev mode).
/// 4.  Load or generate the validator keypair.
/// 5.  Load or persist the hash-window primers.
/// 6.  Build the ordering core: connection manager, ordering service, gate.
/// 7.  Build the YAC transport.
/// 8.  Spawn the gate-output consumer (metrics + WS fan-out).
/// 9.  Spawn the self-dialed synchronization loop (dev mode).
/// 10. Serve the status API and metrics endpoint until shutdown.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    let config = AppConfig::from_run_args(&args);

    logging::init_logging(&config.log_level, config.log_format);

    tracing::info!(
        rpc_bind = %config.rpc_bind,
        metrics_bind = %config.metrics_bind,
        data_dir = %config.data_dir.display(),
        dev = config.dev_mode,
        "starting nova-node"
    );

    // --- Hash-log database ---
    let db = if config.dev_mode {
        HashLogDb::open_temporary().context("failed to open temporary hash-log database")?
    } else {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!(
                "failed to create data directory: {}",
                config.data_dir.display()
            )
        })?;
        let db_path = config.data_dir.join("hashlog");
        HashLogDb::open(&db_path)
            .with_context(|| format!("failed to open hash-log database at {}", db_path.display()))?
    };

    // --- Validator keypair ---
    let keypair = load_or_generate_keypair(&db, &args, config.dev_mode)?;
    let self_peer = Peer::new(
        format!("127.0.0.1:{}", config.rpc_bind.port()),
        keypair.public_key(),
    );
    tracing::info!(public_key = %keypair.public_key().to_hex(), "validator identity resolved");

    // --- Hash-window primers ---
    let initial_hashes = match db.get_initial_hashes().context("reading initial hashes")? {
        Some(hashes) => hashes,
        None => {
            let hashes = config.ordering.initial_hashes;
            db.put_initial_hashes(hashes)
                .context("persisting initial hashes")?;
            hashes
        }
    };

    // --- Ordering core ---
    let connection_manager = Arc::new(ConnectionManager::new(initial_hashes));
    let presence = Arc::new(InMemoryPresence::default());
    let presence_for_service: Arc<dyn nova_protocol::ordering::TxPresenceCache> =
        Arc::clone(&presence);
    let presence_for_gate: Arc<dyn nova_protocol::ordering::TxPresenceCache> = Arc::clone(&presence);
    let ordering_service = Arc::new(OrderingService::new(
        config.ordering.max_number_of_transactions,
        AlwaysCreate,
        presence_for_service,
    ));
    let requester: Arc<dyn nova_protocol::ordering::ProposalRequester> =
        Arc::new(LoopbackRequester::new(Arc::clone(&ordering_service)));
    let gate = Arc::new(Gate::new(
        Arc::clone(&connection_manager),
        requester,
        presence_for_gate,
        config.ordering.delay,
    ));

    // --- YAC transport ---
    let yac_transport = Arc::new(YacTransport::new(Arc::new(LoggingVoteSender)));

    // --- Metrics and event fan-out ---
    let node_metrics = Arc::new(NodeMetrics::new());
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    let app_state = AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            nova_protocol::config::PROTOCOL_VERSION,
        ),
        dev_mode: config.dev_mode,
        gate: Arc::clone(&gate),
        connection_manager: Arc::clone(&connection_manager),
        event_tx: event_tx.clone(),
        metrics: Arc::clone(&node_metrics),
    };

    // --- Shutdown handling ---
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // --- Gate output consumer: metrics + WS fan-out ---
    let (gate_output_tx, mut gate_output_rx) = mpsc::channel::<GateOutput>(GATE_OUTPUT_CHANNEL_CAPACITY);
    let consumer_metrics = Arc::clone(&node_metrics);
    let consumer_event_tx = event_tx.clone();
    let mut consumer_shutdown = shutdown_rx.clone();
    let output_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                maybe_output = gate_output_rx.recv() => {
                    let Some(output) = maybe_output else { break };
                    match output {
                        GateOutput::RoundSwitch { round, ledger_state } => {
                            consumer_metrics.block_round.set(round.block_round as i64);
                            consumer_metrics.reject_round.set(round.reject_round as i64);
                            consumer_metrics.ledger_peer_count.set(ledger_state.peer_count() as i64);
                            let _ = consumer_event_tx.send(NodeEvent::RoundSwitch {
                                block_round: round.block_round,
                                reject_round: round.reject_round,
                            });
                        }
                        GateOutput::ProposalReady { round, proposal } => {
                            consumer_metrics.proposals_served_total.inc();
                            let _ = consumer_event_tx.send(NodeEvent::ProposalReady {
                                block_round: round.block_round,
                                reject_round: round.reject_round,
                                tx_count: proposal.transactions.len(),
                            });
                        }
                    }
                }
                _ = consumer_shutdown.changed() => {
                    if *consumer_shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    });

    // --- Self-dialed synchronization loop ---
    let sync_gate = Arc::clone(&gate);
    let sync_ordering_service = Arc::clone(&ordering_service);
    let sync_peer = self_peer.clone();
    let sync_output_tx = gate_output_tx.clone();
    let sync_metrics = Arc::clone(&node_metrics);
    let mut sync_shutdown = shutdown_rx.clone();
    let sync_handle = tokio::spawn(async move {
        let mut round = Round::genesis(0);
        let mut interval = tokio::time::interval(DEV_ROUND_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let event = SynchronizationEvent {
                        round,
                        sync_outcome: SyncOutcome::Commit,
                        ledger_state: LedgerState::new(vec![sync_peer.clone()]),
                    };
                    match sync_gate.on_synchronization_event(event, &sync_output_tx).await {
                        Ok(next) => {
                            sync_metrics.sync_events_total.inc();
                            round = next;
                            let hash = BlockHash(*blake3::hash(&round.block_round.to_le_bytes()).as_bytes());
                            sync_gate.on_committed_block(hash, Vec::new(), Vec::new());
                            sync_ordering_service.on_round_advance(round);
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "synchronization event rejected");
                        }
                    }
                }
                _ = sync_shutdown.changed() => {
                    if *sync_shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    });

    // --- Status API server ---
    let api_router = api::create_router(app_state.clone());
    let api_listener = tokio::net::TcpListener::bind(config.rpc_bind)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", config.rpc_bind))?;
    tracing::info!("status API listening on {}", config.rpc_bind);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_listener = tokio::net::TcpListener::bind(config.metrics_bind)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", config.metrics_bind))?;
    tracing::info!("metrics listening on {}", config.metrics_bind);

    print_startup_banner(&keypair.public_key().to_hex(), &config);

    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("status API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    // --- Graceful shutdown ---
    let _ = shutdown_tx.send(true);
    yac_transport.stop();
    let _ = tokio::join!(output_handle, sync_handle);

    tracing::info!("nova-node stopped");
    Ok(())
}

// ---------------------------------------------------------------------------
// init — Data directory initialization
// ---------------------------------------------------------------------------

/// Initializes a new node data directory and generates a validator keypair.
///
/// Creates `{data_dir}/hashlog` (the sled-backed store for the signing key
/// and hash-window primers).
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("nova_node=info", LogFormat::Pretty);

    let data_dir = config::resolve_data_dir(&args.data_dir);
    tracing::info!(data_dir = %data_dir.display(), "initializing node");

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let db_path = data_dir.join("hashlog");
    let db = HashLogDb::open(&db_path)
        .with_context(|| format!("failed to open hash-log database at {}", db_path.display()))?;

    let keypair = NovaKeypair::generate();
    db.put_signing_key(&keypair)
        .context("failed to persist validator keypair")?;
    db.put_initial_hashes([BlockHash::zero(), BlockHash::zero()])
        .context("failed to persist initial hashes")?;

    let pubkey_hex = keypair.public_key().to_hex();

    println!();
    println!("Node initialized successfully.");
    println!();
    println!("  Data directory : {}", data_dir.display());
    println!("  Hash log       : {}", db_path.display());
    println!("  Public key     : {}", pubkey_hex);
    println!();
    println!("Run `nova-node run -d {}` to start the node.", data_dir.display());

    Ok(())
}

// ---------------------------------------------------------------------------
// status — Query a running node
// ---------------------------------------------------------------------------

/// Queries a running node's status endpoint and prints the result.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let url = format!("{}/status", args.rpc_url.trim_end_matches('/'));
    let body = minimal_http_get(&url).await?;

    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => {
            if let Some(version) = json.get("version").and_then(|v| v.as_str()) {
                println!("Node Status");
                println!("  Version      : {}", version);
            }
            if let Some(dev) = json.get("dev_mode").and_then(|v| v.as_bool()) {
                println!("  Dev mode     : {}", dev);
            }
            if let Some(state) = json.get("gate_state").and_then(|v| v.as_str()) {
                println!("  Gate state   : {}", state);
            }
            if let Some(br) = json.get("block_round").and_then(|v| v.as_u64()) {
                println!("  Block round  : {}", br);
            }
            if let Some(rr) = json.get("reject_round").and_then(|v| v.as_u64()) {
                println!("  Reject round : {}", rr);
            }
            if let Some(ts) = json.get("timestamp").and_then(|v| v.as_str()) {
                println!("  Timestamp    : {}", ts);
            }
        }
        Err(_) => println!("{}", body),
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// version
// ---------------------------------------------------------------------------

/// Prints version information to stdout.
fn print_version() {
    println!("nova-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol  {}", nova_protocol::config::PROTOCOL_VERSION);
    if let Some(commit) = option_env!("GIT_COMMIT") {
        println!("commit    {}", commit);
    }
}

// ---------------------------------------------------------------------------
// Keypair persistence
// ---------------------------------------------------------------------------

/// Resolves the validator keypair for this run: `--validator-key` wins if
/// set, then dev mode generates an ephemeral keypair, then the hash-log
/// database's persisted key, and finally a freshly generated + persisted key.
fn load_or_generate_keypair(
    db: &HashLogDb,
    args: &cli::RunArgs,
    dev_mode: bool,
) -> Result<NovaKeypair> {
    if let Some(hex_key) = &args.validator_key {
        return NovaKeypair::from_hex(hex_key)
            .map_err(|e| anyhow::anyhow!("invalid --validator-key: {}", e));
    }

    if dev_mode {
        let kp = NovaKeypair::generate();
        tracing::info!(public_key = %kp.public_key().to_hex(), "generated ephemeral dev keypair");
        return Ok(kp);
    }

    if let Some(kp) = db.get_signing_key().context("reading validator keypair")? {
        return Ok(kp);
    }

    let kp = NovaKeypair::generate();
    db.put_signing_key(&kp)
        .context("persisting newly generated validator keypair")?;
    tracing::info!(public_key = %kp.public_key().to_hex(), "generated and persisted new validator keypair");
    Ok(kp)
}

// ---------------------------------------------------------------------------
// Startup banner
// ---------------------------------------------------------------------------

/// Prints the node startup banner with configuration summary.
fn print_startup_banner(pubkey_hex: &str, config: &AppConfig) {
    let node_id_short = if pubkey_hex.len() > 20 {
        format!("{}...", &pubkey_hex[..20])
    } else {
        pubkey_hex.to_string()
    };

    let mode = if config.dev_mode { "Dev" } else { "Validator" };

    let lines = [
        format!("  Node ID:    {}", node_id_short),
        format!("  Status API: http://{}", config.rpc_bind),
        format!("  Metrics:    http://{}", config.metrics_bind),
        format!("  Data:       {}", config.data_dir.display()),
        format!("  Mode:       {}", mode),
    ];

    let title = format!(
        "  NOVA Protocol \u{2014} Validator Node v{}",
        env!("CARGO_PKG_VERSION")
    );

    let max_width = lines
        .iter()
        .map(|l| l.len())
        .chain(std::iter::once(title.len()))
        .max()
        .unwrap_or(50)
        + 4;

    let border = "\u{2550}".repeat(max_width);

    println!();
    println!("\u{2554}{}\u{2557}", border);
    println!("\u{2551}  {:<width$}  \u{2551}", title.trim(), width = max_width - 4);
    println!("\u{2560}{}\u{2563}", border);
    for line in &lines {
        println!("\u{2551}  {:<width$}  \u{2551}", line.trim(), width = max_width - 4);
    }
    println!("\u{255A}{}\u{255D}", border);
    println!();
}

// ---------------------------------------------------------------------------
// Shutdown signal
// ---------------------------------------------------------------------------

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

// ---------------------------------------------------------------------------
// Minimal HTTP client
// ---------------------------------------------------------------------------

/// Minimal HTTP GET without pulling in `reqwest` as a dependency. Only
/// handles plain `http://host:port/path` URLs — enough for `status` talking
/// to a locally running node.
async fn minimal_http_get(url: &str) -> Result<String> {
    let rest = url
        .strip_prefix("http://")
        .ok_or_else(|| anyhow::anyhow!("only http:// URLs are supported"))?;
    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };
    let (host, port) = match authority.rfind(':') {
        Some(i) => {
            let p: u16 = authority[i + 1..]
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid port in URL"))?;
            (&authority[..i], p)
        }
        None => (authority, 80),
    };

    let addr = format!("{}:{}", host, port);
    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, host,
    );

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    stream.write_all(request.as_bytes()).await?;
    stream.shutdown().await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_else(|| response.to_string());

    Ok(body)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
