use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use secrecy::SecretString;

use synapse_core::SessionLimits;
use synapse_routing::AgentBus;
use synapse_server::{HttpState, ServerConfig};
use synapse_state::SharedState;
use synapse_telemetry::{MetricsRecorder, TelemetryConfig};

/// MCP protocol bridge: routes tool calls to AI agents and shares context
/// across sessions through a single source of truth.
#[derive(Debug, Parser)]
#[command(name = "synapse", version)]
struct Args {
    /// Listen host for the protocol transport.
    #[arg(long, env = "SYNAPSE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Listen port for the protocol transport.
    #[arg(long, env = "SYNAPSE_PORT", default_value_t = 8765)]
    port: u16,

    /// Port for the health/readiness/metrics endpoints.
    #[arg(long, env = "SYNAPSE_HTTP_PORT", default_value_t = 8080)]
    http_port: u16,

    /// Redis connection string for shared state. Absent selects the
    /// in-memory fallback.
    #[arg(long, env = "SYNAPSE_REDIS_URL")]
    redis_url: Option<String>,

    /// HS256 secret enabling bearer-token verification for tool calls.
    #[arg(long, env = "SYNAPSE_AUTH_SECRET")]
    auth_secret: Option<String>,

    /// Maximum inbound frame size in bytes.
    #[arg(long, env = "SYNAPSE_MAX_FRAME_BYTES", default_value_t = 1 << 20)]
    max_frame_bytes: usize,

    /// Per-session rate limit, tokens per second.
    #[arg(long, env = "SYNAPSE_RATE_PER_SEC", default_value_t = 10.0)]
    rate_per_sec: f64,

    /// Per-session burst size.
    #[arg(long, env = "SYNAPSE_BURST", default_value_t = 20)]
    burst: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    synapse_telemetry::init_telemetry(&TelemetryConfig::default());
    tracing::info!("starting synapse bridge");

    // Backend availability is checked exactly once, here. A configured but
    // unreachable Redis degrades to the in-memory store with a warning.
    let state = match &args.redis_url {
        Some(url) => match SharedState::connect_redis(url).await {
            Ok(state) => {
                tracing::info!("redis shared-state backend connected");
                state
            }
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable, falling back to in-memory shared state");
                SharedState::in_memory()
            }
        },
        None => SharedState::in_memory(),
    };

    let metrics = Arc::new(MetricsRecorder::new());
    let bus = Arc::new(AgentBus::new(Arc::new(state)));

    let mut bridge = synapse_server::Bridge::new(bus).with_metrics(Arc::clone(&metrics));
    if args.auth_secret.is_some() {
        bridge = bridge.with_auth_required();
    }
    let bridge = Arc::new(bridge);

    let registry = Arc::new(synapse_server::SessionRegistry::new());

    let config = ServerConfig {
        host: args.host.clone(),
        port: args.port,
        max_frame_bytes: args.max_frame_bytes,
        limits: SessionLimits {
            rate_per_sec: args.rate_per_sec,
            burst: args.burst,
        },
        auth_secret: args.auth_secret.map(SecretString::from),
    };

    let server = synapse_server::start(
        config,
        bridge,
        Arc::clone(&registry),
        Some(Arc::clone(&metrics)),
    )
    .await
    .context("failed to start mcp transport")?;

    let http = synapse_server::start_http(
        &args.host,
        args.http_port,
        HttpState {
            registry,
            metrics: Some(metrics),
        },
    )
    .await
    .context("failed to start http collaborator")?;

    tracing::info!(
        mcp_port = server.port,
        http_port = http.port,
        "synapse ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;
    tracing::info!("shutting down");
    Ok(())
}
