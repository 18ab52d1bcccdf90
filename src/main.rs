//! Process entry point: dotenv +
//! tracing init, `AppConfig::load()`, a `PgPool` connect, an `Arc<AppState>`
//! built once and handed to the router via `with_state`, then
//! `axum::serve`. Narrowed to this core's own components (order books,
//! locks, matching engine, persistence/audit/signer gateways,
//! OrderSubmitService) instead of a full perp-trading surface
//! (funding, liquidation, ADL, referral, kline, websocket, price feed are
//! out of scope).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod audit;
mod config;
mod locks;
mod matching;
mod metrics;
mod models;
mod orderbook;
mod persistence;
mod service;
mod signer;
mod validator;

use crate::audit::redis::RedisAuditLog;
use crate::audit::AuditLog;
use crate::config::AppConfig;
use crate::locks::{AdmissionLock, MatchingLockRegistry};
use crate::orderbook::OrderBookRegistry;
use crate::persistence::postgres::PgGateway;
use crate::persistence::PersistenceGateway;
use crate::service::OrderSubmitService;
use crate::signer::ethers_signer::EthersReceiptSigner;
use crate::signer::ReceiptSigner;

pub struct AppState {
    pub config: AppConfig,
    pub order_submit_service: OrderSubmitService,
    pub orderbooks: Arc<OrderBookRegistry>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "predictex_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    tracing::info!("Starting predictex-core v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(environment = %config.environment, "loaded configuration");

    let _metrics_handle = metrics::init_metrics();

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    tracing::info!("database pool connected");

    let persistence: Arc<dyn PersistenceGateway> = Arc::new(PgGateway::new(pool));

    let audit: Arc<dyn AuditLog> = Arc::new(RedisAuditLog::new(
        &config.redis_url,
        config.max_audit_entries_per_market,
        config.max_audit_entries_global,
    )?);
    tracing::info!("audit log backend initialized");

    let signer: Arc<dyn ReceiptSigner> =
        Arc::new(EthersReceiptSigner::from_private_key(&config.signing_private_key).map_err(|e| anyhow::anyhow!(e.to_string()))?);
    tracing::info!("receipt signer initialized");

    let orderbooks = Arc::new(OrderBookRegistry::new());
    let matching_locks = Arc::new(MatchingLockRegistry::new());
    let admission_locks = Arc::new(AdmissionLock::new(std::time::Duration::from_millis(
        config.admission_lock_ttl_ms,
    )));

    let host = config.host.clone();
    let port = config.port;
    let config = Arc::new(config);

    let order_submit_service = OrderSubmitService::new(
        config.clone(),
        orderbooks.clone(),
        matching_locks,
        admission_locks,
        persistence,
        audit,
        signer,
    );

    let state = Arc::new(AppState {
        config: (*config).clone(),
        order_submit_service,
        orderbooks,
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api::routes::create_router(state.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    tracing::info!(%addr, "server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
