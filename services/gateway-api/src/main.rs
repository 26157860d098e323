//! Geoinfo Gateway API
//!
//! Stateless bearer-token gateway for the incident-reporting platform.
//!
//! ## REST Endpoints
//!
//! - `POST /api/auth/login` - Exchange credentials for a bearer token
//! - `GET /api/auth/me` - Identity carried by the token
//! - `POST /api/auth/password` - Change the caller's password
//! - `GET /api/health` - Health check (public)
//! - `GET /metrics` - Prometheus metrics

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use gateway_api::app::build_router;
use gateway_api::config::{BootstrapAdmin, Config};
use gateway_api::state::{AppState, AuthServiceImpl};
use geoinfo_auth_core::{AuthError, AuthService};
use geoinfo_db::{CredentialRepository, InMemoryCredentialRepository, PgCredentialRepository};
use geoinfo_types::Role;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("gateway_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Geoinfo Gateway API");

    // Load configuration
    let config = Config::from_env_or_yaml()?;
    tracing::info!(
        http_port = config.http_port,
        auth_rules = config.policy.rules().len(),
        cors_rules = config.cors.rules().len(),
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    // Credential store
    let (credentials, pool) = match &config.database_url {
        Some(url) => {
            let pool = geoinfo_db::create_pool(url).await?;
            tracing::info!("Database pool created");
            if config.run_migrations {
                geoinfo_db::run_migrations(&pool).await?;
                tracing::info!("Database migrations applied");
            }
            let repo: Arc<dyn CredentialRepository> =
                Arc::new(PgCredentialRepository::new(pool.clone()));
            (repo, Some(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory credential store");
            let repo: Arc<dyn CredentialRepository> = Arc::new(InMemoryCredentialRepository::new());
            (repo, None)
        }
    };

    let auth = AuthService::new(config.auth.clone(), credentials)?;
    if let Some(admin) = &config.bootstrap_admin {
        bootstrap_admin(&auth, admin).await?;
    }

    let http_port = config.http_port;
    let state = AppState::new(auth, pool, config);
    let app = build_router(state, metrics_handle);

    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    run_http_server(app, addr).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Provision the configured admin account unless it already exists
async fn bootstrap_admin(auth: &AuthServiceImpl, admin: &BootstrapAdmin) -> anyhow::Result<()> {
    match auth
        .register(&admin.username, &admin.password, [Role::Admin])
        .await
    {
        Ok(identity) => {
            tracing::info!(username = %identity.username, "Bootstrap admin created");
            Ok(())
        }
        Err(AuthError::UsernameTaken) => {
            tracing::debug!(username = %admin.username, "Bootstrap admin already exists");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_http_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Register metrics with descriptions
    metrics::describe_counter!(
        "gateway_auth_decisions_total",
        "Authorization decisions by outcome"
    );
    metrics::describe_counter!(
        "gateway_cors_rejections_total",
        "Cross-origin requests from origins outside the policy"
    );
    metrics::describe_counter!("gateway_logins_total", "Login attempts by outcome");

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
