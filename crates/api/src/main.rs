//! API server entry point.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use api::AppState;
use api::auth::Authenticator;
use api::config::{Config, LogFormat, TlsConfig};
use company_store::{CompanyStore, InMemoryCompanyStore, PostgresCompanyStore};
use axum::Router;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use domain::{CompanyService, ServiceConfig};
use events::{
    BackgroundPublisher, EventPublisher, HttpEventSink, NoopPublisher, Shutdown, SinkError,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Failures that stop the server from starting.
#[derive(Debug, Error)]
enum StartupError {
    #[error("failed to install Prometheus recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to connect to database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to run migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("failed to build event sink: {0}")]
    Sink(#[from] SinkError),

    #[error("failed to load TLS certificate or key: {0}")]
    Tls(std::io::Error),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
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
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Connects to PostgreSQL when configured, otherwise falls back to memory.
async fn open_store(
    config: &Config,
) -> Result<(Arc<dyn CompanyStore>, Option<PgPool>), StartupError> {
    let Some(url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on exit");
        return Ok((Arc::new(InMemoryCompanyStore::new()), None));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(url)
        .await?;
    let store = PostgresCompanyStore::new(pool.clone());
    store.run_migrations().await?;
    tracing::info!(
        max_connections = config.database_max_connections,
        "connected to PostgreSQL"
    );

    Ok((Arc::new(store), Some(pool)))
}

fn open_publisher(config: &Config) -> Result<Arc<dyn EventPublisher>, StartupError> {
    let Some(sink_config) = config.sink_config() else {
        tracing::warn!("EVENT_SINK_URL not set, company events will be discarded");
        return Ok(Arc::new(NoopPublisher));
    };

    let sink = HttpEventSink::new(sink_config)?;
    tracing::info!(endpoint = sink.endpoint(), "publishing company events");
    Ok(Arc::new(BackgroundPublisher::new(
        sink,
        config.publisher_config(),
        Shutdown::new(),
    )))
}

/// Serves `app` over HTTPS until a shutdown signal, then lets open
/// connections finish for at most `grace`.
async fn serve_tls(
    app: Router,
    addr: &str,
    tls: &TlsConfig,
    grace: Duration,
) -> Result<(), StartupError> {
    // Both ring and aws-lc-rs may be compiled in, so pick one explicitly.
    let _ = rustls::crypto::ring::default_provider().install_default();
    let rustls_config = RustlsConfig::from_pem_file(&tls.cert_file, &tls.key_file)
        .await
        .map_err(StartupError::Tls)?;

    let listener = std::net::TcpListener::bind(addr)?;
    listener.set_nonblocking(true)?;

    let handle = Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            shutdown_signal().await;
            handle.graceful_shutdown(Some(grace));
        }
    });

    axum_server::from_tcp_rustls(listener, rustls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

async fn run(config: Config) -> Result<(), StartupError> {
    // 1. Install Prometheus metrics recorder
    let metrics_handle =
        metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 2. Wire store, publisher and service
    let (store, pool) = open_store(&config).await?;
    let publisher = open_publisher(&config)?;
    let service = CompanyService::with_config(
        store,
        publisher,
        ServiceConfig {
            storage_timeout: Some(config.storage_timeout),
            shutdown_timeout: config.shutdown_timeout,
        },
    );

    if config.uses_dev_secret() {
        tracing::warn!("JWT_SECRET not set, signing tokens with the development secret");
    }
    let auth = Authenticator::new(
        &config.jwt_secret,
        config.auth_username.as_str(),
        config.auth_password.as_str(),
    );
    let state = Arc::new(AppState::new(service, auth));

    // 3. Build the application
    let app = api::create_app(state.clone(), metrics_handle);

    // 4. Start server
    let addr = config.addr();
    match &config.tls {
        Some(tls) => {
            tracing::info!(
                %addr,
                cert_file = %tls.cert_file.display(),
                "starting API server with TLS"
            );
            serve_tls(app, &addr, tls, config.shutdown_timeout).await?;
        }
        None => {
            tracing::info!(%addr, "starting API server");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    // 5. Drain events, then release the database
    state.service.shutdown().await;
    if let Some(pool) = pool {
        pool.close().await;
    }

    tracing::info!("server shut down gracefully");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "server failed");
            ExitCode::FAILURE
        }
    }
}
