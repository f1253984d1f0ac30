//! Auth Service
//!
//! Registration, activation, login sessions and password reset over HTTP.

use auth_service::config::Config;
use auth_service::crypto::{PasswordHasher, TokenCodec};
use auth_service::notifier::{LogMailer, MailDispatcher, MailTemplates, Mailer, Notifier, SmtpMailer};
use auth_service::repositories::{PgStore, Stores};
use auth_service::routes::{self, AppState};
use auth_service::services::{CredentialService, HttpProfileProvisioner, TokenCodecs};
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // LOG_FORMAT=json switches to structured output
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_service=debug,auth=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    info!("Starting Auth Service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        bcrypt_cost = config.bcrypt_cost,
        access_ttl_secs = config.access_ttl.as_secs(),
        refresh_ttl_secs = config.refresh_ttl.as_secs(),
        smtp_configured = config.smtp_url.is_some(),
        "Configuration loaded successfully"
    );

    let metrics_handle = routes::init_metrics_recorder().map_err(|e| {
        error!("Failed to install metrics recorder: {}", e);
        e
    })?;

    info!("Connecting to database...");
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect(config.database_url.expose_secret())
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| {
            error!("Failed to run migrations: {}", e);
            e
        })?;

    info!("Database connection established");

    let shutdown = CancellationToken::new();
    let store = Arc::new(PgStore::new(db_pool));
    let stores = Stores::shared(store);

    let mailer: Arc<dyn Mailer> = match &config.smtp_url {
        Some(url) => Arc::new(SmtpMailer::new(url, &config.mail_from).map_err(|e| {
            error!("Failed to configure SMTP transport: {}", e);
            e
        })?),
        None => {
            warn!("SMTP_URL not set, outgoing mail will only be logged");
            Arc::new(LogMailer)
        }
    };
    let (dispatcher, mail_workers) = MailDispatcher::spawn(
        mailer,
        config.mail_queue_capacity,
        config.mail_workers,
        shutdown.clone(),
    );
    let notifier = Notifier::new(
        dispatcher,
        MailTemplates::new(
            config.activation_url.clone(),
            config.password_reset_url.clone(),
        ),
    );

    let provisioner = Arc::new(
        HttpProfileProvisioner::new(
            config.profile_service_url.clone(),
            config.profile_service_timeout,
        )
        .map_err(|e| {
            error!("Failed to build profile service client: {}", e);
            e
        })?,
    );

    let tokens = TokenCodecs {
        access: TokenCodec::new(&config.jwt_access_secret, config.access_ttl)
            .with_leeway(config.jwt_leeway_seconds),
        refresh: TokenCodec::new(&config.jwt_refresh_secret, config.refresh_ttl)
            .with_leeway(config.jwt_leeway_seconds),
    };

    let service = CredentialService::new(
        stores,
        PasswordHasher::new(config.bcrypt_cost),
        tokens,
        notifier,
        provisioner,
    )?;

    let state = Arc::new(AppState {
        service: Arc::new(service),
        shutdown: shutdown.clone(),
    });
    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Auth Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Every connection has drained; let the mail workers flush and exit.
    shutdown.cancel();
    for worker in mail_workers {
        if let Err(e) = worker.await {
            warn!("Mail worker ended abnormally: {}", e);
        }
    }

    info!("Auth Service shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
