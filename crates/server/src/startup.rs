use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{routing::get, Router};
use configs::{AppConfig, ServerConfig};
use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tower_http::{
    cors::CorsLayer,
    timeout::{RequestBodyTimeoutLayer, TimeoutLayer},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, warn, Level};

use common::types::BuildInfo;
use service::auth::repo::seaorm::SeaOrmAuthRepository;
use service::auth::service::{AuthConfig, AuthService};
use service::guest::identity::FacebookGraph;
use service::guest::repo::seaorm::SeaOrmGuestRepository;
use service::guest::service::{GuestConfig, GuestService};
use service::notify::sender::{LogOnlySender, TwilioSender};
use service::notify::{spawn_worker, Notifier, SmsSender};
use service::runtime::shutdown_channel;
use service::session::clock::system_clock;
use service::session::repo::seaorm::SeaOrmSessionRepository;
use service::session::sweeper::spawn_sweeper;
use service::session::{SessionPolicy, SessionStore};

use crate::dispatch::{dispatch, Dispatcher};
use crate::errors::StartupError;
use crate::metrics::{metrics_handler, SESSIONS_SWEPT_TOTAL};
use crate::servlets;
use crate::state::ServerState;

/// How long background tasks get to finish after the listener has stopped.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Dispatcher as the fallback, `/metrics` beside it, transport layers around both.
pub fn build_router(dispatcher: Arc<Dispatcher>, server: &ServerConfig) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .fallback(dispatch)
        .with_state(dispatcher)
        .layer(TimeoutLayer::new(Duration::from_secs(server.write_timeout_secs)))
        .layer(RequestBodyTimeoutLayer::new(Duration::from_secs(server.read_timeout_secs)))
        .layer(CorsLayer::very_permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}

/// Build every service on top of `db` and return the state the servlets use.
pub fn build_state(
    cfg: &AppConfig,
    db: DatabaseConnection,
    sessions: Arc<SessionStore>,
    notifier: Notifier,
) -> Result<ServerState, StartupError> {
    let identity = FacebookGraph::new(&cfg.identity).map_err(|e| StartupError::Runtime(e.to_string()))?;
    let auth = AuthService::new(
        Arc::new(SeaOrmAuthRepository { db: db.clone() }),
        Arc::clone(&sessions),
        notifier,
        AuthConfig::default(),
    );
    let guest = GuestService::new(
        Arc::new(identity),
        Arc::new(SeaOrmGuestRepository { db }),
        sessions,
        GuestConfig::from(&cfg.session),
    );
    Ok(ServerState {
        auth: Arc::new(auth),
        guest: Arc::new(guest),
        build: BuildInfo { build: cfg.build.build_id.clone(), version: cfg.build.api_version.clone() },
    })
}

fn sms_sender(cfg: &AppConfig) -> Result<Arc<dyn SmsSender>, StartupError> {
    if cfg.notify.enabled {
        let twilio = TwilioSender::new(&cfg.notify).map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
        Ok(Arc::new(twilio))
    } else {
        warn!("sms delivery disabled; messages are only logged");
        Ok(Arc::new(LogOnlySender))
    }
}

fn bind_addr(server: &ServerConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", server.host, server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("server address: {e}")))
}

/// Public entry: wire everything from `cfg`, serve until Ctrl+C or SIGTERM,
/// then stop the background tasks.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let db = models::db::connect_with_config(&cfg.database).await?;
    migration::Migrator::up(&db, None).await?;
    info!(service = "server", event = "migrations_applied", "database schema up to date");

    let (trigger, signal) = shutdown_channel();

    let sessions = Arc::new(SessionStore::new(
        Arc::new(SeaOrmSessionRepository { db: db.clone() }),
        system_clock(),
        SessionPolicy::from(&cfg.session),
    ));

    let (notifier, rx) = Notifier::channel(cfg.notify.queue_capacity);
    let worker = spawn_worker(rx, sms_sender(&cfg)?, signal.clone());

    let state = build_state(&cfg, db, Arc::clone(&sessions), notifier)?;
    let dispatcher = Arc::new(Dispatcher::new(servlets::registry(&state)?, cfg.server.status_policy));
    let app = build_router(dispatcher, &cfg.server);

    let sweeper = spawn_sweeper(
        sessions,
        Duration::from_secs(cfg.session.sweep_interval_secs),
        signal,
        |report| SESSIONS_SWEPT_TOTAL.inc_by(report.total()),
    );

    let addr = bind_addr(&cfg.server)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(service = "server", event = "listening", %addr, policy = ?cfg.server.status_policy, "server listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!(service = "server", event = "draining", "listener closed; stopping background tasks");
    trigger.trigger();
    drain("session_sweeper", sweeper).await;
    drain("sms_worker", worker).await;
    Ok(())
}

async fn drain(name: &'static str, task: JoinHandle<()>) {
    match tokio::time::timeout(DRAIN_TIMEOUT, task).await {
        Ok(Ok(())) => info!(task = name, "background task stopped"),
        Ok(Err(e)) => error!(task = name, error = %e, "background task failed"),
        Err(_) => warn!(task = name, "background task did not stop in time"),
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_rejects_garbage_host() {
        let mut server = ServerConfig::default();
        assert_eq!(bind_addr(&server).unwrap().port(), 8080);
        server.host = "not a host".into();
        assert!(matches!(bind_addr(&server), Err(StartupError::InvalidConfig(_))));
    }

    #[test]
    fn disabled_notify_uses_log_sender() {
        let cfg = AppConfig::default();
        assert_eq!(sms_sender(&cfg).unwrap().name(), "log");
    }
}
