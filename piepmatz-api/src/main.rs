use crate::server::{RATE_LIMIT_KEY_PREFIX, RateLimiter, ServerState};
use piepmatz_common::snowflake::{ProcessId, SnowflakePartOutOfRangeError, WorkerId};
use piepmatz_db::client::{DbClient, DbError};
use piepmatz_directory::client::{DirectoryClient, DirectoryError};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use serde::Deserialize;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Snowflake coordinate out of range: {0}")]
    SnowflakeCoordinate(#[from] SnowflakePartOutOfRangeError<u8>),
    #[error("Error setting up the database: {0}")]
    Database(#[from] DbError),
    #[error("Error connecting to redis: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Error setting up the directory client: {0}")]
    Directory(#[from] DirectoryError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: String,
    redis_url: String,
    directory_url: String,
    directory_api_key: String,
    #[serde(default)]
    worker_id: u8,
    #[serde(default)]
    process_id: u8,
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "piepmatz_api=debug,piepmatz_common=debug,\
                piepmatz_db=debug,piepmatz_directory=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

async fn connect_redis(redis_url: &str) -> Result<ConnectionManager, InitError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(500));

    let client = redis::Client::open(redis_url)?;
    let connection = client.get_connection_manager_with_config(config).await?;

    Ok(connection)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let worker_id = WorkerId::try_from(env.worker_id)?;
    let process_id = ProcessId::try_from(env.process_id)?;

    let db_client = DbClient::connect(&env.database_url, worker_id, process_id).await?;
    let redis_connection = connect_redis(&env.redis_url).await?;
    let directory = DirectoryClient::new(&env.directory_url, env.directory_api_key)?;

    let state = ServerState {
        db_client: Arc::new(db_client),
        directory: Arc::new(directory),
        rate_limiter: RateLimiter::new(redis_connection, RATE_LIMIT_KEY_PREFIX),
    };

    let tracing_layer = TraceLayer::new_for_http();
    let app = server::routes().with_state(state).layer(tracing_layer);

    let cancellation_token = CancellationToken::new();
    {
        let cancellation_token = cancellation_token.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            cancellation_token.cancel();
        });
    }

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancellation_token.cancelled_owned())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
