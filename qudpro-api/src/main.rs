use generator::RandomPostSource;
use qudpro_common::snowflake::WorkerId;
use qudpro_db::client::{DbClient, DbError};
use qudpro_feed::{FeedConfig, FeedEngine, InjectionScheduler, memory::MemoryPostStore};
use serde::Deserialize;
use server::ServerState;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use store::Store;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod generator;
mod server;
mod store;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error setting up database: {0}")]
    Database(#[from] DbError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    /// Posts are only kept in memory if this is unset.
    database_url: Option<String>,
    #[serde(default)]
    worker_id: WorkerId,
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "qudpro_api=debug,\
                qudpro_feed=debug,\
                qudpro_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<(Env, FeedConfig), InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    let env = envy::from_env()?;
    let feed_config = envy::prefixed("FEED_").from_env()?;
    Ok((env, feed_config))
}

async fn open_store(env: &Env) -> Result<Store, InitError> {
    let Some(database_url) = &env.database_url else {
        warn!("DATABASE_URL is not set, posts will not survive a restart");
        return Ok(Store::Memory(MemoryPostStore::new(env.worker_id)));
    };

    let db_client = DbClient::connect(database_url, env.worker_id).await?;
    db_client.migrate().await?;
    info!("Connected to database");

    Ok(Store::Postgres(db_client))
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Could not listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }

    info!("Shutting down");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let (env, feed_config) = get_env()?;
    debug!(?feed_config, worker_id = env.worker_id.get(), "Loaded configuration");

    let store = open_store(&env).await?;
    let feed = Arc::new(FeedEngine::new(
        store,
        RandomPostSource::new(env.worker_id),
        feed_config,
        env.worker_id,
    ));
    feed.load().await;
    let mut scheduler = InjectionScheduler::start(Arc::clone(&feed));

    let shutdown = CancellationToken::new();
    let tracing_layer = TraceLayer::new_for_http();
    let app = server::routes()
        .with_state(ServerState {
            feed,
            shutdown: shutdown.clone(),
        })
        .layer(tracing_layer);

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .map_err(InitError::TcpServe);
    scheduler.stop().await;

    served
}
