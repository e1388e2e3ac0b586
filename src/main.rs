// src/main.rs

use std::sync::Arc;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use tend::config::CONFIG;
use tend::notify::{LogSink, NotificationSink, WebhookSink};
use tend::policy::openai::OpenAiPolicy;
use tend::server;
use tend::state::AppState;
use tend::workspace::sqlite::SqliteWorkspaceStore;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&CONFIG.log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options =
        SqliteConnectOptions::from_str(&CONFIG.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(CONFIG.sqlite_max_connections)
        .connect_with(options)
        .await?;

    let store = SqliteWorkspaceStore::new(pool);
    store.init_schema().await?;
    info!(database = %CONFIG.database_url, "workspace store ready");

    let sink: Arc<dyn NotificationSink> = if CONFIG.webhook_enabled() {
        Arc::new(WebhookSink::new(CONFIG.notify_webhook_url.clone()))
    } else {
        Arc::new(LogSink)
    };

    let state = AppState::new(
        Arc::new(store),
        Arc::new(OpenAiPolicy::from_config()),
        sink,
    );
    let app = server::router(state);

    let addr = CONFIG.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, model = %CONFIG.model, "tend listening");
    axum::serve(listener, app).await?;
    Ok(())
}
