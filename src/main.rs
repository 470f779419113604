use anyhow::Context;
use letmeask::{auth, AppState, Config, Store};
use tokio::{net::TcpListener, signal};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("letmeask=info,tower_http=info")))
        .init();

    let config = Config::load()?;

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(config.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(config.session_inactivity_minutes)));

    let store = Store::connect(&config.database_url).await?;

    let client_secret = std::fs::read_to_string(&config.client_secret_path)
        .with_context(|| format!("reading {}", config.client_secret_path))?;
    let clients = auth::Clients::from_json(serde_json::from_str(&client_secret)?, &config.public_url)?;

    let app = letmeask::app(AppState { store, clients })
        .layer(session_layer);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("listening on {} ({})", config.bind_addr, config.public_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
