use std::future::Future;
use std::io;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cinema_reservation::{
    app,
    config::{AppConfig, Config, LogFormat},
    AppState,
};

fn init_tracing(config: &AppConfig) {
    let registry = tracing_subscriber::registry().with(EnvFilter::new(&config.rust_log));
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

// Ждёт сигнал. Если подписаться не удалось, этот источник просто молчит,
// а не роняет сервер сразу.
async fn signal_or_park<F>(signal: F, name: &'static str)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!(error = %e, "Failed to listen for {}", name);
        std::future::pending::<()>().await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = signal_or_park(signal::ctrl_c(), "Ctrl-C");

    #[cfg(unix)]
    let terminate = signal_or_park(
        async {
            let mut sig = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            sig.recv().await;
            Ok::<(), io::Error>(())
        },
        "SIGTERM",
    );

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    init_tracing(&config.app);
    info!(environment = %config.app.environment, "Starting Cinema Reservation API");

    let state = AppState::new(config.clone()).await?;
    let app = app(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
