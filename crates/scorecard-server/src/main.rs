mod config;
mod error;
mod lookup;
mod news;
mod rate_limit;
mod server;
mod share;
mod state;

use scorecard_common::loader::{AnySource, DataStore, FsSource, HttpSource};
use scorecard_common::upstream::UpstreamClient;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::{Config, DataLocation};
use rate_limit::RateLimiter;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting scorecard server");

    let config = Config::from_env()?;
    let source = match &config.data {
        DataLocation::Dir(dir) => {
            info!(dir = %dir.display(), "reading data files from disk");
            AnySource::Fs(FsSource::new(dir))
        }
        DataLocation::Url(url) => {
            info!(%url, "reading data files over http");
            AnySource::Http(HttpSource::new(url, config.upstream.timeout)?)
        }
    };
    info!(
        geocoder = %config.upstream.geocoder_base_url,
        districts = %config.upstream.district_base_url,
        reps = %config.upstream.reps_base_url,
        news = %config.upstream.news_feed_url,
        timeout_ms = config.upstream.timeout.as_millis(),
        "upstream services configured"
    );
    let upstream = UpstreamClient::new(config.upstream.clone())?;

    let limiter = RateLimiter::from_env();
    match &limiter {
        Some(l) => info!(rps = l.rps(), "address lookups rate limited"),
        None => info!("address lookups not rate limited"),
    }

    let state = AppState::new(DataStore::new(source), upstream, limiter);

    // Warm the cache; a failure here is retried by the first request.
    if let Err(e) = state.dataset().await {
        warn!(error = %e, "initial dataset load failed, serving 503 until it succeeds");
    }

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "listening");

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .inspect_err(|e| error!(error = %e, "server error"))?;

    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install signal handler");
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
