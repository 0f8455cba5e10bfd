use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;

use anisub::config::ServerConfig;
use anisub::http::{AppState, router};
use anisub::library::Library;
use anisub::media::ffmpeg::FfmpegOpener;
use anisub::pool::HandlePool;
use anisub::preview::FramePreviewService;
use anisub::resolve::ResolutionResolver;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = ServerConfig::parse();

    if !config.library.is_dir() {
        log::warn!(
            target: "anisub",
            "library root {} does not exist yet; the API will serve empty listings",
            config.library.display()
        );
    }

    let pool = Arc::new(HandlePool::new(
        Arc::new(FfmpegOpener::new()),
        config.pool_capacity,
    ));
    let state = AppState {
        library: Arc::new(Library::new(&config.library)),
        previews: Arc::new(FramePreviewService::new(Arc::clone(&pool))),
        resolver: Arc::new(ResolutionResolver::new(&config.library)),
        pool: Arc::clone(&pool),
    };

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    log::info!(
        target: "anisub",
        "serving {} on http://{addr} (pool capacity {})",
        config.library.display(),
        pool.capacity()
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running server")?;

    pool.release_all();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        log::error!(target: "anisub", "failed to install Ctrl+C handler: {err}");
    }
}
