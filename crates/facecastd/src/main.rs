use anyhow::{bail, Context, Result};
use clap::Parser;
use facecast_core::recognizer::ARCFACE_EMBEDDING_DIM;
use facecast_core::{FramePipeline, KnownFaceSet, OnnxAnalyzer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod channel;
mod config;
mod engine;
mod greeter;
mod pages;
mod server;
mod upload;

use config::Config;
use server::AppState;

#[derive(Parser)]
#[command(name = "facecastd", version, about = "Live face-recognition web server")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "FACECAST_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    tracing::info!("facecastd starting");

    let known = KnownFaceSet::load(&config.encodings)
        .with_context(|| format!("loading {}", config.encodings.display()))?;
    if let Some(dim) = known.dim() {
        if dim != ARCFACE_EMBEDDING_DIM {
            bail!(
                "{} holds {dim}-dim encodings; the recognizer produces {ARCFACE_EMBEDDING_DIM}",
                config.encodings.display()
            );
        }
    }
    tracing::info!(
        entries = known.len(),
        identities = known.identity_counts().len(),
        "known faces loaded"
    );

    let analyzer = OnnxAnalyzer::load(&config.model_dir)
        .with_context(|| format!("loading models from {}", config.model_dir.display()))?;
    tracing::info!(model_dir = %config.model_dir.display(), "models loaded");

    let matcher = config.match_metric.matcher(config.threshold());
    tracing::info!(
        metric = %config.match_metric,
        threshold = config.threshold(),
        "matcher configured"
    );

    let pipeline = FramePipeline::new(analyzer, known, matcher, config.pipeline_options());
    let engine = engine::spawn_engine(pipeline).context("spawning engine thread")?;

    std::fs::create_dir_all(&config.dataset_dir)
        .with_context(|| format!("creating {}", config.dataset_dir.display()))?;

    let state = AppState {
        engine,
        dataset_dir: Arc::new(config.dataset_dir.clone()),
    };
    let app = server::router(state, config.max_upload_bytes);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "facecastd ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("facecastd shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}
