use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use hebrew_tts::codec::FfmpegEncoderBuilder;
use hebrew_tts::engines::mms::{MmsEngine, MmsModelParams, MODEL_NAME};
use hebrew_tts::orchestrator::SpeechOrchestrator;
use hebrew_tts::server;

/// Hebrew text-to-speech HTTP service
#[derive(Debug, Parser)]
#[command(name = "hebrew-tts-server", about = "Hebrew text-to-speech over HTTP")]
struct Args {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: std::net::IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Directory holding the exported ONNX model and tokenizer files
    #[arg(long, env = "MODEL_DIR", default_value = "models/mms-tts-heb")]
    model_dir: PathBuf,

    /// ffmpeg binary used for MP3 encoding
    #[arg(long, env = "FFMPEG_BIN", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Inference threads (ONNX Runtime default when unset)
    #[arg(long, env = "NUM_THREADS")]
    threads: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let engine = MmsEngine::with_params(
        &args.model_dir,
        MmsModelParams {
            num_threads: args.threads,
        },
    );
    let encoder = FfmpegEncoderBuilder::default()
        .program(args.ffmpeg.clone())
        .build()?;
    let orchestrator = Arc::new(SpeechOrchestrator::new(engine, encoder));

    log::info!("Loading model: {MODEL_NAME} from {}", args.model_dir.display());
    let warm = Arc::clone(&orchestrator);
    match tokio::task::spawn_blocking(move || warm.warm_up()).await? {
        Ok(()) => log::info!("Model loaded successfully"),
        // Not fatal: the next /speak request retries the load.
        Err(e) => log::warn!("{e}"),
    }

    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on http://{addr}");

    axum::serve(listener, server::router(orchestrator))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

/// Wait for a shutdown signal (`SIGINT` or `SIGTERM`)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    log::info!("Shutdown signal received");
}
