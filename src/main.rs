//! LED Matrix Animator HTTP API Server
//!
//! Hosts one in-memory animation editing session. Any client on the LAN can
//! toggle LEDs, manage frames, convert images, preview playback and fetch
//! the Arduino export via simple HTTP requests.
//!
//! ## Architecture
//! - **Playback thread** (std::thread): owns the frame timer, advances frames
//! - **HTTP server** (tokio/axum): edits the session, sends play/pause commands
//!
//! ## Rust concepts
//! - `#[tokio::main]` async entry point
//! - `std::thread::spawn` for the playback thread
//! - `std::sync::mpsc` channel between async and sync worlds
//! - `Arc<Mutex<T>>` for the shared session
//!
//! ## Usage
//! ```sh
//! ./target/release/led-matrix-animator --font font.json --port 8080
//! ```

use clap::Parser;
use led_matrix_animator::editor::Editor;
use led_matrix_animator::font::{EmptyFont, FontTable, JsonFont};
use led_matrix_animator::playback::playback_loop;
use led_matrix_animator::server::{self, AppState};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// LED Matrix Animator HTTP API Server
#[derive(Parser)]
#[command(name = "led-matrix-animator")]
#[command(about = "HTTP API server for designing 8x8 LED matrix animations")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "8080")]
    port: u16,

    /// JSON font file mapping single characters to lit LED ids
    #[arg(long)]
    font: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber for request logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false) // Disable ANSI color codes for systemd/journald
        .compact()
        .init();

    let args = Args::parse();

    let font: Box<dyn FontTable + Send> = match &args.font {
        Some(path) => Box::new(JsonFont::open(path)?),
        None => {
            tracing::warn!("No font file given, letter frames are disabled");
            Box::new(EmptyFont)
        }
    };

    tracing::info!("LED Matrix Animator v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Port: {}", args.port);

    let editor = Arc::new(Mutex::new(Editor::with_font(font)));

    // Create the channel for sending play/pause to the playback thread.
    let (tx, rx) = mpsc::channel();

    // Spawn the playback thread.
    let playback_editor = editor.clone();
    let playback_handle = std::thread::spawn(move || {
        playback_loop(rx, playback_editor);
    });

    let app_state = AppState {
        editor,
        playback_tx: tx,
    };

    let app = server::create_router(app_state);

    // Start listening
    let addr = format!("{}:{}", args.bind, args.port);
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("API Documentation: http://localhost:{}/docs", args.port);
    tracing::info!("Try: curl http://localhost:{}/api/v1/status", args.port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    // The router (and with it the last Sender) is gone, so the playback
    // thread sees a closed channel and exits.
    if playback_handle.join().is_err() {
        tracing::error!("Playback thread panicked");
    }
    Ok(())
}
