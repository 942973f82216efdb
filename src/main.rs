//! Formcoach - Headless exercise-tracking session controller
//!
//! Main entry point for the CLI application.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use formcoach::{
    analysis::{HttpAnalysisGateway, HttpSessionService, NoopSessionService, SessionService},
    clock::SystemClock,
    config::Config,
    controller::{Collaborators, SessionController},
    voice::build_speaker,
    web::WebServer,
    AppState, SessionCommand,
};

/// Formcoach - real-time exercise form coaching
#[derive(Parser, Debug)]
#[command(name = "formcoach", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// HTTP server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Rep count that ends a session automatically (0 disables)
    #[arg(short, long)]
    target_reps: Option<u32>,

    /// Pose-analysis endpoint (overrides config)
    #[arg(long)]
    analysis_url: Option<String>,

    /// Disable spoken feedback
    #[arg(long)]
    no_voice: bool,

    /// Disable HTTP server
    #[arg(long)]
    no_http: bool,

    /// Start a session immediately
    #[arg(long)]
    start: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", formcoach::NAME, formcoach::VERSION);

    let config = load_config(&args)?;

    info!("Analysis endpoint: {}", config.analysis.url);
    info!("Sample interval: {}ms", config.session.sample_interval_ms);
    info!("Voice feedback: {}", config.voice.enabled);
    info!("HTTP server: {}", config.http.enabled);

    let (state, commands) = AppState::new(config.clone());

    // Wire the controller's collaborators
    let gateway = Arc::new(HttpAnalysisGateway::new(&config.analysis)?);
    let service: Arc<dyn SessionService> = if config.session_service.enabled {
        Arc::new(HttpSessionService::new(&config.session_service)?)
    } else {
        info!("Session service disabled");
        Arc::new(NoopSessionService)
    };

    let controller = SessionController::new(
        Arc::clone(&state),
        &config,
        Collaborators {
            source: state.frames.clone(),
            gateway,
            service,
            speaker: build_speaker(&config.voice, state.speech_tx.clone()),
            clock: Arc::new(SystemClock),
        },
    );

    let controller_task = tokio::spawn(async move {
        if let Err(e) = controller.run(commands).await {
            error!("Session controller error: {}", e);
        }
    });

    // Start HTTP server if enabled
    if config.http.enabled {
        let http_state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = run_http_server(http_state).await {
                error!("HTTP server error: {}", e);
            }
        });
    }

    if args.start {
        if let Err(e) = state.request(SessionCommand::Start { target_reps: None }).await {
            warn!("Could not start session: {}", e);
        }
    }

    // Wait for Ctrl+C / SIGTERM
    shutdown_signal().await;
    info!("Shutdown signal received");
    state.shutdown();

    // Give tasks a moment to clean up
    let _ = tokio::time::timeout(tokio::time::Duration::from_millis(500), controller_task).await;

    info!("Formcoach stopped");
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.http.port = port;
    }
    if let Some(target) = args.target_reps {
        config.session.default_target_reps = target;
    }
    if let Some(ref url) = args.analysis_url {
        config.analysis.url = url.clone();
    }
    if args.no_voice {
        config.voice.enabled = false;
    }
    if args.no_http {
        config.http.enabled = false;
    }

    config.validate()?;
    Ok(config)
}

async fn run_http_server(state: Arc<AppState>) -> anyhow::Result<()> {
    let http_config = state.config.read().await.http.clone();

    let web_server = WebServer::new(Arc::clone(&state), &http_config);
    let addr = web_server.addr();
    let app = web_server.router();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| formcoach::error::WebError::Bind(format!("{}: {}", addr, e)))?;
    info!("HTTP server listening on {}", addr);

    let mut shutdown_rx = state.subscribe_shutdown();

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
