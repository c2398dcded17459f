mod backend;
mod client;
mod config;
mod error;
mod models;
mod parser;
mod pipeline;
mod preprocess;
mod prompt;
mod server;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use backend::Backend;
use clap::{Parser, Subcommand};
use client::DecodeClient;
use config::Config;
use pipeline::Analyzer;
use preprocess::PrepareOptions;
use reqwest::Client;
use server::AppState;
use session::Session;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "nutrition-decoder")]
#[command(about = "Reads nutrition labels with a vision model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the analysis HTTP server (default)
    Serve,

    /// Analyse label photos through a running server
    Decode {
        /// Label photos (front of pack, ingredient list, ...)
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Server base URL
        #[arg(short, long, env = "DECODER_SERVER", default_value = "http://localhost:3000")]
        server: String,

        /// Model override forwarded to the server
        #[arg(short, long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = match Client::builder().timeout(config.request_timeout).build() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let prepare = PrepareOptions {
        max_edge: config.max_image_edge,
        jpeg_quality: config.jpeg_quality,
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, client, prepare).await,
        Command::Decode {
            images,
            server,
            model,
        } => decode(client, prepare, server, images, model).await,
    }
}

async fn serve(config: Config, client: Client, prepare: PrepareOptions) -> ExitCode {
    let backend = Backend::from_config(&config, client);
    if config.api_key().is_none() {
        warn!(
            "No API key configured for {}; analysis requests will fail",
            backend.kind().as_str()
        );
    }

    info!(
        "Using {} backend (model: {})",
        backend.kind().as_str(),
        config.model.as_deref().unwrap_or(backend.default_model())
    );

    let state = Arc::new(AppState {
        analyzer: Analyzer::new(backend, config.model.clone(), config.request_timeout),
        prepare,
    });
    let app = server::router(state, config.static_dir.clone());

    let addr = format!("0.0.0.0:{}", config.port);
    info!("Server starting on {}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server failed: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn decode(
    client: Client,
    prepare: PrepareOptions,
    server: String,
    images: Vec<PathBuf>,
    model: Option<String>,
) -> ExitCode {
    let decoder = DecodeClient::new(client, server, prepare);
    let mut session = Session::new();

    if decoder.decode(&mut session, &images, model).await.is_err() {
        eprintln!(
            "Analysis failed: {}",
            session.message().unwrap_or("unknown error")
        );
        return ExitCode::FAILURE;
    }

    let code = match session.result().map(serde_json::to_string_pretty) {
        Some(Ok(json)) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Some(Err(e)) => {
            error!("Failed to render result: {}", e);
            ExitCode::FAILURE
        }
        None => ExitCode::FAILURE,
    };

    if let Err(e) = session.reset() {
        warn!("Session not reset: {}", e);
    }
    code
}
