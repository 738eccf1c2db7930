use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use duplex_voice::{
    ClientConfig,
    core::devices,
    core::session::{
        CredentialProvider, SessionComponents, SessionController, SessionState, SetupBuilder,
        StatusCallback, StatusUpdate, StatusVariant, TokenEndpointClient, TranscriptCallback,
        WebSocketConnector, redact_url,
    },
    core::transcript::TranscriptUpdate,
};

/// Duplex voice - barge-in capable voice sessions with a live model
#[derive(Parser, Debug)]
#[command(name = "duplex-voice")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a live session on the default audio devices (default)
    Run,

    /// Fetch a credential and print what it grants
    Token,

    /// Print the default session setup payload
    Setup {
        /// Model to request
        #[arg(long)]
        model: Option<String>,

        /// Prebuilt voice to request
        #[arg(long)]
        voice: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    // Parse CLI arguments
    let cli = Cli::parse();

    if let Some(Commands::Setup { model, voice }) = &cli.command {
        let setup = SetupBuilder::new()
            .model(model.as_deref().unwrap_or_default())
            .voice(voice.as_deref().unwrap_or_default())
            .build();
        println!("{}", serde_json::to_string_pretty(&setup)?);
        return Ok(());
    }

    // Load configuration from file or environment
    let config = if let Some(config_path) = &cli.config {
        println!("Loading configuration from {}", config_path.display());
        ClientConfig::from_file(config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        ClientConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    match cli.command {
        Some(Commands::Token) => print_token(config).await,
        _ => run_session(config).await,
    }
}

async fn print_token(config: ClientConfig) -> anyhow::Result<()> {
    let client = TokenEndpointClient::new(config.token)?;
    let token = client.fetch().await?;

    println!("model:    {}", token.model.as_deref().unwrap_or("-"));
    println!("voice:    {}", token.voice.as_deref().unwrap_or("-"));
    println!("expires:  {}", token.expires_at.as_deref().unwrap_or("-"));
    println!(
        "endpoint: {}",
        redact_url(token.endpoint(&config.session.ws_endpoint))
    );
    Ok(())
}

async fn run_session(config: ClientConfig) -> anyhow::Result<()> {
    if !devices::is_supported() {
        anyhow::bail!("This build has no audio device support; rebuild with --features device-audio");
    }

    let components = SessionComponents {
        credentials: Arc::new(TokenEndpointClient::new(config.token)?),
        connector: Arc::new(WebSocketConnector::new()),
        microphone: devices::default_microphone(),
        output: devices::default_output(),
    };

    let mut controller = SessionController::new(config.session, components);
    let status_callback: StatusCallback = Arc::new(|status: StatusUpdate| {
        Box::pin(async move {
            match status.variant {
                StatusVariant::Error => eprintln!("[error] {}", status.message),
                _ => println!("[{}] {}", status.variant, status.message),
            }
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let transcript_callback: TranscriptCallback = Arc::new(|update: TranscriptUpdate| {
        Box::pin(async move {
            if update.is_final {
                println!("{}: {}", update.speaker, update.text);
            }
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    controller.on_status(status_callback);
    controller.on_transcript(transcript_callback);

    let session = controller.spawn();
    session.start().await?;
    println!("Press Enter or Ctrl-C to stop.");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    tokio::select! {
        _ = stdin.next_line() => info!("Stop requested"),
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        _ = session.wait_for_state(SessionState::Idle) => info!("Session ended"),
    }

    session.shutdown().await;
    Ok(())
}
