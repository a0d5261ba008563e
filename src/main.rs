use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use gridchat::{chat, constants, web_server, Config, GeminiClient, Orchestrator};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Gemini API key.
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model name [default: gemini-1.5-flash]
    #[arg(long, global = true, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Gemini API base URL [default: the public endpoint]
    #[arg(long, global = true, env = "GEMINI_API_BASE")]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

// Define the available subcommands
#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the chatbot web server.
    Serve {
        #[arg(long, default_value_t = constants::DEFAULT_PORT, help = "Port for the web server.")]
        port: u16,
        #[arg(long, help = "Directory holding the page templates.")]
        templates_dir: Option<PathBuf>,
        #[arg(long, help = "Directory served under /static.")]
        static_dir: Option<PathBuf>,
        #[arg(
            long,
            default_value_t = constants::SESSION_IDLE_TIMEOUT.as_secs(),
            help = "Drop browser sessions idle for this many seconds."
        )]
        session_idle_secs: u64,
    },
    /// Ask a single question and print the answer.
    Ask {
        /// The question to ask.
        question: String,
    },
    /// Engage in a text-based chat session in the terminal.
    Chat,
}

// The main entry point of the application, using tokio's async runtime
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for GEMINI_API_KEY and friends)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG environment variable (e.g., RUST_LOG=info,gridchat=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Parse command-line arguments
    let cli = Cli::parse();

    info!("gridchat starting with command: {:?}", cli.command);

    // Fail before any request if the credential is missing
    let config = Config::resolve(cli.api_key, cli.model, cli.api_base)
        .context("Invalid configuration")?;
    info!(?config, "Configuration loaded");

    let orchestrator = Orchestrator::new(Arc::new(GeminiClient::new(&config)));

    match cli.command {
        Commands::Serve {
            port,
            templates_dir,
            static_dir,
            session_idle_secs,
        } => {
            let templates_dir =
                templates_dir.unwrap_or_else(|| PathBuf::from(constants::TEMPLATES_DIR.as_str()));
            let static_dir =
                static_dir.unwrap_or_else(|| PathBuf::from(constants::STATIC_DIR.as_str()));
            info!("Starting gridchat web server on port {}...", port);

            let state = web_server::AppState::new(orchestrator, templates_dir)
                .with_session_idle_timeout(Duration::from_secs(session_idle_secs));
            let server = web_server::start_web_server(port, state, &static_dir);
            tokio::pin!(server);

            // Run until the server stops or Ctrl-C arrives
            tokio::select! {
                res = &mut server => {
                    if let Err(e) = &res {
                        error!("Web server failed: {:?}", e);
                    }
                    res?;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl-C received, shutting down.");
                }
            }
        }
        Commands::Ask { question } => {
            if question.trim().is_empty() {
                anyhow::bail!("Ask a question about the smart grid.");
            }
            let mut log = gridchat::ConversationLog::new();
            println!("You asked: {}", question);
            let outcome = orchestrator
                .handle_turn(&question, &mut log)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            print!("{}", chat::format_outcome(&outcome));
        }
        Commands::Chat => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            chat::run_chat(&orchestrator, stdin, tokio::io::stdout())
                .await
                .context("Chat session failed")?;
        }
    }

    Ok(())
}
