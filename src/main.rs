use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use lipsync_worker::{
    AppState, Job, JobHandler, WorkerConfig, handlers::run_job, init, routes, utils,
};

/// Lip-sync analysis worker
#[derive(Parser, Debug)]
#[command(name = "lipsync-worker")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single job from a JSON file and print the response
    Run {
        /// Job file
        #[arg(short = 'i', long = "input", default_value = utils::TEST_INPUT_FILE)]
        input: PathBuf,
    },

    /// Serve the worker HTTP API
    Serve,

    /// Build a job file from an audio file
    CreateTestInput {
        /// Audio file to embed
        file: PathBuf,

        /// Where to write the job
        #[arg(short = 'o', long = "output", default_value = utils::TEST_INPUT_FILE)]
        output: PathBuf,
    },

    /// Verify runtime prerequisites
    Init,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<WorkerConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            WorkerConfig::from_file(path).map_err(|e| anyhow!(e.to_string()))
        }
        None => WorkerConfig::from_env().map_err(|e| anyhow!(e.to_string())),
    }
}

async fn run_once(config: WorkerConfig, input: &Path) -> anyhow::Result<()> {
    let contents = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read job file {}", input.display()))?;
    let job: Job = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid job JSON in {}", input.display()))?;

    let handler = Arc::new(
        JobHandler::new(Arc::new(config)).map_err(|e| anyhow!(e.to_string()))?,
    );
    let response = run_job(handler, job).await;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn serve(config: WorkerConfig) -> anyhow::Result<()> {
    let address = config.address();
    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    let router = routes::api::create_api_router(&config);
    let app_state = AppState::new(config).map_err(|e| anyhow!(e.to_string()))?;
    let app = router.with_state(app_state);

    info!("Worker listening on http://{}", socket_addr);
    let listener = TcpListener::bind(&socket_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Must happen before any TLS connection is attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::CreateTestInput { file, output } => {
            let job = utils::build_test_job(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            utils::write_test_job(&job, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("JSON saved to {}", output.display());
        }
        Commands::Init => {
            let config = load_config(config_path)?;
            init::run(&config).await?;
            println!("All runtime prerequisites are satisfied");
        }
        Commands::Run { input } => {
            let config = load_config(config_path)?;
            run_once(config, &input).await?;
        }
        Commands::Serve => {
            let config = load_config(config_path)?;
            serve(config).await?;
        }
    }

    Ok(())
}
