mod cmd;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use clarity_client::{HttpLimsClient, HttpSettings};
use clarity_core::{ClarityConfig, Direction};

#[derive(Parser)]
#[command(
    name = "clarity",
    about = "Clarity LIMS automation — fetch samples, resolve step history, route artifacts",
    version,
    propagate_version = true
)]
struct Cli {
    /// LIMS API base url, e.g. https://lims.example.org/api/v2/
    #[arg(long, global = true, env = "CLARITY_HOST")]
    host: Option<String>,

    #[arg(long, global = true, env = "CLARITY_USERNAME")]
    username: Option<String>,

    #[arg(long, global = true, env = "CLARITY_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Tunables file (YAML); defaults apply when omitted
    #[arg(long, global = true, env = "CLARITY_CONFIG")]
    config: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value = "60")]
    timeout: u64,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch sample records by uri
    GetSamples {
        /// Sample endpoint uris
        #[arg(required = true)]
        uris: Vec<String>,

        /// Don't resolve project names for the samples
        #[arg(long)]
        skip_projects: bool,
    },

    /// Route artifacts into a workflow step's queue, in batches
    Route {
        /// Target step uri
        #[arg(long = "step")]
        step_uri: String,

        /// Remove the artifacts from the queue instead of adding them
        #[arg(long)]
        unassign: bool,

        /// Override the configured uris-per-request batch size
        #[arg(long)]
        batch_size: Option<usize>,

        /// Artifact uris to route
        #[arg(required = true)]
        uris: Vec<String>,
    },

    /// Resolve each step artifact's ancestor at an earlier step
    PreviousStep {
        /// Step execution (process) uri holding the current artifacts
        #[arg(long = "process")]
        process_uri: String,

        /// Name of the earlier step to resolve ancestors at
        #[arg(long = "step")]
        step_name: String,

        /// Which side of the current step to walk back from
        #[arg(long, value_enum, default_value = "output")]
        direction: DirectionArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DirectionArg {
    Input,
    Output,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Input => Direction::Input,
            DirectionArg::Output => Direction::Output,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = build_client(&cli)?;
    let config = match &cli.config {
        Some(path) => ClarityConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ClarityConfig::default(),
    };

    match cli.command {
        Commands::GetSamples {
            ref uris,
            skip_projects,
        } => cmd::get_samples::run(&client, uris, !skip_projects, cli.json).await,
        Commands::Route {
            ref step_uri,
            unassign,
            batch_size,
            ref uris,
        } => {
            let mut router_config = config.router;
            if let Some(size) = batch_size {
                router_config.batch_size = size;
            }
            cmd::route::run(&client, router_config, step_uri, uris, unassign, cli.json).await
        }
        Commands::PreviousStep {
            ref process_uri,
            ref step_name,
            direction,
        } => {
            cmd::previous_step::run(
                &client,
                config.walker,
                process_uri,
                step_name,
                direction.into(),
                cli.json,
            )
            .await
        }
    }
}

fn build_client(cli: &Cli) -> anyhow::Result<HttpLimsClient> {
    let host = cli
        .host
        .as_deref()
        .context("no LIMS host: pass --host or set CLARITY_HOST")?;
    let username = cli
        .username
        .as_deref()
        .context("no LIMS username: pass --username or set CLARITY_USERNAME")?;

    let mut settings = HttpSettings::new(host, username, cli.password.clone());
    settings.timeout = Duration::from_secs(cli.timeout);
    HttpLimsClient::new(settings).context("failed to build HTTP client")
}
