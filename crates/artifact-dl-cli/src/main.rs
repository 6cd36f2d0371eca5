// artifact-dl - serve or resolve CI build artifact download links

use std::net::SocketAddr;

use artifact_dl_server::resolve::{ArtifactTarget, BranchTarget, RunTarget};
use artifact_dl_server::{build_app, build_resolver, ServerConfig, Target};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// artifact-dl - direct links to CI build artifacts
#[derive(Parser)]
#[command(name = "artifact-dl")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    upstream: UpstreamArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct UpstreamArgs {
    /// API token sent as a bearer credential on every upstream call
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,

    /// Upstream REST API root
    #[arg(long, env = "GITHUB_API_URL", default_value = artifact_dl_server::config::DEFAULT_API_BASE)]
    api_base: Url,

    /// Upstream web UI root, used for check suite links
    #[arg(long, env = "GITHUB_WEB_URL", default_value = artifact_dl_server::config::DEFAULT_WEB_BASE)]
    web_base: Url,

    /// Public path the service is mounted under, e.g. /github_artifact
    #[arg(long, env = "ARTIFACT_DL_PREFIX", default_value = "")]
    prefix: String,
}

impl UpstreamArgs {
    fn config(&self) -> ServerConfig {
        ServerConfig::new(self.token.clone())
            .with_api_base(self.api_base.clone())
            .with_web_base(self.web_base.clone())
            .with_prefix(&self.prefix)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Address to listen on
        #[arg(long, env = "BIND_ADDRESS", default_value = "127.0.0.1:5000")]
        bind: SocketAddr,
    },
    /// Print every link to an artifact, least to most direct
    Resolve {
        #[command(subcommand)]
        target: TargetCommand,
    },
}

#[derive(Subcommand)]
enum TargetCommand {
    /// Latest successful push run of a workflow on a branch
    Branch {
        org: String,
        repo: String,
        /// Workflow file name, bare name (".yml" is appended) or numeric id
        workflow: String,
        branch: String,
        artifact: String,
    },
    /// A named artifact of a specific run
    Run {
        org: String,
        repo: String,
        run_id: u64,
        artifact: String,
    },
    /// An artifact by id
    Artifact {
        org: String,
        repo: String,
        artifact_id: u64,
    },
}

impl From<TargetCommand> for Target {
    fn from(command: TargetCommand) -> Self {
        match command {
            TargetCommand::Branch {
                org,
                repo,
                workflow,
                branch,
                artifact,
            } => BranchTarget {
                org,
                repo,
                workflow,
                branch,
                artifact,
            }
            .into(),
            TargetCommand::Run {
                org,
                repo,
                run_id,
                artifact,
            } => RunTarget {
                org,
                repo,
                run_id,
                artifact,
            }
            .into(),
            TargetCommand::Artifact {
                org,
                repo,
                artifact_id,
            } => ArtifactTarget {
                org,
                repo,
                artifact_id,
            }
            .into(),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "artifact_dl_server=info,artifact_dl=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.upstream.config();

    let result = match cli.command {
        Commands::Serve { bind } => handle_serve(&config, bind).await,
        Commands::Resolve { target } => handle_resolve(&config, target.into()).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn handle_serve(config: &ServerConfig, bind: SocketAddr) -> anyhow::Result<()> {
    let app = build_app(config)?;
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", bind, e))?;

    tracing::info!("Listening on http://{}{}/", bind, config.prefix);
    tracing::info!("Upstream API: {}", config.api_base);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn handle_resolve(config: &ServerConfig, target: Target) -> anyhow::Result<()> {
    let resolver = build_resolver(config)?;
    for url in resolver.resolve(&target).await? {
        println!("{}", url);
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
