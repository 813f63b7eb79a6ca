mod app;
mod channel;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use conduit_config::{ConduitConfig, env};
use conduit_dispatch::{Command, NoopAcknowledger};
use conduit_worker::ChannelId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::App;

/// Conduit - chat commands that drive workflow instances
#[derive(Parser)]
#[command(name = "conduit")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to a JSON configuration file
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Path to the data directory (default: ~/.conduit)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Where uploaded files are written (default: <data-dir>/uploads)
  #[arg(long, global = true)]
  out_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Read commands from stdin, one per line (e.g. `/weather Seattle`)
  Serve,

  /// Run a single command and wait for it to finish
  Run {
    /// Command name: weather, export or label
    name: String,

    /// Command arguments
    args: Vec<String>,
  },

  /// Deploy the configured process artifact and print its definition
  Deploy {
    /// Artifact to deploy instead of the configured one
    artifact: Option<PathBuf>,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let dotenv_loaded = env::load_dotenv();
  init_tracing();
  if dotenv_loaded {
    info!("loaded .env");
  }

  let mut config =
    ConduitConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
  env::apply_env(&mut config);

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".conduit"),
  };
  let out_dir = cli.out_dir.unwrap_or_else(|| data_dir.join("uploads"));

  let rt = tokio::runtime::Runtime::new()?;
  match cli.command {
    Some(Commands::Serve) => rt.block_on(serve(config, out_dir)),
    Some(Commands::Run { name, args }) => rt.block_on(run_once(config, out_dir, name, args)),
    Some(Commands::Deploy { artifact }) => rt.block_on(deploy(config, out_dir, artifact)),
    None => {
      println!("conduit - use --help to see available commands");
      Ok(())
    }
  }
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

async fn serve(config: ConduitConfig, out_dir: PathBuf) -> Result<()> {
  let cancel = CancellationToken::new();
  let app = App::start(&config, out_dir, cancel.clone()).await?;
  let reply = ChannelId::new("stdin");

  info!("reading commands from stdin");
  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  loop {
    tokio::select! {
      _ = tokio::signal::ctrl_c() => {
        info!("interrupted, cancelling running commands");
        cancel.cancel();
        break;
      }
      line = lines.next_line() => {
        let Some(line) = line.context("failed to read stdin")? else {
          break;
        };
        match Command::from_line(&line, reply.clone()) {
          Ok(Some(command)) => {
            if let Err(e) = app.dispatcher.dispatch(command, &NoopAcknowledger).await {
              warn!(error = %e, "command not dispatched");
            }
          }
          Ok(None) => {}
          Err(e) => println!("[{reply}] {e}"),
        }
      }
    }
  }

  app.shutdown().await;
  Ok(())
}

async fn run_once(
  config: ConduitConfig,
  out_dir: PathBuf,
  name: String,
  args: Vec<String>,
) -> Result<()> {
  let command = Command::parse(&name, &args.join(" "), ChannelId::new("cli"))?;

  let cancel = CancellationToken::new();
  let app = App::start(&config, out_dir, cancel.clone()).await?;

  let interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      interrupt.cancel();
    }
  });

  app
    .dispatcher
    .dispatch(command, &NoopAcknowledger)
    .await
    .context("failed to dispatch command")?;
  app.shutdown().await;
  Ok(())
}

async fn deploy(config: ConduitConfig, out_dir: PathBuf, artifact: Option<PathBuf>) -> Result<()> {
  let artifact = artifact.unwrap_or_else(|| config.weather.artifact_path.clone());
  let app = App::start(&config, out_dir, CancellationToken::new()).await?;

  let definition = app
    .orchestrator
    .deploy(&artifact)
    .await
    .with_context(|| format!("failed to deploy {}", artifact.display()))?;
  println!("{}", serde_json::to_string_pretty(&definition)?);

  app.shutdown().await;
  Ok(())
}
