use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transcribot::config::{BotConfig, BotContext, ContextError, MissingVar};
use transcribot::daemon::{Daemon, DaemonError};
use transcribot::forum::{RedditClient, RedditCredentials};
use transcribot::workflow::{BlossomClient, WorkflowClient, WorkflowError};

#[derive(Debug, Parser)]
#[command(version, about = "Posts OCR transcriptions as threaded Reddit comments")]
struct Args {
    /// Run against non-production credentials and the debug community
    #[arg(long)]
    debug: bool,

    /// Run the daemon loop without taking any action
    #[arg(long)]
    noop: bool,
}

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] MissingVar),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("could not resolve own identity: {0}")]
    Identity(#[from] WorkflowError),

    #[error(transparent)]
    Daemon(#[from] DaemonError),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transcribot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "bot terminated");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), StartupError> {
    let config = BotConfig::from_env(args.debug, args.noop);

    let workflow = BlossomClient::from_env()?;
    let me = workflow.me(&config.bot_username).await?;

    let credentials = RedditCredentials::from_env(config.user_agent())?;
    let forum = RedditClient::new(credentials);

    let ctx = BotContext::new(config, me)?;
    info!(me = %ctx.me, "bot built and initialized");

    let shutdown = CancellationToken::new();
    spawn_interrupt_handler(shutdown.clone());

    let daemon = Daemon::new(workflow, forum, ctx);
    daemon.run(shutdown).await?;
    Ok(())
}

/// First interrupt asks the loop to finish the cycle in flight; a second one
/// terminates immediately.
fn spawn_interrupt_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("interrupt handler unavailable; shut down externally");
            return;
        }
        info!("interrupt received; finishing the current cycle (press Ctrl-C again to abort)");
        shutdown.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            error!("second interrupt; terminating immediately");
            std::process::exit(1);
        }
    });
}
