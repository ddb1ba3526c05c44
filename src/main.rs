use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use shellport::config::ServerConfig;
use shellport::server::{Acceptor, StopReason};
use shellport::shell::{Binding, BindingShell};

/// Serve a shared variable-binding shell over TCP.
#[derive(Debug, Parser)]
#[command(name = "shellport", version)]
struct Cli {
    /// Port to listen on, on all local interfaces.
    #[arg(short, long, env = "SHELLPORT_PORT", allow_negative_numbers = true)]
    port: i64,

    /// Bounded wait for each accept call, in milliseconds.
    #[arg(long, env = "SHELLPORT_ACCEPT_TIMEOUT_MS", default_value_t = 1000)]
    accept_timeout_ms: u64,

    /// Script run at the start of every session. Repeatable.
    #[arg(short, long = "script", value_name = "SCRIPT")]
    scripts: Vec<String>,

    /// Directory relative script paths are resolved against.
    #[arg(long, env = "SHELLPORT_SCRIPT_DIR")]
    script_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::new(cli.port)
        .with_accept_timeout(Duration::from_millis(cli.accept_timeout_ms))
        .with_startup_scripts(cli.scripts);

    let mut shell = BindingShell::new(Binding::new());
    if let Some(dir) = cli.script_dir {
        shell = shell.with_script_dir(dir);
    }

    let acceptor = match Acceptor::start(&config, Arc::new(shell)).await {
        Ok(acceptor) => acceptor,
        Err(e) => {
            error!(error = %e, "failed to start shell server");
            return Err(e.into());
        }
    };
    let handle = acceptor.handle();
    let server = acceptor.spawn();

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("interrupt received, shutting down");
            handle.shutdown();
            handle.stopped().await;
        }
        _ = handle.stopped() => {}
    }

    match server.await? {
        StopReason::Shutdown => Ok(()),
        reason => Err(reason.into()),
    }
}
