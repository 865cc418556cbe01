//! specrun remote-run server binary entry point
//!
//! Run with: specrun-server [--port PORT]
//!
//! Listens for `specrun --drb` clients until interrupted. This build has no specs compiled in; programs
//! that register their own specs serve them with `specrun::remote::serve` and a `RunService`.

use std::env;
use std::process;
use std::sync::Arc;

use clap::Parser;
use specrun::SpecCatalog;
use specrun::remote::{RunService, serve};
use specrun::runner::{DEFAULT_DRB_HOST, DRB_PORT_ENV, Runner, resolve_drb_port};
use tokio::net::TcpListener;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(name = "specrun-server", version, about = "Serve specrun runs to --drb clients")]
struct Args {
    /// Port to listen on [default: $SPECRUN_DRB or 8989]
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = DEFAULT_DRB_HOST)]
    host: String,
}

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let args = Args::parse();
    let port = resolve_drb_port(args.port, env::var(DRB_PORT_ENV).ok().as_deref());

    let listener = match TcpListener::bind((args.host.as_str(), port)).await {
        Ok(listener) => listener,
        Err(error) => {
            eprintln!("could not listen on {}:{}: {}", args.host, port, error);
            process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
            let _ = shutdown_tx.send(true);
        }
    });

    let service = RunService::new(Runner::new(Arc::new(SpecCatalog::new())));
    if let Err(error) = serve(listener, Arc::new(service), shutdown_rx).await {
        eprintln!("server error: {}", error);
        process::exit(1);
    }
}
