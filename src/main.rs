//! betstream binary entry point.
//!
//! Wires configuration, the tracing subscriber, the shutdown monitor and
//! the session together, then maps the terminal session state onto the
//! process exit code.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use betstream::config::{Args, ClientConfig};
use betstream::{shutdown, Session};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match ClientConfig::load(Args::parse()) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "configuration rejected");
            return ExitCode::FAILURE;
        }
    };

    info!(
        client_id = %config.id,
        server = %config.server_address,
        data_file = %config.data_file.display(),
        "starting bet upload session"
    );

    let cancel = shutdown::spawn_monitor();
    let mut session = Session::new(config, cancel);

    // The terminal outcome was already logged by the session.
    match session.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
