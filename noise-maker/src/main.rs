mod args;
mod generator;
mod stream;

use args::CliArgs;
use clap::Parser;
use stream::run_log_stream;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = CliArgs::parse();
    info!(
        rate = args.rate(),
        batch_size = args.batch_size(),
        format = ?args.format(),
        "starting log stream"
    );

    tokio::select! {
        result = run_log_stream(
            *args.rate(),
            *args.batch_size(),
            *args.format(),
            args.nats_url(),
            args.subject(),
        ) => {
            if let Err(e) = result {
                error!("log stream failed: {e}");
            }
        }
        _ = signal::ctrl_c() => info!("stopping log generation"),
    }
}
