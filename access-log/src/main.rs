mod analytics;
mod ingest;
mod invariants;
mod metric;
mod metrics_server;
mod models;
mod parser;
mod prometheus;
mod worker;

use analytics::Analytics;
use clap::Parser;
use ingest::{Chunk, consume_nats};
use metric::{AccessLogParser, Metric, Tags};
use std::sync::Arc;
use tokio::{
    sync::mpsc::{self, Receiver, Sender},
    task::{JoinError, JoinHandle},
    try_join,
};
use tracing::error;
use tracing_subscriber::EnvFilter;
use worker::worker_loop;

const INGEST_BUFFER_SIZE: usize = 50;
const AGGREGATOR_BUFFER_SIZE: usize = 5;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "nats://127.0.0.1:4222")]
    nats_url: String,

    #[arg(long, default_value = "logs")]
    subject: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Name attached to every produced metric.
    #[arg(long, default_value = "access_log")]
    metric_name: String,

    /// Default tag added to every metric, as KEY=VALUE. Repeatable.
    #[arg(long = "tag", value_parser = parse_tag)]
    tags: Vec<(String, String)>,
}

fn parse_tag(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    if key.is_empty() {
        return Err(format!("tag key is empty in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), JoinError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let parser = AccessLogParser::new(args.metric_name, args.tags.into_iter().collect::<Tags>());
    let analytics = Arc::new(Analytics::default());
    let metrics_handle = metrics_server::start(analytics.clone(), args.port);

    let (ingest_tx, ingest_rx) = mpsc::channel(INGEST_BUFFER_SIZE);
    let (aggregator_tx, aggregator_rx) = mpsc::channel::<Vec<Metric>>(AGGREGATOR_BUFFER_SIZE);

    let nats_handle = spawn_nats_ingest(args.nats_url, args.subject, ingest_tx);
    let worker_handle = spawn_workers(parser, ingest_rx, aggregator_tx);
    let aggregator_handle = spawn_aggregator(aggregator_rx, &analytics);

    try_join!(
        nats_handle,
        worker_handle,
        aggregator_handle,
        metrics_handle
    )?;

    Ok(())
}

fn spawn_nats_ingest(nats_url: String, subject: String, tx: Sender<Chunk>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = consume_nats(nats_url, subject, tx).await {
            error!("NATS ingest error: {e}");
        }
    })
}

fn spawn_workers(
    parser: AccessLogParser,
    rx: Receiver<Chunk>,
    tx: Sender<Vec<Metric>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        worker_loop(parser, tx, rx).await;
    })
}

fn spawn_aggregator(mut rx: Receiver<Vec<Metric>>, analytics: &Arc<Analytics>) -> JoinHandle<()> {
    let analytics_clone = analytics.clone();
    tokio::spawn(async move {
        while let Some(batch) = rx.recv().await {
            for metric in &batch {
                analytics_clone.record(metric);
            }
        }
    })
}
