use crate::ingest::Chunk;
use crate::metric::{AccessLogParser, Metric};
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{trace, warn};

const FLUSH_INTERVAL: Duration = Duration::from_secs(3);
const BUFFER_SIZE: usize = 10_000;

pub async fn worker_loop(
    parser: AccessLogParser,
    tx: Sender<Vec<Metric>>,
    mut rx: Receiver<Chunk>,
) {
    let mut buffer = Vec::with_capacity(BUFFER_SIZE);
    let mut flush = interval(FLUSH_INTERVAL);
    flush.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            maybe_chunk = rx.recv() => {
                match maybe_chunk {
                    Some(chunk) => {
                        for metric in parse_chunk(&parser, &chunk) {
                            trace!(record = %serde_json::to_string(&metric).unwrap_or_default(), "parsed");
                            buffer.push(metric);
                            if buffer.len() >= BUFFER_SIZE {
                                tx.send(buffer.split_off(0)).await.ok();
                            }
                        }
                    }
                    None => break,
                }
            }
            _ = flush.tick() => {
                if !buffer.is_empty() {
                    tx.send(buffer.split_off(0)).await.ok();
                }
            }
        }
    }
    if !buffer.is_empty() {
        tx.send(buffer).await.ok();
    }
}

/// One metric per non-blank line. Lines the metric layer rejects are logged
/// and dropped.
fn parse_chunk(parser: &AccessLogParser, chunk: &str) -> Vec<Metric> {
    chunk
        .split('\n')
        .filter_map(|line| match parser.parse(line.as_bytes()) {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                warn!(metric = parser.metric_name(), "dropping line: {e}");
                None
            }
        })
        .flatten()
        .collect()
}
