use async_nats::Client;
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, warn};
use tryhard::{RetryFutureConfig, retry_fn};

/// Newline-separated access-log lines from one NATS message.
pub type Chunk = String;

const CONNECT_ATTEMPTS: u32 = 10;

async fn connect(nats_url: &str) -> Result<Client, async_nats::ConnectError> {
    let config = RetryFutureConfig::new(CONNECT_ATTEMPTS)
        .exponential_backoff(Duration::from_millis(100))
        .max_delay(Duration::from_secs(5));
    retry_fn(|| async {
        info!(url = nats_url, "connecting to NATS");
        async_nats::connect(nats_url).await
    })
    .with_config(config)
    .await
}

/// Decodes a payload lossily. Payloads without any non-blank content carry
/// no lines and yield `None`.
fn decode_chunk(payload: &[u8]) -> Option<Chunk> {
    let chunk = String::from_utf8_lossy(payload);
    if chunk.trim().is_empty() {
        return None;
    }
    Some(chunk.into_owned())
}

/// Forwards every non-blank payload published on `subject` until the
/// subscription ends or the worker side hangs up.
pub async fn consume_nats(
    nats_url: String,
    subject: String,
    tx: Sender<Chunk>,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = connect(&nats_url).await?;
    let mut sub = client.subscribe(subject.clone()).await?;
    info!(%subject, "subscribed");

    let mut forwarded = 0u64;
    while let Some(msg) = sub.next().await {
        let Some(chunk) = decode_chunk(&msg.payload) else {
            debug!(%subject, "skipping blank payload");
            continue;
        };
        if tx.send(chunk).await.is_err() {
            warn!(%subject, forwarded, "worker closed, stopping ingest");
            return Ok(());
        }
        forwarded += 1;
    }
    warn!(%subject, forwarded, "NATS subscription ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use asserting::prelude::*;

    #[test]
    fn blank_payloads_are_skipped() {
        assert_that!(decode_chunk(b"")).is_none();
        assert_that!(decode_chunk(b" \n\n\t")).is_none();
    }

    #[test]
    fn payload_is_decoded_lossily() {
        let chunk = decode_chunk(b"a \xff GET /x 200 -\n").unwrap();
        assert_eq!(chunk, "a \u{fffd} GET /x 200 -\n");
    }
}
