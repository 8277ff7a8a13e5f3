use crate::args::LogFormat;
use crate::generator::{generate_gateway_log, generate_minimal_log};
use async_nats::Client;
use rand::{SeedableRng, rngs::StdRng};
use tokio::time::{Duration, sleep};
use tracing::{debug, info};
use tryhard::{RetryFutureConfig, retry_fn};

const MAX_RATE_BEFORE_DISABLING_THROTTLING: u64 = 10_000;

pub async fn run_log_stream(
    rate: u64,
    batch_size: usize,
    format: LogFormat,
    nats_url: &str,
    subject: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = RetryFutureConfig::new(10)
        .exponential_backoff(Duration::from_millis(100))
        .max_delay(Duration::from_secs(5));

    let client: Client = retry_fn(|| async {
        info!(url = nats_url, "attempting to connect to NATS");
        async_nats::connect(nats_url).await
    })
    .with_config(config)
    .await?;

    let mut rng = StdRng::from_os_rng();
    let delay = batch_delay(rate, batch_size);

    loop {
        let mut buffer = String::with_capacity(batch_size * 128);
        for _ in 0..batch_size {
            let log_line = match format {
                LogFormat::Gateway => generate_gateway_log(&mut rng),
                LogFormat::Minimal => generate_minimal_log(&mut rng),
            };
            buffer.push_str(&log_line);
            buffer.push('\n');
        }
        client.publish(subject.to_string(), buffer.into()).await?;
        debug!(lines = batch_size, "published batch");

        if let Some(d) = delay {
            sleep(d).await;
        }
    }
}

/// Pause between batches so that `rate` lines go out per second.
fn batch_delay(rate: u64, batch_size: usize) -> Option<Duration> {
    if rate == 0 || batch_size == 0 || rate >= MAX_RATE_BEFORE_DISABLING_THROTTLING {
        return None;
    }
    Some(Duration::from_secs_f64(batch_size as f64 / rate as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_delay_spreads_rate_over_batches() {
        assert_eq!(batch_delay(10, 5), Some(Duration::from_millis(500)));
        assert_eq!(batch_delay(100, 100), Some(Duration::from_secs(1)));
        assert_eq!(batch_delay(MAX_RATE_BEFORE_DISABLING_THROTTLING, 10), None);
        assert_eq!(batch_delay(0, 10), None);
        assert_eq!(batch_delay(10, 0), None);
    }
}
