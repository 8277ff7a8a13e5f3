use futures_util::StreamExt;
use std::time::Duration;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::nats;
use tokio::{process::Command, time::timeout};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn publishes_gateway_batches() {
    // Start NATS container using testcontainers-modules
    let container = nats::Nats::default().start().await.unwrap();
    let port = container.get_host_port_ipv4(4222).await.unwrap();
    let nats_url = format!("nats://127.0.0.1:{port}");

    let client = async_nats::connect(&nats_url)
        .await
        .expect("Failed to connect to NATS");
    let subject = "logs";
    let mut subscription = client.subscribe(subject.to_string()).await.unwrap();
    client.flush().await.unwrap();

    let mut child = Command::new(env!("CARGO_BIN_EXE_noise-maker"))
        .args([
            "--nats-url",
            &nats_url,
            "--subject",
            subject,
            "--rate",
            "50",
            "--batch-size",
            "5",
            "--format",
            "gateway",
        ])
        .spawn()
        .expect("Failed to start noise-maker");

    let message = timeout(Duration::from_secs(30), subscription.next())
        .await
        .expect("No batch published in time")
        .expect("Subscription closed");
    let data = String::from_utf8(message.payload.to_vec()).unwrap();
    let lines: Vec<&str> = data.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines.iter().all(|l| l.contains(" HTTP/1.1 ")));

    let _ = child.kill().await;
    let _ = child.wait().await;
}
