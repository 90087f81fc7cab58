//! Pushes 100 documents through a 10-worker pool behind a 5-per-second limiter.
use paceline::prelude::*;
use paceline::{DispatchPool, Document, RecordingSubmitter};
use std::time::Duration;
use tokio::time::Instant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let limiter = RateLimiter::builder()
        .capacity(5)
        .window(Duration::from_secs(1))
        .sink(LogSink)
        .build()?;
    let submitter = RecordingSubmitter::new().with_latency(Duration::from_millis(150));
    let client = DocumentClient::new(limiter, submitter);
    let pool = DispatchPool::spawn(client.clone(), 10, 100);

    let start = Instant::now();
    let mut handles = Vec::with_capacity(100);
    for n in 0..100 {
        let doc = Document::sample("2026-10-19").with_doc_id(n.to_string());
        handles.push(pool.submit(doc, format!("Signature {}", n)).await?);
    }

    let mut failed = 0;
    for handle in handles {
        if let Err(e) = handle.wait().await {
            eprintln!("submission failed: {}", e);
            failed += 1;
        }
    }
    pool.shutdown().await;

    let sent = client.submitter().submissions();
    println!("sent {} documents in {:?} ({} failed)", sent.len(), start.elapsed(), failed);
    for (second, batch) in sent.chunks(5).enumerate().take(3) {
        let offsets: Vec<_> = batch.iter().map(|s| s.at - start).collect();
        println!("  batch {}: {:?}", second, offsets);
    }
    Ok(())
}
