//! Round-trip benchmark suite.
//!
//! Measures the cost of one message crossing to the background and back:
//! - one-shot `PING` via `send_request`
//! - `PING` posted on an open port
//!
//! Run with: cargo bench --bench round_trip
//! Results saved to: target/criterion/

use criterion::{Criterion, criterion_group, criterion_main};
use tokio::runtime::Runtime;
use webext_messaging::{Extension, Message, PortEvent};

// ============================================================================
// Benchmark: One-shot
// ============================================================================

fn bench_one_shot(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let extension = rt.block_on(async { Extension::builder().start() }).expect("start");
    let popup = &extension.popup();

    c.bench_function("one_shot_ping", |b| {
        b.to_async(&rt).iter(|| async move {
            popup
                .send_request(Message::ping())
                .await
                .expect("ping response")
        });
    });

    rt.block_on(extension.shutdown());
}

// ============================================================================
// Benchmark: Port
// ============================================================================

fn bench_port(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let extension = rt.block_on(async { Extension::builder().start() }).expect("start");
    let content = extension
        .content_script("https://example.com/", 1)
        .expect("content connection");
    let port = &tokio::sync::Mutex::new(content.connect("content-script-port").expect("connect"));

    c.bench_function("port_ping", |b| {
        b.to_async(&rt).iter(|| async move {
            let mut port = port.lock().await;
            port.post(&Message::ping()).expect("post");
            match port.recv().await {
                Some(PortEvent::Message(response)) => response,
                other => panic!("unexpected port event: {other:?}"),
            }
        });
    });

    rt.block_on(extension.shutdown());
}

criterion_group!(benches, bench_one_shot, bench_port);
criterion_main!(benches);
