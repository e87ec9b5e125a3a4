//! End-to-end messaging between transient contexts and the background.
//!
//! Time is paused in every test: simulated handler latency advances the
//! clock deterministically, and a zero elapsed time means the answer came
//! without any delay.

mod common;

use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};
use webext_messaging::background::{DEFAULT_PING_REPLY, DEFAULT_PORT_PING_REPLY, SHUTDOWN_REASON};
use webext_messaging::{
    Dispatch, DispatchTable, Extension, Message, MessageKind, Origin, PortEvent, PortState,
    Request, ResponderConfig, Response, SampleData,
};

use common::{PAGE_URL, TAB_ID, start_extension};

// ============================================================================
// One-shot
// ============================================================================

#[tokio::test(start_paused = true)]
async fn ping_resolves_without_delay() -> anyhow::Result<()> {
    let extension = start_extension()?;
    let content = extension.content_script(PAGE_URL, TAB_ID)?;

    let start = Instant::now();
    let response = assert_ok!(content.send_request(Message::ping()).await);

    assert_eq!(start.elapsed(), Duration::ZERO);
    assert!(response.is_success());
    assert_eq!(response.get_str(), Some(DEFAULT_PING_REPLY));

    extension.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn get_data_count_matches_users() -> anyhow::Result<()> {
    let extension = start_extension()?;
    let popup = extension.popup();

    let start = Instant::now();
    let response = popup.send_request(Message::get_data()).await?;
    assert!(start.elapsed() >= Duration::from_millis(1000));

    let data: SampleData = response.data_as()?;
    assert_eq!(data.count, data.users.len());
    assert_eq!(response.get_u64("count"), 3);

    extension.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn process_text_uppercases_and_is_idempotent() -> anyhow::Result<()> {
    let extension = start_extension()?;
    let content = extension.content_script(PAGE_URL, TAB_ID)?;

    let first = content
        .send_request(Message::process_text("Hello, World"))
        .await?;
    let upper = first.get_str().map(str::to_string);
    assert_eq!(upper.as_deref(), Some("HELLO, WORLD"));

    let second = content
        .send_request(Message::process_text(upper.unwrap_or_default()))
        .await?;
    assert_eq!(second.get_str(), first.get_str());

    extension.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn process_text_accepts_empty_string() -> anyhow::Result<()> {
    let extension = start_extension()?;
    let response = extension
        .popup()
        .send_request(Message::process_text(""))
        .await?;

    assert!(response.is_success());
    assert_eq!(response.get_str(), Some(""));

    extension.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn invalid_process_text_payload_fails_without_delay() -> anyhow::Result<()> {
    let extension = start_extension()?;
    let popup = extension.popup();

    let payloads = [
        None,
        Some(json!({})),
        Some(json!({ "text": 42 })),
        Some(json!({ "text": null })),
        Some(json!("bare string")),
    ];

    for payload in payloads {
        let start = Instant::now();
        let response = popup
            .send_request(Message::new(MessageKind::ProcessText, payload.clone()))
            .await?;

        assert_eq!(start.elapsed(), Duration::ZERO, "payload {payload:?}");
        assert!(!response.is_success());
        assert!(response.error().is_some_and(|e| !e.is_empty()));
    }

    extension.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unknown_kind_names_the_kind() -> anyhow::Result<()> {
    let extension = start_extension()?;
    let response = extension
        .popup()
        .send_request(Message::new("FETCH_WEATHER", None))
        .await?;

    assert!(!response.is_success());
    assert!(response.error().is_some_and(|e| e.contains("FETCH_WEATHER")));

    extension.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_rejects_in_flight_request() -> anyhow::Result<()> {
    let extension = start_extension()?;
    let content = extension.content_script(PAGE_URL, TAB_ID)?;

    let call = tokio::spawn(async move { content.send_request(Message::get_data()).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    extension.shutdown().await;

    let err = assert_err!(call.await?);
    assert!(err.is_channel_error());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn ping_is_not_blocked_by_pending_process_text() -> anyhow::Result<()> {
    let extension = start_extension()?;
    let content = extension.content_script(PAGE_URL, TAB_ID)?;

    let slow = {
        let content = content.clone();
        tokio::spawn(async move { content.send_request(Message::process_text("later")).await })
    };
    tokio::task::yield_now().await;

    let start = Instant::now();
    let ping = content.send_request(Message::ping()).await?;
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert!(ping.is_success());
    assert!(!slow.is_finished());

    let processed = slow.await??;
    assert_eq!(processed.get_str(), Some("LATER"));
    assert_eq!(content.pending_count(), 0);

    extension.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn timeout_gives_up_on_slow_request() -> anyhow::Result<()> {
    let extension = start_extension()?;
    let popup = extension.popup();

    let err = assert_err!(
        popup
            .send_request_with_timeout(Message::get_data(), Duration::from_millis(200))
            .await
    );
    assert!(err.is_timeout());

    let response = popup
        .send_request_with_timeout(Message::get_data(), Duration::from_secs(5))
        .await?;
    assert!(response.is_success());

    extension.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn builder_latency_applies() -> anyhow::Result<()> {
    common::init_logging();
    let extension = Extension::builder()
        .config(ResponderConfig::new().with_ping_reply("hi"))
        .process_text_latency(Duration::from_millis(20))
        .start()?;
    let popup = extension.popup();

    let start = Instant::now();
    let response = popup.send_request(Message::process_text("a")).await?;
    assert_eq!(response.get_str(), Some("A"));
    assert!(start.elapsed() >= Duration::from_millis(20));
    assert!(start.elapsed() < Duration::from_millis(500));

    let ping = popup.send_request(Message::ping()).await?;
    assert_eq!(ping.get_str(), Some("hi"));

    extension.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn handler_fault_is_isolated() -> anyhow::Result<()> {
    common::init_logging();
    let table = DispatchTable::standard(&ResponderConfig::default())
        .route("BOOM", |_: Request, _: &Origin| -> Dispatch {
            panic!("kaboom")
        })
        .route("LATE_BOOM", |_: Request, _: &Origin| {
            Dispatch::after(Duration::from_millis(10), || -> Response {
                panic!("late kaboom")
            })
        });
    let extension = Extension::builder().dispatch_table(table).start()?;
    let popup = extension.popup();

    let response = popup.send_request(Message::new("BOOM", None)).await?;
    assert!(!response.is_success());
    assert!(response.error().is_some_and(|e| e.contains("kaboom")));

    let response = popup.send_request(Message::new("LATE_BOOM", None)).await?;
    assert!(!response.is_success());
    assert!(response.error().is_some_and(|e| e.contains("late kaboom")));

    let ping = popup.send_request(Message::ping()).await?;
    assert!(ping.is_success());
    assert_eq!(ping.get_str(), Some(DEFAULT_PING_REPLY));

    extension.shutdown().await;
    Ok(())
}

// ============================================================================
// Ports
// ============================================================================

#[tokio::test(start_paused = true)]
async fn port_ping_reply_differs_from_one_shot() -> anyhow::Result<()> {
    let extension = start_extension()?;
    let content = extension.content_script(PAGE_URL, TAB_ID)?;

    let mut port = content.connect("content-script-port")?;
    assert_eq!(port.state(), PortState::Connecting);
    port.post(&Message::ping())?;

    let Some(PortEvent::Message(response)) = port.recv().await else {
        anyhow::bail!("expected a port reply");
    };
    assert!(response.is_success());
    assert_eq!(response.get_str(), Some(DEFAULT_PORT_PING_REPLY));
    assert_ne!(response.get_str(), Some(DEFAULT_PING_REPLY));
    assert_eq!(port.state(), PortState::Open);

    assert_eq!(extension.port_names(), vec!["content-script-port"]);
    port.disconnect();
    extension.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn abnormal_disconnect_is_observed_once() -> anyhow::Result<()> {
    let extension = start_extension()?;
    let content = extension.content_script(PAGE_URL, TAB_ID)?;

    let mut port = content.connect("content-script-port")?;
    port.post(&Message::ping())?;
    assert!(matches!(port.recv().await, Some(PortEvent::Message(_))));

    extension.shutdown().await;

    let mut disconnects = Vec::new();
    while let Some(event) = port.recv().await {
        if let PortEvent::Disconnected(disconnect) = event {
            disconnects.push(disconnect);
        }
    }

    assert_eq!(disconnects.len(), 1);
    assert!(!disconnects[0].is_clean());
    assert_eq!(disconnects[0].error.as_deref(), Some(SHUTDOWN_REASON));
    assert_eq!(port.state(), PortState::Closed);

    let err = assert_err!(port.post(&Message::ping()));
    assert!(err.to_string().contains("content-script-port"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_post_after_shutdown_still_reports_disconnect() -> anyhow::Result<()> {
    let extension = start_extension()?;
    let popup = extension.popup();

    let mut port = popup.connect("popup-port")?;
    port.post(&Message::ping())?;
    assert!(matches!(port.recv().await, Some(PortEvent::Message(_))));

    extension.shutdown().await;

    // The background end is gone but its disconnect notice is still queued.
    let err = assert_err!(port.post(&Message::ping()));
    assert!(err.to_string().contains("popup-port"));

    let mut disconnects = Vec::new();
    while let Some(event) = port.recv().await {
        match event {
            PortEvent::Disconnected(disconnect) => disconnects.push(disconnect),
            PortEvent::Message(response) => anyhow::bail!("unexpected reply: {response:?}"),
        }
    }
    assert_eq!(disconnects.len(), 1);
    assert_eq!(disconnects[0].error.as_deref(), Some(SHUTDOWN_REASON));
    assert_eq!(port.state(), PortState::Closed);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn port_queued_at_shutdown_reports_error() -> anyhow::Result<()> {
    let extension = start_extension()?;
    let popup = extension.popup();

    let mut port = popup.connect("late-port")?;
    extension.shutdown().await;

    let Some(PortEvent::Disconnected(disconnect)) = port.recv().await else {
        anyhow::bail!("expected a disconnect");
    };
    assert!(!disconnect.is_clean());
    assert_eq!(disconnect.error.as_deref(), Some(SHUTDOWN_REASON));
    assert!(port.recv().await.is_none());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn background_observes_client_disconnect_reason() -> anyhow::Result<()> {
    let extension = start_extension()?;
    let mut closures = extension.port_closures();
    let content = extension.content_script(PAGE_URL, TAB_ID)?;

    let mut port = content.connect("content-script-port")?;
    port.post(&Message::ping())?;
    assert!(matches!(port.recv().await, Some(PortEvent::Message(_))));

    port.disconnect_with_error("tab navigated away");

    let closed = closures.recv().await?;
    assert_eq!(closed.name, "content-script-port");
    assert_eq!(closed.sender.tab_id, Some(TAB_ID));
    assert_eq!(closed.disconnect.error.as_deref(), Some("tab navigated away"));
    assert!(closures.try_recv().is_err());
    assert_eq!(extension.port_count(), 0);

    extension.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn port_messages_answered_in_completion_order() -> anyhow::Result<()> {
    let extension = start_extension()?;
    let popup = extension.popup();

    let mut port = popup.connect("popup-port")?;
    port.post(&Message::process_text("slow"))?;
    port.post(&Message::ping())?;
    port.post(&Message::new("NOPE", None))?;

    let mut replies = Vec::new();
    while replies.len() < 3 {
        match port.recv().await {
            Some(PortEvent::Message(response)) => replies.push(response),
            other => anyhow::bail!("unexpected event: {other:?}"),
        }
    }

    assert_eq!(replies[0].get_str(), Some(DEFAULT_PORT_PING_REPLY));
    assert!(replies[1].error().is_some_and(|e| e.contains("NOPE")));
    assert_eq!(replies[2].get_str(), Some("SLOW"));

    port.disconnect();
    extension.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn client_disconnect_ends_session() -> anyhow::Result<()> {
    let extension = start_extension()?;
    let popup = extension.popup();

    let mut port = popup.connect("popup-port")?;
    port.post(&Message::ping())?;
    assert!(port.recv().await.is_some());
    assert_eq!(extension.port_count(), 1);

    port.disconnect_with_error("popup closed");
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(extension.port_count(), 0);

    extension.shutdown().await;
    Ok(())
}
