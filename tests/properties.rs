//! Properties of the background dispatch path, checked without any
//! transport.

mod common;

use std::time::Duration;

use proptest::prelude::*;
use serde_json::{Value, json};
use tokio::runtime::{Builder, Runtime};
use url::Url;
use webext_messaging::background::DEFAULT_PING_REPLY;
use webext_messaging::{
    BackgroundResponder, Dispatch, Message, MessageKind, MessageSender, Origin, ResponderConfig,
};

// ============================================================================
// Helpers
// ============================================================================

fn responder() -> BackgroundResponder {
    common::init_logging();
    BackgroundResponder::with_config(
        &ResponderConfig::new()
            .with_get_data_latency(Duration::ZERO)
            .with_process_text_latency(Duration::ZERO),
    )
}

fn runtime() -> Runtime {
    Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime")
}

fn content_origin(tab_id: u32) -> Origin {
    let url = Url::parse("https://example.com/").expect("url");
    Origin::one_shot(MessageSender::content(url, tab_id))
}

fn non_string_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        prop::collection::vec(any::<i32>(), 0..4).prop_map(|items| json!(items)),
        "[A-Z]{1,8}".prop_map(|key| json!({ key: "value" })),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn ping_is_immediate_with_fixed_greeting(tab_id in any::<u32>()) {
        let dispatch = responder().dispatch(Message::ping(), &content_origin(tab_id));

        let Dispatch::Immediate(response) = dispatch else {
            panic!("PING must be answered immediately");
        };
        prop_assert!(response.is_success());
        prop_assert_eq!(response.get_str(), Some(DEFAULT_PING_REPLY));
    }

    #[test]
    fn process_text_uppercases_idempotently(text in "[ -~]{0,64}") {
        let responder = responder();
        let origin = content_origin(1);
        let rt = runtime();

        let dispatch = responder.dispatch(Message::process_text(text.clone()), &origin);
        prop_assert!(!dispatch.is_immediate());
        let first = rt.block_on(dispatch.resolve());
        prop_assert!(first.is_success());
        let expected = text.to_uppercase();
        prop_assert_eq!(first.get_str(), Some(expected.as_str()));

        let again = responder.dispatch(
            Message::process_text(first.get_str().unwrap_or_default()),
            &origin,
        );
        let second = rt.block_on(again.resolve());
        prop_assert_eq!(second.get_str(), first.get_str());
    }

    #[test]
    fn non_string_text_fails_immediately(text in non_string_value()) {
        let message = Message::new(MessageKind::ProcessText, Some(json!({ "text": text })));
        let dispatch = responder().dispatch(message, &content_origin(1));

        let Dispatch::Immediate(response) = dispatch else {
            panic!("invalid payload must be answered immediately");
        };
        prop_assert!(!response.is_success());
        prop_assert!(response.error().is_some_and(|e| !e.is_empty()));
    }

    #[test]
    fn non_object_payload_fails_immediately(payload in non_string_value()) {
        let message = Message::new(MessageKind::ProcessText, Some(payload));
        let dispatch = responder().dispatch(message, &content_origin(1));

        prop_assert!(dispatch.is_immediate());
    }

    #[test]
    fn unknown_kind_error_names_kind(kind in "[A-Z_]{1,24}") {
        prop_assume!(!MessageKind::from(kind.as_str()).is_known());

        let dispatch = responder().dispatch(Message::new(kind.as_str(), None), &content_origin(1));
        let Dispatch::Immediate(response) = dispatch else {
            panic!("unknown kind must be answered immediately");
        };
        prop_assert!(!response.is_success());
        prop_assert!(response.error().is_some_and(|e| e.contains(&kind)));
    }

    #[test]
    fn get_data_count_matches_users(tab_id in any::<u32>()) {
        let dispatch = responder().dispatch(Message::get_data(), &content_origin(tab_id));
        prop_assert!(!dispatch.is_immediate());

        let response = runtime().block_on(dispatch.resolve());
        let users = response.data().and_then(|d| d["users"].as_array()).map(Vec::len);
        prop_assert_eq!(users, Some(response.get_u64("count") as usize));
    }
}
