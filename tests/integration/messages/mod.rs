//! Write pipeline: ingress frames, history, summaries and store faults

use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use parley_common::WriteMode;
use parley_conversations::ingress::IngressEnd;

use crate::common::{authed_request, parse_body, text_frames, token_for, TestApp};

mod test_ingress_history {
    use super::*;

    #[tokio::test]
    async fn test_each_ingressed_message_listed_once_newest_first() {
        let app = TestApp::new();
        let id = app.create_conversation(1, 2).await;
        let member = app.state.rooms.attach(id);

        let end = app
            .ingress(id, 1, &member)
            .run(text_frames(&[
                r#"{"text": "first"}"#,
                r#"{"text": "second"}"#,
                r#"{"text": "third"}"#,
            ]))
            .await;
        assert!(matches!(end, IngressEnd::Closed));

        let history = app.history(id).await;
        let texts: Vec<&str> = history.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["third", "second", "first"]);

        let mut ids: Vec<i64> = history.iter().map(|m| m.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_history_of_quiet_conversation_is_empty() {
        let app = TestApp::new();
        let id = app.create_conversation(1, 2).await;

        let req = authed_request(
            Method::GET,
            &format!("/v1/conversations/{}/messages", id),
            &token_for(1),
            None,
        );
        let resp = app.test_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(parse_body(resp).await, json!([]));
    }
}

mod test_hi_scenario {
    use super::*;

    #[tokio::test]
    async fn test_peer_receives_stored_message() {
        let app = TestApp::new();
        let id = app.create_conversation(1, 2).await;

        let mut peer = app.state.rooms.attach(id);
        let sender = app.state.rooms.attach(id);

        app.ingress(id, 1, &sender)
            .run(text_frames(&[r#"{"text": "hi"}"#]))
            .await;

        let history = app.history(id).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "hi");
        assert_eq!(history[0].sender, 1);

        assert_eq!(app.conversation(id).await.last_message, "hi");

        let received = peer.outbox.recv().await.unwrap();
        assert_eq!(received, history[0]);

        // Outbound frame shape
        let frame = serde_json::to_value(&received).unwrap();
        for field in ["id", "chat_id", "sender", "text", "created_at"] {
            assert!(frame.get(field).is_some(), "missing {}", field);
        }
    }
}

mod test_summary_fault {
    use super::*;

    #[tokio::test]
    async fn test_independent_mode_keeps_message_and_old_summary() {
        let app = TestApp::with_mode(WriteMode::Independent);
        let id = app.create_conversation(1, 2).await;
        let mut member = app.state.rooms.attach(id);

        app.ingress(id, 1, &member)
            .run(text_frames(&[r#"{"text": "before"}"#]))
            .await;
        assert_eq!(member.outbox.recv().await.unwrap().text, "before");

        app.store.fail_summary_updates(true);
        app.ingress(id, 1, &member)
            .run(text_frames(&[r#"{"text": "during fault"}"#]))
            .await;

        // Message is durable and still broadcast
        let history = app.history(id).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].text, "during fault");
        assert_eq!(member.outbox.recv().await.unwrap().text, "during fault");

        // Summary is unchanged from its prior value
        assert_eq!(app.conversation(id).await.last_message, "before");
    }

    #[tokio::test]
    async fn test_atomic_mode_discards_message_with_summary() {
        let app = TestApp::with_mode(WriteMode::Atomic);
        let id = app.create_conversation(1, 2).await;
        let mut member = app.state.rooms.attach(id);

        app.ingress(id, 1, &member)
            .run(text_frames(&[r#"{"text": "before"}"#]))
            .await;
        assert_eq!(member.outbox.recv().await.unwrap().text, "before");

        app.store.fail_summary_updates(true);
        let end = app
            .ingress(id, 1, &member)
            .run(text_frames(&[r#"{"text": "during fault"}"#]))
            .await;
        assert!(matches!(end, IngressEnd::Closed));

        let history = app.history(id).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "before");
        assert_eq!(app.conversation(id).await.last_message, "before");
        assert!(member.outbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rest_send_surfaces_atomic_failure() {
        let app = TestApp::new();
        let id = app.create_conversation(1, 2).await;
        app.store.fail_summary_updates(true);

        let req = authed_request(
            Method::POST,
            &format!("/v1/conversations/{}/messages", id),
            &token_for(1),
            Some(json!({"text": "lost"})),
        );
        let resp = app.test_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(parse_body(resp).await["error"]["code"], "PERSISTENCE_ERROR");
        assert_eq!(app.store.message_count(), 0);
    }
}

mod test_blank_frames {
    use super::*;

    #[tokio::test]
    async fn test_whitespace_frame_rejected_and_connection_stays_open() {
        let app = TestApp::new();
        let id = app.create_conversation(1, 2).await;
        let mut member = app.state.rooms.attach(id);

        let end = app
            .ingress(id, 1, &member)
            .run(text_frames(&[
                r#"{"text": ""}"#,
                r#"{"text": " \t\n "}"#,
                r#"{"text": "real"}"#,
            ]))
            .await;
        assert!(matches!(end, IngressEnd::Closed));

        assert_eq!(member.outbox.recv().await.unwrap().text, "real");
        assert!(member.outbox.try_recv().is_err());
        assert_eq!(app.store.message_count(), 1);
        assert_eq!(app.conversation(id).await.last_message, "real");
    }

    #[tokio::test]
    async fn test_frame_missing_text_keeps_connection_open() {
        let app = TestApp::new();
        let id = app.create_conversation(1, 2).await;
        let mut member = app.state.rooms.attach(id);

        let end = app
            .ingress(id, 1, &member)
            .run(text_frames(&[
                r#"{"chat_id": 1}"#,
                r#"{"chat_id": 1, "text": null}"#,
                r#"{"text": "still here"}"#,
            ]))
            .await;
        assert!(matches!(end, IngressEnd::Closed));

        assert_eq!(member.outbox.recv().await.unwrap().text, "still here");
        assert!(member.outbox.try_recv().is_err());
        assert_eq!(app.store.message_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_frame_terminates_ingress() {
        let app = TestApp::new();
        let id = app.create_conversation(1, 2).await;
        let member = app.state.rooms.attach(id);

        let end = app
            .ingress(id, 1, &member)
            .run(text_frames(&[r#"{"text": ["not", "a", "string"]}"#, r#"{"text": "unread"}"#]))
            .await;
        assert!(matches!(end, IngressEnd::Protocol(_)));
        assert_eq!(app.store.message_count(), 0);
    }
}
