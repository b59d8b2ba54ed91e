//! Conversation lifecycle over the HTTP surface

use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::common::{authed_request, parse_body, token_for, TestApp};

mod test_create_and_fetch {
    use super::*;

    #[tokio::test]
    async fn test_fetch_returns_created_participants() {
        let app = TestApp::new();

        for (first, second) in [(1, 2), (2, 1), (7, 42)] {
            let req = authed_request(
                Method::POST,
                "/v1/conversations",
                &token_for(first),
                Some(json!({"first_user_id": first, "second_user_id": second})),
            );
            let resp = app.test_router().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::CREATED);
            let id = parse_body(resp).await["id"].as_i64().unwrap();

            let req = authed_request(
                Method::GET,
                &format!("/v1/conversations/{}", id),
                &token_for(second),
                None,
            );
            let resp = app.test_router().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);

            let body = parse_body(resp).await;
            assert_eq!(body["first_user_id"], first);
            assert_eq!(body["second_user_id"], second);
        }
    }

    #[tokio::test]
    async fn test_same_participants_rejected() {
        let app = TestApp::new();
        let req = authed_request(
            Method::POST,
            "/v1/conversations",
            &token_for(1),
            Some(json!({"first_user_id": 1, "second_user_id": 1})),
        );
        let resp = app.test_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_body(resp).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_missing_conversation_is_not_found() {
        let app = TestApp::new();
        let req = authed_request(Method::GET, "/v1/conversations/999", &token_for(1), None);
        let resp = app.test_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

mod test_list_conversations {
    use super::*;

    #[tokio::test]
    async fn test_most_recently_active_first() {
        let app = TestApp::new();
        let older = app.create_conversation(1, 2).await;
        let newer = app.create_conversation(1, 3).await;

        // Activity on the older conversation moves it to the front
        app.state
            .conversations
            .update_summary(older, "bump", chrono::Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();

        let req = authed_request(Method::GET, "/v1/conversations", &token_for(1), None);
        let body = parse_body(app.test_router().oneshot(req).await.unwrap()).await;
        let ids: Vec<i64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![older, newer]);
    }

    #[tokio::test]
    async fn test_pagination_defaults_and_clamping() {
        let app = TestApp::new();
        for other in 2..=13 {
            app.create_conversation(1, other).await;
        }

        let req = authed_request(Method::GET, "/v1/conversations", &token_for(1), None);
        let body = parse_body(app.test_router().oneshot(req).await.unwrap()).await;
        assert_eq!(body.as_array().unwrap().len(), 10);

        let req = authed_request(
            Method::GET,
            "/v1/conversations?limit=5&offset=10",
            &token_for(1),
            None,
        );
        let body = parse_body(app.test_router().oneshot(req).await.unwrap()).await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let req = authed_request(
            Method::GET,
            "/v1/conversations?limit=0",
            &token_for(1),
            None,
        );
        let body = parse_body(app.test_router().oneshot(req).await.unwrap()).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }
}
