use gcm_core::{FailureRule, GatewayResponse, SendOptions};
use gcm_push::{Gateway, GatewayConfig, GatewayError, HttpGateway};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Answers each multicast request with one result per registration id.
struct EchoResults;

impl Respond for EchoResults {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        let ids = body["registration_ids"].as_array().cloned().unwrap_or_default();
        let results: Vec<serde_json::Value> = ids
            .iter()
            .map(|id| serde_json::json!({"message_id": format!("m-{}", id.as_str().unwrap())}))
            .collect();

        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "multicast_id": 42,
            "success": results.len(),
            "failure": 0,
            "canonical_ids": 0,
            "results": results,
        }))
    }
}

fn gateway(server: &MockServer, max_recipients: usize) -> HttpGateway {
    HttpGateway::new(GatewayConfig {
        api_key: "secret".to_string(),
        endpoint: format!("{}/fcm/send", server.uri()),
        max_recipients_per_request: max_recipients,
    })
}

fn ids(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

#[tokio::test]
async fn test_topic_send_posts_single_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .and(header("Authorization", "key=secret"))
        .and(body_partial_json(serde_json::json!({
            "to": "/topics/news",
            "data": {"title": "hi"},
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message_id": 1023456
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = gateway(&server, 1000)
        .deliver(
            &serde_json::json!({"title": "hi"}),
            &[],
            &SendOptions::default().with_topic("news"),
        )
        .await
        .unwrap();

    let GatewayResponse::Single(chunk) = response else {
        panic!("expected a single chunk");
    };
    assert!(chunk.recipients.is_empty());
    assert_eq!(chunk.result.message_id, Some(serde_json::json!(1023456)));
    assert!(!chunk.result.is_failure(FailureRule::KeyPresent));
}

#[tokio::test]
async fn test_recipients_are_split_into_chunks() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .respond_with(EchoResults)
        .expect(2)
        .mount(&server)
        .await;

    let response = gateway(&server, 2)
        .deliver(
            &serde_json::json!({"title": "hi"}),
            &ids(&["t1", "t2", "t3"]),
            &SendOptions::default(),
        )
        .await
        .unwrap();

    let chunks = response.chunks();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].recipients, ids(&["t1", "t2"]));
    assert_eq!(chunks[1].recipients, ids(&["t3"]));

    let pairs = chunks[0].paired().unwrap();
    assert_eq!(pairs[1].0, "t2");
    assert_eq!(pairs[1].1.message_id.as_deref(), Some("m-t2"));
}

#[tokio::test]
async fn test_single_batch_is_not_chunked() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .respond_with(EchoResults)
        .expect(1)
        .mount(&server)
        .await;

    let response = gateway(&server, 1000)
        .deliver(
            &serde_json::json!({"title": "hi"}),
            &ids(&["t1", "t2"]),
            &SendOptions::default(),
        )
        .await
        .unwrap();

    assert!(matches!(response, GatewayResponse::Single(_)));
    assert_eq!(response.chunks()[0].recipients, ids(&["t1", "t2"]));
}

#[tokio::test]
async fn test_error_status_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let err = gateway(&server, 1000)
        .deliver(
            &serde_json::json!({"title": "hi"}),
            &ids(&["t1"]),
            &SendOptions::default(),
        )
        .await
        .unwrap_err();

    match err.downcast_ref::<GatewayError>() {
        Some(GatewayError::Status { status, body }) => {
            assert_eq!(*status, 401);
            assert_eq!(body, "Unauthorized");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
