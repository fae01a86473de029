mod common;

use common::{spawn_http_stub, StubReply};
use dex_arb_monitor::dex::QueryClient;
use dex_arb_monitor::error::{ArbError, RetryPolicy};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::time::Duration;

fn client(max_retries: u32) -> QueryClient {
    QueryClient::new(
        Duration::from_secs(5),
        RetryPolicy::new(max_retries, Duration::from_millis(5)),
        4,
    )
    .unwrap()
}

#[tokio::test]
async fn graphql_success_returns_data_and_sends_variables() {
    let (url, bodies) = spawn_http_stub(vec![StubReply::Json(
        200,
        json!({ "data": { "pools": [{ "id": "0x1" }] } }).to_string(),
    )])
    .await;

    let variables = json!({ "base": "WETH", "quote": "USDT" });
    let response = client(3)
        .execute(&url, "query Pools { pools { id } }", Some(&variables))
        .await
        .unwrap();

    assert!(!response.has_errors());
    assert_eq!(response.into_data().unwrap(), json!({ "pools": [{ "id": "0x1" }] }));

    let sent: Value = serde_json::from_str(&bodies.lock().unwrap()[0]).unwrap();
    assert_eq!(sent["query"], "query Pools { pools { id } }");
    assert_eq!(sent["variables"], variables);
}

#[tokio::test]
async fn partial_success_is_returned_once_with_errors() {
    let (url, bodies) = spawn_http_stub(vec![StubReply::Json(
        200,
        json!({ "data": null, "errors": [{ "message": "indexer unavailable" }] }).to_string(),
    )])
    .await;

    let response = client(3).execute(&url, "{ pairs { id } }", None).await.unwrap();
    assert!(response.has_errors());
    assert!(matches!(response.into_data(), Err(ArbError::RemoteErrors(_))));
    assert_eq!(bodies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn non_success_status_is_fatal_and_not_retried() {
    let (url, bodies) = spawn_http_stub(vec![StubReply::Json(
        400,
        json!({ "errors": [{ "message": "Syntax Error" }] }).to_string(),
    )])
    .await;

    let result = client(3).execute(&url, "{ broken", None).await;
    match result {
        Err(ArbError::HttpStatus { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("Syntax Error"));
        }
        other => panic!("expected HttpStatus, got {:?}", other),
    }
    assert_eq!(bodies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn dropped_connection_is_retried_with_identical_payload() {
    let (url, bodies) = spawn_http_stub(vec![
        StubReply::Drop,
        StubReply::Json(200, json!({ "data": { "pairs": [] } }).to_string()),
    ])
    .await;

    let response = client(3).execute(&url, "{ pairs { id } }", None).await.unwrap();
    assert_eq!(response.into_data().unwrap(), json!({ "pairs": [] }));

    let bodies = bodies.lock().unwrap();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0], bodies[1]);
}

#[tokio::test]
async fn unreachable_endpoint_exhausts_retries() {
    // Bind then release a port so nothing is listening on it.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = client(2).execute(&format!("http://{}", addr), "{ pools { id } }", None).await;
    match result {
        Err(e) => assert!(e.is_transient(), "expected a transient error, got {:?}", e),
        Ok(r) => panic!("expected failure, got {:?}", r),
    }
}

#[tokio::test]
async fn get_json_wraps_body_as_data() {
    let (url, _) = spawn_http_stub(vec![StubReply::Json(
        200,
        json!([{ "symbol": "WBTCUSDT", "price": "64000.0" }]).to_string(),
    )])
    .await;

    let data = client(0).get_json(&url).await.unwrap().into_data().unwrap();
    assert_eq!(data[0]["symbol"], "WBTCUSDT");
}
