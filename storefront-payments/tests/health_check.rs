mod common;

use common::{paystack_signature, TestApp};

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "storefront-payments-test");
}

#[tokio::test]
async fn readiness_check_works() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/ready"))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
}

#[tokio::test]
async fn request_id_is_echoed_or_generated() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/ready"))
        .header("x-request-id", "req-123")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.headers()["x-request-id"], "req-123");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");

    let response = app
        .client
        .get(app.url("/ready"))
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn metrics_include_webhook_counters() {
    let app = TestApp::spawn().await;
    let order = app.seed_order("1000.00", "NGN").await;

    let body = serde_json::json!({
        "event": "charge.success",
        "data": { "id": 1, "reference": "ref_m", "metadata": { "orderId": order.id } }
    })
    .to_string();
    app.post_paystack_webhook(&body, Some(&paystack_signature(&body)))
        .await;

    let response = app
        .client
        .get(app.url("/metrics"))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let text = response.text().await.expect("Failed to read body");
    assert!(text.contains("storefront_webhook_events_total"));
    assert!(text.contains("storefront_order_confirmations_total"));
}
