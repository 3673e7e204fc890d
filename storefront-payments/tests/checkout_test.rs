mod common;

use chrono::Utc;
use common::{TestApp, PAYSTACK_SECRET, STRIPE_SECRET};
use reqwest::StatusCode;
use serde_json::json;
use storefront_payments::models::PaymentMethod;
use storefront_payments::services::OrderRepository;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn paystack_checkout_returns_authorization_url() {
    let app = TestApp::spawn().await;
    let order = app.seed_order("4500.00", "NGN").await;

    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .and(header("authorization", format!("Bearer {}", PAYSTACK_SECRET).as_str()))
        .and(body_partial_json(json!({
            "email": "shopper@example.com",
            "amount": 450000,
            "currency": "NGN",
            "callback_url": "http://api.test/api/payments/paystack/callback",
            "metadata": { "orderId": order.id.to_string(), "orderNumber": order.order_number }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "message": "Authorization URL created",
            "data": {
                "authorization_url": "https://checkout.paystack.com/abc123",
                "access_code": "abc123",
                "reference": "ref_abc123"
            }
        })))
        .expect(1)
        .mount(&app.paystack_server)
        .await;

    let response = app
        .client
        .post(app.url(&format!("/api/orders/{}/checkout", order.id)))
        .json(&json!({ "provider": "paystack" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["provider"], "paystack");
    assert_eq!(body["authorization_url"], "https://checkout.paystack.com/abc123");
    assert_eq!(body["reference"], "ref_abc123");

    assert_eq!(
        app.order(order.id).await.payment_method,
        Some(PaymentMethod::Paystack)
    );
}

#[tokio::test]
async fn stripe_checkout_returns_session_url() {
    let app = TestApp::spawn().await;
    let order = app.seed_order("25.50", "USD").await;

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(header("authorization", format!("Bearer {}", STRIPE_SECRET).as_str()))
        .and(body_string_contains("mode=payment"))
        .and(body_string_contains("unit_amount%5D=2550"))
        .and(body_string_contains(
            format!("metadata%5BorderId%5D={}", order.id).as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_1",
            "object": "checkout.session",
            "url": "https://checkout.stripe.com/c/pay/cs_test_1"
        })))
        .expect(1)
        .mount(&app.stripe_server)
        .await;

    let response = app
        .client
        .post(app.url(&format!("/api/orders/{}/checkout", order.id)))
        .json(&json!({ "provider": "stripe" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["provider"], "stripe");
    assert_eq!(
        body["authorization_url"],
        "https://checkout.stripe.com/c/pay/cs_test_1"
    );
    assert_eq!(body["reference"], "cs_test_1");

    assert_eq!(
        app.order(order.id).await.payment_method,
        Some(PaymentMethod::Stripe)
    );
}

#[tokio::test]
async fn provider_failure_is_a_bad_gateway() {
    let app = TestApp::spawn().await;
    let order = app.seed_order("4500.00", "NGN").await;

    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status": false,
            "message": "Invalid key"
        })))
        .mount(&app.paystack_server)
        .await;

    let response = app
        .client
        .post(app.url(&format!("/api/orders/{}/checkout", order.id)))
        .json(&json!({ "provider": "paystack" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "Payment initialization failed");
    assert_eq!(app.order(order.id).await.payment_method, None);
}

#[tokio::test]
async fn paid_orders_cannot_be_checked_out_again() {
    let app = TestApp::spawn().await;
    let order = app.seed_order("4500.00", "NGN").await;
    app.repository
        .confirm_payment(order.id, "12345", Utc::now())
        .await
        .expect("Failed to confirm order");

    let response = app
        .client
        .post(app.url(&format!("/api/orders/{}/checkout", order.id)))
        .json(&json!({ "provider": "paystack" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url(&format!("/api/orders/{}/checkout", uuid::Uuid::new_v4())))
        .json(&json!({ "provider": "stripe" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unsupported_provider_is_rejected() {
    let app = TestApp::spawn().await;
    let order = app.seed_order("4500.00", "NGN").await;

    let response = app
        .client
        .post(app.url(&format!("/api/orders/{}/checkout", order.id)))
        .json(&json!({ "provider": "paypal" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
