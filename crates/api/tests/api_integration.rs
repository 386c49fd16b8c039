//! Integration tests for the API server.

use std::sync::Arc;
use std::sync::OnceLock;

use api::{Catalog, Config};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use common::FixedClock;
use event_store::InMemoryEventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const CATALOG: &str = r#"{
    "vouchers": [
        { "code": "GIAM20K", "title": "Giảm 20k", "min_subtotal": 100000, "discount_amount": 20000 }
    ],
    "flash_sales": [
        { "id": "lunch", "discount": { "discount_type": "Percent", "discount_value": 20 },
          "start_at": "2025-03-01T11:00:00Z", "end_at": "2025-03-01T13:00:00Z",
          "enabled": true, "product_ids": ["pho-bo"] }
    ]
}"#;

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

fn setup() -> axum::Router {
    let catalog = Catalog::from_json(CATALOG).unwrap();
    let clock = Arc::new(FixedClock::at(noon()));
    let (state, _) = api::create_state(InMemoryEventStore::new(), &Config::default(), catalog, clock);
    api::create_app(state, get_metrics_handle())
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn post(app: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

fn order_request() -> Value {
    json!({
        "customer": { "name": "Lan", "phone": "0901234567", "address": "12 Lý Thường Kiệt" },
        "delivery_method": "delivery",
        "payment_method": "cod",
        "items": [
            { "product_id": "com-tam", "unit_price": 35000, "quantity": 2 }
        ]
    })
}

/// Places an order and returns `(order_id, order_code)`.
async fn place_order(app: &axum::Router) -> (String, String) {
    let (status, created) = post(app, "/orders", order_request()).await;
    assert_eq!(status, StatusCode::CREATED);
    (
        created["order_id"].as_str().unwrap().to_string(),
        created["order_code"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, json) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["board_orders"], 0);
    assert!(json["version"].is_string());
}

mod checkout {
    use super::*;

    #[tokio::test]
    async fn test_price_cart_with_free_shipping() {
        let app = setup();

        let (status, quote) = post(
            &app,
            "/checkout/price",
            json!({
                "items": [{ "product_id": "com-tam", "unit_price": 30000, "quantity": 2 }],
                "delivery_method": "delivery"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(quote["priced"]["subtotal"], 60000);
        assert_eq!(quote["priced"]["shipping_fee"], 0);
        assert_eq!(quote["priced"]["total"], 60000);
    }

    #[tokio::test]
    async fn test_running_flash_sale_lowers_the_line_price() {
        let app = setup();

        let (status, quote) = post(
            &app,
            "/checkout/price",
            json!({
                "items": [{ "product_id": "pho-bo", "unit_price": 50000, "quantity": 1 }],
                "delivery_method": "pickup"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(quote["lines"][0]["discounted_unit_price"], 40000);
        assert_eq!(quote["priced"]["total"], 40000);
    }

    #[tokio::test]
    async fn test_voucher_below_minimum_is_a_business_rejection() {
        let app = setup();

        let (status, body) = post(
            &app,
            "/checkout/price",
            json!({
                "items": [{ "product_id": "com-tam", "unit_price": 30000, "quantity": 1 }],
                "delivery_method": "delivery",
                "voucher_code": "giam20k"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VOUCHER_BELOW_MINIMUM");
        assert!(body["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_voucher_applied_above_minimum() {
        let app = setup();

        let (status, quote) = post(
            &app,
            "/checkout/price",
            json!({
                "items": [{ "product_id": "com-tam", "unit_price": 60000, "quantity": 2 }],
                "delivery_method": "delivery",
                "voucher_code": "GIAM20K"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(quote["priced"]["discount_amount"], 20000);
        assert_eq!(quote["priced"]["total"], 100000);
        assert_eq!(quote["priced"]["applied_voucher_code"], "GIAM20K");
    }

    #[tokio::test]
    async fn test_empty_cart_is_bad_request() {
        let app = setup();

        let (status, body) = post(
            &app,
            "/checkout/price",
            json!({ "items": [], "delivery_method": "delivery" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "EMPTY_CART");
    }

    #[tokio::test]
    async fn test_zero_quantity_is_bad_request() {
        let app = setup();

        let (status, body) = post(
            &app,
            "/checkout/price",
            json!({
                "items": [{ "product_id": "com-tam", "unit_price": 30000, "quantity": 0 }],
                "delivery_method": "delivery"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_QUANTITY");
    }

    #[tokio::test]
    async fn test_flash_sale_status() {
        let app = setup();

        let (status, snapshot) = get(&app, "/flash-sales/lunch").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["status"], "Running");
        assert_eq!(snapshot["remaining"]["total_seconds"], 3600);

        let (status, _) = get(&app, "/flash-sales/breakfast").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod orders {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_order() {
        let app = setup();
        let (order_id, order_code) = place_order(&app).await;
        assert_eq!(order_code.len(), 8);

        let (status, order) = get(&app, &format!("/orders/{order_id}")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["id"], order_id.as_str());
        assert_eq!(order["code"], order_code.as_str());
        assert_eq!(order["fulfillment_status"], "Pending");
        assert_eq!(order["payment_status"], "Unpaid");
        assert_eq!(order["next_states"], json!(["Confirmed", "Cancelled"]));
        assert_eq!(order["priced"]["subtotal"], 70000);
        assert_eq!(order["version"], 1);
    }

    #[tokio::test]
    async fn test_get_order_by_code_ignores_case() {
        let app = setup();
        let (order_id, order_code) = place_order(&app).await;

        let (status, order) = get(
            &app,
            &format!("/orders/by-code/{}", order_code.to_ascii_lowercase()),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["id"], order_id.as_str());

        let (status, _) = get(&app, "/orders/by-code/ZZZZZZZZ").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_address_for_delivery_is_rejected() {
        let app = setup();
        let mut request = order_request();
        request["customer"]["address"] = json!("  ");

        let (status, body) = post(&app, "/orders", request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "MISSING_CUSTOMER_FIELD");
    }

    #[tokio::test]
    async fn test_unknown_payment_method_is_rejected() {
        let app = setup();
        let mut request = order_request();
        request["payment_method"] = json!("barter");

        let (status, body) = post(&app, "/orders", request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "UNKNOWN_PAYMENT_METHOD");
    }

    #[tokio::test]
    async fn test_invalid_order_id_format() {
        let app = setup();

        let (status, body) = get(&app, "/orders/not-a-uuid").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_ID");
    }

    #[tokio::test]
    async fn test_get_nonexistent_order() {
        let app = setup();
        let fake_id = uuid::Uuid::new_v4();

        let (status, _) = get(&app, &format!("/orders/{fake_id}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get(&app, &format!("/orders/{fake_id}/events")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod transitions {
    use super::*;

    #[tokio::test]
    async fn test_confirm_then_illegal_jump() {
        let app = setup();
        let (order_id, _) = place_order(&app).await;
        let uri = format!("/orders/{order_id}/transition");

        let (status, body) = post(&app, &uri, json!({ "fulfillment": "confirmed" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], true);
        assert_eq!(body["version"], 2);
        assert_eq!(body["order"]["fulfillment_status"], "Confirmed");

        let (status, body) = post(&app, &uri, json!({ "fulfillment": "Pending" })).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "ILLEGAL_TRANSITION");
    }

    #[tokio::test]
    async fn test_stale_expected_version_conflicts() {
        let app = setup();
        let (order_id, _) = place_order(&app).await;
        let uri = format!("/orders/{order_id}/transition");

        let (status, _) = post(
            &app,
            &uri,
            json!({ "fulfillment": "Confirmed", "expected_version": 1 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = post(
            &app,
            &uri,
            json!({ "fulfillment": "Cancelled", "expected_version": 1 }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_cancelling_a_paid_order_flags_refund() {
        let app = setup();
        let (order_id, _) = place_order(&app).await;
        let uri = format!("/orders/{order_id}/transition");

        let (status, body) = post(
            &app,
            &uri,
            json!({ "payment": "paid", "fulfillment": "Cancelled", "reason": "Hết hàng" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["refund_due"], true);
        assert_eq!(body["order"]["payment_status"], "Paid");
        assert_eq!(body["order"]["next_states"], json!([]));
    }

    #[tokio::test]
    async fn test_marking_paid_twice_is_a_no_op() {
        let app = setup();
        let (order_id, _) = place_order(&app).await;
        let uri = format!("/orders/{order_id}/transition");

        post(&app, &uri, json!({ "payment": "Paid" })).await;
        let (status, body) = post(&app, &uri, json!({ "payment": "Paid" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], false);
        assert_eq!(body["version"], 2);
    }

    #[tokio::test]
    async fn test_bad_transition_input() {
        let app = setup();
        let (order_id, _) = place_order(&app).await;
        let uri = format!("/orders/{order_id}/transition");

        let (status, body) = post(&app, &uri, json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "EMPTY_TRANSITION");

        let (status, body) = post(&app, &uri, json!({ "fulfillment": "Lost" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "UNKNOWN_STATUS");

        let (status, body) = post(
            &app,
            &uri,
            json!({ "fulfillment": "Confirmed", "actor": "robot" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "UNKNOWN_ACTOR");
    }

    #[tokio::test]
    async fn test_get_order_events() {
        let app = setup();
        let (order_id, _) = place_order(&app).await;
        let uri = format!("/orders/{order_id}/transition");
        post(&app, &uri, json!({ "fulfillment": "Confirmed", "actor": "admin" })).await;

        let (status, events) = get(&app, &format!("/orders/{order_id}/events")).await;

        assert_eq!(status, StatusCode::OK);
        let events = events.as_array().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["event_type"], "OrderPlaced");
        assert_eq!(events[0]["version"], 1);
        assert_eq!(events[1]["event_type"], "FulfillmentStatusChanged");
        assert_eq!(events[1]["version"], 2);
    }
}

mod admin {
    use super::*;

    #[tokio::test]
    async fn test_board_filters_by_status() {
        let app = setup();
        let (first, _) = place_order(&app).await;
        place_order(&app).await;
        post(
            &app,
            &format!("/orders/{first}/transition"),
            json!({ "fulfillment": "Confirmed" }),
        )
        .await;

        let (status, board) = get(&app, "/admin/orders").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(board["orders"].as_array().unwrap().len(), 2);
        assert_eq!(board["counts"]["Pending"], 1);
        assert_eq!(board["counts"]["Confirmed"], 1);
        assert_eq!(board["counts"]["Completed"], 0);
        assert_eq!(board["refunds_due"], 0);

        let (status, board) = get(&app, "/admin/orders?status=confirmed").await;
        assert_eq!(status, StatusCode::OK);
        let orders = board["orders"].as_array().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0]["order_id"], first.as_str());
    }

    #[tokio::test]
    async fn test_board_rejects_unknown_status() {
        let app = setup();

        let (status, body) = get(&app, "/admin/orders?status=Lost").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "UNKNOWN_STATUS");
    }
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    post(
        &app,
        "/checkout/price",
        json!({
            "items": [{ "product_id": "com-tam", "unit_price": 30000, "quantity": 1 }],
            "delivery_method": "pickup"
        }),
    )
    .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("checkout_priced_total"));
}
