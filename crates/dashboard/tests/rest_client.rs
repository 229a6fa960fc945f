use std::collections::HashMap;

use api_types::{medicine::Medicine, order::Order};
use axum::{
    Json, Router,
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use dashboard::{
    AuthClient, ClientError, CollectionClient, FALLBACK_MESSAGE, ListParams, RestCollection,
    Session, SessionContext,
};
use serde_json::{Value, json};

const TOKEN: &str = "secret-token";
const VENDOR: &str = "vendor-7";

fn authorized(headers: &HeaderMap, query: &HashMap<String, String>) -> bool {
    let bearer = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some(format!("Bearer {TOKEN}").as_str());
    bearer && query.get("vendorId").map(String::as_str) == Some(VENDOR)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Invalid token"})),
    )
        .into_response()
}

async fn list_orders(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers, &query) {
        return unauthorized();
    }
    let status = query.get("status").cloned().unwrap_or_default();
    Json(json!({
        "success": true,
        "orders": [
            {"_id": "o1", "orderNumber": "ORD-1", "status": "Pending", "totalAmount": 10.5},
            {"_id": "o2", "orderNumber": "ORD-2", "status": status, "totalAmount": 3.0},
        ]
    }))
    .into_response()
}

async fn update_order(
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(patch): Json<Value>,
) -> Response {
    if !authorized(&headers, &query) {
        return unauthorized();
    }
    match id.as_str() {
        "o1" => Json(json!({
            "order": {"_id": "o1", "orderNumber": "ORD-1", "status": patch["status"]}
        }))
        .into_response(),
        "locked" => (
            StatusCode::CONFLICT,
            Json(json!({"error": "Order is already delivered"})),
        )
            .into_response(),
        // acknowledges without echoing the record
        _ => Json(json!({"message": "updated"})).into_response(),
    }
}

async fn fetch_order(
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers, &query) {
        return unauthorized();
    }
    Json(json!({"_id": id, "orderNumber": "ORD-9", "status": "Accepted"})).into_response()
}

async fn delete_medicine(
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers, &query) {
        return unauthorized();
    }
    if id == "m1" {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["email"] == "shop@example.com" && body["password"] == "hunter2" {
        Json(json!({"token": TOKEN, "vendor": {"_id": VENDOR, "name": "Corner Pharmacy"}}))
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid credentials"})),
        )
            .into_response()
    }
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route("/api/vendor/orders", get(list_orders))
        .route(
            "/api/vendor/orders/{id}",
            get(fetch_order).patch(update_order),
        )
        .route(
            "/api/vendor/medicines/{id}",
            axum::routing::delete(delete_medicine),
        )
        .route("/api/vendor/auth/login", post(login));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api/vendor")
}

fn signed_in() -> SessionContext {
    SessionContext::signed_in(Session {
        token: TOKEN.to_string(),
        vendor_id: VENDOR.to_string(),
        email: "shop@example.com".to_string(),
    })
}

#[tokio::test]
async fn list_unwraps_keyed_collection_and_sends_params() {
    let base = spawn_server().await;
    let orders = RestCollection::<Order>::new(&base, signed_in()).unwrap();

    let items = orders
        .list(&ListParams::new().with("status", "Delivered"))
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].order_number.as_deref(), Some("ORD-1"));
    assert_eq!(items[1].status, "Delivered");
}

#[tokio::test]
async fn signed_out_collection_sends_nothing() {
    let base = spawn_server().await;
    let orders = RestCollection::<Order>::new(&base, SessionContext::new()).unwrap();
    let err = orders.list(&ListParams::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::SignedOut));
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    // bind then release a port so nothing is listening on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let orders =
        RestCollection::<Order>::new(&format!("http://{addr}/api/vendor"), signed_in()).unwrap();
    let err = orders.list(&ListParams::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
    assert!(!err.is_unauthorized());
    assert_eq!(
        err.user_message(),
        "Cannot reach the server. Check your connection and try again."
    );
}

#[tokio::test]
async fn rejected_token_surfaces_as_unauthorized() {
    let base = spawn_server().await;
    let session = SessionContext::signed_in(Session {
        token: "stale".to_string(),
        vendor_id: VENDOR.to_string(),
        email: "shop@example.com".to_string(),
    });
    let orders = RestCollection::<Order>::new(&base, session).unwrap();
    let err = orders.list(&ListParams::new()).await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn update_reads_wrapped_record() {
    let base = spawn_server().await;
    let orders = RestCollection::<Order>::new(&base, signed_in()).unwrap();
    let order = orders
        .update("o1", &json!({"status": "Dispatched"}))
        .await
        .unwrap();
    assert_eq!(order.status, "Dispatched");
}

#[tokio::test]
async fn update_acknowledgement_falls_back_to_fetch() {
    let base = spawn_server().await;
    let orders = RestCollection::<Order>::new(&base, signed_in()).unwrap();
    let order = orders
        .update("o9", &json!({"status": "Accepted"}))
        .await
        .unwrap();
    assert_eq!(order.id, "o9");
    assert_eq!(order.order_number.as_deref(), Some("ORD-9"));
}

#[tokio::test]
async fn server_error_text_comes_from_error_field() {
    let base = spawn_server().await;
    let orders = RestCollection::<Order>::new(&base, signed_in()).unwrap();
    let err = orders
        .update("locked", &json!({"status": "Cancelled"}))
        .await
        .unwrap_err();
    match &err {
        ClientError::Server { status, .. } => assert_eq!(status.as_u16(), 409),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.user_message(), "Order is already delivered");
}

#[tokio::test]
async fn delete_accepts_empty_body_and_falls_back_on_plain_errors() {
    let base = spawn_server().await;
    let medicines = RestCollection::<Medicine>::new(&base, signed_in()).unwrap();

    medicines.remove("m1").await.unwrap();

    let err = medicines.remove("m2").await.unwrap_err();
    assert_eq!(err.user_message(), FALLBACK_MESSAGE);
}

#[tokio::test]
async fn login_returns_vendor_session() {
    let base = spawn_server().await;
    let auth = AuthClient::new(&base).unwrap();

    let session = auth.login(" shop@example.com ", "hunter2").await.unwrap();
    assert_eq!(session.token, TOKEN);
    assert_eq!(session.vendor_id, VENDOR);
    assert_eq!(session.email, "shop@example.com");

    let err = auth.login("shop@example.com", "wrong").await.unwrap_err();
    assert!(err.is_unauthorized());

    let err = auth.login("", "").await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
}
