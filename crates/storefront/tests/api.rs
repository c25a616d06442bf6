//! HTTP API tests through the full router, sessions included.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use furnish_storefront::config::StorefrontConfig;
use furnish_storefront::db::{MemoryStore, Stores};
use furnish_storefront::middleware::create_session_layer;
use furnish_storefront::state::AppState;

fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/furnish_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("k3J9x!qP2@vL7#mN4$wR8%tY1^zB6&cD"),
        checkout_idle: Duration::from_secs(1800),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

async fn test_app() -> Router {
    let store = Arc::new(MemoryStore::new());
    common::seed_catalog(&store).await;
    let state = AppState::new(test_config(), Stores::in_memory(store), None);
    furnish_storefront::app(
        state,
        create_session_layer(tower_sessions::MemoryStore::default(), false),
    )
}

/// A browser-like client: one address, one cookie jar.
struct Client {
    app: Router,
    ip: &'static str,
    cookie: Option<String>,
}

impl Client {
    fn new(app: Router, ip: &'static str) -> Self {
        Self {
            app,
            ip,
            cookie: None,
        }
    }

    async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-real-ip", self.ip);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_owned());
        }

        let status = response.status();
        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else if is_json {
            serde_json::from_slice(&bytes).unwrap()
        } else {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        };
        (status, body)
    }

    async fn get(&mut self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn put(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body)).await
    }

    async fn register(&mut self, email: &str) -> Value {
        let (status, user) = self
            .post(
                "/api/auth/register",
                json!({ "name": "Ada Lovelace", "email": email, "password": "correct horse" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        user
    }
}

#[tokio::test]
async fn test_health() {
    let mut client = Client::new(test_app().await, "10.0.0.1");
    let (status, body) = client.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_owned()));
    let (status, _) = client.get("/health/ready").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_catalog_is_public() {
    let mut client = Client::new(test_app().await, "10.0.0.2");

    let (status, categories) = client.get("/api/categories").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(categories.as_array().unwrap().len(), 3);

    let (status, chairs) = client.get("/api/products?category=chairs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chairs[0]["handle"], "poang-armchair");

    let (status, _) = client.get("/api/products?category=garden").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, table) = client.get("/api/products/lisabo-table").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(table["price"], "100.00");
    assert!(table.get("favorite").is_none());
}

#[tokio::test]
async fn test_search_filters_and_validation() {
    let mut client = Client::new(test_app().await, "10.0.0.3");

    let (status, results) = client
        .get("/api/search?q=&sort=price-descending&in_stock_only=true")
        .await;
    assert_eq!(status, StatusCode::OK);
    let handles: Vec<&str> = results["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["handle"].as_str().unwrap())
        .collect();
    assert_eq!(handles, ["lisabo-table", "poang-armchair"]);
    assert_eq!(results["out_of_stock_count"], 1);

    let (status, _) = client.get("/api/search?q=lamp&min_price=90&max_price=10").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = client.get("/api/search?q=lamp&min_price=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_private_routes_need_login() {
    let mut client = Client::new(test_app().await, "10.0.0.4");
    for uri in ["/api/cart", "/api/favorites", "/api/addresses", "/api/orders", "/api/checkout"] {
        let (status, body) = client.get(uri).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_register_login_logout() {
    let app = test_app().await;
    let mut client = Client::new(app.clone(), "10.0.0.5");
    let user = client.register("ada@example.com").await;
    assert_eq!(user["email"], "ada@example.com");

    let (status, me) = client.get("/api/auth/me").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Ada Lovelace");

    let (status, _) = client.post("/api/auth/logout", json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = client.get("/api/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut other = Client::new(app, "10.0.0.6");
    let (status, _) = other
        .post(
            "/api/auth/login",
            json!({ "email": "ada@example.com", "password": "wrong password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = other
        .post(
            "/api/auth/login",
            json!({ "email": "ada@example.com", "password": "correct horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let mut client = Client::new(test_app().await, "10.0.0.7");
    client.register("dup@example.com").await;
    let (status, _) = client
        .post(
            "/api/auth/register",
            json!({ "name": "Ada", "email": "dup@example.com", "password": "correct horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cart_and_favorites() {
    let mut client = Client::new(test_app().await, "10.0.0.8");
    client.register("cart@example.com").await;

    let (_, table) = client.get("/api/products/lisabo-table").await;
    let id = table["id"].as_i64().unwrap();

    let (status, cart) = client
        .post("/api/cart/items", json!({ "product_id": id, "quantity": 2 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["item_count"], 2);
    assert_eq!(cart["subtotal"], "200.00");

    let (_, count) = client.get("/api/cart/count").await;
    assert_eq!(count["count"], 2);

    let (status, cart) = client
        .put(&format!("/api/cart/items/{id}"), json!({ "quantity": 0 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["item_count"], 0);

    let (status, _) = client
        .post("/api/cart/items", json!({ "product_id": 9999 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, toggled) = client
        .post(&format!("/api/favorites/{id}/toggle"), json!({}))
        .await;
    assert_eq!(toggled["favorite"], true);
    let (_, detail) = client.get("/api/products/lisabo-table").await;
    assert_eq!(detail["favorite"], true);
    let (_, favorites) = client.get("/api/favorites").await;
    assert_eq!(favorites[0]["handle"], "lisabo-table");
    let (_, toggled) = client
        .post(&format!("/api/favorites/{id}/toggle"), json!({}))
        .await;
    assert_eq!(toggled["favorite"], false);
}

#[tokio::test]
async fn test_checkout_over_http() {
    let mut client = Client::new(test_app().await, "10.0.0.9");
    client.register("checkout@example.com").await;

    let (status, address) = client
        .post(
            "/api/addresses",
            json!({
                "full_name": "Ada Lovelace",
                "phone_number": "07700 900123",
                "address_line1": "1 Market St",
                "town": "London",
                "postcode": "sw1a1aa",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(address["is_default"], true);
    assert_eq!(address["postcode"], "SW1A 1AA");

    let (status, saved) = client
        .post(
            "/api/payment-methods",
            json!({
                "card_holder_name": "Ada Lovelace",
                "card_number": "4111111111111111",
                "expiry_date": "12/35",
                "cvv": "123",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(saved["last4"], "1111");
    assert!(saved.get("card_number").is_none());

    let (_, chair) = client.get("/api/products/poang-armchair").await;
    client
        .post("/api/cart/items", json!({ "product_id": chair["id"] }))
        .await;

    let (status, view) = client.post("/api/checkout/start", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["step"], "review");
    assert_eq!(view["step_number"], 1);

    let (status, _) = client.post("/api/checkout/place-order", json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    for _ in 0..3 {
        let (status, _) = client.post("/api/checkout/next", json!({})).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, view) = client
        .post("/api/checkout/place-order", json!({ "notes": "Ring twice" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["step"], "confirmation");
    let order_id = view["confirmation"]["order_id"].as_i64().unwrap();

    let (_, orders) = client.get("/api/orders?status=processing").await;
    assert_eq!(orders.as_array().unwrap().len(), 1);

    let (status, cancelled) = client
        .post(&format!("/api/orders/{order_id}/cancel"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, _) = client
        .post(&format!("/api/orders/{order_id}/cancel"), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, cart) = client.get("/api/cart").await;
    assert_eq!(cart["item_count"], 0);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}
