//! In-process fake of the restaurant backend

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use pos_client::{ClientConfig, ClientContext, ClientEvent, Notice, PollConfig};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::sync::broadcast;

pub const TOKEN: &str = "test-token";

#[derive(Debug, Default)]
pub struct Backend {
    pub orders: Vec<Value>,
    pub tables: Vec<Value>,
    pub products: Vec<Value>,
    pub notifications: Vec<Value>,
    /// Tables the backend refuses because they have an open order
    pub occupied_tables: Vec<i64>,
    /// Every order action answers with this status and body when set
    pub fail_actions: Option<(StatusCode, Value)>,
    /// Every request answers 401 when set
    pub reject_all: bool,
    /// `update-items` answers only after this delay when set
    pub update_delay: Option<Duration>,
    /// Recorded POSTs: path and body
    pub posts: Vec<(String, Value)>,
    /// `search` parameter of every order list request
    pub order_searches: Vec<String>,
}

type Shared = Arc<Mutex<Backend>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub backend: Shared,
    pub dir: TempDir,
}

impl TestServer {
    pub async fn start(backend: Backend) -> Self {
        let backend = Arc::new(Mutex::new(backend));
        let app = router(backend.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            addr,
            backend,
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(format!("http://{}/api", self.addr))
            .with_token(TOKEN)
            .with_timeout(5)
            .with_prefs_path(self.dir.path().join("kitchen_prefs.json"))
            .with_polling(PollConfig::with_intervals(
                std::time::Duration::from_millis(200),
                std::time::Duration::from_millis(400),
            ))
    }

    pub fn context(&self) -> ClientContext {
        ClientContext::new(self.config()).unwrap()
    }

    pub fn posts(&self) -> Vec<(String, Value)> {
        self.backend.lock().posts.clone()
    }

    pub fn order_searches(&self) -> Vec<String> {
        self.backend.lock().order_searches.clone()
    }

    pub fn order(&self, id: i64) -> Option<Value> {
        self.backend
            .lock()
            .orders
            .iter()
            .find(|o| o["id"] == id)
            .cloned()
    }
}

/// Drain every notice received so far
pub fn notices(rx: &mut broadcast::Receiver<ClientEvent>) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ClientEvent::Notice(notice) = event {
            out.push(notice);
        }
    }
    out
}

pub fn order_json(id: i64, status: &str, order_type: &str) -> Value {
    json!({
        "id": id,
        "status": status,
        "status_display": status,
        "order_type": order_type,
        "created_at": "2025-03-01T10:00:00Z",
        "updated_at": "2025-03-01T10:00:00Z",
        "total_price": "30000.00",
        "final_price": "30000.00",
        "items": [],
    })
}

pub fn table_json(id: i64, name: &str, zone: &str, available: bool) -> Value {
    json!({"id": id, "name": name, "zone": zone, "is_available": available})
}

pub fn product_json(id: i64, name: &str, price: &str) -> Value {
    json!({"id": id, "name": name, "price": price, "is_active": true, "category": null})
}

fn router(backend: Shared) -> Router {
    Router::new()
        .route("/api/categories/", get(|| async { Json(json!([])) }))
        .route("/api/products/", get(products))
        .route("/api/tables/", get(tables))
        .route("/api/orders/", get(list_orders).post(create_order))
        .route("/api/orders/{id}/", get(get_order))
        .route("/api/orders/{id}/{action}/", get(order_resource).post(order_action))
        .route("/api/kitchen/unacknowledged-changes/", get(notifications))
        .route("/api/kitchen/acknowledge-changes/", post(acknowledge))
        .route("/api/cashier/orders-ready/", get(ready_orders))
        .route("/api/cashier/payment-history/", get(paid_orders))
        .route("/api/delivery/paid-orders/", get(paid_orders))
        .layer(middleware::from_fn_with_state(backend.clone(), require_token))
        .with_state(backend)
}

async fn require_token(State(backend): State<Shared>, req: Request, next: Next) -> Response {
    let expected = format!("Bearer {}", TOKEN);
    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized || backend.lock().reject_all {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid token"})),
        )
            .into_response();
    }
    next.run(req).await
}

async fn products(State(backend): State<Shared>) -> Json<Value> {
    Json(Value::Array(backend.lock().products.clone()))
}

async fn tables(State(backend): State<Shared>) -> Json<Value> {
    Json(Value::Array(backend.lock().tables.clone()))
}

async fn list_orders(
    State(backend): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let mut backend = backend.lock();
    let search = params.get("search").cloned().unwrap_or_default();
    backend.order_searches.push(search);
    Json(Value::Array(backend.orders.clone()))
}

async fn get_order(State(backend): State<Shared>, Path(id): Path<i64>) -> Response {
    match backend.lock().orders.iter().find(|o| o["id"] == id) {
        Some(order) => Json(order.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response(),
    }
}

async fn create_order(State(backend): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut backend = backend.lock();
    backend.posts.push(("orders/".into(), body.clone()));

    if let Some(table_id) = body["table_id"].as_i64()
        && backend.occupied_tables.contains(&table_id)
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"table_id": [format!("Table {} is already occupied", table_id)]})),
        )
            .into_response();
    }

    let id = 100 + backend.orders.len() as i64;
    let mut order = order_json(id, "new", body["order_type"].as_str().unwrap_or("dine_in"));
    order["table_id"] = body["table_id"].clone();
    backend.orders.push(order.clone());
    (StatusCode::CREATED, Json(order)).into_response()
}

async fn order_resource(
    State(backend): State<Shared>,
    Path((id, resource)): Path<(i64, String)>,
) -> Response {
    let backend = backend.lock();
    let paid = backend
        .orders
        .iter()
        .any(|o| o["id"] == id && o["payment"].is_object());
    if resource != "receipt" || !paid {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response();
    }
    Json(json!({
        "check_number": format!("C-{}", id),
        "items": [],
        "final_price": "30000.00",
    }))
    .into_response()
}

async fn order_action(
    State(backend): State<Shared>,
    Path((id, action)): Path<(i64, String)>,
    Json(body): Json<Value>,
) -> Response {
    let delay = backend.lock().update_delay.filter(|_| action == "update-items");
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    let mut backend = backend.lock();
    backend
        .posts
        .push((format!("orders/{}/{}/", id, action), body.clone()));
    if let Some((status, body)) = backend.fail_actions.clone() {
        return (status, Json(body)).into_response();
    }
    let Some(order) = backend.orders.iter_mut().find(|o| o["id"] == id) else {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response();
    };
    let status = match action.as_str() {
        "start_preparation" => "preparing",
        "mark_ready" => "ready",
        "mark-served" => "served",
        "cancel_order" => "cancelled",
        "start_delivery" => "delivering",
        "mark_delivered" => "delivered",
        "process_payment" => {
            order["payment"] = json!({
                "id": id,
                "method": body["method"],
                "timestamp": "2025-03-01T12:00:00Z",
            });
            "paid"
        }
        "update-items" => return Json(json!({})).into_response(),
        _ => return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response(),
    };
    order["status"] = json!(status);
    Json(json!({})).into_response()
}

async fn notifications(State(backend): State<Shared>) -> Json<Value> {
    Json(Value::Array(backend.lock().notifications.clone()))
}

async fn acknowledge(State(backend): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut backend = backend.lock();
    backend
        .posts
        .push(("kitchen/acknowledge-changes/".into(), body.clone()));
    let ids: Vec<i64> = body["log_ids"]
        .as_array()
        .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default();
    backend
        .notifications
        .retain(|n| !n["id"].as_i64().is_some_and(|id| ids.contains(&id)));
    Json(json!({"acknowledged": ids.len()}))
}

async fn ready_orders(State(backend): State<Shared>) -> Json<Value> {
    let orders = backend
        .lock()
        .orders
        .iter()
        .filter(|o| o["status"] == "ready")
        .cloned()
        .collect();
    Json(Value::Array(orders))
}

async fn paid_orders(State(backend): State<Shared>) -> Json<Value> {
    let orders = backend
        .lock()
        .orders
        .iter()
        .filter(|o| o["payment"].is_object())
        .cloned()
        .collect();
    Json(Value::Array(orders))
}
