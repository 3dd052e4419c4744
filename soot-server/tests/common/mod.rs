#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::Value;
use soot_core::SootConfig;
use soot_server::db;
use soot_server::state::AppState;
use soot_server::store::accounts::{self, User};
use soot_server::store::houses::{self, House};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

/// In-memory database with migrations applied up to `target` (all when None).
///
/// A single connection keeps every query on the same in-memory database.
pub async fn memory_pool_at(target: Option<&str>) -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::migrate_to(&pool, target).await.unwrap();
    pool
}

pub struct TestApp {
    pub pool: SqlitePool,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_pool(memory_pool_at(None).await)
    }

    pub fn with_pool(pool: SqlitePool) -> Self {
        Self::with_config(pool, SootConfig::default())
    }

    pub fn with_config(pool: SqlitePool, config: SootConfig) -> Self {
        let router = soot_server::app(AppState::new(pool.clone(), config));
        TestApp { pool, router }
    }

    /// A user with a live session token.
    pub async fn user(&self, email: &str) -> (User, String) {
        let user = accounts::find_or_create(&self.pool, email, None).await.unwrap();
        let token = accounts::issue_session(&self.pool, &user.id, 30).await.unwrap();
        (user, token)
    }

    pub async fn house(&self, owner: &User, name: &str) -> House {
        houses::create(&self.pool, name, owner).await.unwrap()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, _, text) = self.request_raw(method, uri, token, body).await;
        let json = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        (status, json)
    }

    /// Status, content type and body text.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Option<String>, String) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }
}
