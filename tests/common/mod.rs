#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use rbac_admin_api::auth::{Argon2Hasher, JwtKeys, Scope};
use rbac_admin_api::config::AppConfig;
use rbac_admin_api::store::MemoryStore;
use rbac_admin_api::{build_router, AppState};

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // An empty DATABASE_URL wins over .env and selects the in-memory store
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_rbac-admin-api"));
        cmd.env("RBAC_API_PORT", port.to_string())
            .env("APP_ENV", "development")
            .env("DATABASE_URL", "")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK
                    || resp.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE
                {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!(
            "server did not become ready on {} within {:?}",
            self.base_url,
            timeout
        )
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server =
        SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// In-process app over a fresh in-memory store.
pub struct TestApp {
    pub router: Router,
    pub keys: JwtKeys,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let config = AppConfig::development();
        let store = Arc::new(MemoryStore::new());
        let hasher = Arc::new(Argon2Hasher::with_params(8, 1, 1).expect("argon2 params"));
        let keys = JwtKeys::from_config(&config.security).expect("jwt keys");
        let state = AppState::new(store.clone(), hasher, keys.clone(), config);

        Self {
            router: build_router(state),
            keys,
            store,
        }
    }

    pub fn token(&self, subject: &str, scope: Scope) -> String {
        self.keys.issue(subject, scope).expect("issue token")
    }

    pub fn admin(&self) -> String {
        self.token("ops", Scope::Admin)
    }

    pub fn reader(&self) -> String {
        self.token("auditor", Scope::Read)
    }

    /// Send one request and return the status with the parsed JSON body
    /// (`Value::Null` for an empty body).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    /// POST /api/v1/auth/token without a bearer token.
    pub async fn login(&self, correo: &str, clave: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/v1/auth/token",
            None,
            Some(serde_json::json!({ "correo": correo, "clave": clave })),
        )
        .await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// POST and return the new id, panicking unless the create succeeded.
    pub async fn create(&self, uri: &str, body: Value) -> String {
        let (status, value) = self.post(uri, &self.admin(), body).await;
        assert_eq!(status, StatusCode::CREATED, "create {} failed: {}", uri, value);
        value["id"].as_str().expect("id").to_string()
    }

    pub async fn create_user(&self, correo: &str) -> String {
        self.create(
            "/api/v1/usuarios",
            json!({
                "nombre": "Ana",
                "apellido": "Pérez",
                "departamento": "Ventas",
                "correo": correo,
                "clave": "secreto1",
            }),
        )
        .await
    }

    pub async fn create_system(&self, nombre: &str) -> String {
        self.create(
            "/api/v1/sistemas",
            json!({ "nombre": nombre, "descripcion": "test" }),
        )
        .await
    }

    pub async fn create_role(&self, nombre: &str, nivel: i64) -> String {
        self.create(
            "/api/v1/roles",
            json!({ "nombre": nombre, "nivel_jerarquia": nivel }),
        )
        .await
    }

    pub async fn create_permission(&self, nombre: &str) -> String {
        self.create("/api/v1/permisos", json!({ "nombre": nombre }))
            .await
    }
}
