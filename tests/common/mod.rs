#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bizcard_api::{
    auth::password::hash_password,
    config::AppConfig,
    database::UserStore,
    models::{User, UserInput},
    router, AppState,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};

pub const PASSWORD: &str = "Abc123!";
pub const SECRET: &str = "integration-test-secret-0123456789";

/// An in-process server on a free port, backed by the in-memory store.
///
/// Each test starts its own so throttle and store state never leak between tests.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub state: AppState,
    pub client: Client,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("bizcard_api=debug")
            .with_test_writer()
            .try_init();

        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config = AppConfig::development();
        config.server.port = port;
        config.security.jwt_secret = SECRET.to_string();
        config.security.trust_proxy = true;
        config.security.enable_cors = false;

        let state = AppState::in_memory(config);
        let app = router(state.clone()).into_make_service_with_connect_info::<SocketAddr>();

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind port {}", port))?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self {
            port,
            base_url,
            state,
            client: Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(self.url(path))
    }

    pub fn patch(&self, path: &str) -> RequestBuilder {
        self.client.patch(self.url(path))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }

    /// Insert a user directly into the store, bypassing registration rules.
    pub async fn seed_user(&self, email: &str, is_admin: bool, is_business: bool) -> Result<User> {
        let input: UserInput = serde_json::from_value(user_payload(email, is_business))?;
        let hash = hash_password(PASSWORD)?;
        let mut user = User::from_input(input, hash);
        user.is_admin = is_admin;
        self.state.users.insert_user(&user).await?;
        Ok(user)
    }

    /// Seed a user and return it with a token issued for it.
    pub async fn seed_with_token(&self, email: &str, is_admin: bool, is_business: bool) -> Result<(User, String)> {
        let user = self.seed_user(email, is_admin, is_business).await?;
        let token = self.state.tokens.issue(&user)?;
        Ok((user, token))
    }

    /// Create a card through the API as `token`'s owner.
    pub async fn create_card(&self, token: &str) -> Result<Value> {
        let res = self
            .post("/cards")
            .header("x-auth-token", token)
            .json(&card_payload("Falafel Corner"))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "card create failed: {}", res.status());
        let body: Value = res.json().await?;
        Ok(body["data"].clone())
    }
}

pub fn user_payload(email: &str, is_business: bool) -> Value {
    json!({
        "name": { "first": "Noa", "last": "Cohen" },
        "phone": "0521234567",
        "email": email,
        "password": PASSWORD,
        "address": {
            "country": "Israel",
            "city": "Jerusalem",
            "street": "Jaffa",
            "houseNumber": "7"
        },
        "isBusiness": is_business
    })
}

pub fn card_payload(title: &str) -> Value {
    json!({
        "title": title,
        "subtitle": "Best in town",
        "description": "Fresh falafel every day",
        "phone": "0541234567",
        "email": "hello@falafel.example",
        "web": "https://falafel.example",
        "address": {
            "country": "Israel",
            "city": "Haifa City",
            "street": "Herzl",
            "houseNumber": "3"
        }
    })
}

/// Read the standard error envelope and return `(code, message)`.
pub async fn error_of(res: reqwest::Response) -> Result<(String, String)> {
    let body: Value = res.json().await?;
    anyhow::ensure!(body["success"] == false, "expected error envelope: {}", body);
    Ok((
        body["code"].as_str().unwrap_or_default().to_string(),
        body["error"].as_str().unwrap_or_default().to_string(),
    ))
}
