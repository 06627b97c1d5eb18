use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{DirectoryUser, IdentityProvider, UserPage};
use crate::{config::IdentityConfig, error::AppError};

const SERVICE: &str = "identity provider";

/// Admin REST client for a GoTrue-compatible auth server.
#[derive(Clone)]
pub struct GoTrueClient {
    http: Client,
    base: String,
    service_key: String,
}

#[derive(Deserialize)]
struct UsersEnvelope {
    #[serde(default)]
    users: Vec<DirectoryUser>,
}

#[derive(Deserialize)]
struct LinkEnvelope {
    action_link: Option<String>,
    properties: Option<LinkProperties>,
}

#[derive(Deserialize)]
struct LinkProperties {
    action_link: Option<String>,
}

impl GoTrueClient {
    pub fn new(cfg: &IdentityConfig, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("build identity http client")?;
        Ok(Self {
            http,
            base: format!("{}/auth/v1", cfg.url.trim_end_matches('/')),
            service_key: cfg.service_key.clone(),
        })
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, AppError> {
        let res = self.authed(req).send().await.map_err(transport_error)?;
        if res.status().is_success() {
            return Ok(res);
        }
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        Err(AppError::identity(provider_message(status, &body)))
    }
}

fn transport_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Timeout(SERVICE)
    } else {
        AppError::identity(err.to_string())
    }
}

/// Pulls the human-readable message out of a provider error body.
fn provider_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str).map(String::from))
        })
        .unwrap_or_else(|| format!("HTTP {status}"))
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    #[instrument(skip(self))]
    async fn list_users(&self, page: u32, per_page: u32) -> Result<UserPage, AppError> {
        let res = self
            .send(
                self.http
                    .get(format!("{}/admin/users", self.base))
                    .query(&[("page", page), ("per_page", per_page)]),
            )
            .await?;
        let total = res
            .headers()
            .get("x-total-count")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let envelope: UsersEnvelope = res.json().await.map_err(transport_error)?;
        debug!(count = envelope.users.len(), ?total, "fetched user page");
        Ok(UserPage {
            users: envelope.users,
            total,
        })
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<DirectoryUser>, AppError> {
        let res = self
            .authed(self.http.get(format!("{}/admin/users/{id}", self.base)))
            .send()
            .await
            .map_err(transport_error)?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::identity(provider_message(status, &body)));
        }
        res.json().await.map(Some).map_err(transport_error)
    }

    #[instrument(skip(self, metadata))]
    async fn update_user_metadata(
        &self,
        id: Uuid,
        metadata: Map<String, Value>,
    ) -> Result<DirectoryUser, AppError> {
        let res = self
            .send(
                self.http
                    .put(format!("{}/admin/users/{id}", self.base))
                    .json(&json!({ "user_metadata": metadata })),
            )
            .await?;
        res.json().await.map_err(transport_error)
    }

    #[instrument(skip(self))]
    async fn ban_user(&self, id: Uuid, duration: &str) -> Result<(), AppError> {
        self.send(
            self.http
                .put(format!("{}/admin/users/{id}", self.base))
                .json(&json!({ "ban_duration": duration })),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn generate_magic_link(&self, email: &str) -> Result<String, AppError> {
        let res = self
            .send(
                self.http
                    .post(format!("{}/admin/generate_link", self.base))
                    .json(&json!({ "type": "magiclink", "email": email })),
            )
            .await?;
        let link: LinkEnvelope = res.json().await.map_err(transport_error)?;
        link.action_link
            .or(link.properties.and_then(|p| p.action_link))
            .ok_or_else(|| AppError::identity("No magic link returned"))
    }

    #[instrument(skip(self))]
    async fn send_recovery(&self, email: &str) -> Result<(), AppError> {
        self.send(
            self.http
                .post(format!("{}/recover", self.base))
                .json(&json!({ "email": email })),
        )
        .await?;
        Ok(())
    }
}
