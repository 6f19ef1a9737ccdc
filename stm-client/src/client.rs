use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;

use crate::db::QueuedOp;
use crate::domain::{Credentials, Customer, EntryPayload, TimeEntry, User};
use crate::replay::ReplayTransport;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Rejected ({status}): {message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("TransportError: {0}")]
    Transport(String),
    #[error("ParsingError: {0}")]
    ParsingError(String),
}

impl ApiError {
    /// True when the request never got an answer from the server. Only these
    /// failures are worth queueing for replay; everything else is a verdict.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

/// Error payload the server attaches to rejected requests.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ApiError::Transport(format!("invalid API URL {base_url}: {e}")))?;
        let http = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Transport(format!("failed to build URL for {path}: {e}")))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (message, code) = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(parsed) => (parsed.error, parsed.code),
                Err(_) if body.is_empty() => (status.to_string(), None),
                Err(_) => (body, None),
            };
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                code,
                message,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::ParsingError(format!("failed to parse response as JSON: {e}")))
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        self.get_json(self.http.post(self.endpoint("/auth/login")?).json(credentials))
            .await
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let response = self
            .send(self.http.post(self.endpoint("/auth/logout")?))
            .await?;
        let _ = response.bytes().await;
        Ok(())
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        self.get_json(self.http.get(self.endpoint("/auth/me")?))
            .await
    }

    pub async fn fetch_customers(&self) -> Result<Vec<Customer>, ApiError> {
        self.get_json(self.http.get(self.endpoint("/customers")?))
            .await
    }

    pub async fn fetch_entries(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<TimeEntry>, ApiError> {
        let mut query = Vec::new();
        if let Some(from) = from {
            query.push(("from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = to {
            query.push(("to", to.format("%Y-%m-%d").to_string()));
        }

        self.get_json(self.http.get(self.endpoint("/entries")?).query(&query))
            .await
    }

    pub async fn create_entry(&self, payload: &EntryPayload) -> Result<TimeEntry, ApiError> {
        self.get_json(self.http.post(self.endpoint("/entries")?).json(payload))
            .await
    }

    pub async fn update_entry(
        &self,
        id: i32,
        payload: &EntryPayload,
    ) -> Result<TimeEntry, ApiError> {
        self.get_json(
            self.http
                .put(self.endpoint(&format!("/entries/{id}"))?)
                .json(payload),
        )
        .await
    }

    pub async fn delete_entry(&self, id: i32) -> Result<(), ApiError> {
        let response = self
            .send(self.http.delete(self.endpoint(&format!("/entries/{id}"))?))
            .await?;
        let _ = response.bytes().await;
        Ok(())
    }
}

#[async_trait]
impl ReplayTransport for ApiClient {
    async fn replay(&self, op: &QueuedOp) -> Result<(), ApiError> {
        let url = self.endpoint(&op.path)?;
        let request = match op.method.as_str() {
            "POST" => self.http.post(url),
            "PUT" => self.http.put(url),
            "DELETE" => self.http.delete(url),
            other => {
                return Err(ApiError::ParsingError(format!(
                    "queued operation {} has unsupported method {other}",
                    op.id
                )))
            }
        };
        let request = match &op.body {
            Some(body) => request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.clone()),
            None => request,
        };

        let response = self.send(request).await?;
        let _ = response.bytes().await;
        Ok(())
    }
}
