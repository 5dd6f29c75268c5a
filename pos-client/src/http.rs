//! HTTP transport with bearer authentication

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::session::Session;
use crate::{ClientError, ClientResult};

/// HTTP client trait
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T>;
    async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ClientResult<T>;
    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T>;
    /// POST with an empty JSON object as body
    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T>;
}

/// Network HTTP client
#[derive(Debug, Clone)]
pub struct NetworkHttpClient {
    client: Client,
    base_url: String,
    session: Arc<Session>,
}

impl NetworkHttpClient {
    pub fn new(config: &ClientConfig, session: Arc<Session>) -> ClientResult<Self> {
        if config.base_url.is_empty() {
            return Err(ClientError::Config("base URL is empty".into()));
        }
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> ClientResult<T> {
        let response = self.authorize(req).send().await?;
        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();
        let url = response.url().path().to_string();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            // keep plain-text bodies as a JSON string
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes)
                    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            };
            tracing::debug!(status = status.as_u16(), path = %url, "Request failed");
            return Err(ClientError::from_status(status, body));
        }

        let bytes = if bytes.is_empty() { &b"null"[..] } else { &bytes[..] };
        serde_json::from_slice(bytes).map_err(|e| {
            tracing::warn!(path = %url, error = %e, "Unexpected response body");
            ClientError::InvalidResponse(format!("{}: {}", url, e))
        })
    }
}

#[async_trait]
impl HttpClient for NetworkHttpClient {
    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send(self.client.get(self.url(path))).await
    }

    async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ClientResult<T> {
        self.send(self.client.get(self.url(path)).query(query)).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.send(self.client.post(self.url(path)).json(body)).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send(
            self.client
                .post(self.url(path))
                .json(&serde_json::Map::new()),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let config = ClientConfig::new("http://localhost:8000/api/");
        let client = NetworkHttpClient::new(&config, Arc::new(Session::default())).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api");
        assert_eq!(client.url("orders/"), "http://localhost:8000/api/orders/");
        assert_eq!(client.url("/orders/3/"), "http://localhost:8000/api/orders/3/");
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let config = ClientConfig::new("");
        let err = NetworkHttpClient::new(&config, Arc::new(Session::default())).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }
}
