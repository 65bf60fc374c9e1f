//! Cloudflare API client implementation.
//!
//! This module provides the HTTP client for the Cloudflare v4 REST API. Every
//! response is decoded from the standard envelope and failures are mapped onto
//! [`CloudflareError`]. The client never retries; retry policy belongs to the
//! host running the module.

use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::{ConnectionParams, Secret};
use crate::error::{CloudflareError, ConfigError, ModuleError, Result};

use super::types::ApiEnvelope;

/// Page size requested from list endpoints.
const PER_PAGE: u32 = 50;

/// Upper bound on pages fetched by one list call.
const MAX_PAGES: u32 = 1000;

/// User agent sent with every request.
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Cloudflare API client.
#[derive(Debug, Clone)]
pub struct CloudflareClient {
    /// HTTP client.
    client: Client,
    /// API base URL without trailing slash.
    base_url: String,
    /// Bearer token.
    api_token: Secret,
    /// Per-request timeout, kept for error messages.
    timeout_secs: u64,
}

impl CloudflareClient {
    /// Creates a client from connection parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if no token is set or the HTTP client cannot be created.
    pub fn new(connection: &ConnectionParams) -> Result<Self> {
        let api_token = connection
            .api_token
            .clone()
            .ok_or_else(|| ConfigError::validation("api_token is required", "api_token"))?;
        let timeout_secs = connection.timeout_secs();

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CloudflareError::network(format!("Failed to create HTTP client: {e}")))?;

        debug!(
            "Cloudflare client for {} (token {}, timeout {timeout_secs}s)",
            connection.api_url(),
            api_token.fingerprint()
        );

        Ok(Self {
            client,
            base_url: connection.api_url().to_string(),
            api_token,
            timeout_secs,
        })
    }

    /// Returns the API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Performs a GET and returns the envelope's `result`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the result is missing.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let request = self.client.get(self.url(path)).query(query);
        let envelope: ApiEnvelope<T> = self.send(path, request).await?;
        Self::into_result(envelope)
    }

    /// Performs a GET on a list endpoint and collects every page.
    ///
    /// # Errors
    ///
    /// Returns an error if any page fails.
    pub async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let mut paged = query.to_vec();
            paged.push(("page", page.to_string()));
            paged.push(("per_page", PER_PAGE.to_string()));

            let request = self.client.get(self.url(path)).query(&paged);
            let envelope: ApiEnvelope<Vec<T>> = self.send(path, request).await?;

            let total_pages = envelope
                .result_info
                .and_then(|info| info.total_pages)
                .unwrap_or(page);
            let batch = envelope.result.unwrap_or_default();
            let fetched = batch.len();
            items.extend(batch);

            trace!("{path}: page {page}/{total_pages}, {fetched} items");

            if fetched == 0 || page >= total_pages || page >= MAX_PAGES {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    /// Performs a POST with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the result is missing.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.url(path)).json(body);
        let envelope: ApiEnvelope<T> = self.send(path, request).await?;
        Self::into_result(envelope)
    }

    /// Performs a PATCH with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the result is missing.
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let request = self.client.patch(self.url(path)).json(body);
        let envelope: ApiEnvelope<T> = self.send(path, request).await?;
        Self::into_result(envelope)
    }

    /// Performs a DELETE, discarding the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let request = self.client.delete(self.url(path));
        let _: ApiEnvelope<serde_json::Value> = self.send(path, request).await?;
        Ok(())
    }

    /// Sends a request and decodes the envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<ApiEnvelope<T>> {
        trace!("Cloudflare request: {path}");

        let response = request
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(self.api_token.expose())
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(&e))?;

        debug!("Cloudflare response: {path} -> {}", status.as_u16());

        if !status.is_success() {
            return Err(Self::status_error(status, path, &body).into());
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&body).map_err(|e| {
            CloudflareError::invalid_response(format!("Failed to parse response: {e}"))
        })?;

        if !envelope.success {
            let (code, message) = envelope.first_error();
            let message = if message.is_empty() {
                String::from("Request was not successful")
            } else {
                message
            };
            if envelope.is_auth_error() {
                return Err(CloudflareError::AuthenticationFailed {
                    status: status.as_u16(),
                    message,
                }
                .into());
            }
            return Err(CloudflareError::api_error(status.as_u16(), code, message).into());
        }

        Ok(envelope)
    }

    fn into_result<T>(envelope: ApiEnvelope<T>) -> Result<T> {
        envelope.result.ok_or_else(|| {
            ModuleError::Cloudflare(CloudflareError::invalid_response("No result in response"))
        })
    }

    /// Maps a non-2xx response onto an error.
    fn status_error(status: StatusCode, path: &str, body: &str) -> CloudflareError {
        let parsed = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(body).ok();
        let (code, message) = parsed
            .as_ref()
            .map(ApiEnvelope::first_error)
            .filter(|(_, message)| !message.is_empty())
            .unwrap_or_else(|| {
                let text = body.trim();
                let text = if text.is_empty() {
                    status.canonical_reason().unwrap_or("Unknown error")
                } else {
                    text
                };
                (None, text.to_string())
            });

        match status.as_u16() {
            401 | 403 => CloudflareError::AuthenticationFailed {
                status: status.as_u16(),
                message,
            },
            404 => CloudflareError::NotFound {
                path: path.to_string(),
            },
            409 => CloudflareError::Conflict { message },
            _ if parsed.as_ref().is_some_and(ApiEnvelope::is_auth_error) => {
                CloudflareError::AuthenticationFailed {
                    status: status.as_u16(),
                    message,
                }
            }
            other => CloudflareError::api_error(other, code, message),
        }
    }

    fn transport_error(&self, error: &reqwest::Error) -> ModuleError {
        if error.is_timeout() {
            CloudflareError::Timeout {
                timeout_secs: self.timeout_secs,
            }
            .into()
        } else {
            CloudflareError::network(format!("Request failed: {error}")).into()
        }
    }
}
