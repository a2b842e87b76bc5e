//! Typed HTTP client for the cycle tracking API.
//!
//! # Design
//! `ApiClient` holds the base address, a shared `Transport`, and the single
//! mutable piece of process-wide state: the bearer token. Every call is
//! split into `build_request` (pure; captures headers, including the token,
//! at build time) and `parse_response` (pure; status classification and
//! decoding), with one `Transport::execute` await in between. A token
//! change therefore never reaches a request that is already built.
//!
//! Status precedence: 2xx success, 401 `Unauthorized`, other 4xx
//! `ClientError`, 5xx `ServerError`, anything else `UnexpectedStatus`.

use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, TransportError};

const CONTENT_TYPE_JSON: &str = "application/json";

/// Typed client over a pluggable `Transport`.
///
/// Cheap to share behind an `Arc`; concurrent calls do not interfere.
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    auth_token: Mutex<Option<String>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.auth_token().is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base_url: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            auth_token: Mutex::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace the bearer token used by requests built from now on.
    ///
    /// `None` and the empty string both clear it.
    pub fn set_auth_token(&self, token: Option<String>) {
        let token = token.filter(|t| !t.is_empty());
        *self.auth_token.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn auth_token(&self) -> Option<String> {
        self.auth_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn get<T>(&self, path: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.request::<(), T>(HttpMethod::Get, path, None).await
    }

    pub async fn post<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        self.request(HttpMethod::Post, path, body).await
    }

    /// `post` without a request body.
    pub async fn post_empty<T>(&self, path: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.request::<(), T>(HttpMethod::Post, path, None).await
    }

    pub async fn put<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        self.request(HttpMethod::Put, path, body).await
    }

    /// Issue a DELETE; the response body is never decoded.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let request = self.build_request::<()>(HttpMethod::Delete, path, None)?;
        let response = self.send(request).await?;
        check_status(response.status)
    }

    async fn request<B, T>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.build_request(method, path, body)?;
        let response = self.send(request).await?;
        self.parse_response(response)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = request.method;
        let url = request.url.clone();
        debug!(%method, %url, "sending request");

        match self.transport.execute(request).await {
            Ok(response) => {
                debug!(%method, %url, status = response.status, "received response");
                Ok(response)
            }
            Err(TransportError::Network(message)) => {
                debug!(%method, %url, error = %message, "request failed");
                Err(ApiError::NetworkFailed(message))
            }
            Err(TransportError::Malformed(message)) => {
                debug!(%method, %url, error = %message, "malformed response");
                Err(ApiError::InvalidResponse)
            }
        }
    }

    /// Build the wire request for `method` + `path`.
    ///
    /// # Errors
    ///
    /// `InvalidAddress` if base + path is not an absolute URL,
    /// `EncodingFailed` if `body` cannot be serialized.
    pub fn build_request<B>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpRequest, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{path}", self.base_url);
        reqwest::Url::parse(&url).map_err(|_| ApiError::InvalidAddress)?;

        let mut headers = Vec::new();
        if let Some(token) = self.auth_token() {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }

        let body = match body {
            Some(value) => {
                let json = serde_json::to_string(value)
                    .map_err(|e| ApiError::EncodingFailed(e.to_string()))?;
                headers.push(("content-type".to_string(), CONTENT_TYPE_JSON.to_string()));
                Some(json)
            }
            None => None,
        };

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Classify `response` and decode its body as `T` on success.
    ///
    /// An empty success body is decoded as JSON `null`, so `()` and
    /// `Option<_>` targets accept it.
    pub fn parse_response<T>(&self, response: HttpResponse) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        if let Err(err) = check_status(response.status) {
            debug!(status = response.status, body_len = response.body.len(), "discarding error body");
            return Err(err);
        }
        let body = if response.body.trim().is_empty() {
            "null"
        } else {
            response.body.as_str()
        };
        serde_json::from_str(body).map_err(|e| ApiError::DecodingFailed(e.to_string()))
    }
}

/// Map a status code to success or its `ApiError` variant.
pub fn check_status(status: u16) -> Result<(), ApiError> {
    match status {
        200..=299 => Ok(()),
        401 => Err(ApiError::Unauthorized),
        400..=499 => Err(ApiError::ClientError(status)),
        500..=599 => Err(ApiError::ServerError(status)),
        _ => Err(ApiError::UnexpectedStatus(status)),
    }
}
