//! Network transport seam.
//!
//! `ApiClient` hands a fully built `HttpRequest` to a `Transport` and gets
//! back an `HttpResponse` regardless of status. Status interpretation stays
//! in the client; a transport only reports whether a response arrived.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ClientConfig;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Failure to obtain any HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// DNS, connect, TLS, timeout or reset.
    #[error("network error: {0}")]
    Network(String),

    /// Bytes came back but not as a well-formed HTTP response.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Executes one HTTP round-trip.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `reqwest`-backed transport used in production.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport with the config's timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Network` if the TLS backend cannot be
    /// initialised.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify_send_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response.text().await.map_err(classify_body_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// A reply that arrived but could not be parsed as HTTP is `Malformed`;
/// everything else (connect, timeout, reset) is `Network`.
fn classify_send_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() || err.is_connect() {
        return TransportError::Network(err.to_string());
    }
    if err.is_decode() || hyper_error(&err).is_some_and(hyper::Error::is_parse) {
        return TransportError::Malformed(err.to_string());
    }
    TransportError::Network(err.to_string())
}

/// The head was fine, so a failing body read is a cut connection or a
/// timeout.
fn classify_body_error(err: reqwest::Error) -> TransportError {
    if err.is_decode() {
        TransportError::Malformed(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}

fn hyper_error(err: &reqwest::Error) -> Option<&hyper::Error> {
    let mut source = std::error::Error::source(err);
    while let Some(e) = source {
        if let Some(hyper_err) = e.downcast_ref::<hyper::Error>() {
            return Some(hyper_err);
        }
        source = e.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::client::ApiClient;
    use crate::error::ApiError;

    /// Serve one connection: read the request, write `reply`, hang up.
    async fn one_shot_server(reply: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket.write_all(reply).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}")
    }

    fn client(base_url: &str) -> ApiClient {
        let transport = ReqwestTransport::from_client(reqwest::Client::new());
        ApiClient::new(base_url, Arc::new(transport))
    }

    fn get(url: String) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn truncated_body_is_a_network_failure() {
        let base = one_shot_server(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\n{\"a\":").await;

        let err = client(&base)
            .get::<serde_json::Value>("/x")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NetworkFailed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn non_http_reply_is_an_invalid_response() {
        let base = one_shot_server(b"SSH-2.0-OpenSSH_9.0\r\n").await;

        let err = client(&base)
            .get::<serde_json::Value>("/x")
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::InvalidResponse);
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
        let result = transport.execute(get(format!("http://{addr}/x"))).await;
        assert!(matches!(result, Err(TransportError::Network(_))), "{result:?}");
    }

    #[tokio::test]
    async fn well_formed_reply_passes_through_with_any_status() {
        let base = one_shot_server(
            b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 4\r\nx-trace: t1\r\n\r\nbusy",
        )
        .await;

        let transport = ReqwestTransport::from_client(reqwest::Client::new());
        let response = transport.execute(get(format!("{base}/x"))).await.unwrap();
        assert_eq!(response.status, 503);
        assert_eq!(response.body, "busy");
        assert!(response
            .headers
            .iter()
            .any(|(k, v)| k == "x-trace" && v == "t1"));
    }
}
