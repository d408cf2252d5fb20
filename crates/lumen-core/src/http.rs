//! HTTP client for a networked light controller.
//!
//! Some lamps sit behind a small HTTP bridge instead of being reached over
//! BLE directly. The bridge accepts two requests:
//!
//! - `POST /set-color` with `{"color": {"r": .., "g": .., "b": ..}}`
//! - `GET /shutdown`
//!
//! Only `200 OK` counts as success.
//!
//! # Example
//!
//! ```no_run
//! use lumen_core::http::HttpLightClient;
//! use lumen_types::Rgb;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpLightClient::new("http://192.168.1.40:3000")?;
//! client.set_color(Rgb::new(255, 36, 66)).await?;
//! client.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::debug;

use lumen_types::Rgb;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for HTTP light operations.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The bridge is not reachable.
    #[error("Light controller not reachable at {url}: {source}")]
    NotReachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Building the HTTP client failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The bridge answered with something other than 200.
    #[error("Light controller returned {status}: {message}")]
    Status { status: u16, message: String },
}

pub type HttpResult<T> = std::result::Result<T, HttpError>;

#[derive(Debug, Serialize)]
struct SetColorRequest {
    color: Rgb,
}

/// Client for the HTTP light bridge.
#[derive(Debug, Clone)]
pub struct HttpLightClient {
    client: Client,
    base_url: String,
}

impl HttpLightClient {
    /// Create a client for `base_url` (e.g. `http://192.168.1.40:3000`).
    pub fn new(base_url: &str) -> HttpResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Self::with_client(base_url, client)
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(base_url: &str, client: Client) -> HttpResult<Self> {
        let base_url = normalize_url(base_url)?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the bridge to show `color`.
    pub async fn set_color(&self, color: Rgb) -> HttpResult<()> {
        let url = format!("{}/set-color", self.base_url);
        debug!("POST {} {}", url, color);
        let response = self
            .client
            .post(&url)
            .json(&SetColorRequest { color })
            .send()
            .await
            .map_err(|source| HttpError::NotReachable {
                url: url.clone(),
                source,
            })?;
        check_status(response).await
    }

    /// Ask the bridge to turn the light off.
    pub async fn shutdown(&self) -> HttpResult<()> {
        let url = format!("{}/shutdown", self.base_url);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| HttpError::NotReachable {
                url: url.clone(),
                source,
            })?;
        check_status(response).await
    }
}

fn normalize_url(base_url: &str) -> HttpResult<String> {
    let base_url = base_url.trim().trim_end_matches('/');
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(HttpError::InvalidUrl(format!(
            "URL must start with http:// or https://, got: {}",
            base_url
        )));
    }
    Ok(base_url.to_string())
}

async fn check_status(response: reqwest::Response) -> HttpResult<()> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.to_string()
    } else {
        body.trim().to_string()
    };
    Err(HttpError::Status {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accept one request, answer with `status_line`, return the raw request.
    async fn serve_once(status_line: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (url, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        body.len() >= length
    }

    #[test]
    fn test_client_normalizes_url() {
        let client = HttpLightClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn test_client_invalid_url() {
        let result = HttpLightClient::new("localhost:3000");
        assert!(matches!(result, Err(HttpError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_set_color_posts_json() {
        let (url, server) = serve_once("200 OK").await;
        let client = HttpLightClient::new(&url).unwrap();
        client.set_color(Rgb::new(255, 36, 66)).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /set-color HTTP/1.1"));
        let body = request.split_once("\r\n\r\n").unwrap().1;
        let json: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(json, serde_json::json!({"color": {"r": 255, "g": 36, "b": 66}}));
    }

    #[tokio::test]
    async fn test_shutdown_gets() {
        let (url, server) = serve_once("200 OK").await;
        let client = HttpLightClient::new(&url).unwrap();
        client.shutdown().await.unwrap();
        assert!(server.await.unwrap().starts_with("GET /shutdown HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_non_ok_status_is_error() {
        let (url, _server) = serve_once("204 No Content").await;
        let client = HttpLightClient::new(&url).unwrap();
        let err = client.shutdown().await.unwrap_err();
        assert!(matches!(err, HttpError::Status { status: 204, .. }));
    }

    #[tokio::test]
    async fn test_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = HttpLightClient::new(&url).unwrap();
        let err = client.set_color(Rgb::BLACK).await.unwrap_err();
        assert!(matches!(err, HttpError::NotReachable { .. }));
    }
}
