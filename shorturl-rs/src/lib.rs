//! # shorturl-rs
//!
//! Wire types and a small Rust client for the shorturl URL shortener API.
//!
//! The server uses the same request and response types, so a payload produced by
//! this crate is exactly what the API expects.
//!
//! ## Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), shorturl_rs::ShortUrlApiError> {
//! use shorturl_rs::ShortUrlApi;
//!
//! let api = ShortUrlApi::new("http://localhost:8080")?;
//!
//! let code = api.create_short_url("https://example.com/very/long/url").await?;
//! api.update_short_url(&code, "https://example.com/another/url").await?;
//!
//! let target = api.resolve_short_url(&code).await?;
//! assert_eq!(target.as_deref(), Some("https://example.com/another/url"));
//! # Ok(())
//! # }
//! ```

use reqwest::{StatusCode, Url, header::LOCATION, redirect::Policy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Path prefix every API route lives under.
pub const API_PREFIX: &str = "/api/v1";

/// Request payload for creating or updating a short URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortUrlRequest {
    /// The long URL the short code should point to.
    pub url: String,
}

/// Response after creating (or re-using) a short URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedShortUrlResponse {
    /// The short code, to be appended to the API prefix.
    #[serde(rename = "shortUrl")]
    pub short_url: String,
}

/// Response after updating the destination of a short URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedShortUrlResponse {
    pub status: String,
    pub message: String,
}

impl UpdatedShortUrlResponse {
    pub fn successful() -> Self {
        Self {
            status: String::from("Successful"),
            message: String::from("Short URL updated successfully"),
        }
    }
}

/// Body of every non-successful API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// A client for the shorturl API.
///
/// Redirects are never followed, so resolving a short code reports the
/// `Location` the server answered with.
#[derive(Clone)]
pub struct ShortUrlApi {
    url: String,
    client: reqwest::Client,
}

/// Errors that can occur when talking to the shorturl API.
#[derive(Debug, Error)]
pub enum ShortUrlApiError {
    /// The configured base URL could not be turned into a request URL.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// Sending the request or receiving the response failed.
    #[error("Request error: {0}")]
    RequestError(String),
    /// The response body did not have the expected shape.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    /// The API answered with an error status.
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },
}

impl ShortUrlApi {
    /// Creates a client for the API served at `url`, e.g. `http://localhost:8080`.
    ///
    /// # Errors
    ///
    /// Returns [`ShortUrlApiError::ConfigurationError`] if the HTTP client cannot be built.
    pub fn new(url: &str) -> Result<Self, ShortUrlApiError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(|e| ShortUrlApiError::ConfigurationError(e.to_string()))?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ShortUrlApiError> {
        Url::parse(&format!("{}{}/{}", self.url, API_PREFIX, path))
            .map_err(|e| ShortUrlApiError::ConfigurationError(e.to_string()))
    }

    /// Creates a short code for `long_url` and returns it.
    ///
    /// Creating the same long URL twice returns the same code.
    ///
    /// # Errors
    ///
    /// Returns [`ShortUrlApiError::ApiError`] for a rejected body (400) or a
    /// store failure on the server (500).
    pub async fn create_short_url(&self, long_url: &str) -> Result<String, ShortUrlApiError> {
        let resp = self
            .client
            .post(self.endpoint("createShortUrl")?)
            .json(&ShortUrlRequest {
                url: long_url.to_string(),
            })
            .send()
            .await
            .map_err(|e| ShortUrlApiError::RequestError(e.to_string()))?;

        let created: CreatedShortUrlResponse = decode(resp).await?;

        Ok(created.short_url)
    }

    /// Points an existing short code at `long_url`.
    ///
    /// # Errors
    ///
    /// The server answers 500 both for unknown codes and for updates that would
    /// not change the stored URL; both surface as [`ShortUrlApiError::ApiError`].
    pub async fn update_short_url(
        &self,
        short_url: &str,
        long_url: &str,
    ) -> Result<UpdatedShortUrlResponse, ShortUrlApiError> {
        let resp = self
            .client
            .put(self.endpoint(&format!("updateShortUrl/{short_url}"))?)
            .json(&ShortUrlRequest {
                url: long_url.to_string(),
            })
            .send()
            .await
            .map_err(|e| ShortUrlApiError::RequestError(e.to_string()))?;

        decode(resp).await
    }

    /// Looks up where `short_url` redirects to. Returns `None` for unknown codes.
    pub async fn resolve_short_url(
        &self,
        short_url: &str,
    ) -> Result<Option<String>, ShortUrlApiError> {
        let resp = self
            .client
            .get(self.endpoint(short_url)?)
            .send()
            .await
            .map_err(|e| ShortUrlApiError::RequestError(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !resp.status().is_redirection() {
            return Err(api_error(resp).await);
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ShortUrlApiError::DeserializationError("redirect without location".to_string())
            })?;

        Ok(Some(location.to_string()))
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ShortUrlApiError> {
    if !resp.status().is_success() {
        return Err(api_error(resp).await);
    }

    resp.json::<T>()
        .await
        .map_err(|e| ShortUrlApiError::DeserializationError(e.to_string()))
}

async fn api_error(resp: reqwest::Response) -> ShortUrlApiError {
    let status = resp.status().as_u16();
    let message = match resp.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(e) => e.to_string(),
    };

    ShortUrlApiError::ApiError { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_response_uses_camel_case() {
        let json = serde_json::to_string(&CreatedShortUrlResponse {
            short_url: String::from("abc1234"),
        })
        .unwrap();

        assert_eq!(json, r#"{"shortUrl":"abc1234"}"#);
    }

    #[test]
    fn test_request_requires_url() {
        assert!(serde_json::from_str::<ShortUrlRequest>("{}").is_err());
        assert!(serde_json::from_str::<ShortUrlRequest>(r#"{"url":1}"#).is_err());

        let req: ShortUrlRequest = serde_json::from_str(r#"{"url":"https://a.b"}"#).unwrap();
        assert_eq!(req.url, "https://a.b");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let api = ShortUrlApi::new("http://localhost:8080/").unwrap();

        assert_eq!(
            api.endpoint("createShortUrl").unwrap().as_str(),
            "http://localhost:8080/api/v1/createShortUrl"
        );
    }

    async fn serve_once(response: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_resolve_reports_location_without_following() {
        let base = serve_once(
            "HTTP/1.1 301 Moved Permanently\r\n\
             Location: http://unreachable.invalid/target\r\n\
             Content-Length: 0\r\n\
             Connection: close\r\n\r\n",
        )
        .await;

        let api = ShortUrlApi::new(&base).unwrap();

        assert_eq!(
            api.resolve_short_url("abc1234").await.unwrap().as_deref(),
            Some("http://unreachable.invalid/target")
        );
    }

    #[tokio::test]
    async fn test_resolve_unknown_code() {
        let base = serve_once(
            "HTTP/1.1 404 Not Found\r\n\
             Content-Type: application/json\r\n\
             Content-Length: 31\r\n\
             Connection: close\r\n\r\n\
             {\"error\":\"Short URL not found\"}",
        )
        .await;

        let api = ShortUrlApi::new(&base).unwrap();

        assert_eq!(api.resolve_short_url("nothere").await.unwrap(), None);
    }
}
