//! HTTP fetching with bounded retries
//!
//! All network traffic goes through the [`Transport`] trait. The production
//! implementation wraps a blocking `reqwest` client that is shared by every
//! worker; tests plug in a scripted in-memory transport instead.

use crate::retry::{RetryPolicy, Retryable};
use scraper::Html;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Timeout applied to every request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// User agent sent to the streaming sites
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; rv:122.0) Gecko/20100101 Firefox/122.0";

/// Errors that can occur while fetching a resource
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be parsed or built
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// Connection failure, timeout or other transport level problem
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The server answered with a non-success status code
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The response body was not the JSON we expected
    #[error("Failed to parse JSON from {url}: {message}")]
    Json { url: String, message: String },

    /// Every attempt failed
    #[error("Giving up on {url} after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            // Authorization answers are final
            FetchError::Status { status, .. } => !matches!(status, 401 | 403),
            _ => false,
        }
    }
}

/// Request method, with the form body for POST requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    PostForm(Vec<(String, String)>),
}

/// A fully prepared HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL, query string included
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn post_form(url: impl Into<String>, form: &[(&str, &str)]) -> Self {
        Self {
            method: Method::PostForm(
                form.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// A received HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport level failure (no response was received)
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Performs single HTTP exchanges
///
/// Implementations must be usable from several worker threads at once.
pub trait Transport: Send + Sync {
    /// Sends the request once, without retrying
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Transport backed by a blocking `reqwest` client
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Creates a transport with the site user agent and the fixed request timeout
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    /// Creates a transport with the site user agent and a custom timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match &request.method {
            Method::Get => self.client.get(&request.url),
            Method::PostForm(form) => self.client.post(&request.url).form(form),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| TransportError(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

/// Retrying front-end to a [`Transport`]
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    /// Sends the request, retrying transient failures
    ///
    /// Only 2xx responses are returned; anything else ends up as an error once
    /// the retry budget is spent.
    pub fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        let result = self.retry.run(|_| {
            let response = self
                .transport
                .send(request)
                .map_err(|e| FetchError::Transport {
                    url: request.url.clone(),
                    message: e.0,
                })?;

            if response.is_success() {
                Ok(response)
            } else {
                Err(FetchError::Status {
                    url: request.url.clone(),
                    status: response.status,
                })
            }
        });

        result.map_err(|(last, attempts)| {
            if attempts > 1 {
                FetchError::RetriesExhausted {
                    url: request.url.clone(),
                    attempts,
                    last: Box::new(last),
                }
            } else {
                last
            }
        })
    }

    /// Fetches a page and parses it as HTML
    pub fn fetch_document(&self, url: &str) -> Result<Html, FetchError> {
        let response = self.execute(&HttpRequest::get(url))?;
        Ok(Html::parse_document(&response.body))
    }

    /// Fetches a page whose query string is built from `params`
    pub fn fetch_document_with_query(
        &self,
        base: &str,
        params: &[(&str, &str)],
    ) -> Result<Html, FetchError> {
        let url = Url::parse_with_params(base, params).map_err(|e| FetchError::InvalidUrl {
            url: base.to_string(),
            message: e.to_string(),
        })?;
        self.fetch_document(url.as_str())
    }

    /// Sends the request and decodes the JSON body
    pub fn execute_json<T: DeserializeOwned>(&self, request: &HttpRequest) -> Result<T, FetchError> {
        let response = self.execute(request)?;
        serde_json::from_str(&response.body).map_err(|e| FetchError::Json {
            url: request.url.clone(),
            message: e.to_string(),
        })
    }
}
