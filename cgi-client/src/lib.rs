//! Private HTTP transport for the Reolink CGI API
//!
//! Reolink cameras expose every operation through a single endpoint,
//! `http://{host}/cgi-bin/api.cgi`, selecting the operation with a `cmd`
//! query parameter. This crate owns that one endpoint: it attaches the
//! command name and session token, serializes the JSON body, enforces the
//! configured timeout and folds every network failure into a
//! [`TransportError`]. It never retries and never interprets the response
//! body; that belongs to the API layer above.

mod error;

pub use error::TransportError;

use std::io::Read;
use std::time::Duration;

use serde_json::Value;

/// Path of the single CGI endpoint on the device
pub const API_PATH: &str = "/cgi-bin/api.cgi";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on a response body read into memory
const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

/// HTTP method used for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Binary capture (snapshots)
    Get,
    /// JSON command dispatch
    Post,
}

/// A single request against the CGI endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Value of the `cmd` query parameter
    pub command: String,
    /// Session token, attached as `token=` when present
    pub token: Option<String>,
    /// Extra query parameters, appended after `cmd` and `token`
    pub query: Vec<(String, String)>,
    /// JSON body, only sent with `POST`
    pub body: Option<Value>,
}

impl Request {
    /// Create a `POST` request carrying a JSON body
    pub fn post(command: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            command: command.into(),
            token: None,
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// Create a `GET` request with no body
    pub fn get(command: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            command: command.into(),
            token: None,
            query: Vec::new(),
            body: None,
        }
    }

    /// Attach a session token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Append an extra query parameter
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// All query parameters in the order they are sent
    pub fn query_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = vec![("cmd", self.command.as_str())];
        if let Some(token) = &self.token {
            pairs.push(("token", token.as_str()));
        }
        pairs.extend(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        pairs
    }
}

/// An HTTP response as received from the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Value of the `Content-Type` header, if any
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Build a `200 application/json` response from a JSON value
    pub fn json(value: &Value) -> Self {
        Self {
            status: 200,
            content_type: Some("application/json".to_string()),
            body: value.to_string().into_bytes(),
        }
    }

    /// Whether the device labelled the body as an image
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("image"))
    }
}

/// Anything that can carry a [`Request`] to the device
///
/// Implemented by [`CgiClient`] for real devices and by scripted doubles in
/// tests of the layers above.
pub trait Transport: Send + Sync {
    /// Send one request and return the raw response
    fn send(&self, request: &Request) -> Result<RawResponse, TransportError>;

    /// Host this transport talks to, used in log and error messages
    fn host(&self) -> &str;
}

/// Blocking HTTP client bound to one camera
#[derive(Debug, Clone)]
pub struct CgiClient {
    agent: ureq::Agent,
    host: String,
    base_url: String,
    timeout: Duration,
}

impl CgiClient {
    /// Create a client for `host` with the default timeout
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_timeout(host, DEFAULT_TIMEOUT)
    }

    /// Create a client for `host` with a custom timeout
    ///
    /// The timeout applies both to establishing the connection and to
    /// reading the response.
    pub fn with_timeout(host: impl Into<String>, timeout: Duration) -> Self {
        let host = host.into();
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(timeout)
                .timeout_read(timeout)
                .build(),
            base_url: format!("http://{}{}", host, API_PATH),
            host,
            timeout,
        }
    }

    /// Full endpoint URL without query parameters
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn classify_transport(&self, err: &ureq::Transport) -> TransportError {
        match err.kind() {
            ureq::ErrorKind::Dns | ureq::ErrorKind::ConnectionFailed => {
                if source_is_timeout(err) {
                    self.timeout_error()
                } else {
                    TransportError::Connect {
                        host: self.host.clone(),
                        reason: err.to_string(),
                    }
                }
            }
            _ if source_is_timeout(err) => self.timeout_error(),
            _ => TransportError::Io {
                host: self.host.clone(),
                reason: err.to_string(),
            },
        }
    }

    fn classify_read(&self, err: std::io::Error) -> TransportError {
        if is_timeout_kind(err.kind()) {
            self.timeout_error()
        } else {
            TransportError::Io {
                host: self.host.clone(),
                reason: err.to_string(),
            }
        }
    }

    fn timeout_error(&self) -> TransportError {
        TransportError::Timeout {
            host: self.host.clone(),
            timeout: self.timeout,
        }
    }
}

impl Transport for CgiClient {
    fn send(&self, request: &Request) -> Result<RawResponse, TransportError> {
        let mut http = match request.method {
            Method::Get => self.agent.get(&self.base_url),
            Method::Post => self.agent.post(&self.base_url),
        };
        for (key, value) in request.query_pairs() {
            http = http.query(key, value);
        }

        tracing::debug!(
            host = %self.host,
            command = %request.command,
            method = ?request.method,
            "sending camera request"
        );

        let result = match (&request.method, &request.body) {
            (Method::Post, Some(body)) => http.send_json(body),
            _ => http.call(),
        };

        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(TransportError::Status {
                    host: self.host.clone(),
                    status,
                })
            }
            Err(ureq::Error::Transport(err)) => return Err(self.classify_transport(&err)),
        };

        let status = response.status();
        let content_type = response.header("content-type").map(str::to_string);

        let body = read_capped(response.into_reader(), MAX_BODY_BYTES)
            .map_err(|e| self.classify_read(e))?
            .ok_or_else(|| TransportError::Io {
                host: self.host.clone(),
                reason: format!("response body exceeds {} bytes", MAX_BODY_BYTES),
            })?;

        tracing::debug!(
            host = %self.host,
            command = %request.command,
            status,
            bytes = body.len(),
            "received camera response"
        );

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }

    fn host(&self) -> &str {
        &self.host
    }
}

/// Read at most `limit` bytes; `None` if the body is longer
fn read_capped(reader: impl Read, limit: u64) -> std::io::Result<Option<Vec<u8>>> {
    let mut body = Vec::new();
    reader.take(limit + 1).read_to_end(&mut body)?;
    if body.len() as u64 > limit {
        return Ok(None);
    }
    Ok(Some(body))
}

fn is_timeout_kind(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}

fn source_is_timeout(err: &ureq::Transport) -> bool {
    std::error::Error::source(err)
        .and_then(|source| source.downcast_ref::<std::io::Error>())
        .is_some_and(|io| is_timeout_kind(io.kind()))
}
