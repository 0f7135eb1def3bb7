//! Scripted transport double for tests
//!
//! Available to this crate's tests and, through the `test-support` feature,
//! to sibling crates that need a camera without a network.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use cgi_client::{RawResponse, Request, Transport, TransportError};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Builds a transport error for a host
pub type ErrorFactory = fn(&str) -> TransportError;

#[derive(Clone)]
enum Step {
    Respond(RawResponse),
    Fail(ErrorFactory),
}

/// A [`Transport`] that answers from per-command scripts
///
/// Each command has a queue of steps. Steps are consumed in order and the
/// last one repeats forever, so `.on("Login", login_success("t"))` answers
/// every login. Commands without a script get HTTP 404. Every request is
/// recorded for later assertions.
pub struct ScriptedTransport {
    host: String,
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    delays: HashMap<String, Duration>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            host: "192.168.1.50".to_string(),
            scripts: Mutex::new(HashMap::new()),
            delays: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response for `command`
    pub fn on(self, command: &str, response: RawResponse) -> Self {
        self.push(command, Step::Respond(response))
    }

    /// Queue a transport failure for `command`
    pub fn on_error(self, command: &str, error: ErrorFactory) -> Self {
        self.push(command, Step::Fail(error))
    }

    /// Sleep before answering `command`
    pub fn with_delay(mut self, command: &str, delay: Duration) -> Self {
        self.delays.insert(command.to_string(), delay);
        self
    }

    /// Every request sent so far, in order
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// Number of requests sent for `command`
    pub fn count(&self, command: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.command == command)
            .count()
    }

    fn push(self, command: &str, step: Step) -> Self {
        self.scripts
            .lock()
            .entry(command.to_string())
            .or_default()
            .push_back(step);
        self
    }

    fn next_step(&self, command: &str) -> Option<Step> {
        let mut scripts = self.scripts.lock();
        let queue = scripts.get_mut(command)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &Request) -> Result<RawResponse, TransportError> {
        self.requests.lock().push(request.clone());

        if let Some(delay) = self.delays.get(&request.command) {
            std::thread::sleep(*delay);
        }

        match self.next_step(&request.command) {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(factory)) => Err(factory(&self.host)),
            None => Err(TransportError::Status {
                host: self.host.clone(),
                status: 404,
            }),
        }
    }

    fn host(&self) -> &str {
        &self.host
    }
}

/// Successful login issuing `token` with a one hour lease
pub fn login_success(token: &str) -> RawResponse {
    success(
        "Login",
        json!({"Token": {"leaseTime": 3600, "name": token}}),
    )
}

/// Successful response carrying `value`
pub fn success(command: &str, value: Value) -> RawResponse {
    RawResponse::json(&json!([{"cmd": command, "code": 0, "value": value}]))
}

/// Device error response with `rspCode`
pub fn failure(command: &str, rsp_code: i64, detail: &str) -> RawResponse {
    RawResponse::json(&json!([{
        "cmd": command,
        "code": 0,
        "error": {"detail": detail, "rspCode": rsp_code}
    }]))
}

/// Token rejection as sent by the device for an expired session
pub fn token_rejected(command: &str) -> RawResponse {
    failure(command, -6, "please login first")
}

/// A non-JSON body
pub fn text(body: &str) -> RawResponse {
    RawResponse {
        status: 200,
        content_type: Some("text/html".to_string()),
        body: body.as_bytes().to_vec(),
    }
}

/// A JPEG body
pub fn image(bytes: &[u8]) -> RawResponse {
    RawResponse {
        status: 200,
        content_type: Some("image/jpeg".to_string()),
        body: bytes.to_vec(),
    }
}

pub fn refused(host: &str) -> TransportError {
    TransportError::Connect {
        host: host.to_string(),
        reason: "Connection refused (os error 111)".to_string(),
    }
}

pub fn timeout(host: &str) -> TransportError {
    TransportError::Timeout {
        host: host.to_string(),
        timeout: Duration::from_secs(10),
    }
}
