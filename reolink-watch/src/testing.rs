//! In-memory command executor for watcher tests

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use reolink_api::{ApiError, CommandExecutor, TransportError};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
enum Reply {
    Value(Value),
    Network,
    Auth,
    Unsupported,
    Device(i64),
}

impl Reply {
    fn into_result(self, command: &str) -> Result<Value, ApiError> {
        match self {
            Reply::Value(value) => Ok(value),
            Reply::Network => Err(ApiError::NetworkError(TransportError::Connect {
                host: "camera".to_string(),
                reason: "Connection refused".to_string(),
            })),
            Reply::Auth => Err(ApiError::AuthError(format!(
                "{} rejected by device: please login first",
                command
            ))),
            Reply::Unsupported => Err(ApiError::Unsupported(format!("{}: not support", command))),
            Reply::Device(code) => Err(ApiError::from_device_code(command, code, Some("busy"))),
        }
    }
}

/// Answers commands from per-command queues; the last reply repeats
#[derive(Default)]
pub struct ScriptedExecutor {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<(String, Option<Value>)>>,
    closes: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, command: &str, value: Value) -> Self {
        self.push(command, Reply::Value(value))
    }

    pub fn network_error(self, command: &str) -> Self {
        self.push(command, Reply::Network)
    }

    pub fn auth_error(self, command: &str) -> Self {
        self.push(command, Reply::Auth)
    }

    pub fn unsupported(self, command: &str) -> Self {
        self.push(command, Reply::Unsupported)
    }

    pub fn device_error(self, command: &str, code: i64) -> Self {
        self.push(command, Reply::Device(code))
    }

    /// Queue one motion tick
    pub fn motion(self, active: bool) -> Self {
        self.reply("GetMdState", json!({"channel": 0, "state": i64::from(active)}))
    }

    /// Queue one AI tick with `people` support and the given person state
    pub fn person(self, active: bool) -> Self {
        self.reply(
            "GetAiState",
            json!({
                "channel": 0,
                "people": {"alarm_state": i64::from(active), "support": 1},
                "vehicle": {"alarm_state": 0, "support": 1},
                "dog_cat": {"alarm_state": 0, "support": 0}
            }),
        )
    }

    pub fn calls(&self, command: &str) -> usize {
        self.calls.lock().iter().filter(|(c, _)| c == command).count()
    }

    pub fn params(&self, command: &str) -> Vec<Option<Value>> {
        self.calls
            .lock()
            .iter()
            .filter(|(c, _)| c == command)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn push(self, command: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .entry(command.to_string())
            .or_default()
            .push_back(reply);
        self
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn execute(&self, command: &str, params: Option<Value>) -> Result<Value, ApiError> {
        self.calls.lock().push((command.to_string(), params));

        let reply = {
            let mut replies = self.replies.lock();
            match replies.get_mut(command) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(reply) => reply.into_result(command),
            None => Err(ApiError::from_device_code(command, -9, Some("not support"))),
        }
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
