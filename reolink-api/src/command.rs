//! Command requests and the traits that dispatch them

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, Result};

/// One device command as sent through the dispatcher
///
/// Immutable once built; the builder methods consume and return `self`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    name: String,
    action: u8,
    params: Option<Value>,
    requires_auth: bool,
}

impl CommandRequest {
    /// A command with no parameters that needs a session token
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: 0,
            params: None,
            requires_auth: true,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_optional_params(mut self, params: Option<Value>) -> Self {
        self.params = params;
        self
    }

    /// Set the `action` field (`0` for plain queries, `1` to also get ranges/defaults)
    pub fn with_action(mut self, action: u8) -> Self {
        self.action = action;
        self
    }

    /// Send without a token and without the re-login retry
    pub fn without_auth(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> u8 {
        self.action
    }

    pub fn params(&self) -> Option<&Value> {
        self.params.as_ref()
    }

    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }
}

/// A strongly typed device command
///
/// Implementors name the wire command, build its parameters and decode the
/// `value` payload. Commands without an implementation remain reachable
/// through the untyped [`CommandExecutor::execute`].
pub trait CameraCommand {
    /// Decoded payload type
    type Response: DeserializeOwned;

    /// Wire command name, sent as `cmd=`
    const NAME: &'static str;

    /// The `param` object, if the command takes one
    fn params(&self) -> Option<Value> {
        None
    }

    /// Decode the `value` payload of a successful response
    fn parse_response(value: Value) -> Result<Self::Response> {
        serde_json::from_value(value).map_err(|e| ApiError::unparseable(Self::NAME, e))
    }

    /// Build the request the dispatcher sends
    fn to_request(&self) -> CommandRequest {
        CommandRequest::new(Self::NAME).with_optional_params(self.params())
    }
}

/// The `execute` contract every higher-level command consumes
pub trait CommandExecutor {
    /// Run a command and return its `value` payload
    fn execute(&self, command: &str, params: Option<Value>) -> Result<Value>;

    /// Release the session; called once on teardown
    fn close(&self) {}
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for &E {
    fn execute(&self, command: &str, params: Option<Value>) -> Result<Value> {
        (**self).execute(command, params)
    }

    fn close(&self) {
        (**self).close()
    }
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for Arc<E> {
    fn execute(&self, command: &str, params: Option<Value>) -> Result<Value> {
        (**self).execute(command, params)
    }

    fn close(&self) {
        (**self).close()
    }
}
