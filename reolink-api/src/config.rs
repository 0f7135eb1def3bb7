//! Client configuration supplied by the caller
//!
//! The API layer never reads the environment or any file; whoever builds a
//! [`CameraClient`](crate::CameraClient) hands it a [`ClientConfig`].

use std::fmt;
use std::time::Duration;

/// Default login user on Reolink firmware
pub const DEFAULT_USERNAME: &str = "admin";

/// Username and password for the device login
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection settings for one camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Camera IP or hostname, optionally with `:port`
    pub host: String,
    pub credentials: Credentials,
    /// Channel index for multi-channel devices (NVRs); 0 for standalone cameras
    pub channel: u8,
    /// Connect and read timeout for every request
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a config with the default user, channel 0 and a 10 second timeout
    pub fn new(host: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            credentials: Credentials::new(DEFAULT_USERNAME, password),
            channel: 0,
            timeout: cgi_client::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.credentials.username = username.into();
        self
    }

    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
