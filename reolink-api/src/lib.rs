//! Session-managed command dispatch for Reolink cameras
//!
//! This crate sits on top of the private `cgi-client` transport and gives
//! callers a single entry point, [`CameraClient::execute`], that hides the
//! device's token-based session:
//!
//! ```rust,ignore
//! use reolink_api::{CameraClient, ClientConfig};
//! use serde_json::json;
//!
//! let client = CameraClient::new(ClientConfig::new("192.168.1.50", "secret"));
//!
//! // Logs in on first use, re-logs in once if the token is rejected
//! let state = client.execute("GetMdState", Some(json!({"channel": 0})))?;
//!
//! // Typed commands decode their payload
//! let caps = client.capabilities()?;
//! if caps.supports("supportAi", 0) {
//!     let ai = client.ai_state()?;
//! }
//!
//! client.close();
//! ```
//!
//! Every failure is one of the four [`ApiError`] kinds; callers branch on
//! [`ApiError::kind`] rather than on device status codes.

pub mod client;
pub mod command;
pub mod config;
pub mod envelope;
pub mod error;
pub mod operations;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use cgi_client::{CgiClient, RawResponse, Request, Transport, TransportError};
pub use client::CameraClient;
pub use command::{CameraCommand, CommandExecutor, CommandRequest};
pub use config::{ClientConfig, Credentials, DEFAULT_USERNAME};
pub use error::{ApiError, ErrorKind, Result};
pub use operations::{
    AiDetection, AiState, Capabilities, DeviceInfo, GetAbility, GetAiState, GetDevInfo,
    GetMdState, MotionState, SnapStream,
};
pub use session::{SessionManager, SessionState, Token};
