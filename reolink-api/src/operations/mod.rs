//! Typed camera commands
//!
//! Only the commands the core itself relies on are typed here: device
//! identity, the capability query and the two detection-state queries the
//! event watcher polls. Everything else passes through
//! [`CommandExecutor::execute`](crate::CommandExecutor::execute) untouched.

pub mod ability;
pub mod detection;
pub mod device;
pub mod snapshot;

pub use ability::{Capabilities, GetAbility};
pub use detection::{AiDetection, AiState, GetAiState, GetMdState, MotionState};
pub use device::{DeviceInfo, GetDevInfo};
pub use snapshot::SnapStream;

use serde_json::Value;

/// Unwrap `{"<key>": {...}}` payloads, falling back to the whole value
pub(crate) fn unwrap_key(mut value: Value, key: &str) -> Value {
    match value.get_mut(key) {
        Some(inner) => inner.take(),
        None => value,
    }
}
