use cgi_client::TransportError;
use thiserror::Error;

/// Device status codes meaning the token (or the credentials) were rejected
pub const AUTH_ERROR_CODES: &[i64] = &[-6, -7, 287];

/// Device status codes meaning the command does not exist on this model or firmware
pub const UNSUPPORTED_ERROR_CODES: &[i64] = &[-9, -12];

/// Code reported in [`ApiError::DeviceError`] when the body could not be parsed
pub const UNPARSEABLE_RESPONSE: i64 = -1000;

/// High-level errors for camera operations
///
/// Every failure below the dispatcher resolves to exactly one of these four
/// kinds, which is what callers branch on (and what the CLI turns into an
/// exit code).
#[derive(Debug, Error)]
pub enum ApiError {
    /// The camera could not be reached
    ///
    /// Connection refused, timeout, DNS failure or a non-2xx HTTP status.
    /// Recoverable by retrying later.
    #[error("Camera unreachable: {0}")]
    NetworkError(#[from] TransportError),

    /// Credentials were rejected, or the token was rejected twice in a row
    ///
    /// Fatal for the current session.
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// The device rejected this specific command
    ///
    /// `code` is the device status code, or [`UNPARSEABLE_RESPONSE`] when the
    /// response body was not a valid envelope.
    #[error("API error ({command}): {message} (code {code})")]
    DeviceError {
        command: String,
        code: i64,
        message: String,
    },

    /// The feature is absent on this model or firmware
    ///
    /// Expected and common; never a bug.
    #[error("Feature not supported on this camera model: {0}")]
    Unsupported(String),
}

impl ApiError {
    /// Error for a body that is not a valid response envelope
    pub fn unparseable(command: &str, detail: impl std::fmt::Display) -> Self {
        Self::DeviceError {
            command: command.to_string(),
            code: UNPARSEABLE_RESPONSE,
            message: format!("unparseable response: {}", detail),
        }
    }

    /// Classify a non-zero device status code
    pub fn from_device_code(command: &str, code: i64, detail: Option<&str>) -> Self {
        let message = detail.unwrap_or("unknown error").to_string();
        if AUTH_ERROR_CODES.contains(&code) {
            Self::AuthError(format!("{} rejected by device: {}", command, message))
        } else if UNSUPPORTED_ERROR_CODES.contains(&code) {
            Self::Unsupported(format!("{}: {}", command, message))
        } else {
            Self::DeviceError {
                command: command.to_string(),
                code,
                message,
            }
        }
    }

    /// The taxonomy bucket this error falls into
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::NetworkError(_) => ErrorKind::Unreachable,
            ApiError::AuthError(_) => ErrorKind::Auth,
            ApiError::DeviceError { .. } => ErrorKind::Device,
            ApiError::Unsupported(_) => ErrorKind::Unsupported,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }

    /// Whether the device rejected the session token
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::AuthError(_))
    }
}

/// Coarse error classification consumed by the CLI layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Generic command failure
    Device,
    /// Bad credentials or repeated token rejection
    Auth,
    /// Camera unreachable
    Unreachable,
    /// Feature not available on this model
    Unsupported,
}

/// Exit code for a successful run
pub const EXIT_OK: i32 = 0;
/// Exit code for a generic failure
pub const EXIT_ERROR: i32 = 1;
/// Exit code for invalid invocation or missing configuration
pub const EXIT_USAGE: i32 = 2;
/// Exit code for authentication failures
pub const EXIT_AUTH: i32 = 3;
/// Exit code when the camera cannot be reached
pub const EXIT_UNREACHABLE: i32 = 4;
/// Exit code for features the camera does not have
pub const EXIT_UNSUPPORTED: i32 = 5;

impl ErrorKind {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Device => EXIT_ERROR,
            ErrorKind::Auth => EXIT_AUTH,
            ErrorKind::Unreachable => EXIT_UNREACHABLE,
            ErrorKind::Unsupported => EXIT_UNSUPPORTED,
        }
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;
