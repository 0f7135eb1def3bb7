use std::sync::Arc;

use cgi_client::{CgiClient, Request, Transport};
use serde_json::Value;

use crate::command::{CameraCommand, CommandExecutor, CommandRequest};
use crate::config::{ClientConfig, Credentials};
use crate::envelope;
use crate::error::{ApiError, Result, UNPARSEABLE_RESPONSE};
use crate::operations::{
    AiState, Capabilities, DeviceInfo, GetAbility, GetAiState, GetDevInfo, GetMdState,
    MotionState, SnapStream,
};
use crate::session::SessionManager;

/// Session-managed client for one camera
///
/// Every command goes through [`CameraClient::execute`], which logs in on
/// first use, attaches the cached token and retries exactly once after a
/// re-login when the device rejects that token. The session is released
/// with [`CameraClient::close`] or, failing that, when the client is dropped.
///
/// ```rust,ignore
/// use reolink_api::{CameraClient, ClientConfig};
///
/// let client = CameraClient::new(ClientConfig::new("192.168.1.50", "secret"));
/// let info = client.device_info()?;
/// println!("{} running {}", info.model.unwrap_or_default(), info.firm_ver.unwrap_or_default());
/// ```
pub struct CameraClient<T: Transport = CgiClient> {
    transport: Arc<T>,
    session: SessionManager<T>,
    channel: u8,
}

impl CameraClient<CgiClient> {
    /// Create a client talking HTTP to the configured host
    pub fn new(config: ClientConfig) -> Self {
        let transport = CgiClient::with_timeout(config.host, config.timeout);
        Self::with_transport(Arc::new(transport), config.credentials).with_channel(config.channel)
    }
}

impl<T: Transport> CameraClient<T> {
    /// Create a client over an existing transport
    pub fn with_transport(transport: Arc<T>, credentials: Credentials) -> Self {
        Self {
            session: SessionManager::new(Arc::clone(&transport), credentials),
            transport,
            channel: 0,
        }
    }

    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn host(&self) -> &str {
        self.transport.host()
    }

    pub fn session(&self) -> &SessionManager<T> {
        &self.session
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Run a command by name and return its `value` payload
    pub fn execute(&self, command: &str, params: Option<Value>) -> Result<Value> {
        self.execute_request(&CommandRequest::new(command).with_optional_params(params))
    }

    /// Run a fully specified command request
    pub fn execute_request(&self, request: &CommandRequest) -> Result<Value> {
        if !request.requires_auth() {
            return self.dispatch(request, None);
        }
        self.with_session(request.name(), |token| self.dispatch(request, Some(token)))
    }

    /// Run a typed command
    pub fn call<C: CameraCommand>(&self, command: &C) -> Result<C::Response> {
        let value = self.execute_request(&command.to_request())?;
        C::parse_response(value)
    }

    /// Capture a JPEG still from the configured channel
    ///
    /// Returns the raw image bytes. A JSON body instead of an image is
    /// decoded and classified like any other command response.
    pub fn snapshot(&self, stream: SnapStream) -> Result<Vec<u8>> {
        self.with_session("Snap", |token| {
            let mut request = Request::get("Snap")
                .with_token(token)
                .with_query("channel", self.channel.to_string());
            if let Some(rs) = stream.rs_param(self.channel) {
                request = request.with_query("rs", rs);
            }

            let response = self.transport.send(&request)?;
            if response.is_image() {
                tracing::debug!(host = %self.host(), bytes = response.body.len(), %stream, "snapshot captured");
                return Ok(response.body);
            }

            // Errors come back as a regular envelope
            if let Ok(item) = envelope::parse("Snap", &response.body) {
                envelope::classify("Snap", item)?;
            }
            Err(ApiError::DeviceError {
                command: "Snap".to_string(),
                code: UNPARSEABLE_RESPONSE,
                message: "response is not an image".to_string(),
            })
        })
    }

    /// Feature matrix for the logged-in user
    pub fn capabilities(&self) -> Result<Capabilities> {
        let username = self.session.credentials().username.clone();
        self.call(&GetAbility::new(username))
    }

    pub fn device_info(&self) -> Result<DeviceInfo> {
        self.call(&GetDevInfo)
    }

    pub fn motion_state(&self) -> Result<MotionState> {
        self.call(&GetMdState {
            channel: self.channel,
        })
    }

    pub fn ai_state(&self) -> Result<AiState> {
        self.call(&GetAiState {
            channel: self.channel,
        })
    }

    /// Log out and forget the token
    ///
    /// Safe to call more than once. A later command logs in again.
    pub fn close(&self) {
        self.session.logout();
    }

    /// Run `attempt` with a valid token, re-logging in once on rejection
    fn with_session<R>(&self, command: &str, mut attempt: impl FnMut(&str) -> Result<R>) -> Result<R> {
        let token = self.session.ensure_authenticated()?;

        match attempt(&token) {
            Err(ApiError::AuthError(reason)) => {
                tracing::warn!(
                    host = %self.host(),
                    command,
                    reason = %reason,
                    "token rejected, logging in again"
                );
                self.session.invalidate_token(&token);
                let token = self.session.ensure_authenticated()?;

                attempt(&token).map_err(|e| match e {
                    ApiError::AuthError(reason) => ApiError::AuthError(format!(
                        "{}; token rejected again after re-login",
                        reason
                    )),
                    other => other,
                })
            }
            other => other,
        }
    }

    fn dispatch(&self, request: &CommandRequest, token: Option<&str>) -> Result<Value> {
        let body = envelope::request_body(request.name(), request.action(), request.params());
        let mut http = Request::post(request.name(), body);
        if let Some(token) = token {
            http = http.with_token(token);
        }

        let response = self.transport.send(&http)?;
        let result = envelope::decode(request.name(), &response.body);

        if let Err(e) = &result {
            tracing::debug!(host = %self.host(), command = %request.name(), error = %e, "command failed");
        }
        result
    }
}

impl<T: Transport> CommandExecutor for CameraClient<T> {
    fn execute(&self, command: &str, params: Option<Value>) -> Result<Value> {
        CameraClient::execute(self, command, params)
    }

    fn close(&self) {
        CameraClient::close(self)
    }
}

impl<T: Transport> Drop for CameraClient<T> {
    fn drop(&mut self) {
        if self.session.is_authenticated() {
            tracing::debug!(host = %self.host(), "client dropped, releasing session");
            self.session.logout();
        }
    }
}

impl<T: Transport> std::fmt::Debug for CameraClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraClient")
            .field("host", &self.host())
            .field("channel", &self.channel)
            .field("session", &self.session)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{self, ScriptedTransport};
    use cgi_client::TransportError;
    use rstest::rstest;
    use serde_json::json;

    fn client(transport: ScriptedTransport) -> (Arc<ScriptedTransport>, CameraClient<ScriptedTransport>) {
        let transport = Arc::new(transport);
        let client = CameraClient::with_transport(Arc::clone(&transport), Credentials::new("admin", "pw"));
        (transport, client)
    }

    #[test]
    fn test_first_command_logs_in_and_attaches_token() {
        let (transport, client) = client(
            ScriptedTransport::new()
                .on("Login", testing::login_success("abc123token"))
                .on("GetMdState", testing::success("GetMdState", json!({"channel": 0, "state": 1}))),
        );

        let value = client.execute("GetMdState", Some(json!({"channel": 0}))).unwrap();
        assert_eq!(value, json!({"channel": 0, "state": 1}));

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].command, "Login");
        assert_eq!(requests[1].token.as_deref(), Some("abc123token"));
        assert_eq!(
            requests[1].body,
            Some(json!([{"cmd": "GetMdState", "action": 0, "param": {"channel": 0}}]))
        );
    }

    #[test]
    fn test_token_is_reused_across_commands() {
        let (transport, client) = client(
            ScriptedTransport::new()
                .on("Login", testing::login_success("tok"))
                .on("GetDevInfo", testing::success("GetDevInfo", json!({"DevInfo": {}}))),
        );

        for _ in 0..3 {
            client.execute("GetDevInfo", None).unwrap();
        }
        assert_eq!(transport.count("Login"), 1);
        assert_eq!(transport.count("GetDevInfo"), 3);
    }

    #[test]
    fn test_rejected_token_relogs_and_retries_once() {
        let (transport, client) = client(
            ScriptedTransport::new()
                .on("Login", testing::login_success("old"))
                .on("Login", testing::login_success("new"))
                .on("GetDevInfo", testing::token_rejected("GetDevInfo"))
                .on("GetDevInfo", testing::success("GetDevInfo", json!({"DevInfo": {"model": "E1"}}))),
        );

        let value = client.execute("GetDevInfo", None).unwrap();
        assert_eq!(value["DevInfo"]["model"], "E1");
        assert_eq!(transport.count("Login"), 2);

        let retried: Vec<_> = transport
            .requests()
            .into_iter()
            .filter(|r| r.command == "GetDevInfo")
            .map(|r| r.token)
            .collect();
        assert_eq!(retried, vec![Some("old".to_string()), Some("new".to_string())]);
    }

    #[test]
    fn test_second_rejection_is_auth_error_without_third_attempt() {
        let (transport, client) = client(
            ScriptedTransport::new()
                .on("Login", testing::login_success("tok"))
                .on("GetDevInfo", testing::token_rejected("GetDevInfo")),
        );

        let err = client.execute("GetDevInfo", None).unwrap_err();
        assert!(err.is_auth());
        assert!(err.to_string().contains("token rejected again after re-login"));
        assert_eq!(transport.count("Login"), 2);
        assert_eq!(transport.count("GetDevInfo"), 2);
    }

    #[test]
    fn test_relogin_failure_surfaces_login_error() {
        let (transport, client) = client(
            ScriptedTransport::new()
                .on("Login", testing::login_success("tok"))
                .on("Login", testing::failure("Login", -7, "invalid user"))
                .on("GetDevInfo", testing::token_rejected("GetDevInfo")),
        );

        let err = client.execute("GetDevInfo", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(err.to_string().contains("invalid user"));
        assert_eq!(transport.count("GetDevInfo"), 1);
    }

    #[rstest]
    #[case(-9, ErrorKind::Unsupported)]
    #[case(-12, ErrorKind::Unsupported)]
    #[case(-4, ErrorKind::Device)]
    #[case(1, ErrorKind::Device)]
    fn test_device_codes_are_classified(#[case] code: i64, #[case] expected: ErrorKind) {
        let (transport, client) = client(
            ScriptedTransport::new()
                .on("Login", testing::login_success("tok"))
                .on("GetPtzPreset", testing::failure("GetPtzPreset", code, "nope")),
        );

        let err = client.execute("GetPtzPreset", None).unwrap_err();
        assert_eq!(err.kind(), expected);
        // Only token rejections trigger a retry
        assert_eq!(transport.count("GetPtzPreset"), 1);
        assert_eq!(transport.count("Login"), 1);
    }

    #[test]
    fn test_device_error_keeps_code_and_detail() {
        let (_transport, client) = client(
            ScriptedTransport::new()
                .on("Login", testing::login_success("tok"))
                .on("SetOsd", testing::failure("SetOsd", -4, "param error")),
        );

        match client.execute("SetOsd", Some(json!({"Osd": {}}))).unwrap_err() {
            ApiError::DeviceError { command, code, message } => {
                assert_eq!(command, "SetOsd");
                assert_eq!(code, -4);
                assert_eq!(message, "param error");
            }
            other => panic!("Expected DeviceError, got {:?}", other),
        }
    }

    #[test]
    fn test_non_json_body_is_unparseable_device_error() {
        let (_transport, client) = client(
            ScriptedTransport::new()
                .on("Login", testing::login_success("tok"))
                .on("GetDevInfo", testing::text("<html>Bad Gateway</html>")),
        );

        let err = client.execute("GetDevInfo", None).unwrap_err();
        assert!(matches!(
            err,
            ApiError::DeviceError { code: UNPARSEABLE_RESPONSE, .. }
        ));
    }

    #[rstest]
    #[case::refused(testing::refused as testing::ErrorFactory)]
    #[case::timeout(testing::timeout as testing::ErrorFactory)]
    fn test_transport_failure_is_network_error(#[case] failure: testing::ErrorFactory) {
        let (_transport, client) = client(
            ScriptedTransport::new()
                .on("Login", testing::login_success("tok"))
                .on_error("GetDevInfo", failure),
        );

        let err = client.execute("GetDevInfo", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unreachable);
        assert!(client.session().is_authenticated());
    }

    #[test]
    fn test_unreachable_camera_fails_at_login() {
        let (transport, client) =
            client(ScriptedTransport::new().on_error("Login", testing::refused));

        let err = client.execute("GetDevInfo", None).unwrap_err();
        assert!(matches!(err, ApiError::NetworkError(TransportError::Connect { .. })));
        assert_eq!(transport.count("GetDevInfo"), 0);
    }

    #[test]
    fn test_unauthenticated_request_skips_login() {
        let (transport, client) = client(
            ScriptedTransport::new().on("GetLocalLink", testing::success("GetLocalLink", json!({}))),
        );

        client
            .execute_request(&CommandRequest::new("GetLocalLink").without_auth())
            .unwrap();
        assert_eq!(transport.count("Login"), 0);
        assert_eq!(transport.requests()[0].token, None);
    }

    #[test]
    fn test_typed_motion_state_uses_channel() {
        let transport = ScriptedTransport::new()
            .on("Login", testing::login_success("tok"))
            .on("GetMdState", testing::success("GetMdState", json!({"channel": 2, "state": 0})));
        let (transport, client) = client(transport);
        let client = client.with_channel(2);

        let state = client.motion_state().unwrap();
        assert!(!state.is_active());
        let sent = transport.requests().pop().unwrap();
        assert_eq!(sent.body.unwrap()[0]["param"]["channel"], 2);
    }

    #[test]
    fn test_capabilities_sends_username() {
        let (transport, client) = client(
            ScriptedTransport::new()
                .on("Login", testing::login_success("tok"))
                .on(
                    "GetAbility",
                    testing::success(
                        "GetAbility",
                        json!({"Ability": {"abilityChn": [{"mdAlarm": {"permit": 4, "ver": 1}}]}}),
                    ),
                ),
        );

        let caps = client.capabilities().unwrap();
        assert!(caps.supports("mdAlarm", 0));
        let sent = transport.requests().pop().unwrap();
        assert_eq!(sent.body.unwrap()[0]["param"]["User"]["userName"], "admin");
    }

    #[test]
    fn test_snapshot_returns_image_bytes() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0];
        let (transport, client) = client(
            ScriptedTransport::new()
                .on("Login", testing::login_success("tok"))
                .on("Snap", testing::image(&jpeg)),
        );

        assert_eq!(client.snapshot(SnapStream::Sub).unwrap(), jpeg.to_vec());

        let sent = transport.requests().pop().unwrap();
        assert_eq!(sent.method, cgi_client::Method::Get);
        assert_eq!(
            sent.query_pairs(),
            vec![("cmd", "Snap"), ("token", "tok"), ("channel", "0"), ("rs", "00100")]
        );
    }

    #[test]
    fn test_snapshot_error_envelope_is_classified() {
        let (_transport, client) = client(
            ScriptedTransport::new()
                .on("Login", testing::login_success("tok"))
                .on("Snap", testing::failure("Snap", -9, "not support")),
        );

        assert!(matches!(
            client.snapshot(SnapStream::Main).unwrap_err(),
            ApiError::Unsupported(_)
        ));
    }

    #[test]
    fn test_snapshot_non_image_body() {
        let (_transport, client) = client(
            ScriptedTransport::new()
                .on("Login", testing::login_success("tok"))
                .on("Snap", testing::text("<html>busy</html>")),
        );

        match client.snapshot(SnapStream::Main).unwrap_err() {
            ApiError::DeviceError { code, message, .. } => {
                assert_eq!(code, UNPARSEABLE_RESPONSE);
                assert_eq!(message, "response is not an image");
            }
            other => panic!("Expected DeviceError, got {:?}", other),
        }
    }

    #[test]
    fn test_snapshot_relogs_on_rejected_token() {
        let (transport, client) = client(
            ScriptedTransport::new()
                .on("Login", testing::login_success("tok"))
                .on("Snap", testing::token_rejected("Snap"))
                .on("Snap", testing::image(&[0xFF, 0xD8])),
        );

        assert_eq!(client.snapshot(SnapStream::Main).unwrap(), vec![0xFF, 0xD8]);
        assert_eq!(transport.count("Login"), 2);
    }

    #[test]
    fn test_close_logs_out_once() {
        let (transport, client) = client(
            ScriptedTransport::new()
                .on("Login", testing::login_success("tok"))
                .on("GetDevInfo", testing::success("GetDevInfo", json!({})))
                .on("Logout", testing::success("Logout", json!({}))),
        );

        client.execute("GetDevInfo", None).unwrap();
        client.close();
        client.close();
        drop(client);
        assert_eq!(transport.count("Logout"), 1);
    }

    #[test]
    fn test_drop_releases_session() {
        let (transport, client) = client(
            ScriptedTransport::new()
                .on("Login", testing::login_success("tok"))
                .on("GetDevInfo", testing::success("GetDevInfo", json!({})))
                .on("Logout", testing::success("Logout", json!({}))),
        );

        client.execute("GetDevInfo", None).unwrap();
        drop(client);
        assert_eq!(transport.count("Logout"), 1);
    }

    #[test]
    fn test_drop_without_session_sends_nothing() {
        let (transport, client) = client(ScriptedTransport::new());
        drop(client);
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_executor_trait_object() {
        let (_transport, client) = client(
            ScriptedTransport::new()
                .on("Login", testing::login_success("tok"))
                .on("GetTime", testing::success("GetTime", json!({"Time": {"year": 2026}}))),
        );

        let executor: &dyn CommandExecutor = &client;
        let value = executor.execute("GetTime", None).unwrap();
        assert_eq!(value["Time"]["year"], 2026);
    }
}
