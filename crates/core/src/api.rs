use crate::bc_protocol::Baichuan;
use crate::onvif::Subscription;
use crate::{Credentials, Error, Result};
use bytes::Bytes;
use log::*;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

mod accessors;
mod commands;
mod config;
mod discovery;
mod enums;
mod mapper;
mod model;
mod session;
mod settings;
mod state;
mod streams;

pub use commands::ApiVersions;
pub use config::HostConfig;
pub use enums::*;
pub use model::{DevInfo, NetPort, SearchFile, SearchStatus, SensitivityPreset};

use mapper::MapContext;
use model::{LoginValue, Reply};
use session::Session;
use state::HostState;

/// The device only compares this many characters of a password
const MAX_PASSWORD_LEN: usize = 31;

/// Small `text/html` replies containing one of these mean the token or credentials were refused
const LOGIN_ERRORS: [&str; 3] = [
    r#""detail" : "invalid user""#,
    r#""detail" : "login failed""#,
    r#"detail" : "please login first"#,
];

/// What a reply must look like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Expect {
    /// Anything, the body is returned as is
    Any,
    /// A JSON array
    Json,
    /// The given content type, the body is returned as is
    Mime(&'static str),
}

/// One HTTP request, a `POST` of a command batch or a `GET` of a single command
pub(crate) struct Request<'a> {
    cmd: String,
    body: Option<&'a [Value]>,
    params: Vec<(&'static str, String)>,
    expected: Expect,
}

impl<'a> Request<'a> {
    pub(crate) fn post(body: &'a [Value]) -> Self {
        Self {
            cmd: commands::batch_cmd(body),
            body: Some(body),
            params: vec![],
            expected: Expect::Json,
        }
    }

    pub(crate) fn get<T: Into<String>>(cmd: T, params: Vec<(&'static str, String)>) -> Self {
        Self {
            cmd: cmd.into(),
            body: None,
            params,
            expected: Expect::Any,
        }
    }

    pub(crate) fn expect(mut self, expected: Expect) -> Self {
        self.expected = expected;
        self
    }

    fn is_login_logout(&self) -> bool {
        self.cmd == "Login" || self.cmd == "Logout"
    }
}

/// A successful reply
#[derive(Debug)]
pub(crate) enum Payload {
    Json(Vec<Value>),
    Raw(Bytes),
}

/// The outcome of one round trip
enum Attempt {
    Done(Payload),
    /// The session was refused or the reply was garbled, log in again and resend once
    Retry,
}

#[derive(Debug, Clone, Copy, Default)]
struct Endpoint {
    port: Option<u16>,
    use_https: Option<bool>,
}

///
/// This is the primary struct of the HTTP side of this library
///
/// It holds the session with one camera or NVR and everything learnt about it. All commands
/// log in on demand, a caller only ever needs [`Host::get_host_data`] once and then
/// [`Host::get_states`] whenever fresh states are wanted.
///
pub struct Host {
    config: HostConfig,
    credentials: Credentials,
    endpoint: RwLock<Endpoint>,
    session: Mutex<Session>,
    client: Mutex<Option<reqwest::Client>>,
    // Only one command batch may be on the wire
    pub(crate) send_mutex: tokio::sync::Mutex<()>,
    // Only one login or logout sequence at a time
    login_mutex: tokio::sync::Mutex<()>,
    state: RwLock<HostState>,
    pub(crate) subscription: Mutex<Subscription>,
    log_once: Mutex<BTreeSet<String>>,
    baichuan: Baichuan,
}

impl Host {
    ///
    /// Creates the host, no connection is made until the first command
    ///
    /// Passwords longer than the device accepts are truncated.
    ///
    pub fn new(config: HostConfig) -> Self {
        let password: String = config.password.chars().take(MAX_PASSWORD_LEN).collect();
        let baichuan = Baichuan::new(
            config.host.clone(),
            config.username.clone(),
            password.clone(),
            config.bc_port,
        );
        Self {
            credentials: Credentials::new(config.username.clone(), Some(password)),
            endpoint: RwLock::new(Endpoint {
                port: config.port,
                use_https: config.use_https,
            }),
            session: Default::default(),
            client: Default::default(),
            send_mutex: Default::default(),
            login_mutex: Default::default(),
            state: Default::default(),
            subscription: Default::default(),
            log_once: Default::default(),
            baichuan,
            config,
        }
    }

    /// The Baichuan client of the same device, for the things the HTTP API cannot do
    pub fn baichuan(&self) -> &Baichuan {
        &self.baichuan
    }

    pub(crate) fn host(&self) -> &str {
        &self.config.host
    }

    pub(crate) fn username(&self) -> &str {
        &self.credentials.username
    }

    pub(crate) fn password(&self) -> &str {
        self.credentials.password()
    }

    fn endpoint(&self) -> Endpoint {
        *self.endpoint.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_endpoint(&self, port: u16, use_https: bool) {
        *self.endpoint.write().unwrap_or_else(|e| e.into_inner()) = Endpoint {
            port: Some(port),
            use_https: Some(use_https),
        };
    }

    /// `scheme://host:port` of the web port
    pub(crate) fn base_url(&self) -> String {
        let endpoint = self.endpoint();
        let scheme = if endpoint.use_https.unwrap_or(false) {
            "https"
        } else {
            "http"
        };
        match endpoint.port {
            Some(port) => format!("{}://{}:{}", scheme, self.host(), port),
            None => format!("{}://{}", scheme, self.host()),
        }
    }

    fn url(&self) -> String {
        format!("{}/cgi-bin/api.cgi", self.base_url())
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, HostState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn write_state(&self) -> RwLockWriteGuard<'_, HostState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn map_context(&self) -> MapContext<'_> {
        MapContext {
            host: self.host(),
            username: self.username(),
            password: self.password(),
        }
    }

    /// True the first time a message key is seen
    pub(crate) fn log_once(&self, key: &str) -> bool {
        self.log_once
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string())
    }

    pub(crate) fn token(&self) -> Option<String> {
        self.lock_session().token().map(str::to_string)
    }

    pub(crate) fn lease(&self) -> Option<Instant> {
        self.lock_session().lease()
    }

    /// True while the token may be used
    pub fn session_active(&self) -> bool {
        self.lock_session().is_active_at(Instant::now())
    }

    /// Forces the next command to log in again
    pub fn expire_session(&self) {
        self.lock_session().expire(Instant::now());
    }

    /// Forgets the token without telling the device
    pub fn clear_token(&self) {
        self.lock_session().clear();
    }

    pub(crate) fn hide_password(&self, content: &str) -> String {
        let token = self.token().unwrap_or_default();
        self.credentials
            .hide_password(content, &[(token.as_str(), "<token>")])
    }

    ///
    /// Logs in unless the current session has enough lease left
    ///
    /// If the web port is not known HTTPS on 443 is tried first and then HTTP on 80.
    ///
    pub async fn login(&self) -> Result<()> {
        let endpoint = self.endpoint();
        if endpoint.port.is_none() || endpoint.use_https.is_none() {
            return self.login_try_ports().await;
        }
        self.login_at_endpoint().await
    }

    async fn login_try_ports(&self) -> Result<()> {
        self.set_endpoint(443, true);
        match self.login_at_endpoint().await {
            Ok(()) => return Ok(()),
            Err(e @ Error::CredentialsInvalid { .. }) => return Err(e),
            Err(e) => debug!("{}: login over https on 443 failed: {}", self.host(), e),
        }
        self.set_endpoint(80, false);
        self.login_at_endpoint().await
    }

    async fn login_at_endpoint(&self) -> Result<()> {
        let _login = self.login_mutex.lock().await;

        if self.lock_session().is_reusable_at(Instant::now()) {
            return Ok(());
        }

        // A stale session counts against the session limit of the device
        self.logout_locked().await;

        debug!(
            "{}: trying to login with user {}...",
            self.host(),
            self.username()
        );
        let body = [json!({
            "cmd": "Login",
            "action": 0,
            "param": {"User": {"userName": self.username(), "password": self.password()}}
        })];
        let replies = self
            .exchange(&Request::post(&body))
            .await?
            .into_json(self.host())?;

        let reply = replies
            .first()
            .and_then(|reply| Reply::deserialize(reply).ok())
            .ok_or_else(|| Error::LoginFailed {
                host: self.host().to_string(),
                why: "empty login response".to_string(),
            })?;
        if reply.code != 0 {
            return Err(Error::LoginFailed {
                host: self.host().to_string(),
                why: reply
                    .error
                    .map(|e| e.detail)
                    .unwrap_or_else(|| format!("code {}", reply.code)),
            });
        }

        let token = match LoginValue::deserialize(&reply.value)
            .ok()
            .and_then(|value| {
                let lease = Duration::try_from_secs_f64(value.token.lease_time).ok()?;
                Some((value.token.name, lease))
            }) {
            Some(token) => token,
            None => {
                error!("{}: login error, unknown response format", self.host());
                self.clear_token();
                return Err(Error::LoginFailed {
                    host: self.host().to_string(),
                    why: "unknown response format".to_string(),
                });
            }
        };

        debug!(
            "{}: logged in, lease time {}s",
            self.host(),
            token.1.as_secs()
        );
        self.lock_session().set(token.0, token.1, Instant::now());
        Ok(())
    }

    ///
    /// Ends the session
    ///
    /// The token is always forgotten and the connection closed, even if the device could not
    /// be told.
    ///
    pub async fn logout(&self) {
        let _login = self.login_mutex.lock().await;
        self.logout_locked().await;
    }

    async fn logout_locked(&self) {
        if self.token().is_some() {
            let body = [json!({"cmd": "Logout", "action": 0, "param": {}})];
            let request = Request::post(&body).expect(Expect::Any);
            if let Err(e) = self.exchange(&request).await {
                debug!("{}: logout failed: {}", self.host(), e);
            }
        }
        self.clear_token();
        self.client.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    pub(crate) fn client(&self) -> Result<reqwest::Client> {
        let mut client = self.client.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(client) = client.as_ref() {
            return Ok(client.clone());
        }
        // Devices ship self signed certificates
        let new_client = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .danger_accept_invalid_certs(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        *client = Some(new_client.clone());
        Ok(new_client)
    }

    pub(crate) fn http_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                host: self.host().to_string(),
            }
        } else if e.is_connect() {
            Error::ConnectionError {
                host: self.host().to_string(),
                why: e.to_string(),
            }
        } else {
            Error::Http(e)
        }
    }

    /// Sends a batch of commands and returns the reply array, logging in first when needed
    pub(crate) async fn send_json(&self, body: &[Value]) -> Result<Vec<Value>> {
        self.send(&Request::post(body)).await?.into_json(self.host())
    }

    ///
    /// Sends a request, logging in first unless it is a login or logout
    ///
    /// A refused token, a 502 or an unreadable JSON reply is retried once after logging
    /// in again. Every error leaves the session expired.
    ///
    pub(crate) async fn send(&self, request: &Request<'_>) -> Result<Payload> {
        let mut retry = false;
        loop {
            if !request.is_login_logout() {
                self.login().await?;
            }
            match self.attempt(request, retry).await? {
                Attempt::Done(payload) => return Ok(payload),
                Attempt::Retry => retry = true,
            }
        }
    }

    /// Like [`Host::send`] but never logs in, used by login and logout themselves
    async fn exchange(&self, request: &Request<'_>) -> Result<Payload> {
        let mut retry = false;
        loop {
            match self.attempt(request, retry).await? {
                Attempt::Done(payload) => return Ok(payload),
                Attempt::Retry => retry = true,
            }
        }
    }

    async fn attempt(&self, request: &Request<'_>, retry: bool) -> Result<Attempt> {
        match self.send_once(request, retry).await {
            Ok(Attempt::Retry) => {
                self.expire_session();
                Ok(Attempt::Retry)
            }
            Ok(done) => Ok(done),
            Err(e) => {
                self.expire_session();
                match &e {
                    Error::InvalidContentType { .. } => {
                        debug!("{}: content type error: {}", self.host(), e)
                    }
                    Error::CredentialsInvalid { .. } => {
                        error!("{}: login attempt failed", self.host())
                    }
                    _ => error!("{}: {} failed: {}", self.host(), request.cmd, e),
                }
                Err(e)
            }
        }
    }

    async fn send_once(&self, request: &Request<'_>, retry: bool) -> Result<Attempt> {
        let client = self.client()?;
        let url = self.url();

        let mut params: Vec<(&str, String)> = vec![("cmd", request.cmd.clone())];
        params.extend(request.params.iter().cloned());
        if request.cmd == "Login" {
            params.push(("token", "null".to_string()));
        } else if let Some(token) = self.token() {
            params.push(("token", token));
        }

        if log_enabled!(Level::Debug) {
            debug!(
                "{}: HTTP request params: {}",
                self.host(),
                self.hide_password(&format!("{:?}", params))
            );
            if let Some(body) = request.body {
                debug!(
                    "{}: HTTP request body: {}",
                    self.host(),
                    self.hide_password(&Value::from(body.to_vec()).to_string())
                );
            }
        }

        let (status, content_type, data) = {
            let _send = self.send_mutex.lock().await;
            let builder = match request.body {
                Some(body) => client.post(&url).json(body),
                None => client.get(&url),
            };
            let response = builder
                .query(&params)
                .send()
                .await
                .map_err(|e| self.http_error(e))?;
            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(';').next())
                .map(|value| value.trim().to_string())
                .unwrap_or_default();
            let data = response.bytes().await.map_err(|e| self.http_error(e))?;
            (status, content_type, data)
        };

        debug!(
            "{}: HTTP response status = {}, content-type = ({})",
            self.host(),
            status,
            content_type
        );
        if log_enabled!(Level::Trace) {
            if request.cmd == "Snap" || (request.cmd == "Search" && data.len() > 500) {
                trace!("{}: HTTP response data of {} omitted", self.host(), request.cmd);
            } else {
                trace!(
                    "{}: HTTP response data: {}",
                    self.host(),
                    self.hide_password(&String::from_utf8_lossy(&data))
                );
            }
        }

        if data.len() < 500 && content_type == "text/html" {
            let text = String::from_utf8_lossy(&data);
            let refused = LOGIN_ERRORS.iter().any(|err| text.contains(err))
                && (request.body.is_none() || request.cmd != "Logout");
            if refused {
                if request.is_login_logout() || retry {
                    return Err(Error::CredentialsInvalid {
                        host: self.host().to_string(),
                    });
                }
                debug!(
                    "{}: \"invalid login\" response, trying to login again and retry the command",
                    self.host()
                );
                return Ok(Attempt::Retry);
            }
        }

        if let Expect::Mime(expected) = request.expected {
            if expected != content_type {
                return Err(Error::InvalidContentType {
                    host: self.host().to_string(),
                    why: format!(
                        "expected type '{}' but received '{}'",
                        expected, content_type
                    ),
                });
            }
        }

        if status == 502 && !retry {
            debug!(
                "{}: 502/Bad Gateway response, trying to login again and retry the command",
                self.host()
            );
            return Ok(Attempt::Retry);
        }

        if status >= 400 || (request.is_login_logout() && status != 200) {
            return Err(Error::Api {
                host: self.host().to_string(),
                cmd: request.cmd.clone(),
                rsp_code: status as i64,
                detail: format!("API returned HTTP status ERROR code {}", status),
            });
        }

        match request.expected {
            Expect::Json => match serde_json::from_slice::<Vec<Value>>(&data) {
                Ok(replies) => Ok(Attempt::Done(Payload::Json(replies))),
                Err(e) if !retry => {
                    debug!(
                        "{}: error translating JSON response: {}, trying again",
                        self.host(),
                        e
                    );
                    Ok(Attempt::Retry)
                }
                Err(e) => Err(Error::InvalidContentType {
                    host: self.host().to_string(),
                    why: format!(
                        "error translating JSON response: {}, content type '{}'",
                        e, content_type
                    ),
                }),
            },
            _ => Ok(Attempt::Done(Payload::Raw(data))),
        }
    }
}

impl Payload {
    pub(crate) fn into_json(self, host: &str) -> Result<Vec<Value>> {
        match self {
            Payload::Json(replies) => Ok(replies),
            Payload::Raw(_) => Err(Error::InvalidContentType {
                host: host.to_string(),
                why: "expected a JSON reply".to_string(),
            }),
        }
    }

    pub(crate) fn into_bytes(self) -> Bytes {
        match self {
            Payload::Json(replies) => Bytes::from(Value::from(replies).to_string()),
            Payload::Raw(data) => data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_truncated() {
        let host = Host::new(HostConfig::new("cam", "admin", "a".repeat(40)));
        assert_eq!(host.password().len(), 31);
    }

    #[test]
    fn test_urls() {
        let host = Host::new(HostConfig::new("cam", "admin", "pw"));
        assert_eq!(host.url(), "http://cam/cgi-bin/api.cgi");
        host.set_endpoint(443, true);
        assert_eq!(host.url(), "https://cam:443/cgi-bin/api.cgi");
    }

    #[test]
    fn test_hide_password() {
        let host = Host::new(HostConfig::new("cam", "admin", "secret"));
        host.lock_session()
            .set("tok123".to_string(), Duration::from_secs(10), Instant::now());
        assert_eq!(
            host.hide_password(r#"{"password":"secret","token":"tok123"}"#),
            r#"{"password":"<password>","token":"<token>"}"#
        );
    }

    #[test]
    fn test_request_cmd() {
        let body = [json!({"cmd": "GetEnc", "action": 0, "param": {"channel": 0}})];
        let request = Request::post(&body);
        assert_eq!(request.cmd, "GetEnc");
        assert!(!request.is_login_logout());
        assert_eq!(request.expected, Expect::Json);
        let snap = Request::get("Snap", vec![]).expect(Expect::Mime("image/jpeg"));
        assert_eq!(snap.expected, Expect::Mime("image/jpeg"));
    }
}
