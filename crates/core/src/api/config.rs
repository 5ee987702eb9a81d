use super::enums::{Protocol, RtmpAuth, StreamKind};
use crate::bc_protocol::BC_PORT;
use std::time::Duration;

/// Everything needed to reach one host
///
/// Leaving `port` or `use_https` unset makes the first login probe HTTPS on 443 and then
/// HTTP on 80.
#[derive(Clone)]
pub struct HostConfig {
    /// Address or hostname of the device
    pub host: String,
    /// Login user
    pub username: String,
    /// Login password, the device only accepts up to 31 characters
    pub password: String,
    /// The web port
    pub port: Option<u16>,
    /// Whether the web port speaks HTTPS
    pub use_https: Option<bool>,
    /// The protocol [`super::Host::get_stream_source`] builds urls for
    pub protocol: Protocol,
    /// The default stream for urls
    pub stream: StreamKind,
    /// Total time allowed for one HTTP request
    pub timeout: Duration,
    /// How rtmp urls authenticate
    pub rtmp_auth: RtmpAuth,
    /// The Baichuan port
    pub bc_port: u16,
    /// Address used in urls handed to clients outside of the local network
    pub external_host: Option<String>,
    /// Port used in urls handed to clients outside of the local network
    pub external_port: Option<u16>,
}

impl std::fmt::Debug for HostConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"******")
            .field("port", &self.port)
            .field("use_https", &self.use_https)
            .field("protocol", &self.protocol)
            .field("stream", &self.stream)
            .field("timeout", &self.timeout)
            .field("rtmp_auth", &self.rtmp_auth)
            .field("bc_port", &self.bc_port)
            .finish()
    }
}

impl HostConfig {
    /// A config with the defaults: port probing, rtmp on the sub stream, 60s timeout
    pub fn new<T: Into<String>, U: Into<String>, V: Into<String>>(
        host: T,
        username: U,
        password: V,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            port: None,
            use_https: None,
            protocol: Protocol::default(),
            stream: StreamKind::default(),
            timeout: *crate::TIMEOUT,
            rtmp_auth: RtmpAuth::default(),
            bc_port: BC_PORT,
            external_host: None,
            external_port: None,
        }
    }

    /// Fixes the web port and scheme, no probing is done
    pub fn with_port(mut self, port: u16, use_https: bool) -> Self {
        self.port = Some(port);
        self.use_https = Some(use_https);
        self
    }

    /// Sets the streaming protocol and default stream
    pub fn with_stream(mut self, protocol: Protocol, stream: StreamKind) -> Self {
        self.protocol = protocol;
        self.stream = stream;
        self
    }

    /// Sets the HTTP timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how rtmp urls authenticate
    pub fn with_rtmp_auth(mut self, rtmp_auth: RtmpAuth) -> Self {
        self.rtmp_auth = rtmp_auth;
        self
    }

    /// Sets the Baichuan port
    pub fn with_bc_port(mut self, bc_port: u16) -> Self {
        self.bc_port = bc_port;
        self
    }

    /// Sets the address and port used in urls for external clients
    pub fn with_external(mut self, host: Option<String>, port: Option<u16>) -> Self {
        self.external_host = host;
        self.external_port = port;
        self
    }
}
