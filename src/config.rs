use lazy_static::lazy_static;
use regex::Regex;
use reolink_core::api::{Protocol, StreamKind};
use serde::Deserialize;
use std::clone::Clone;
use validator::{Validate, ValidationError};
use validator_derive::Validate;

lazy_static! {
    static ref RE_PROTOCOL: Regex = Regex::new(r"^(rtmp|rtsp|flv)$").unwrap();
    static ref RE_STREAM_SRC: Regex = Regex::new(r"^(main|sub|ext)$").unwrap();
}

#[derive(Debug, Deserialize, Validate, Clone)]
pub(crate) struct Config {
    #[validate]
    pub(crate) cameras: Vec<CameraConfig>,
}

#[derive(Debug, Deserialize, Validate, Clone)]
#[validate(schema(function = "validate_camera_config"))]
pub(crate) struct CameraConfig {
    pub(crate) name: String,

    #[serde(rename = "address")]
    pub(crate) camera_addr: Option<String>,

    pub(crate) username: String,
    pub(crate) password: String,

    /// HTTP(S) port, probed when not given
    #[validate(range(min = 1, max = 65535, message = "Invalid port", code = "port"))]
    pub(crate) port: Option<u32>,

    #[serde(default)]
    pub(crate) use_https: Option<bool>,

    #[validate(range(min = 1, max = 65535, message = "Invalid port", code = "bc_port"))]
    #[serde(default = "default_bc_port")]
    pub(crate) bc_port: u32,

    #[validate(range(min = 0, max = 31, message = "Invalid channel", code = "channel_id"))]
    #[serde(default = "default_channel_id")]
    pub(crate) channel_id: u8,

    #[serde(default = "default_protocol")]
    #[validate(regex(path = "RE_PROTOCOL", message = "Invalid protocol", code = "protocol"))]
    pub(crate) protocol: String,

    #[serde(default = "default_stream")]
    #[validate(regex(path = "RE_STREAM_SRC", message = "Invalid stream", code = "stream"))]
    pub(crate) stream: String,

    #[serde(default = "default_timeout")]
    #[validate(range(min = 1, max = 600, message = "Invalid timeout", code = "timeout"))]
    pub(crate) timeout: u64,
}

impl CameraConfig {
    pub(crate) fn protocol(&self) -> Protocol {
        match self.protocol.as_str() {
            "rtsp" => Protocol::Rtsp,
            "flv" => Protocol::Flv,
            _ => Protocol::Rtmp,
        }
    }

    pub(crate) fn stream(&self) -> StreamKind {
        match self.stream.as_str() {
            "main" => StreamKind::Main,
            "ext" => StreamKind::Ext,
            _ => StreamKind::Sub,
        }
    }
}

fn default_bc_port() -> u32 {
    reolink_core::bc_protocol::BC_PORT as u32
}

fn default_channel_id() -> u8 {
    0
}

fn default_protocol() -> String {
    "rtmp".to_string()
}

fn default_stream() -> String {
    "sub".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn validate_camera_config(camera_config: &CameraConfig) -> Result<(), ValidationError> {
    match &camera_config.camera_addr {
        None => Err(ValidationError::new("The camera address must be given")),
        Some(addr) if addr.is_empty() => {
            Err(ValidationError::new("The camera address must not be empty"))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str(indoc! {r#"
            [[cameras]]
            name = "garden"
            address = "192.168.1.10"
            username = "admin"
            password = "hunter2"
        "#})
        .unwrap();
        config.validate().unwrap();

        let camera = &config.cameras[0];
        assert_eq!(camera.bc_port, 9000);
        assert_eq!(camera.channel_id, 0);
        assert_eq!(camera.protocol(), Protocol::Rtmp);
        assert_eq!(camera.stream(), StreamKind::Sub);
        assert_eq!(camera.port, None);
    }

    #[test]
    fn test_stream_choice() {
        let config: Config = toml::from_str(indoc! {r#"
            [[cameras]]
            name = "door"
            address = "door.local"
            username = "admin"
            password = "hunter2"
            protocol = "rtsp"
            stream = "main"
            port = 443
            use_https = true
        "#})
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.cameras[0].protocol(), Protocol::Rtsp);
        assert_eq!(config.cameras[0].stream(), StreamKind::Main);
    }

    #[test]
    fn test_missing_address_rejected() {
        let config: Config = toml::from_str(indoc! {r#"
            [[cameras]]
            name = "garden"
            username = "admin"
            password = "hunter2"
        "#})
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_values_rejected() {
        let config: Config = toml::from_str(indoc! {r#"
            [[cameras]]
            name = "garden"
            address = "192.168.1.10"
            username = "admin"
            password = "hunter2"
            channel_id = 40
            stream = "both"
        "#})
        .unwrap();
        assert!(config.validate().is_err());
    }
}
