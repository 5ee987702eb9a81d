//! Contains code that is not specific to any of the subcommands
//!
use anyhow::{anyhow, Context, Result};
use log::*;
use reolink_core::api::{Host, HostConfig};
use reolink_core::bc_protocol::Baichuan;
use std::time::Duration;

use super::config::{CameraConfig, Config};

pub(crate) fn find_camera_by_name<'a>(config: &'a Config, name: &str) -> Result<&'a CameraConfig> {
    config
        .cameras
        .iter()
        .find(|c| c.name == name)
        .ok_or_else(|| anyhow!("Camera {} not found in the config file", name))
}

fn camera_addr(camera_config: &CameraConfig) -> Result<&str> {
    camera_config
        .camera_addr
        .as_deref()
        .ok_or_else(|| anyhow!("Camera {} has no address", camera_config.name))
}

/// Builds the HTTP client of a camera, nothing is sent yet
pub(crate) fn host_from_config(camera_config: &CameraConfig) -> Result<Host> {
    let mut host_config = HostConfig::new(
        camera_addr(camera_config)?,
        &camera_config.username,
        &camera_config.password,
    )
    .with_stream(camera_config.protocol(), camera_config.stream())
    .with_timeout(Duration::from_secs(camera_config.timeout));

    if let Some(port) = camera_config.port {
        let port = u16::try_from(port).context("Port out of range")?;
        host_config = host_config.with_port(port, camera_config.use_https.unwrap_or(port == 443));
    }
    Ok(Host::new(host_config))
}

/// Builds the HTTP client and reads the device capabilities
pub(crate) async fn connect_host(camera_config: &CameraConfig) -> Result<Host> {
    let host = host_from_config(camera_config)?;

    info!("{}: Logging in", camera_config.name);
    host.get_host_data()
        .await
        .with_context(|| format!("Failed to read the device data of {}", camera_config.name))?;
    info!("{}: Connected and logged in", camera_config.name);

    Ok(host)
}

pub(crate) fn baichuan_from_config(camera_config: &CameraConfig) -> Result<Baichuan> {
    let port = u16::try_from(camera_config.bc_port).context("Baichuan port out of range")?;
    Ok(Baichuan::new(
        camera_addr(camera_config)?,
        &camera_config.username,
        &camera_config.password,
        port,
    ))
}
