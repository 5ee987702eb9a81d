///
/// # Reolink Ports
///
/// This module handles the ports subcommand
///
/// The HTTP API cannot switch itself on, so this goes through Baichuan
///
/// # Usage
///
/// ```bash
/// # List the services
/// reolink ports --config=config.toml CameraName
/// # Enable rtsp
/// reolink ports --config=config.toml CameraName --service=rtsp --on=true
/// ```
///
use anyhow::{Context, Result};
use log::*;
use reolink_core::bc_protocol::PortType;

mod cmdline;

use super::config::Config;
use crate::utils::{baichuan_from_config, find_camera_by_name};
use cmdline::Service;
pub(crate) use cmdline::Opt;

/// Entry point for the ports subcommand
///
/// Opt is the command line options
pub(crate) async fn main(opt: Opt, config: Config) -> Result<()> {
    let camera_config = find_camera_by_name(&config, &opt.camera)?;
    let camera = baichuan_from_config(camera_config)?;

    if let (Some(service), Some(on)) = (opt.service, opt.on) {
        camera
            .set_port_enabled(port_type(service), on)
            .await
            .context("Could not switch the service")?;
        info!("{}: {:?} is now {}", camera_config.name, service, on_off(on));
    }

    let ports = camera
        .get_ports()
        .await
        .context("Could not read the ports of the camera")?;
    for (name, state) in ports.iter() {
        println!(
            "{:<6} port {:<6} {}",
            name,
            state.port.map(|p| p.to_string()).unwrap_or_default(),
            state.enabled.map(on_off).unwrap_or("?")
        );
    }

    if let Err(e) = camera.logout().await {
        warn!("{}: Logout failed: {}", camera_config.name, e);
    }
    Ok(())
}

fn port_type(service: Service) -> PortType {
    match service {
        Service::Http => PortType::Http,
        Service::Https => PortType::Https,
        Service::Rtmp => PortType::Rtmp,
        Service::Rtsp => PortType::Rtsp,
        Service::Onvif => PortType::Onvif,
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}
