///
/// # Reolink Info
///
/// This module handles the info subcommand
///
/// It logs in over HTTP, reads the capabilities and states and prints a summary
///
/// # Usage
///
/// ```bash
/// reolink info --config=config.toml CameraName
/// ```
///
use anyhow::{Context, Result};
use reolink_core::api::Host;

mod cmdline;

use super::config::Config;
use crate::utils::{connect_host, find_camera_by_name};
pub(crate) use cmdline::Opt;

/// Entry point for the info subcommand
///
/// Opt is the command line options
pub(crate) async fn main(opt: Opt, config: Config) -> Result<()> {
    let camera_config = find_camera_by_name(&config, &opt.camera)?;
    let host = connect_host(camera_config).await?;

    host.get_states()
        .await
        .with_context(|| format!("Failed to read the states of {}", camera_config.name))?;

    print_summary(&host);
    host.logout().await;

    Ok(())
}

fn print_summary(host: &Host) {
    let unknown = || "unknown".to_string();
    println!("Name:     {}", host.nvr_name().unwrap_or_else(unknown));
    println!("Model:    {}", host.model().unwrap_or_else(unknown));
    println!("Hardware: {}", host.hardware_version().unwrap_or_else(unknown));
    println!("Firmware: {}", host.sw_version());
    println!("Serial:   {}", host.serial().unwrap_or_else(unknown));
    println!("MAC:      {}", host.mac_address().unwrap_or_else(unknown));
    println!("NVR:      {}", host.is_nvr());
    println!(
        "Ports:    rtsp {:?}, rtmp {:?}, onvif {:?}",
        host.rtsp_port(),
        host.rtmp_port(),
        host.onvif_port()
    );

    for channel in host.channels() {
        println!();
        println!(
            "Channel {}: {}",
            channel,
            host.camera_name(channel).unwrap_or_else(unknown)
        );
        println!("  Motion:       {}", host.motion_detected(channel));
        println!("  IR lights:    {}", host.ir_enabled(channel));
        println!("  PTZ:          {}", host.ptz_supported(channel));
        println!(
            "  Switchable:   {}",
            host.get_switchable_capabilities(channel).join(", ")
        );
    }
}
