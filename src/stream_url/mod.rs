///
/// # Reolink Stream Url
///
/// This module handles the stream-url subcommand
///
/// The protocol and stream come from the camera config
///
/// # Usage
///
/// ```bash
/// reolink stream-url --config=config.toml CameraName
/// ```
///
use anyhow::{anyhow, Context, Result};

mod cmdline;

use super::config::Config;
use crate::utils::{connect_host, find_camera_by_name};
pub(crate) use cmdline::Opt;

/// Entry point for the stream-url subcommand
///
/// Opt is the command line options
pub(crate) async fn main(opt: Opt, config: Config) -> Result<()> {
    let camera_config = find_camera_by_name(&config, &opt.camera)?;
    let channel = opt.channel.unwrap_or(camera_config.channel_id);
    let host = connect_host(camera_config).await?;

    let url = host
        .get_stream_source(channel, Some(camera_config.stream()))
        .await
        .context("Could not build the stream url")?
        .ok_or_else(|| anyhow!("No stream on channel {}", channel))?;
    println!("{}", url);

    Ok(())
}
