///
/// # Reolink Snapshot
///
/// This module handles the snapshot subcommand
///
/// # Usage
///
/// ```bash
/// reolink snapshot --config=config.toml --output=garden.jpg CameraName
/// ```
///
use anyhow::{anyhow, Context, Result};
use log::*;

mod cmdline;

use super::config::Config;
use crate::utils::{connect_host, find_camera_by_name};
pub(crate) use cmdline::Opt;

/// Entry point for the snapshot subcommand
///
/// Opt is the command line options
pub(crate) async fn main(opt: Opt, config: Config) -> Result<()> {
    let camera_config = find_camera_by_name(&config, &opt.camera)?;
    let channel = opt.channel.unwrap_or(camera_config.channel_id);
    let host = connect_host(camera_config).await?;

    let image = host
        .get_snapshot(channel)
        .await
        .context("Could not request a snapshot")?
        .ok_or_else(|| anyhow!("The camera sent an empty snapshot"))?;
    host.logout().await;

    tokio::fs::write(&opt.output, &image)
        .await
        .with_context(|| format!("Failed to write {:?}", opt.output))?;
    info!(
        "{}: Wrote {} bytes to {:?}",
        camera_config.name,
        image.len(),
        opt.output
    );

    Ok(())
}
