#![warn(missing_docs)]
//!
//! # Reolink
//!
//! Reolink is a small program that acts as a control interface for Reolink IP cameras and NVRs.
//!
//! It reads the device data over the HTTP API and uses the Baichuan protocol for what the
//! HTTP API cannot do, such as switching network services on.
//!
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::*;
use std::fs;
use validator::Validate;

mod cmdline;
mod config;
mod info;
mod ports;
mod snapshot;
mod stream_url;
mod utils;

use cmdline::{Command, Opt};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!(
        "Reolink {} {}",
        env!("REOLINK_VERSION"),
        env!("REOLINK_PROFILE")
    );

    let opt = Opt::parse();

    let conf_path = opt.config.context("Must supply --config file")?;
    let config: Config = toml::from_str(
        &fs::read_to_string(&conf_path)
            .with_context(|| format!("Failed to read {:?}", conf_path))?,
    )
    .with_context(|| format!("Failed to parse the {:?} config file", conf_path))?;

    config
        .validate()
        .with_context(|| format!("Failed to validate the {:?} config file", conf_path))?;

    match opt.cmd {
        None => Err(anyhow!("No subcommand given, see --help")),
        Some(Command::Info(opts)) => info::main(opts, config).await,
        Some(Command::Snapshot(opts)) => snapshot::main(opts, config).await,
        Some(Command::Ports(opts)) => ports::main(opts, config).await,
        Some(Command::StreamUrl(opts)) => stream_url::main(opts, config).await,
    }
}
