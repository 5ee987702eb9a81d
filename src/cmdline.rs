use clap::{crate_authors, crate_version, Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// A command line client for Reolink IP cameras and NVRs
///
/// Reolink is free software released under the GNU AGPL v3.
#[derive(Parser, Debug)]
#[command(name = "reolink", arg_required_else_help = true, version = crate_version!(), author = crate_authors!("\n"))]
pub struct Opt {
    #[arg(short, long, global = true, value_parser = PathBuf::from_str)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub cmd: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Info(super::info::Opt),
    Snapshot(super::snapshot::Opt),
    Ports(super::ports::Opt),
    StreamUrl(super::stream_url::Opt),
}
