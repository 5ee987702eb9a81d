use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

/// The snapshot command saves a JPEG still of a channel
#[derive(Parser, Debug)]
pub struct Opt {
    /// The name of the camera. Must be a name in the config
    pub camera: String,
    /// Where to write the JPEG
    #[arg(short, long, value_parser = PathBuf::from_str, default_value = "snapshot.jpg")]
    pub output: PathBuf,
    /// Overrides the channel of the config, used for NVRs
    #[arg(long)]
    pub channel: Option<u8>,
}
