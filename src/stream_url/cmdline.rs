use clap::Parser;

/// The stream-url command prints the live stream url of a channel
#[derive(Parser, Debug)]
pub struct Opt {
    /// The name of the camera. Must be a name in the config
    pub camera: String,
    /// Overrides the channel of the config, used for NVRs
    #[arg(long)]
    pub channel: Option<u8>,
}
