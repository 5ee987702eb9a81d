use clap::Parser;

/// The info command prints the device data and the state of each channel
#[derive(Parser, Debug)]
pub struct Opt {
    /// The name of the camera. Must be a name in the config
    pub camera: String,
}
