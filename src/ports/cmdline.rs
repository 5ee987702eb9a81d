use clap::{Parser, ValueEnum};

/// The ports command lists or switches the network services over the Baichuan protocol
#[derive(Parser, Debug)]
pub struct Opt {
    /// The name of the camera. Must be a name in the config
    pub camera: String,
    /// Switch this service on or off instead of listing
    #[arg(long, value_enum, requires = "on")]
    pub service: Option<Service>,
    /// The new state of the service
    #[arg(long)]
    pub on: Option<bool>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Service {
    Http,
    Https,
    Rtmp,
    Rtsp,
    Onvif,
}
