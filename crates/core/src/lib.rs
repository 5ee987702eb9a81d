#![warn(missing_docs)]
//! # Reolink-Core
//!
//! Reolink-Core is a rust library for interacting with reolink cameras and NVRs.
//!
//! It speaks the two control protocols of these devices:
//!
//! - The HTTP JSON API, see [`api::Host`], which is the primary source of settings and states
//! - The Baichuan binary TCP protocol, see [`bc_protocol::Baichuan`], used for the things the
//!   HTTP API does not expose such as enabling ports
//!
//! A host can be initialised with
//!
//! ```no_run
//! use reolink_core::api::{Host, HostConfig};
//! let host = Host::new(HostConfig::new("camera_ip_address", "admin", "password"));
//! ```
//!
//! After that the capabilities of the device are read with
//!
//! ```no_run
//! # use reolink_core::api::{Host, HostConfig};
//! # async fn doc() -> reolink_core::Result<()> {
//! # let host = Host::new(HostConfig::new("camera_ip_address", "admin", "password"));
//! host.get_host_data().await?;
//! host.get_states().await?;
//! println!("{:?}", host.camera_name(0));
//! # Ok(())
//! # }
//! ```
//! For further commands see the [`api::Host`] struct.
//!

/// Contains the HTTP JSON API client
pub mod api;
/// Contains low level BC structures and formats
pub mod bc;
/// Contains the Baichuan protocol client
pub mod bc_protocol;
mod errors;
/// Contains the ONVIF push subscription
pub mod onvif;
/// Contains the firmware version parsing
pub mod software_version;
/// Contains helpers for the time formats of the devices
pub mod utils;

/// This is the top level error structure of the library
///
/// Most commands will either return their `Ok(result)` or this `Err(Error)`
pub use errors::{Error, Result};

pub(crate) use bc_protocol::Credentials;

lazy_static::lazy_static! {
    /// This is the total timeout of a single HTTP request if the caller did not set one
    pub(crate) static ref TIMEOUT: tokio::time::Duration = tokio::time::Duration::from_secs(60);

    /// Connecting and every write then wait for reply of the Baichuan protocol are bound by this
    pub(crate) static ref BC_TIMEOUT: tokio::time::Duration = tokio::time::Duration::from_secs(15);
}

/// A convience future to timeout with the Baichuan timeout specified in [`BC_TIMEOUT`]
pub(crate) fn bc_timeout<F>(future: F) -> tokio::time::Timeout<F>
where
    F: std::future::Future,
{
    tokio::time::timeout(*BC_TIMEOUT, future)
}
