//! Network transports for Dr.HD HDMI matrix switches.
//!
//! The devices speak two protocols over IPv4:
//! - a TCP command stream on the device service port (8000), and
//! - UDP broadcast discovery on port 30600.
//!
//! This is the lowest layer of drhd. The framing and driver crates build on
//! the [`DeviceStream`] and [`DiscoverySocket`] types provided here.

pub mod error;
pub mod tcp;
pub mod udp;

pub use error::{Result, TransportError};
pub use tcp::{DeviceStream, TCP_PORT};
pub use udp::{DiscoverySocket, UDP_PORT};
