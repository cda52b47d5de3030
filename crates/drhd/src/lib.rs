//! Control Dr.HD HDMI matrix switches over the local network.
//!
//! # Crate Structure
//!
//! - [`transport`]: UDP discovery socket and TCP device stream
//! - [`frame`]: fixed-layout command and discovery frames, checksum, codec
//! - [`driver`]: network explorer and matrix command session (behind `driver` feature)

/// Re-export transport types.
pub mod transport {
    pub use drhd_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use drhd_frame::*;
}

/// Re-export driver types (requires `driver` feature).
#[cfg(feature = "driver")]
pub mod driver {
    pub use drhd_driver::*;
}
