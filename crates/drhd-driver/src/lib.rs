//! Device discovery and command sessions for Dr.HD HDMI matrices.
//!
//! - [`NetworkExplorer`] broadcasts discovery requests on a background
//!   sender thread and hands every decoded reply to a caller listener.
//! - [`HdmiMatrix`] drives one TCP command session with strictly
//!   synchronous request/response exchanges.

pub mod error;
pub mod explorer;
pub mod matrix;

pub use error::{DriverError, Result};
pub use explorer::{
    ExplorerConfig, ExplorerHandle, ExplorerState, NetworkExplorer, DEFAULT_INTERVAL,
    DEFAULT_RETRY_COUNT,
};
pub use matrix::{HdmiMatrix, PortKind, PortMapping, SessionState, DEFAULT_PORT_COUNT};
