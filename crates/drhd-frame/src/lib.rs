//! Fixed-layout wire frames for Dr.HD HDMI matrix switches.
//!
//! Two structures travel on the wire, both with big-endian integers:
//! - the 13-byte TCP command frame (`A5 5B`, group, action, two arguments,
//!   four zero bytes, checksum), and
//! - the 55-byte UDP discovery reply.
//!
//! Both are declared as explicit field tables and go through one generic
//! encode/decode routine in [`layout`].

pub mod builder;
pub mod codec;
pub mod command;
pub mod crc;
pub mod discovery;
pub mod error;
pub mod layout;
pub mod reader;
pub mod writer;

pub use builder::ALL_PORTS;
pub use codec::{decode_frame, encode_frame, FrameConfig};
pub use command::{
    action, beeper, group, group_name, hexify, CommandFrame, FRAME_LEN, PORT_CONNECTED,
};
pub use crc::checksum;
pub use discovery::{
    is_discovery_request, DiscoveryFrame, MacAddress, ParseMacError, DISCOVERY_LEN,
    DISCOVERY_REQUEST,
};
pub use error::{FrameError, Result};
pub use layout::{ByteOrder, FieldDefault, FieldKind, FieldSpec, FieldValue, Fields, Layout};
pub use reader::FrameReader;
pub use writer::FrameWriter;
