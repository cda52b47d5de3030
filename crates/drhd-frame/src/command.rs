//! TCP command frame and protocol constants.

use std::fmt;

use bytes::Bytes;

use crate::crc::checksum;
use crate::error::{FrameError, Result};
use crate::layout::{FieldDefault, FieldSpec, Fields, Layout};

/// Length of every command frame on the wire.
pub const FRAME_LEN: usize = 13;

/// Fixed frame header.
pub const HEADER: [u8; 2] = [0xA5, 0x5B];

/// Fixed frame tail.
pub const TAIL: [u8; 4] = [0x00; 4];

/// Status replies report a connected port with this arg2 value.
pub const PORT_CONNECTED: u16 = 0x00;

/// Command groups.
pub mod group {
    pub const STATUS: u8 = 0x01;
    pub const PORT: u8 = 0x02;
    pub const EDID: u8 = 0x03;
    pub const SETUP: u8 = 0x06;
}

/// Actions, per command group.
pub mod action {
    pub mod port {
        pub const QUERY: u8 = 0x01;
        pub const SET: u8 = 0x03;
    }

    pub mod status {
        pub const INPUT: u8 = 0x04;
        pub const OUTPUT: u8 = 0x05;
        pub const BEEPER: u8 = 0x0B;
    }

    pub mod edid {
        pub const SET_ALL: u8 = 0x01;
        pub const SET: u8 = 0x02;
        pub const COPY_ALL: u8 = 0x03;
        pub const COPY: u8 = 0x04;
    }

    pub mod setup {
        pub const BEEPER: u8 = 0x01;
    }
}

/// Beeper argument values.
pub mod beeper {
    pub const ON: u16 = 0x0F;
    pub const OFF: u16 = 0xF0;
}

const COMMAND_FIELDS: &[FieldSpec] = &[
    FieldSpec::raw("header", 0, 2).with_default(FieldDefault::Bytes(&HEADER)),
    FieldSpec::be("cmd", 2, 1),
    FieldSpec::be("action", 3, 1),
    FieldSpec::be("arg1", 4, 2),
    FieldSpec::be("arg2", 6, 2),
    FieldSpec::raw("tail", 8, 4).with_default(FieldDefault::Bytes(&TAIL)),
    FieldSpec::be("crc", 12, 1),
];

/// Wire layout of the 13-byte command frame.
pub const COMMAND_LAYOUT: Layout = Layout {
    name: "command frame",
    size: FRAME_LEN,
    fields: COMMAND_FIELDS,
};

/// A 13-byte command frame, sent by the client and echoed back by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandFrame {
    header: [u8; 2],
    cmd: u8,
    action: u8,
    arg1: u16,
    arg2: u16,
    tail: [u8; 4],
    crc: u8,
}

impl CommandFrame {
    /// Build a frame with the standard header and tail and a fresh checksum.
    pub fn new(cmd: u8, action: u8, arg1: u16, arg2: u16) -> Self {
        let mut frame = Self {
            header: HEADER,
            cmd,
            action,
            arg1,
            arg2,
            tail: TAIL,
            crc: 0,
        };
        let wire = frame.encode();
        frame.crc = checksum(&wire[..FRAME_LEN - 1]);
        frame
    }

    /// Decode a frame, validating its length and checksum.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let fields = COMMAND_LAYOUT.decode(data)?;

        let expected = checksum(&data[..FRAME_LEN - 1]);
        let actual = data[FRAME_LEN - 1];
        if expected != actual {
            return Err(FrameError::Checksum { expected, actual });
        }

        Ok(Self {
            header: fixed(fields.require_raw("header")?),
            cmd: fields.require_uint("cmd")? as u8,
            action: fields.require_uint("action")? as u8,
            arg1: fields.require_uint("arg1")? as u16,
            arg2: fields.require_uint("arg2")? as u16,
            tail: fixed(fields.require_raw("tail")?),
            crc: fields.require_uint("crc")? as u8,
        })
    }

    /// Encode to exactly [`FRAME_LEN`] bytes.
    pub fn encode(&self) -> Bytes {
        COMMAND_LAYOUT.encode(&self.fields())
    }

    fn fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields
            .set_raw("header", self.header.to_vec())
            .set_uint("cmd", u64::from(self.cmd))
            .set_uint("action", u64::from(self.action))
            .set_uint("arg1", u64::from(self.arg1))
            .set_uint("arg2", u64::from(self.arg2))
            .set_raw("tail", self.tail.to_vec())
            .set_uint("crc", u64::from(self.crc));
        fields
    }

    pub fn cmd(&self) -> u8 {
        self.cmd
    }

    pub fn action(&self) -> u8 {
        self.action
    }

    pub fn arg1(&self) -> u16 {
        self.arg1
    }

    pub fn arg2(&self) -> u16 {
        self.arg2
    }

    pub fn crc(&self) -> u8 {
        self.crc
    }

    pub fn header(&self) -> [u8; 2] {
        self.header
    }

    pub fn tail(&self) -> [u8; 4] {
        self.tail
    }
}

impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CMD={}:{}, ARGS={}:{}, CRC={}",
            self.cmd, self.action, self.arg1, self.arg2, self.crc
        )
    }
}

/// Human-readable name of a command group.
pub fn group_name(cmd: u8) -> &'static str {
    match cmd {
        group::STATUS => "STATUS",
        group::PORT => "PORT",
        group::EDID => "EDID",
        group::SETUP => "SETUP",
        _ => "UNKNOWN",
    }
}

/// Space-separated lowercase hex, as used in frame traces.
pub fn hexify(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn fixed<const N: usize>(src: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let n = src.len().min(N);
    out[..n].copy_from_slice(&src[..n]);
    out
}
