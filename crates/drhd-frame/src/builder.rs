//! Command frames for each logical device operation.
//!
//! Every function is a pure mapping from arguments to a [`CommandFrame`].

use crate::command::{action, beeper, group, CommandFrame};

/// Port argument meaning "every port" in EDID operations.
pub const ALL_PORTS: u16 = 0;

/// Ask which input is routed to `out_port`.
pub fn query_port(out_port: u16) -> CommandFrame {
    CommandFrame::new(group::PORT, action::port::QUERY, out_port, 0)
}

/// Route `in_port` to `out_port`.
pub fn map_port(in_port: u16, out_port: u16) -> CommandFrame {
    CommandFrame::new(group::PORT, action::port::SET, in_port, out_port)
}

/// Set the EDID of `in_port` (or every input for [`ALL_PORTS`]) to `value`.
pub fn set_edid(in_port: u16, value: u16) -> CommandFrame {
    let act = if in_port == ALL_PORTS {
        action::edid::SET_ALL
    } else {
        action::edid::SET
    };
    CommandFrame::new(group::EDID, act, value, in_port)
}

/// Copy the EDID of `out_port` to `in_port` (or every input for [`ALL_PORTS`]).
pub fn copy_edid(out_port: u16, in_port: u16) -> CommandFrame {
    let act = if in_port == ALL_PORTS {
        action::edid::COPY_ALL
    } else {
        action::edid::COPY
    };
    CommandFrame::new(group::EDID, act, out_port, in_port)
}

/// Query the hot-plug state of `out_port`.
pub fn output_status(out_port: u16) -> CommandFrame {
    CommandFrame::new(group::STATUS, action::status::OUTPUT, out_port, 0)
}

/// Query the signal state of `in_port`.
pub fn input_status(in_port: u16) -> CommandFrame {
    CommandFrame::new(group::STATUS, action::status::INPUT, in_port, 0)
}

/// Turn the front-panel beeper on or off.
pub fn set_beep(on: bool) -> CommandFrame {
    let value = if on { beeper::ON } else { beeper::OFF };
    CommandFrame::new(group::SETUP, action::setup::BEEPER, value, 0)
}

/// Query the beeper setting.
pub fn query_beep() -> CommandFrame {
    CommandFrame::new(group::STATUS, action::status::BEEPER, 0, 0)
}
