//! UDP discovery request and reply.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use bytes::Bytes;

use crate::error::Result;
use crate::layout::{FieldSpec, Fields, Layout};

/// Payload broadcast to solicit discovery replies.
pub const DISCOVERY_REQUEST: &[u8] = b"\x61";

/// Length of a discovery reply on the wire.
pub const DISCOVERY_LEN: usize = 55;

/// Value devices put in the tail byte of a reply.
pub const DISCOVERY_TAIL: u8 = 0x01;

const RESERVED_LEN: usize = 32;

const DISCOVERY_FIELDS: &[FieldSpec] = &[
    FieldSpec::raw("mac", 0, 6),
    FieldSpec::be("dev_ip", 6, 4),
    FieldSpec::be("gw_ip", 10, 4),
    FieldSpec::be("netmask", 14, 4),
    FieldSpec::be("dev_port", 18, 2),
    FieldSpec::be("const1", 20, 2),
    FieldSpec::raw("reserved", 22, RESERVED_LEN),
    FieldSpec::be("tail", 54, 1),
];

/// Wire layout of the 55-byte discovery reply.
pub const DISCOVERY_LAYOUT: Layout = Layout {
    name: "discovery frame",
    size: DISCOVERY_LEN,
    fields: DISCOVERY_FIELDS,
};

/// Returns true if `data` is our own discovery request.
///
/// A socket bound to the wildcard address hears its own broadcasts.
pub fn is_discovery_request(data: &[u8]) -> bool {
    data == DISCOVERY_REQUEST
}

/// Hardware address of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Error returned when parsing a [`MacAddress`] fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid MAC address string: {0}")]
pub struct ParseMacError(String);

impl FromStr for MacAddress {
    type Err = ParseMacError;

    /// Parse `aa:bb:cc:dd:ee:ff` or `aa-bb-cc-dd-ee-ff`, case-insensitive.
    /// Separators must not be mixed.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let err = || ParseMacError(s.to_string());
        let sep = match s.as_bytes().get(2) {
            Some(b':') => ':',
            Some(b'-') => '-',
            _ => return Err(err()),
        };

        let mut octets = [0u8; 6];
        let mut parts = s.split(sep);
        for slot in octets.iter_mut() {
            let part = parts.next().ok_or_else(err)?;
            if part.len() != 2 {
                return Err(err());
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| err())?;
        }
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(Self(octets))
    }
}

/// A device's reply to a discovery request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryFrame {
    pub mac: MacAddress,
    pub device_ip: Ipv4Addr,
    pub gateway_ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub device_port: u16,
    /// Undocumented; devices send 80.
    pub const1: u16,
    pub reserved: [u8; RESERVED_LEN],
    pub tail: u8,
}

impl DiscoveryFrame {
    /// Decode a 55-byte discovery reply.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let fields = DISCOVERY_LAYOUT.decode(data)?;

        let mut mac = [0u8; 6];
        mac.copy_from_slice(fields.require_raw("mac")?);
        let mut reserved = [0u8; RESERVED_LEN];
        reserved.copy_from_slice(fields.require_raw("reserved")?);

        Ok(Self {
            mac: MacAddress(mac),
            device_ip: Ipv4Addr::from(fields.require_uint("dev_ip")? as u32),
            gateway_ip: Ipv4Addr::from(fields.require_uint("gw_ip")? as u32),
            netmask: Ipv4Addr::from(fields.require_uint("netmask")? as u32),
            device_port: fields.require_uint("dev_port")? as u16,
            const1: fields.require_uint("const1")? as u16,
            reserved,
            tail: fields.require_uint("tail")? as u8,
        })
    }

    /// Encode to exactly [`DISCOVERY_LEN`] bytes.
    pub fn encode(&self) -> Bytes {
        let mut fields = Fields::new();
        fields
            .set_raw("mac", self.mac.octets().to_vec())
            .set_uint("dev_ip", u64::from(u32::from(self.device_ip)))
            .set_uint("gw_ip", u64::from(u32::from(self.gateway_ip)))
            .set_uint("netmask", u64::from(u32::from(self.netmask)))
            .set_uint("dev_port", u64::from(self.device_port))
            .set_uint("const1", u64::from(self.const1))
            .set_raw("reserved", self.reserved.to_vec())
            .set_uint("tail", u64::from(self.tail));
        DISCOVERY_LAYOUT.encode(&fields)
    }

    /// Key used to recognize the same device across replies.
    pub fn identity(&self) -> (MacAddress, Ipv4Addr, u16) {
        (self.mac, self.device_ip, self.device_port)
    }

    /// Whether the tail byte carries the value devices normally send.
    pub fn has_expected_tail(&self) -> bool {
        self.tail == DISCOVERY_TAIL
    }
}

impl fmt::Display for DiscoveryFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MAC={}, IP={}, GW={}, MASK={}, PORT={}",
            self.mac, self.device_ip, self.gateway_ip, self.netmask, self.device_port
        )
    }
}
