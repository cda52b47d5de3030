use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;

use drhd_frame::MacAddress;
use serde::Deserialize;

use crate::cmd::{Command, DeviceArgs, NetArgs};
use crate::exit::{io_error, CliError, CliResult};
use crate::logging::LogLevel;

/// Settings file contents. Every key is optional; unknown keys are errors.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    bind_to: Option<String>,
    device: Option<String>,
    device_mac: Option<String>,
    log_level: Option<LogLevel>,
    log_udp: Option<LogLevel>,
    log_tcp: Option<LogLevel>,
    num_req: Option<u32>,
}

/// Validated settings file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileConfig {
    pub bind_to: Option<Ipv4Addr>,
    pub device: Option<Ipv4Addr>,
    pub device_mac: Option<MacAddress>,
    pub log_level: Option<LogLevel>,
    pub log_udp: Option<LogLevel>,
    pub log_tcp: Option<LogLevel>,
    pub num_req: Option<u32>,
}

impl FileConfig {
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|err| io_error(&format!("read config {}", path.display()), err))?;
        Self::parse(&text)
            .map_err(|err| CliError::usage(format!("config {}: {}", path.display(), err.message)))
    }

    pub fn parse(text: &str) -> CliResult<Self> {
        let raw: RawConfig = serde_json::from_str(text)
            .map_err(|err| CliError::usage(format!("invalid config: {err}")))?;

        Ok(Self {
            bind_to: parse_ip("bind_to", raw.bind_to)?,
            device: parse_ip("device", raw.device)?,
            device_mac: raw
                .device_mac
                .map(|value| {
                    value.parse::<MacAddress>().map_err(|_| {
                        CliError::usage(format!("invalid MAC address for 'device_mac': {value}"))
                    })
                })
                .transpose()?,
            log_level: raw.log_level,
            log_udp: raw.log_udp,
            log_tcp: raw.log_tcp,
            num_req: raw.num_req,
        })
    }

    /// Overwrite command-line values with every key present in the file.
    pub fn apply(&self, target: &mut Settings<'_>) {
        if let Some(level) = self.log_level {
            *target.log_level = level;
        }
        if let Some(level) = self.log_udp {
            *target.log_udp = Some(level);
        }
        if let Some(level) = self.log_tcp {
            *target.log_tcp = Some(level);
        }

        match &mut target.command {
            Command::Scan(args) => {
                self.apply_net(&mut args.net);
                if let Some(num_req) = self.num_req {
                    args.num_req = num_req;
                }
            }
            Command::Status(args) => self.apply_device(&mut args.device),
            Command::Control(args) => self.apply_device(&mut args.device),
            Command::Beep(args) => self.apply_device(&mut args.device),
            Command::Version(_) => {}
        }
    }

    fn apply_net(&self, net: &mut NetArgs) {
        if let Some(ip) = self.bind_to {
            net.bind_to = ip;
        }
    }

    fn apply_device(&self, args: &mut DeviceArgs) {
        self.apply_net(&mut args.net);
        if let Some(ip) = self.device {
            args.device = Some(ip);
        }
        if let Some(mac) = self.device_mac {
            args.device_mac = Some(mac);
        }
        if let Some(num_req) = self.num_req {
            args.num_req = num_req;
        }
    }
}

/// Mutable view of the command-line values a settings file may override.
pub struct Settings<'a> {
    pub log_level: &'a mut LogLevel,
    pub log_udp: &'a mut Option<LogLevel>,
    pub log_tcp: &'a mut Option<LogLevel>,
    pub command: &'a mut Command,
}

fn parse_ip(key: &str, value: Option<String>) -> CliResult<Option<Ipv4Addr>> {
    value
        .map(|value| {
            value.parse::<Ipv4Addr>().map_err(|_| {
                CliError::usage(format!("invalid IP address for '{key}': {value}"))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::{ScanArgs, StatusArgs};
    use crate::exit::USAGE;

    #[test]
    fn parses_every_key() {
        let config = FileConfig::parse(
            r#"{
                "bind_to": "192.168.1.10",
                "device": "192.168.1.50",
                "device_mac": "00-1C-91-03-80-7E",
                "log_level": "info",
                "log_udp": "debug",
                "log_tcp": "warning",
                "num_req": 5
            }"#,
        )
        .unwrap();

        assert_eq!(config.bind_to, Some(Ipv4Addr::new(192, 168, 1, 10)));
        assert_eq!(config.device, Some(Ipv4Addr::new(192, 168, 1, 50)));
        assert_eq!(
            config.device_mac,
            Some(MacAddress::new([0x00, 0x1C, 0x91, 0x03, 0x80, 0x7E]))
        );
        assert_eq!(config.log_level, Some(LogLevel::Info));
        assert_eq!(config.log_udp, Some(LogLevel::Debug));
        assert_eq!(config.log_tcp, Some(LogLevel::Warn));
        assert_eq!(config.num_req, Some(5));
    }

    #[test]
    fn empty_object_is_valid() {
        assert_eq!(FileConfig::parse("{}").unwrap(), FileConfig::default());
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = FileConfig::parse(r#"{"device": "10.0.0.2", "colour": "blue"}"#).unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(err.message.contains("colour"), "{}", err.message);
    }

    #[test]
    fn invalid_values_name_their_key() {
        let err = FileConfig::parse(r#"{"bind_to": "10.0.0"}"#).unwrap_err();
        assert!(err.message.contains("'bind_to'"), "{}", err.message);

        let err = FileConfig::parse(r#"{"device_mac": "00:11:22-33:44:55"}"#).unwrap_err();
        assert!(err.message.contains("'device_mac'"), "{}", err.message);
    }

    #[test]
    fn file_values_override_command_line() {
        let config = FileConfig::parse(
            r#"{"device": "10.0.0.9", "num_req": 7, "log_tcp": "trace"}"#,
        )
        .unwrap();

        let mut log_level = LogLevel::Warn;
        let mut log_udp = None;
        let mut log_tcp = Some(LogLevel::Error);
        let mut command = Command::Status(StatusArgs {
            device: DeviceArgs {
                device: Some(Ipv4Addr::new(10, 0, 0, 1)),
                ..DeviceArgs::default()
            },
            numeric: false,
            connections: false,
        });

        config.apply(&mut Settings {
            log_level: &mut log_level,
            log_udp: &mut log_udp,
            log_tcp: &mut log_tcp,
            command: &mut command,
        });

        assert_eq!(log_level, LogLevel::Warn);
        assert_eq!(log_udp, None);
        assert_eq!(log_tcp, Some(LogLevel::Trace));
        let Command::Status(args) = command else {
            panic!("command changed");
        };
        assert_eq!(args.device.device, Some(Ipv4Addr::new(10, 0, 0, 9)));
        assert_eq!(args.device.num_req, 7);
    }

    #[test]
    fn scan_takes_bind_address_and_request_count() {
        let config = FileConfig::parse(r#"{"bind_to": "127.0.0.1", "num_req": 0}"#).unwrap();
        let mut log_level = LogLevel::Warn;
        let (mut log_udp, mut log_tcp) = (None, None);
        let mut command = Command::Scan(ScanArgs::default());

        config.apply(&mut Settings {
            log_level: &mut log_level,
            log_udp: &mut log_udp,
            log_tcp: &mut log_tcp,
            command: &mut command,
        });

        let Command::Scan(args) = command else {
            panic!("command changed");
        };
        assert_eq!(args.net.bind_to, Ipv4Addr::LOCALHOST);
        assert_eq!(args.num_req, 0);
    }
}
