mod cmd;
mod config;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Command;
use crate::config::{FileConfig, Settings};
use crate::exit::CliResult;
use crate::logging::{init_logging, LogFormat, LogLevel, LogLevels};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "drhd",
    version,
    about = "Control Dr.HD HDMI matrix switches over the local network"
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, short = 'l', value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Log level for device discovery.
    #[arg(long, value_name = "LEVEL", global = true)]
    log_udp: Option<LogLevel>,

    /// Log level for command sessions.
    #[arg(long, value_name = "LEVEL", global = true)]
    log_tcp: Option<LogLevel>,

    /// JSON settings file. Its values override command-line options.
    #[arg(long, short = 'c', value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn apply_config(&mut self) -> CliResult<()> {
        let Some(path) = self.config.clone() else {
            return Ok(());
        };
        let file = FileConfig::load(&path)?;
        file.apply(&mut Settings {
            log_level: &mut self.log_level,
            log_udp: &mut self.log_udp,
            log_tcp: &mut self.log_tcp,
            command: &mut self.command,
        });
        Ok(())
    }

    fn log_levels(&self) -> LogLevels {
        LogLevels {
            base: self.log_level,
            udp: self.log_udp,
            tcp: self.log_tcp,
        }
    }
}

fn main() {
    let mut cli = Cli::parse();
    if let Err(err) = cli.apply_config() {
        eprintln!("error: {err}");
        std::process::exit(err.code);
    }
    init_logging(cli.log_format, cli.log_levels());

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use drhd_frame::MacAddress;

    use super::*;
    use crate::cmd::control::MapTarget;

    #[test]
    fn parses_scan_defaults() {
        let cli = Cli::try_parse_from(["drhd", "scan"]).expect("scan args should parse");
        let Command::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.num_req, 3);
        assert_eq!(args.net.bind_to, Ipv4Addr::UNSPECIFIED);
        assert_eq!(cli.log_level, LogLevel::Warn);
    }

    #[test]
    fn parses_status_by_mac() {
        let cli = Cli::try_parse_from([
            "drhd",
            "status",
            "--device-mac",
            "00-1c-91-03-80-7e",
            "--numeric",
            "--connections",
        ])
        .expect("status args should parse");
        let Command::Status(args) = cli.command else {
            panic!("expected status");
        };
        assert_eq!(
            args.device.device_mac,
            Some(MacAddress::new([0x00, 0x1C, 0x91, 0x03, 0x80, 0x7E]))
        );
        assert!(args.numeric && args.connections);
    }

    #[test]
    fn rejects_device_and_mac_together() {
        let err = Cli::try_parse_from([
            "drhd",
            "status",
            "--device",
            "10.0.0.2",
            "--device-mac",
            "00:11:22:33:44:55",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_control_map_groups() {
        let cli = Cli::try_parse_from([
            "drhd", "control", "-d", "10.0.0.2", "--map", "A:1", "c:2", "4:3",
        ])
        .expect("control args should parse");
        let Command::Control(args) = cli.command else {
            panic!("expected control");
        };
        let outputs: Vec<MapTarget> = args.map.iter().map(|g| g.output).collect();
        assert_eq!(
            outputs,
            vec![
                MapTarget::Output(1),
                MapTarget::Output(3),
                MapTarget::Output(4)
            ]
        );
    }

    #[test]
    fn rejects_malformed_map_group() {
        let err = Cli::try_parse_from(["drhd", "control", "-d", "10.0.0.2", "--map", "AA:1"])
            .expect_err("bad mapping should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_beep_action() {
        let cli = Cli::try_parse_from(["drhd", "beep", "-d", "10.0.0.2", "query"])
            .expect("beep args should parse");
        assert!(matches!(cli.command, Command::Beep(_)));
    }

    #[test]
    fn hidden_port_is_accepted() {
        let cli = Cli::try_parse_from(["drhd", "beep", "-d", "127.0.0.1", "--port", "9001", "on"])
            .expect("hidden port should parse");
        let Command::Beep(args) = cli.command else {
            panic!("expected beep");
        };
        assert_eq!(args.device.port, 9001);
    }
}
