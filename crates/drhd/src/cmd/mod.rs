use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use drhd_driver::{ExplorerConfig, HdmiMatrix, DEFAULT_RETRY_COUNT};
use drhd_frame::MacAddress;
use drhd_transport::{TCP_PORT, UDP_PORT};
use tracing::info;

use crate::exit::{driver_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod beep;
pub mod control;
pub mod scan;
pub mod status;
pub mod version;

pub use control::MapGroup;

/// Read, write and connect timeout for command sessions.
const SESSION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan the local network for devices.
    Scan(ScanArgs),
    /// Print the port mapping of a device.
    Status(StatusArgs),
    /// Route inputs to outputs.
    Control(ControlArgs),
    /// Switch the front-panel beeper on or off, or query it.
    Beep(BeepArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Scan(args) => scan::run(args, format),
        Command::Status(args) => status::run(args, format),
        Command::Control(args) => control::run(args, format),
        Command::Beep(args) => beep::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Discovery socket options.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct NetArgs {
    /// Bind discovery to this local address instead of all interfaces.
    #[arg(long, short = 'b', value_name = "BIND_IP", default_value_t = Ipv4Addr::UNSPECIFIED)]
    pub bind_to: Ipv4Addr,

    #[arg(long, hide = true, default_value_t = UDP_PORT)]
    pub udp_port: u16,

    #[arg(long, hide = true, default_value_t = SocketAddrV4::new(Ipv4Addr::BROADCAST, UDP_PORT))]
    pub broadcast: SocketAddrV4,

    #[arg(long, hide = true, value_name = "MS", default_value_t = 2000)]
    pub interval_ms: u64,
}

impl Default for NetArgs {
    fn default() -> Self {
        Self {
            bind_to: Ipv4Addr::UNSPECIFIED,
            udp_port: UDP_PORT,
            broadcast: SocketAddrV4::new(Ipv4Addr::BROADCAST, UDP_PORT),
            interval_ms: 2000,
        }
    }
}

impl NetArgs {
    pub fn explorer_config(&self, retry_count: u32) -> ExplorerConfig {
        ExplorerConfig {
            bind: SocketAddrV4::new(self.bind_to, self.udp_port),
            target: self.broadcast,
            interval: Duration::from_millis(self.interval_ms.max(1)),
            retry_count,
        }
    }
}

/// How to reach one device.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct DeviceArgs {
    /// Device IP address.
    #[arg(long, short = 'd', value_name = "DEV_IP", conflicts_with = "device_mac")]
    pub device: Option<Ipv4Addr>,

    /// Find the device with this MAC address on the local network.
    #[arg(long, short = 'M', value_name = "DEV_MAC")]
    pub device_mac: Option<MacAddress>,

    /// Discovery requests sent while looking for --device-mac (0 = until Ctrl-C).
    #[arg(long, value_name = "NUM", default_value_t = DEFAULT_RETRY_COUNT)]
    pub num_req: u32,

    #[arg(long, hide = true, default_value_t = TCP_PORT)]
    pub port: u16,

    #[command(flatten)]
    pub net: NetArgs,
}

impl Default for DeviceArgs {
    fn default() -> Self {
        Self {
            device: None,
            device_mac: None,
            num_req: DEFAULT_RETRY_COUNT,
            port: TCP_PORT,
            net: NetArgs::default(),
        }
    }
}

impl DeviceArgs {
    /// Resolve the device address, looking it up by MAC when no IP is given.
    pub fn resolve(&self) -> CliResult<SocketAddr> {
        let ip = match (self.device, self.device_mac) {
            (Some(ip), _) => ip,
            (None, Some(mac)) => {
                let found = scan::find_device(&self.net, mac, self.num_req)?;
                found.device_ip
            }
            (None, None) => {
                return Err(CliError::usage(
                    "either --device or --device-mac is required",
                ))
            }
        };
        Ok(SocketAddr::new(IpAddr::V4(ip), self.port))
    }

    /// Resolve the device and open a command session.
    pub fn open(&self) -> CliResult<HdmiMatrix> {
        let endpoint = self.resolve()?;
        let mut matrix = HdmiMatrix::with_endpoint(endpoint).with_timeout(SESSION_TIMEOUT);
        matrix
            .connect()
            .map_err(|err| driver_error("connect failed", err))?;
        info!(%endpoint, "session open");
        Ok(matrix)
    }
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ScanArgs {
    /// Discovery requests to send (0 = until Ctrl-C).
    #[arg(long, short = 'n', value_name = "NUM", default_value_t = DEFAULT_RETRY_COUNT)]
    pub num_req: u32,

    #[command(flatten)]
    pub net: NetArgs,
}

impl Default for ScanArgs {
    fn default() -> Self {
        Self {
            num_req: DEFAULT_RETRY_COUNT,
            net: NetArgs::default(),
        }
    }
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub device: DeviceArgs,

    /// Show outputs as numbers instead of letters (A is 1, B is 2, ...).
    #[arg(long, short = 'n')]
    pub numeric: bool,

    /// Also report which inputs and outputs have something attached.
    #[arg(long)]
    pub connections: bool,
}

#[derive(Args, Debug)]
pub struct ControlArgs {
    #[command(flatten)]
    pub device: DeviceArgs,

    /// Map outputs to inputs as O:I. Outputs are numbers or letters
    /// (A is 1); `*:I` routes input I to every output and must be the only group.
    #[arg(long, short = 'm', value_name = "O:I", required = true, num_args = 1.., value_parser = control::parse_map_group)]
    pub map: Vec<MapGroup>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum BeepAction {
    On,
    Off,
    Query,
}

#[derive(Args, Debug)]
pub struct BeepArgs {
    #[command(flatten)]
    pub device: DeviceArgs,

    #[arg(value_enum)]
    pub action: BeepAction,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Letter label for an output port: 1 is A, 2 is B, ...
pub fn output_label(port: u16) -> String {
    match port {
        1..=26 => char::from(b'A' + (port - 1) as u8).to_string(),
        _ => port.to_string(),
    }
}
