use std::collections::BTreeMap;
use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use drhd_frame::DiscoveryFrame;
use serde::Serialize;

use crate::cmd::output_label;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One discovered device.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DeviceOutput {
    pub mac: String,
    pub ip: String,
    pub gateway: String,
    pub netmask: String,
    pub port: u16,
}

impl From<&DiscoveryFrame> for DeviceOutput {
    fn from(frame: &DiscoveryFrame) -> Self {
        Self {
            mac: frame.mac.to_string(),
            ip: frame.device_ip.to_string(),
            gateway: frame.gateway_ip.to_string(),
            netmask: frame.netmask.to_string(),
            port: frame.device_port,
        }
    }
}

/// One output and the input routed to it.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub output: u16,
    pub label: String,
    pub input: u16,
}

impl Route {
    pub fn new(output: u16, input: u16) -> Self {
        Self {
            output,
            label: output_label(output),
            input,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct StatusReport {
    pub device: String,
    pub routes: Vec<Route>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<BTreeMap<u16, bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<BTreeMap<u16, bool>>,
}

#[derive(Serialize)]
struct RoutesOutput<'a> {
    device: &'a str,
    applied: &'a [Route],
}

#[derive(Serialize)]
struct BeepOutput<'a> {
    device: &'a str,
    beep: bool,
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Print one device as soon as it is found. Tables are printed once at the
/// end of a scan instead, see [`print_device_table`].
pub fn print_device(frame: &DiscoveryFrame, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&DeviceOutput::from(frame)),
        OutputFormat::Pretty => println!("{frame}"),
        OutputFormat::Table => {}
    }
}

pub fn print_device_table(frames: &[DiscoveryFrame]) {
    let mut table = new_table(vec!["MAC", "IP", "GATEWAY", "NETMASK", "PORT"]);
    for frame in frames {
        let device = DeviceOutput::from(frame);
        table.add_row(vec![
            device.mac,
            device.ip,
            device.gateway,
            device.netmask,
            device.port.to_string(),
        ]);
    }
    println!("{table}");
}

fn link(connected: bool) -> &'static str {
    if connected {
        "connected"
    } else {
        "disconnected"
    }
}

fn show_output(route: &Route, numeric: bool) -> String {
    if numeric {
        route.output.to_string()
    } else {
        route.label.clone()
    }
}

pub fn print_status(report: &StatusReport, numeric: bool, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut header = vec!["OUTPUT", "INPUT"];
            if report.outputs.is_some() {
                header.push("OUTPUT LINK");
            }
            if report.inputs.is_some() {
                header.push("INPUT LINK");
            }
            let mut table = new_table(header);
            for route in &report.routes {
                let mut row = vec![show_output(route, numeric), route.input.to_string()];
                if let Some(outputs) = &report.outputs {
                    row.push(lookup_link(outputs, route.output));
                }
                if let Some(inputs) = &report.inputs {
                    row.push(lookup_link(inputs, route.input));
                }
                table.add_row(row);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let outputs: Vec<String> = report
                .routes
                .iter()
                .map(|r| show_output(r, numeric))
                .collect();
            let inputs: Vec<String> = report.routes.iter().map(|r| r.input.to_string()).collect();
            println!("device:  {}", report.device);
            println!("outputs: {}", outputs.join(" "));
            println!("inputs:  {}", inputs.join(" "));
            if let Some(links) = &report.outputs {
                println!("output links: {}", describe_links(links));
            }
            if let Some(links) = &report.inputs {
                println!("input links:  {}", describe_links(links));
            }
        }
    }
}

fn lookup_link(links: &BTreeMap<u16, bool>, port: u16) -> String {
    links
        .get(&port)
        .map(|connected| link(*connected).to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn describe_links(links: &BTreeMap<u16, bool>) -> String {
    links
        .iter()
        .map(|(port, connected)| format!("{port}={}", link(*connected)))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn print_routes(device: &str, routes: &[Route], numeric: bool, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&RoutesOutput {
            device,
            applied: routes,
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["OUTPUT", "INPUT"]);
            for route in routes {
                table.add_row(vec![show_output(route, numeric), route.input.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for route in routes {
                println!("{} <- {}", show_output(route, numeric), route.input);
            }
        }
    }
}

pub fn print_beep(device: &str, beep: bool, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&BeepOutput { device, beep }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["DEVICE", "BEEP"]);
            table.add_row(vec![device.to_string(), on_off(beep).to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("beep: {}", on_off(beep)),
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
