use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use drhd_driver::{ExplorerHandle, ExplorerState, NetworkExplorer};
use drhd_frame::{DiscoveryFrame, MacAddress};
use tracing::{debug, info, warn};

use crate::cmd::{NetArgs, ScanArgs};
use crate::exit::{driver_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_device, print_device_table, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub fn run(args: ScanArgs, format: OutputFormat) -> CliResult<i32> {
    let (tx, rx) = mpsc::channel();
    let config = args.net.explorer_config(args.num_req);
    let mut explorer = NetworkExplorer::with_config(config, move |frame| {
        let _ = tx.send(frame);
    });
    explorer
        .start()
        .map_err(|err| driver_error("discovery failed", err))?;
    stop_on_interrupt(explorer.handle());

    let mut seen = HashSet::new();
    let mut found = Vec::new();
    while let Some(frame) = next_reply(&explorer, &rx) {
        if !seen.insert(frame.identity()) {
            debug!(device = %frame, "duplicate reply");
            continue;
        }
        print_device(&frame, format);
        found.push(frame);
    }
    explorer.wait();

    info!(devices = found.len(), attempts = explorer.attempts(), "scan finished");
    if format == OutputFormat::Table {
        print_device_table(&found);
    }
    Ok(SUCCESS)
}

/// Run discovery until a device with `mac` replies and return its reply.
pub fn find_device(net: &NetArgs, mac: MacAddress, num_req: u32) -> CliResult<DiscoveryFrame> {
    let (tx, rx) = mpsc::channel();
    let mut explorer = NetworkExplorer::with_config(net.explorer_config(num_req), move |frame| {
        if frame.mac == mac {
            let _ = tx.send(frame);
        } else {
            debug!(device = %frame, "ignoring other device");
        }
    });
    explorer
        .start()
        .map_err(|err| driver_error("discovery failed", err))?;
    stop_on_interrupt(explorer.handle());

    let found = next_reply(&explorer, &rx);
    explorer.stop();
    explorer.wait();

    match found {
        Some(frame) => {
            info!(%mac, ip = %frame.device_ip, "device located");
            Ok(frame)
        }
        None => Err(CliError::new(
            FAILURE,
            format!("device {mac} not found after {} requests", explorer.attempts()),
        )),
    }
}

/// Next reply from the listener, or `None` once the explorer stopped and
/// every delivered reply was consumed.
fn next_reply(
    explorer: &NetworkExplorer,
    rx: &Receiver<DiscoveryFrame>,
) -> Option<DiscoveryFrame> {
    loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(frame) => return Some(frame),
            Err(RecvTimeoutError::Timeout) if explorer.state() == ExplorerState::Broadcasting => {}
            Err(RecvTimeoutError::Timeout) => return rx.try_recv().ok(),
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}

fn stop_on_interrupt(handle: ExplorerHandle) {
    if let Err(err) = ctrlc::set_handler(move || handle.stop()) {
        warn!(error = %err, "cannot install Ctrl-C handler");
    }
}
