use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use drhd_frame::{
    beeper, builder, group_name, CommandFrame, FrameConfig, FrameError, FrameReader, FrameWriter,
    PORT_CONNECTED,
};
use drhd_transport::{DeviceStream, TCP_PORT};
use tracing::{debug, info, warn};

use crate::error::{DriverError, Result};

/// Number of inputs and outputs assumed when the device model is unknown.
pub const DEFAULT_PORT_COUNT: u16 = 4;

/// Output port to input port routing, ordered by output.
pub type PortMapping = BTreeMap<u16, u16>;

/// Which side of the matrix a port is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    Input,
    Output,
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
}

struct Session {
    reader: FrameReader<DeviceStream>,
    writer: FrameWriter<DeviceStream>,
}

/// Command session with one HDMI matrix.
///
/// Every operation writes one command frame and blocks until the matching
/// reply frame arrives. Operations on a disconnected session fail with
/// [`DriverError::NotConnected`].
pub struct HdmiMatrix {
    endpoint: SocketAddr,
    num_inputs: u16,
    num_outputs: u16,
    timeout: Option<Duration>,
    session: Option<Session>,
}

impl HdmiMatrix {
    /// Session for a 4x4 device listening on the default command port.
    pub fn new(ip: IpAddr) -> Self {
        Self::with_endpoint(SocketAddr::new(ip, TCP_PORT))
    }

    /// Session for a 4x4 device at an explicit address.
    pub fn with_endpoint(endpoint: SocketAddr) -> Self {
        Self {
            endpoint,
            num_inputs: DEFAULT_PORT_COUNT,
            num_outputs: DEFAULT_PORT_COUNT,
            timeout: None,
            session: None,
        }
    }

    /// Override the port counts.
    pub fn with_ports(mut self, inputs: u16, outputs: u16) -> Self {
        self.num_inputs = inputs;
        self.num_outputs = outputs;
        self
    }

    /// Bound every connect, read and write by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    pub fn num_inputs(&self) -> u16 {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> u16 {
        self.num_outputs
    }

    pub fn state(&self) -> SessionState {
        if self.session.is_some() {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Open the TCP session. An existing session is closed first.
    pub fn connect(&mut self) -> Result<()> {
        if self.session.is_some() {
            debug!(endpoint = %self.endpoint, "replacing open session");
            self.disconnect()?;
        }

        let stream = match self.timeout {
            Some(timeout) => DeviceStream::connect_timeout(self.endpoint, timeout)?,
            None => DeviceStream::connect(self.endpoint)?,
        };
        let reader_stream = stream.try_clone()?;

        let config = FrameConfig {
            read_timeout: self.timeout,
            write_timeout: self.timeout,
        };
        let reader = FrameReader::with_config_stream(reader_stream, config.clone())?;
        let writer = FrameWriter::with_config_stream(stream, config)?;

        self.session = Some(Session { reader, writer });
        info!(endpoint = %self.endpoint, "connected");
        Ok(())
    }

    /// Close the TCP session.
    pub fn disconnect(&mut self) -> Result<()> {
        let session = self.session.take().ok_or(DriverError::NotConnected)?;
        session.writer.get_ref().shutdown()?;
        info!(endpoint = %self.endpoint, "disconnected");
        Ok(())
    }

    /// Send one frame and wait for its reply.
    ///
    /// A stream failure (timeout, reset, hangup) closes the session, so a
    /// late reply is never read as the answer to a later request; reconnect
    /// before retrying. A reply with a bad checksum leaves the session open.
    pub fn request(&mut self, frame: CommandFrame) -> Result<CommandFrame> {
        let session = self.session.as_mut().ok_or(DriverError::NotConnected)?;
        let exchange = session
            .writer
            .write_frame(&frame)
            .and_then(|()| session.reader.read_frame());

        match exchange {
            Ok(reply) => {
                debug!(
                    group = group_name(frame.cmd()),
                    request = %frame,
                    reply = %reply,
                    "exchange complete"
                );
                Ok(reply)
            }
            Err(err @ (FrameError::Io(_) | FrameError::ConnectionClosed)) => {
                warn!(
                    endpoint = %self.endpoint,
                    group = group_name(frame.cmd()),
                    error = %err,
                    "session lost, closing"
                );
                self.close_session();
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            let _ = session.writer.get_ref().shutdown();
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.session.is_some() {
            Ok(())
        } else {
            Err(DriverError::NotConnected)
        }
    }

    fn check_input(&self, port: u16) -> Result<()> {
        check_port(port, self.num_inputs)
    }

    fn check_output(&self, port: u16) -> Result<()> {
        check_port(port, self.num_outputs)
    }

    fn port_count(&self, kind: PortKind) -> u16 {
        match kind {
            PortKind::Input => self.num_inputs,
            PortKind::Output => self.num_outputs,
        }
    }

    /// Query every output, in ascending order.
    ///
    /// Each reply contributes one entry keyed by its first argument.
    pub fn get_port_mapping(&mut self) -> Result<PortMapping> {
        self.ensure_connected()?;
        let mut mapping = PortMapping::new();
        for out_port in 1..=self.num_outputs {
            let reply = self.request(builder::query_port(out_port))?;
            mapping.insert(reply.arg1(), reply.arg2());
        }
        debug!(?mapping, "port mapping");
        Ok(mapping)
    }

    /// Query the routing of one output and return the reply's first argument.
    pub fn get_source_for(&mut self, out_port: u16) -> Result<u16> {
        self.ensure_connected()?;
        self.check_output(out_port)?;
        let reply = self.request(builder::query_port(out_port))?;
        Ok(reply.arg1())
    }

    /// Route `in_port` to `out_port`.
    ///
    /// Fails with [`DriverError::Protocol`] when the device echoes a
    /// different output.
    pub fn map_port(&mut self, in_port: u16, out_port: u16) -> Result<()> {
        self.ensure_connected()?;
        self.check_input(in_port)?;
        self.check_output(out_port)?;

        let reply = self.request(builder::map_port(in_port, out_port))?;
        if reply.arg2() != out_port {
            warn!(in_port, out_port, echoed = reply.arg2(), "mapping not acknowledged");
            return Err(DriverError::Protocol {
                expected: out_port,
                actual: reply.arg2(),
            });
        }
        info!(in_port, out_port, "port mapped");
        Ok(())
    }

    /// Route `in_port` to every output, in ascending order. Stops at the
    /// first failure.
    pub fn map_all(&mut self, in_port: u16) -> Result<()> {
        self.ensure_connected()?;
        self.check_input(in_port)?;
        for out_port in 1..=self.num_outputs {
            self.map_port(in_port, out_port)?;
        }
        Ok(())
    }

    /// Set the EDID of one input, or every input with port `0`.
    pub fn set_edid(&mut self, in_port: u16, value: u16) -> Result<()> {
        self.ensure_connected()?;
        if in_port != builder::ALL_PORTS {
            self.check_input(in_port)?;
        }
        self.request(builder::set_edid(in_port, value))?;
        info!(in_port, value, "edid set");
        Ok(())
    }

    /// Copy the EDID read from `out_port` to one input, or every input
    /// with port `0`.
    pub fn copy_edid(&mut self, out_port: u16, in_port: u16) -> Result<()> {
        self.ensure_connected()?;
        self.check_output(out_port)?;
        if in_port != builder::ALL_PORTS {
            self.check_input(in_port)?;
        }
        self.request(builder::copy_edid(out_port, in_port))?;
        info!(out_port, in_port, "edid copied");
        Ok(())
    }

    pub fn set_beep(&mut self, on: bool) -> Result<()> {
        self.ensure_connected()?;
        self.request(builder::set_beep(on))?;
        info!(on, "beeper set");
        Ok(())
    }

    pub fn get_beep(&mut self) -> Result<bool> {
        self.ensure_connected()?;
        let reply = self.request(builder::query_beep())?;
        Ok(reply.arg1() == beeper::ON)
    }

    /// Whether something is attached to one port.
    pub fn get_port_status(&mut self, port: u16, kind: PortKind) -> Result<bool> {
        self.ensure_connected()?;
        check_port(port, self.port_count(kind))?;
        let frame = match kind {
            PortKind::Input => builder::input_status(port),
            PortKind::Output => builder::output_status(port),
        };
        let reply = self.request(frame)?;
        Ok(reply.arg2() == PORT_CONNECTED)
    }

    pub fn get_input_status(&mut self, in_port: u16) -> Result<bool> {
        self.get_port_status(in_port, PortKind::Input)
    }

    pub fn get_output_status(&mut self, out_port: u16) -> Result<bool> {
        self.get_port_status(out_port, PortKind::Output)
    }

    /// Connection state of every port of one kind, in ascending order.
    pub fn get_ports_status(&mut self, kind: PortKind) -> Result<BTreeMap<u16, bool>> {
        self.ensure_connected()?;
        let mut status = BTreeMap::new();
        for port in 1..=self.port_count(kind) {
            status.insert(port, self.get_port_status(port, kind)?);
        }
        Ok(status)
    }

    pub fn get_inputs_status(&mut self) -> Result<BTreeMap<u16, bool>> {
        self.get_ports_status(PortKind::Input)
    }

    pub fn get_outputs_status(&mut self) -> Result<BTreeMap<u16, bool>> {
        self.get_ports_status(PortKind::Output)
    }
}

fn check_port(port: u16, max: u16) -> Result<()> {
    if port == 0 || port > max {
        return Err(DriverError::InvalidPort { port, max });
    }
    Ok(())
}

impl fmt::Debug for HdmiMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HdmiMatrix")
            .field("endpoint", &self.endpoint)
            .field("num_inputs", &self.num_inputs)
            .field("num_outputs", &self.num_outputs)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for HdmiMatrix {
    fn drop(&mut self) {
        self.close_session();
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::{Ipv4Addr, TcpListener};
    use std::sync::{Arc, Mutex};
    use std::thread::{self, JoinHandle};

    use drhd_frame::{action, group, FrameError};

    use super::*;

    /// A simulated matrix: records every request and writes back whatever
    /// bytes `respond` returns for it.
    struct Device {
        addr: SocketAddr,
        requests: Arc<Mutex<Vec<CommandFrame>>>,
        thread: JoinHandle<()>,
    }

    impl Device {
        fn spawn<F>(mut respond: F) -> Self
        where
            F: FnMut(&CommandFrame) -> Vec<u8> + Send + 'static,
        {
            let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
            let addr = listener.local_addr().unwrap();
            let requests = Arc::new(Mutex::new(Vec::new()));
            let seen = Arc::clone(&requests);

            let thread = thread::spawn(move || {
                let (stream, _) = listener.accept().unwrap();
                let mut writer = stream.try_clone().unwrap();
                let mut reader = FrameReader::new(stream);
                loop {
                    let frame = match reader.read_frame() {
                        Ok(frame) => frame,
                        Err(_) => break,
                    };
                    seen.lock().unwrap().push(frame);
                    let bytes = respond(&frame);
                    if !bytes.is_empty() && writer.write_all(&bytes).is_err() {
                        break;
                    }
                }
            });

            Self {
                addr,
                requests,
                thread,
            }
        }

        /// A well-behaved 4x4 device with every output routed to input 1.
        fn echoing() -> Self {
            Self::spawn(|frame| reply_to(frame).encode().to_vec())
        }

        fn matrix(&self) -> HdmiMatrix {
            let mut matrix =
                HdmiMatrix::with_endpoint(self.addr).with_timeout(Duration::from_secs(5));
            matrix.connect().unwrap();
            matrix
        }

        fn finish(self) -> Vec<CommandFrame> {
            self.thread.join().unwrap();
            Arc::try_unwrap(self.requests)
                .unwrap()
                .into_inner()
                .unwrap()
        }
    }

    fn reply_to(frame: &CommandFrame) -> CommandFrame {
        match (frame.cmd(), frame.action()) {
            (group::PORT, action::port::QUERY) => {
                CommandFrame::new(group::PORT, action::port::QUERY, frame.arg1(), 1)
            }
            (group::STATUS, action::status::BEEPER) => {
                CommandFrame::new(group::STATUS, action::status::BEEPER, beeper::ON, 0)
            }
            // Odd ports report "connected", even ports "disconnected".
            (group::STATUS, act) => {
                CommandFrame::new(group::STATUS, act, frame.arg1(), frame.arg1() % 2 ^ 1)
            }
            _ => *frame,
        }
    }

    #[test]
    fn operations_require_connection() {
        let mut matrix = HdmiMatrix::new(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(matrix.state(), SessionState::Disconnected);
        assert_eq!(matrix.endpoint().port(), 8000);

        assert!(matches!(matrix.get_port_mapping(), Err(DriverError::NotConnected)));
        assert!(matches!(matrix.get_source_for(1), Err(DriverError::NotConnected)));
        assert!(matches!(matrix.map_port(1, 1), Err(DriverError::NotConnected)));
        assert!(matches!(matrix.map_all(1), Err(DriverError::NotConnected)));
        assert!(matches!(matrix.set_beep(true), Err(DriverError::NotConnected)));
        assert!(matches!(matrix.get_beep(), Err(DriverError::NotConnected)));
        assert!(matches!(matrix.set_edid(0, 1), Err(DriverError::NotConnected)));
        assert!(matches!(
            matrix.get_port_status(9, PortKind::Input),
            Err(DriverError::NotConnected)
        ));
        assert!(matches!(matrix.disconnect(), Err(DriverError::NotConnected)));
    }

    #[test]
    fn connect_and_disconnect() {
        let device = Device::echoing();
        let mut matrix = device.matrix();
        assert!(matrix.is_connected());

        matrix.disconnect().unwrap();
        assert_eq!(matrix.state(), SessionState::Disconnected);
        assert!(matches!(matrix.disconnect(), Err(DriverError::NotConnected)));
        assert!(device.finish().is_empty());
    }

    #[test]
    fn connect_refused_is_transport_error() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut matrix = HdmiMatrix::with_endpoint(addr);
        assert!(matches!(matrix.connect(), Err(DriverError::Transport(_))));
        assert!(!matrix.is_connected());
    }

    #[test]
    fn port_mapping_queries_every_output_in_order() {
        let device = Device::echoing();
        let mut matrix = device.matrix();

        let mapping = matrix.get_port_mapping().unwrap();
        assert_eq!(mapping.len(), 4);
        assert_eq!(
            mapping.into_iter().collect::<Vec<_>>(),
            vec![(1, 1), (2, 1), (3, 1), (4, 1)]
        );

        drop(matrix);
        let requests = device.finish();
        let queried: Vec<u16> = requests.iter().map(|f| f.arg1()).collect();
        assert_eq!(queried, vec![1, 2, 3, 4]);
        assert!(requests
            .iter()
            .all(|f| f.cmd() == group::PORT && f.action() == action::port::QUERY));
    }

    #[test]
    fn source_for_returns_first_reply_argument() {
        let device = Device::spawn(|frame| {
            CommandFrame::new(frame.cmd(), frame.action(), 3, frame.arg1())
                .encode()
                .to_vec()
        });
        let mut matrix = device.matrix();
        assert_eq!(matrix.get_source_for(2).unwrap(), 3);
    }

    #[test]
    fn map_port_accepts_echo() {
        let device = Device::echoing();
        let mut matrix = device.matrix();
        matrix.map_port(2, 3).unwrap();

        drop(matrix);
        assert_eq!(device.finish(), vec![builder::map_port(2, 3)]);
    }

    #[test]
    fn map_port_rejects_wrong_echo() {
        let device = Device::spawn(|frame| {
            CommandFrame::new(frame.cmd(), frame.action(), frame.arg1(), 2)
                .encode()
                .to_vec()
        });
        let mut matrix = device.matrix();

        let err = matrix.map_port(1, 3).unwrap_err();
        assert!(matches!(
            err,
            DriverError::Protocol {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn map_all_stops_at_first_mismatch() {
        let device = Device::spawn(|frame| {
            let echoed = if frame.arg2() == 3 { 9 } else { frame.arg2() };
            CommandFrame::new(frame.cmd(), frame.action(), frame.arg1(), echoed)
                .encode()
                .to_vec()
        });
        let mut matrix = device.matrix();

        let err = matrix.map_all(4).unwrap_err();
        assert!(matches!(err, DriverError::Protocol { expected: 3, .. }));

        drop(matrix);
        let outputs: Vec<u16> = device.finish().iter().map(|f| f.arg2()).collect();
        assert_eq!(outputs, vec![1, 2, 3]);
    }

    #[test]
    fn port_numbers_are_validated() {
        let device = Device::echoing();
        let mut matrix = device.matrix();

        assert!(matches!(
            matrix.map_port(5, 1),
            Err(DriverError::InvalidPort { port: 5, max: 4 })
        ));
        assert!(matches!(
            matrix.get_source_for(0),
            Err(DriverError::InvalidPort { port: 0, .. })
        ));
        assert!(matches!(
            matrix.copy_edid(1, 7),
            Err(DriverError::InvalidPort { port: 7, .. })
        ));
        matrix.set_edid(0, 2).unwrap();
        matrix.copy_edid(1, 0).unwrap();

        drop(matrix);
        let requests = device.finish();
        assert_eq!(requests, vec![builder::set_edid(0, 2), builder::copy_edid(1, 0)]);
    }

    #[test]
    fn custom_port_counts() {
        let device = Device::echoing();
        let mut matrix = device.matrix().with_ports(2, 8);
        assert_eq!(matrix.get_port_mapping().unwrap().len(), 8);
        assert!(matches!(
            matrix.map_port(3, 1),
            Err(DriverError::InvalidPort { port: 3, max: 2 })
        ));
    }

    #[test]
    fn beeper_state() {
        let device = Device::echoing();
        let mut matrix = device.matrix();
        matrix.set_beep(false).unwrap();
        assert!(matrix.get_beep().unwrap());

        drop(matrix);
        assert_eq!(
            device.finish(),
            vec![builder::set_beep(false), builder::query_beep()]
        );
    }

    #[test]
    fn edid_requests_use_all_ports_actions() {
        let device = Device::echoing();
        let mut matrix = device.matrix();
        matrix.set_edid(2, 7).unwrap();
        matrix.set_edid(0, 7).unwrap();
        matrix.copy_edid(3, 1).unwrap();
        matrix.copy_edid(3, 0).unwrap();

        drop(matrix);
        let actions: Vec<(u8, u8)> = device
            .finish()
            .iter()
            .map(|frame| (frame.cmd(), frame.action()))
            .collect();
        assert_eq!(
            actions,
            vec![
                (group::EDID, action::edid::SET),
                (group::EDID, action::edid::SET_ALL),
                (group::EDID, action::edid::COPY),
                (group::EDID, action::edid::COPY_ALL),
            ]
        );
    }

    #[test]
    fn port_status_reads_second_argument() {
        let device = Device::echoing();
        let mut matrix = device.matrix();

        assert!(matrix.get_input_status(1).unwrap());
        assert!(!matrix.get_output_status(2).unwrap());

        let inputs = matrix.get_inputs_status().unwrap();
        assert_eq!(
            inputs.into_iter().collect::<Vec<_>>(),
            vec![(1, true), (2, false), (3, true), (4, false)]
        );
    }

    #[test]
    fn replies_split_across_writes() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        let device = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            let mut reader = FrameReader::new(stream);
            let request = reader.read_frame().unwrap();
            for byte in reply_to(&request).encode().iter() {
                writer.write_all(&[*byte]).unwrap();
                writer.flush().unwrap();
            }
        });

        let mut matrix = HdmiMatrix::with_endpoint(addr);
        matrix.connect().unwrap();
        assert_eq!(matrix.get_source_for(2).unwrap(), 2);
        device.join().unwrap();
    }

    #[test]
    fn coalesced_replies_are_kept_for_next_request() {
        let mut first = true;
        let device = Device::spawn(move |frame| {
            if !first {
                return Vec::new();
            }
            first = false;
            let mut both = reply_to(frame).encode().to_vec();
            let second = CommandFrame::new(group::PORT, action::port::QUERY, 2, 4);
            both.extend_from_slice(&second.encode());
            both
        });
        let mut matrix = device.matrix().with_ports(4, 2);

        let mapping = matrix.get_port_mapping().unwrap();
        assert_eq!(mapping.get(&1), Some(&1));
        assert_eq!(mapping.get(&2), Some(&4));
    }

    #[test]
    fn corrupt_reply_is_frame_error() {
        let device = Device::spawn(|frame| {
            let mut bytes = reply_to(frame).encode().to_vec();
            bytes[12] ^= 0x55;
            bytes
        });
        let mut matrix = device.matrix();
        let err = matrix.get_beep().unwrap_err();
        assert!(matches!(err, DriverError::Frame(FrameError::Checksum { .. })));
        // The bad frame was consumed whole; the stream is still in step.
        assert!(matrix.is_connected());
    }

    #[test]
    fn device_hangup_closes_session() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        let device = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            drop(stream);
        });

        let mut matrix = HdmiMatrix::with_endpoint(addr).with_timeout(Duration::from_secs(5));
        matrix.connect().unwrap();
        device.join().unwrap();

        let err = matrix.get_beep().unwrap_err();
        assert!(matches!(err, DriverError::Frame(_)));
        assert_eq!(matrix.state(), SessionState::Disconnected);
        assert!(matches!(matrix.disconnect(), Err(DriverError::NotConnected)));
    }

    #[test]
    fn timed_out_reply_is_not_paired_with_next_request() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        // Answers query_port(n) with n * 10; the very first reply is late.
        let device = thread::spawn(move || {
            let mut delay = Some(Duration::from_millis(300));
            for _ in 0..2 {
                let (stream, _) = listener.accept().unwrap();
                let mut writer = FrameWriter::new(stream.try_clone().unwrap());
                let mut reader = FrameReader::new(stream);
                while let Ok(request) = reader.read_frame() {
                    if let Some(delay) = delay.take() {
                        thread::sleep(delay);
                    }
                    let reply = CommandFrame::new(
                        group::PORT,
                        action::port::QUERY,
                        request.arg1() * 10,
                        request.arg1(),
                    );
                    if writer.write_frame(&reply).is_err() {
                        break;
                    }
                }
            }
        });

        let mut matrix =
            HdmiMatrix::with_endpoint(addr).with_timeout(Duration::from_millis(100));
        matrix.connect().unwrap();

        let err = matrix.get_source_for(1).unwrap_err();
        assert!(matches!(err, DriverError::Frame(FrameError::Io(_))));
        assert_eq!(matrix.state(), SessionState::Disconnected);
        assert!(matches!(
            matrix.get_source_for(2),
            Err(DriverError::NotConnected)
        ));

        matrix.connect().unwrap();
        assert_eq!(matrix.get_source_for(2).unwrap(), 20);
        matrix.disconnect().unwrap();
        device.join().unwrap();
    }
}
