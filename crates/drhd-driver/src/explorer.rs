use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use drhd_frame::{hexify, is_discovery_request, DiscoveryFrame, DISCOVERY_REQUEST};
use drhd_transport::{DiscoverySocket, UDP_PORT};
use tracing::{debug, error, info, trace, warn};

use crate::error::{DriverError, Result};

/// Default number of broadcast attempts before the explorer stops.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Default pause between broadcast attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

const RECV_BUFFER_SIZE: usize = 8192;

/// Discovery settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerConfig {
    /// Local address the discovery socket binds to.
    pub bind: SocketAddrV4,
    /// Destination of discovery requests.
    pub target: SocketAddrV4,
    /// Pause between broadcasts. Also the receive timeout.
    pub interval: Duration,
    /// Broadcasts sent before stopping. `0` broadcasts until stopped.
    pub retry_count: u32,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, UDP_PORT),
            target: SocketAddrV4::new(Ipv4Addr::BROADCAST, UDP_PORT),
            interval: DEFAULT_INTERVAL,
            retry_count: DEFAULT_RETRY_COUNT,
        }
    }
}

impl ExplorerConfig {
    /// Bind to `ip` on the discovery port, keeping every other default.
    pub fn bound_to(ip: Ipv4Addr) -> Self {
        Self {
            bind: SocketAddrV4::new(ip, UDP_PORT),
            ..Self::default()
        }
    }
}

/// Lifecycle of a [`NetworkExplorer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerState {
    Idle,
    Broadcasting,
    Stopped,
}

impl ExplorerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Broadcasting,
            2 => Self::Stopped,
            _ => Self::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Broadcasting => 1,
            Self::Stopped => 2,
        }
    }
}

impl fmt::Display for ExplorerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Broadcasting => "broadcasting",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

type Listener = Box<dyn FnMut(DiscoveryFrame) + Send + 'static>;

/// State shared by the explorer, its handles and both worker threads.
struct Shared {
    state: AtomicU8,
    stop: AtomicBool,
    paused: AtomicBool,
    attempts: AtomicU32,
    wake_lock: Mutex<()>,
    wake: Condvar,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(ExplorerState::Idle.as_u8()),
            stop: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            attempts: AtomicU32::new(0),
            wake_lock: Mutex::new(()),
            wake: Condvar::new(),
        }
    }

    fn state(&self) -> ExplorerState {
        ExplorerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: ExplorerState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn request_stop(&self) {
        {
            let _guard = lock(&self.wake_lock);
            self.stop.store(true, Ordering::SeqCst);
        }
        self.wake.notify_all();
        let _ = self.state.compare_exchange(
            ExplorerState::Broadcasting.as_u8(),
            ExplorerState::Stopped.as_u8(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Sleep for `duration` or until stop is requested.
    fn sleep(&self, duration: Duration) {
        let guard = lock(&self.wake_lock);
        let _ = self
            .wake
            .wait_timeout_while(guard, duration, |_| !self.stop.load(Ordering::SeqCst));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cloneable control surface for a running explorer.
///
/// Safe to use from the listener callback or from another thread.
#[derive(Clone)]
pub struct ExplorerHandle {
    shared: Arc<Shared>,
}

impl ExplorerHandle {
    /// Request both worker threads to finish.
    pub fn stop(&self) {
        self.shared.request_stop();
    }

    /// Suspend or resume broadcasting. Receiving continues while paused.
    pub fn pause(&self, paused: bool) {
        self.shared.paused.store(paused, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> ExplorerState {
        self.shared.state()
    }

    /// Broadcasts sent since the last start.
    pub fn attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ExplorerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplorerHandle")
            .field("state", &self.state())
            .field("paused", &self.is_paused())
            .field("attempts", &self.attempts())
            .finish()
    }
}

/// Finds devices by periodically broadcasting a discovery request and
/// passing every decoded reply to a listener.
///
/// A sender thread broadcasts every `interval` until `retry_count` attempts
/// were made. A receiver thread decodes replies and invokes the listener
/// once per reply. Dropping the explorer stops and joins both threads.
pub struct NetworkExplorer {
    config: ExplorerConfig,
    shared: Arc<Shared>,
    listener: Arc<Mutex<Listener>>,
    workers: Vec<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl NetworkExplorer {
    /// Create an idle explorer with default settings.
    pub fn new<F>(listener: F) -> Self
    where
        F: FnMut(DiscoveryFrame) + Send + 'static,
    {
        Self::with_config(ExplorerConfig::default(), listener)
    }

    /// Create an idle explorer with explicit settings.
    pub fn with_config<F>(config: ExplorerConfig, listener: F) -> Self
    where
        F: FnMut(DiscoveryFrame) + Send + 'static,
    {
        Self {
            config,
            shared: Arc::new(Shared::new()),
            listener: Arc::new(Mutex::new(Box::new(listener))),
            workers: Vec::new(),
            local_addr: None,
        }
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// Change the attempt limit for the next start. `0` means unlimited.
    pub fn set_retry_count(&mut self, retry_count: u32) {
        self.config.retry_count = retry_count;
    }

    /// Bind the discovery socket and spawn the sender and receiver threads.
    ///
    /// A stopped explorer can be started again; counters and flags are reset.
    pub fn start(&mut self) -> Result<()> {
        if self.shared.state() == ExplorerState::Broadcasting {
            return Err(DriverError::AlreadyRunning);
        }
        self.wait();

        self.shared.stop.store(false, Ordering::SeqCst);
        self.shared.paused.store(false, Ordering::SeqCst);
        self.shared.attempts.store(0, Ordering::SeqCst);

        let socket = Arc::new(DiscoverySocket::bind(
            self.config.bind,
            self.config.interval,
        )?);
        self.local_addr = Some(socket.local_addr());
        self.shared.set_state(ExplorerState::Broadcasting);

        info!(
            bind = %self.config.bind,
            target = %self.config.target,
            interval_ms = self.config.interval.as_millis() as u64,
            retry_count = self.config.retry_count,
            "explorer started"
        );

        let receiver = {
            let shared = Arc::clone(&self.shared);
            let socket = Arc::clone(&socket);
            let listener = Arc::clone(&self.listener);
            let interval = self.config.interval;
            thread::Builder::new()
                .name("drhd-explorer-recv".into())
                .spawn(move || receive_loop(&shared, &socket, &listener, interval))
        };
        match receiver {
            Ok(handle) => self.workers.push(handle),
            Err(err) => {
                self.abort_start();
                return Err(DriverError::Transport(err.into()));
            }
        }

        let sender = {
            let shared = Arc::clone(&self.shared);
            let config = self.config.clone();
            thread::Builder::new()
                .name("drhd-explorer-send".into())
                .spawn(move || send_loop(&shared, &socket, &config))
        };
        match sender {
            Ok(handle) => self.workers.push(handle),
            Err(err) => {
                self.abort_start();
                return Err(DriverError::Transport(err.into()));
            }
        }

        Ok(())
    }

    fn abort_start(&mut self) {
        self.shared.request_stop();
        self.wait();
    }

    /// Suspend or resume broadcasting. Receiving continues while paused.
    pub fn pause(&self, paused: bool) {
        self.handle().pause(paused);
    }

    /// Request both worker threads to finish. Idempotent.
    pub fn stop(&self) {
        self.shared.request_stop();
    }

    /// Join the worker threads.
    ///
    /// Returns once the explorer stopped on its own (attempt limit reached)
    /// or after [`stop`](Self::stop) was requested. The workers own the
    /// discovery socket, so it is closed when this returns.
    pub fn wait(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        for worker in self.workers.drain(..) {
            let name = worker.thread().name().unwrap_or("explorer").to_string();
            if worker.join().is_err() {
                error!(worker = %name, "explorer worker panicked");
            }
        }
        if let Some(local_addr) = self.local_addr {
            info!(%local_addr, "discovery socket closed");
        }
    }

    pub fn state(&self) -> ExplorerState {
        self.shared.state()
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::SeqCst)
    }

    /// Broadcasts sent since the last start.
    pub fn attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    /// Address of the discovery socket from the most recent start.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn handle(&self) -> ExplorerHandle {
        ExplorerHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl fmt::Debug for NetworkExplorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkExplorer")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("attempts", &self.attempts())
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

impl Drop for NetworkExplorer {
    fn drop(&mut self) {
        self.stop();
        self.wait();
    }
}

fn send_loop(shared: &Shared, socket: &DiscoverySocket, config: &ExplorerConfig) {
    debug!("sender started");
    let target = SocketAddr::V4(config.target);

    loop {
        if shared.stop_requested() {
            break;
        }

        if !shared.paused.load(Ordering::SeqCst) {
            let attempt = shared.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            info!(attempt, %target, "sending discovery request");
            trace!(data = %hexify(DISCOVERY_REQUEST), "SEND >>");
            if let Err(err) = socket.send_to(DISCOVERY_REQUEST, target) {
                warn!(attempt, %target, error = %err, "discovery request failed");
            }
        }

        shared.sleep(config.interval);

        if config.retry_count > 0 && shared.attempts.load(Ordering::SeqCst) >= config.retry_count
        {
            debug!(attempts = config.retry_count, "attempt limit reached");
            shared.request_stop();
        }
    }
    debug!("sender finished");
}

fn receive_loop(
    shared: &Shared,
    socket: &DiscoverySocket,
    listener: &Mutex<Listener>,
    interval: Duration,
) {
    debug!("receiver started");
    let mut buf = [0u8; RECV_BUFFER_SIZE];

    loop {
        if shared.stop_requested() {
            break;
        }

        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(Some(received)) => received,
            Ok(None) => continue,
            Err(err) => {
                if shared.stop_requested() {
                    continue;
                }
                error!(error = %err, "discovery receive failed");
                shared.sleep(interval);
                continue;
            }
        };

        let data = &buf[..len];
        trace!(%from, data = %hexify(data), "RECV <<");

        if is_discovery_request(data) {
            trace!(%from, "ignoring discovery request");
            continue;
        }

        let frame = match DiscoveryFrame::decode(data) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%from, len, error = %err, "ignoring undecodable discovery reply");
                continue;
            }
        };

        if shared.stop_requested() {
            continue;
        }

        if !frame.has_expected_tail() {
            debug!(%from, tail = frame.tail, "discovery reply with unexpected tail");
        }
        info!(%from, device = %frame, "device found");

        let mut guard = lock(listener);
        let callback = &mut *guard;
        callback(frame);
    }
    debug!("receiver finished");
}
