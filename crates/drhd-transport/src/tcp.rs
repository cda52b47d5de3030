use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};

/// TCP service port of the matrix command protocol.
pub const TCP_PORT: u16 = 8000;

/// A connected command stream to a matrix device. Implements Read + Write.
pub struct DeviceStream {
    inner: TcpStream,
    peer: SocketAddr,
}

impl Read for DeviceStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for DeviceStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl DeviceStream {
    /// Connect to a device command port (blocking, no retry).
    pub fn connect(addr: SocketAddr) -> Result<Self> {
        let inner =
            TcpStream::connect(addr).map_err(|source| TransportError::Connect { addr, source })?;
        // Frames are 13 bytes; do not let Nagle hold a request back.
        inner.set_nodelay(true)?;
        debug!(%addr, "connected to device");
        Ok(Self { inner, peer: addr })
    }

    /// Connect with an upper bound on the TCP handshake duration.
    pub fn connect_timeout(addr: SocketAddr, timeout: Duration) -> Result<Self> {
        let inner = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|source| TransportError::Connect { addr, source })?;
        inner.set_nodelay(true)?;
        debug!(%addr, ?timeout, "connected to device");
        Ok(Self { inner, peer: addr })
    }

    /// Remote address of the device.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_write_timeout(timeout).map_err(Into::into)
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self.inner.try_clone()?;
        Ok(Self {
            inner: cloned,
            peer: self.peer,
        })
    }

    /// Shut down both directions of the connection.
    ///
    /// Any clone of this stream observes EOF afterwards. A peer that already
    /// went away is not an error.
    pub fn shutdown(&self) -> Result<()> {
        match self.inner.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl std::fmt::Debug for DeviceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStream")
            .field("peer", &self.peer)
            .finish()
    }
}
