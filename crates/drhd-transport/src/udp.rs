use std::io::ErrorKind;
use std::net::{SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// UDP port used by devices for discovery requests and replies.
pub const UDP_PORT: u16 = 30600;

/// Broadcast-capable UDP socket used for device discovery.
///
/// All methods take `&self`, so one socket can be shared between a sending
/// thread and a receiving thread behind an `Arc`.
#[derive(Debug)]
pub struct DiscoverySocket {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

impl DiscoverySocket {
    /// Bind a broadcast-enabled socket.
    ///
    /// On Unix the socket sets `SO_REUSEPORT`, so several discovery clients
    /// on one host can share the discovery port. `recv_timeout` bounds every
    /// receive so callers can periodically check their own stop conditions.
    pub fn bind(addr: SocketAddrV4, recv_timeout: Duration) -> Result<Self> {
        let bind_addr = SocketAddr::V4(addr);
        let socket = bind_shared(addr).map_err(|source| TransportError::Bind {
            addr: bind_addr,
            source,
        })?;
        socket.set_broadcast(true)?;
        socket.set_read_timeout(Some(recv_timeout))?;
        let local_addr = socket.local_addr()?;

        info!(%local_addr, "discovery socket open");

        Ok(Self { socket, local_addr })
    }

    /// Send one datagram.
    pub fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<()> {
        let sent = self.socket.send_to(data, target)?;
        if sent != data.len() {
            return Err(TransportError::Io(std::io::Error::new(
                ErrorKind::WriteZero,
                format!("short datagram write ({sent} of {} bytes)", data.len()),
            )));
        }
        Ok(())
    }

    /// Wait for one datagram.
    ///
    /// Returns `Ok(None)` when the receive timeout elapses without traffic.
    pub fn recv_from(&self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>> {
        match self.socket.recv_from(buf) {
            Ok((n, from)) => {
                debug!(%from, len = n, "datagram received");
                Ok(Some((n, from)))
            }
            Err(err) if is_timeout(&err) => Ok(None),
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    /// Address this socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[cfg(unix)]
fn bind_shared(addr: SocketAddrV4) -> std::io::Result<UdpSocket> {
    use std::io::Error;
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

    #[cfg(any(target_os = "linux", target_os = "android"))]
    let kind = libc::SOCK_DGRAM | libc::SOCK_CLOEXEC;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    let kind = libc::SOCK_DGRAM;

    // SAFETY: plain socket(2) call; the descriptor is checked before use.
    let fd = unsafe { libc::socket(libc::AF_INET, kind, libc::IPPROTO_UDP) };
    if fd < 0 {
        return Err(Error::last_os_error());
    }
    // SAFETY: `fd` was just created and is owned by nothing else.
    let fd = unsafe { OwnedFd::from_raw_fd(fd) };

    let enable: libc::c_int = 1;
    // SAFETY: `enable` is a valid c_int for the given length and `fd` is an
    // open socket.
    let rc = unsafe {
        libc::setsockopt(
            fd.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_REUSEPORT,
            (&enable as *const libc::c_int).cast::<libc::c_void>(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(Error::last_os_error());
    }

    // SAFETY: all-zero is a valid `sockaddr_in`.
    let mut sin: libc::sockaddr_in = unsafe { std::mem::zeroed() };
    sin.sin_family = libc::AF_INET as libc::sa_family_t;
    sin.sin_port = addr.port().to_be();
    sin.sin_addr = libc::in_addr {
        s_addr: u32::from(*addr.ip()).to_be(),
    };
    #[cfg(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ))]
    {
        sin.sin_len = std::mem::size_of::<libc::sockaddr_in>() as u8;
    }

    // SAFETY: `sin` is a fully initialised IPv4 address of the given length.
    let rc = unsafe {
        libc::bind(
            fd.as_raw_fd(),
            (&sin as *const libc::sockaddr_in).cast::<libc::sockaddr>(),
            std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(Error::last_os_error());
    }

    Ok(UdpSocket::from(fd))
}

#[cfg(not(unix))]
fn bind_shared(addr: SocketAddrV4) -> std::io::Result<UdpSocket> {
    UdpSocket::bind(addr)
}

// Unix reports an elapsed SO_RCVTIMEO as WouldBlock, Windows as TimedOut.
fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn loopback() -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)
    }

    #[test]
    fn send_and_receive_datagram() {
        let a = DiscoverySocket::bind(loopback(), Duration::from_secs(2)).unwrap();
        let b = DiscoverySocket::bind(loopback(), Duration::from_secs(2)).unwrap();

        a.send_to(b"a", b.local_addr()).unwrap();

        let mut buf = [0u8; 16];
        let (n, from) = b.recv_from(&mut buf).unwrap().unwrap();
        assert_eq!(&buf[..n], b"a");
        assert_eq!(from, a.local_addr());
    }

    #[test]
    fn receive_timeout_is_not_an_error() {
        let socket = DiscoverySocket::bind(loopback(), Duration::from_millis(20)).unwrap();
        let mut buf = [0u8; 16];
        assert!(socket.recv_from(&mut buf).unwrap().is_none());
    }

    fn v4(addr: SocketAddr) -> SocketAddrV4 {
        match addr {
            SocketAddr::V4(addr) => addr,
            SocketAddr::V6(_) => unreachable!("bound to an IPv4 address"),
        }
    }

    #[test]
    fn bind_conflict_reports_address() {
        // A socket without SO_REUSEPORT holds the port exclusively.
        let first = UdpSocket::bind(loopback()).unwrap();
        let taken = v4(first.local_addr().unwrap());

        let err = DiscoverySocket::bind(taken, Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, TransportError::Bind { addr, .. } if addr == SocketAddr::V4(taken)));
    }

    #[cfg(unix)]
    #[test]
    fn discovery_sockets_share_a_port() {
        let first = DiscoverySocket::bind(loopback(), Duration::from_millis(20)).unwrap();
        let shared = v4(first.local_addr());

        let second = DiscoverySocket::bind(shared, Duration::from_millis(20)).unwrap();
        assert_eq!(second.local_addr(), first.local_addr());
    }
}
