//! UDP multicast receiver for the market-data hot path.
//!
//! The receive path is a single recvfrom into the caller's buffer — no
//! allocation, no copy beyond the kernel's. Construction does the ugly
//! part: reuse options must be set before bind, which std's `UdpSocket`
//! cannot express, so the socket is created through libc and handed to std
//! afterwards.

use std::net::{Ipv4Addr, UdpSocket};
use std::time::Duration;

use anyhow::{Context, Result};

#[cfg(unix)]
use super::SOCKET_BUFFER_SIZE;

/// Receive timeout so recv loops can poll their stop flag.
pub const RECV_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Joined, bound UDP multicast receiver.
pub struct UdpMulticastReceiver {
    socket: UdpSocket,
    group: Ipv4Addr,
    port: u16,
}

impl UdpMulticastReceiver {
    /// Bind `ANY:port`, join `group` on the default interface, and set a
    /// 100 ms receive timeout.
    pub fn new(group: Ipv4Addr, port: u16) -> Result<Self> {
        let socket = Self::bind_reusable(port)
            .with_context(|| format!("binding multicast receiver to port {port}"))?;

        socket
            .join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)
            .with_context(|| format!("joining multicast group {group}"))?;

        socket
            .set_read_timeout(Some(RECV_POLL_INTERVAL))
            .context("setting receive timeout")?;

        tracing::info!(%group, port, "joined multicast group");

        Ok(Self {
            socket,
            group,
            port,
        })
    }

    /// Create the socket with SO_REUSEADDR (and SO_REUSEPORT where
    /// available) applied before bind, plus an enlarged receive buffer.
    #[cfg(unix)]
    fn bind_reusable(port: u16) -> Result<UdpSocket> {
        use std::os::unix::io::FromRawFd;

        let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, libc::IPPROTO_UDP) };
        if fd < 0 {
            return Err(std::io::Error::last_os_error()).context("creating UDP socket");
        }
        // From here the fd is owned by either the UdpSocket or the error
        // path's explicit close.
        let close_and_err = |fd: i32, what: &'static str| -> anyhow::Error {
            let err = std::io::Error::last_os_error();
            unsafe { libc::close(fd) };
            anyhow::Error::new(err).context(what)
        };

        let one: libc::c_int = 1;
        let rc = unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_REUSEADDR,
                &one as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            return Err(close_and_err(fd, "setting SO_REUSEADDR"));
        }

        // Helpful for multiple receivers on one host; absence is fine.
        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            let rc = unsafe {
                libc::setsockopt(
                    fd,
                    libc::SOL_SOCKET,
                    libc::SO_REUSEPORT,
                    &one as *const _ as *const libc::c_void,
                    std::mem::size_of::<libc::c_int>() as libc::socklen_t,
                )
            };
            if rc != 0 {
                tracing::warn!(
                    "failed to set SO_REUSEPORT (non-fatal): {}",
                    std::io::Error::last_os_error()
                );
            }
        }

        super::set_socket_buffer(fd, libc::SO_RCVBUF, SOCKET_BUFFER_SIZE);

        let addr = libc::sockaddr_in {
            #[cfg(any(target_os = "macos", target_os = "freebsd"))]
            sin_len: 0,
            sin_family: libc::AF_INET as libc::sa_family_t,
            sin_port: port.to_be(),
            sin_addr: libc::in_addr {
                s_addr: libc::INADDR_ANY.to_be(),
            },
            sin_zero: [0; 8],
        };
        let rc = unsafe {
            libc::bind(
                fd,
                &addr as *const libc::sockaddr_in as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            return Err(close_and_err(fd, "binding UDP socket"));
        }

        Ok(unsafe { UdpSocket::from_raw_fd(fd) })
    }

    #[cfg(not(unix))]
    fn bind_reusable(port: u16) -> Result<UdpSocket> {
        UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).context("binding UDP socket")
    }

    /// Receive one datagram into `buf`.
    ///
    /// Returns `Ok(0)` convention is not used here: a timeout surfaces as
    /// `ErrorKind::WouldBlock`/`TimedOut`, which receive loops treat as
    /// "check the stop flag and try again".
    #[inline]
    pub fn recv(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.socket.recv(buf)
    }

    pub fn group(&self) -> Ipv4Addr {
        self.group
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recv_times_out_rather_than_blocking_forever() {
        let receiver = match UdpMulticastReceiver::new(Ipv4Addr::new(239, 255, 0, 77), 38877) {
            Ok(r) => r,
            // Sandboxes without multicast support skip this test.
            Err(_) => return,
        };

        let mut buf = [0u8; 64];
        let start = std::time::Instant::now();
        let result = receiver.recv(&mut buf);
        assert!(result.is_err());
        // Must return around the 100 ms poll interval, not hang.
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn loopback_datagram_round_trip() {
        let group = Ipv4Addr::new(239, 255, 0, 78);
        let port = 38878;
        let receiver = match UdpMulticastReceiver::new(group, port) {
            Ok(r) => r,
            Err(_) => return,
        };

        let sender = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).unwrap();
        sender.set_multicast_loop_v4(true).unwrap();
        sender.send_to(b"ping", (group, port)).unwrap();

        let mut buf = [0u8; 16];
        match receiver.recv(&mut buf) {
            Ok(n) => assert_eq!(&buf[..n], b"ping"),
            // Loopback delivery can be unavailable in CI network setups.
            Err(_) => {}
        }
    }
}
