//! TCP client for order entry and execution reports.
//!
//! Thin wrapper over `TcpStream`: Nagle off by default, optional socket
//! buffer sizing, and `send`/`send_all`/`recv` that map one-to-one onto
//! the underlying syscalls.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use anyhow::{Context, Result};

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Connected TCP client.
///
/// One thread may write while another reads: TCP sockets are
/// independently read/write safe at the OS level, so the trading thread
/// sends orders on a clone of the stream while the exec-report thread
/// reads. Use [`TcpClient::try_clone`] to split.
pub struct TcpClient {
    stream: TcpStream,
}

impl TcpClient {
    /// Connect with TCP_NODELAY on and system-default buffer sizes.
    pub fn connect<A: ToSocketAddrs + std::fmt::Debug>(addr: A) -> Result<Self> {
        Self::connect_with(addr, true, None, None)
    }

    /// Connect with explicit options. `None` buffer sizes keep the system
    /// defaults.
    pub fn connect_with<A: ToSocketAddrs + std::fmt::Debug>(
        addr: A,
        nodelay: bool,
        send_buffer: Option<usize>,
        recv_buffer: Option<usize>,
    ) -> Result<Self> {
        let stream =
            TcpStream::connect(&addr).with_context(|| format!("connecting to {addr:?}"))?;

        if nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                tracing::warn!("failed to set TCP_NODELAY: {e}");
            }
        }

        #[cfg(unix)]
        {
            if let Some(bytes) = send_buffer {
                super::set_socket_buffer(stream.as_raw_fd(), libc::SO_SNDBUF, bytes);
            }
            if let Some(bytes) = recv_buffer {
                super::set_socket_buffer(stream.as_raw_fd(), libc::SO_RCVBUF, bytes);
            }
        }
        #[cfg(not(unix))]
        {
            let _ = (send_buffer, recv_buffer);
        }

        Ok(Self { stream })
    }

    /// Share the connection with another thread (reader/writer split).
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            stream: self.stream.try_clone().context("cloning TCP stream")?,
        })
    }

    /// Short read timeout so receive loops can poll a stop flag.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.stream
            .set_read_timeout(timeout)
            .context("setting read timeout")
    }

    /// One write syscall; may send fewer bytes than asked.
    #[inline]
    pub fn send(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.stream.write(data)
    }

    /// Write the whole buffer or fail.
    #[inline]
    pub fn send_all(&mut self, data: &[u8]) -> bool {
        match self.stream.write_all(data) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("TCP send_all failed: {e}");
                false
            }
        }
    }

    /// One read syscall. `Ok(0)` means the peer closed the connection.
    #[inline]
    pub fn recv(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf)
    }

    pub fn peer_addr(&self) -> Result<std::net::SocketAddr> {
        self.stream.peer_addr().context("getting peer address")
    }
}
