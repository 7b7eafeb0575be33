//! Sockets and egress.
//!
//! Construction failures are fatal (returned as errors); steady-state
//! send/recv failures are logged and reported through return values so the
//! caller decides whether to keep going. Buffer-size and reuse options are
//! best-effort: a refusal is logged once and never fatal.

mod sender;
mod tcp;
mod udp;

pub use sender::{ConsoleSender, FileSender, NullSender, Sender, TcpSender, UdpMulticastSender};
pub use tcp::TcpClient;
pub use udp::UdpMulticastReceiver;

/// Socket buffer size used for market-data and order-entry sockets.
pub(crate) const SOCKET_BUFFER_SIZE: usize = 2 * 1024 * 1024;

/// Best-effort setsockopt for an integer option; logs on refusal.
#[cfg(unix)]
pub(crate) fn set_socket_buffer(fd: std::os::unix::io::RawFd, opt: libc::c_int, bytes: usize) {
    let value = bytes as libc::c_int;
    let rc = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            opt,
            &value as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        tracing::warn!(
            "failed to set socket buffer to {} bytes: {}",
            bytes,
            std::io::Error::last_os_error()
        );
    }
}
