//! Pluggable egress for the replayer.
//!
//! Five senders share one capability: UDP multicast for the normal
//! market-data path, TCP for point-to-point streaming, file for producing
//! captures, console and null for debugging. The hot path is one dynamic
//! call per message, which is noise next to the syscall behind it.

use std::fs::File;
use std::io::Write;
use std::net::{Ipv4Addr, SocketAddrV4, TcpListener, TcpStream, UdpSocket};
use std::path::Path;

use anyhow::{Context, Result};

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

#[cfg(unix)]
use super::SOCKET_BUFFER_SIZE;

/// Message egress used by the replayer.
pub trait Sender: Send {
    /// Send one message. `false` means the message did not go out; the
    /// replayer counts it as not-sent and keeps going.
    fn send(&mut self, message: &[u8]) -> bool;

    /// Flush any buffered output.
    fn flush(&mut self) {}

    /// Messages successfully sent so far.
    fn messages_sent(&self) -> usize;
}

/// Sends each message as one UDP datagram to a multicast group.
pub struct UdpMulticastSender {
    socket: UdpSocket,
    destination: SocketAddrV4,
    messages_sent: usize,
}

impl UdpMulticastSender {
    pub fn new(group: Ipv4Addr, port: u16, ttl: u32) -> Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .context("creating UDP multicast send socket")?;

        socket
            .set_multicast_ttl_v4(ttl)
            .context("setting multicast TTL")?;
        // Loopback on so same-host consumers (the usual test setup) see
        // the stream.
        if let Err(e) = socket.set_multicast_loop_v4(true) {
            tracing::warn!("failed to enable multicast loopback: {e}");
        }

        #[cfg(unix)]
        super::set_socket_buffer(socket.as_raw_fd(), libc::SO_SNDBUF, SOCKET_BUFFER_SIZE);

        let destination = SocketAddrV4::new(group, port);
        tracing::info!(%destination, ttl, "UDP multicast sender ready");

        Ok(Self {
            socket,
            destination,
            messages_sent: 0,
        })
    }
}

impl Sender for UdpMulticastSender {
    fn send(&mut self, message: &[u8]) -> bool {
        match self.socket.send_to(message, self.destination) {
            Ok(sent) if sent == message.len() => {
                self.messages_sent += 1;
                true
            }
            Ok(sent) => {
                tracing::warn!("partial UDP send: {sent}/{} bytes", message.len());
                false
            }
            Err(e) => {
                tracing::error!("UDP send failed: {e}");
                false
            }
        }
    }

    fn messages_sent(&self) -> usize {
        self.messages_sent
    }
}

/// Listens on a port, accepts exactly one client, and streams messages to
/// it. Construction blocks until the client connects.
pub struct TcpSender {
    stream: TcpStream,
    messages_sent: usize,
}

impl TcpSender {
    pub fn new(port: u16) -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .with_context(|| format!("binding TCP sender to port {port}"))?;

        tracing::info!(port, "TCP sender listening, waiting for one client");
        let (stream, peer) = listener.accept().context("accepting TCP client")?;
        tracing::info!(%peer, "TCP client connected");

        stream.set_nodelay(true).context("setting TCP_NODELAY")?;
        #[cfg(unix)]
        super::set_socket_buffer(stream.as_raw_fd(), libc::SO_SNDBUF, SOCKET_BUFFER_SIZE);

        Ok(Self {
            stream,
            messages_sent: 0,
        })
    }
}

impl Sender for TcpSender {
    fn send(&mut self, message: &[u8]) -> bool {
        match self.stream.write_all(message) {
            Ok(()) => {
                self.messages_sent += 1;
                true
            }
            Err(e) => {
                tracing::error!("TCP send failed: {e}");
                false
            }
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.stream.flush() {
            tracing::warn!("TCP flush failed: {e}");
        }
    }

    fn messages_sent(&self) -> usize {
        self.messages_sent
    }
}

/// Appends raw messages to a binary file.
pub struct FileSender {
    file: File,
    messages_sent: usize,
}

impl FileSender {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("opening output file {}", path.display()))?;
        tracing::info!(file = %path.display(), "file sender ready");
        Ok(Self {
            file,
            messages_sent: 0,
        })
    }
}

impl Sender for FileSender {
    fn send(&mut self, message: &[u8]) -> bool {
        match self.file.write_all(message) {
            Ok(()) => {
                self.messages_sent += 1;
                true
            }
            Err(e) => {
                tracing::error!("file write failed: {e}");
                false
            }
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.file.flush() {
            tracing::warn!("file flush failed: {e}");
        }
    }

    fn messages_sent(&self) -> usize {
        self.messages_sent
    }
}

/// Logs a line per message. Debugging aid.
#[derive(Default)]
pub struct ConsoleSender {
    messages_sent: usize,
}

impl ConsoleSender {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sender for ConsoleSender {
    fn send(&mut self, message: &[u8]) -> bool {
        tracing::info!(
            index = self.messages_sent,
            bytes = message.len(),
            tag = %message.first().map(|&t| t as char).unwrap_or('?'),
            "send"
        );
        self.messages_sent += 1;
        true
    }

    fn messages_sent(&self) -> usize {
        self.messages_sent
    }
}

/// Discards everything. Dry runs and throughput tests.
#[derive(Default)]
pub struct NullSender {
    messages_sent: usize,
}

impl NullSender {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sender for NullSender {
    fn send(&mut self, _message: &[u8]) -> bool {
        self.messages_sent += 1;
        true
    }

    fn messages_sent(&self) -> usize {
        self.messages_sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpStream;
    use std::thread;

    #[test]
    fn null_sender_counts() {
        let mut sender = NullSender::new();
        assert!(sender.send(b"abc"));
        assert!(sender.send(b"def"));
        assert_eq!(sender.messages_sent(), 2);
    }

    #[test]
    fn console_sender_counts() {
        let mut sender = ConsoleSender::new();
        assert!(sender.send(b"A123"));
        assert_eq!(sender.messages_sent(), 1);
    }

    #[test]
    fn file_sender_writes_raw_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut sender = FileSender::new(&path).unwrap();
        assert!(sender.send(b"hello "));
        assert!(sender.send(b"world"));
        sender.flush();

        assert_eq!(std::fs::read(&path).unwrap(), b"hello world");
        assert_eq!(sender.messages_sent(), 2);
    }

    #[test]
    fn tcp_sender_streams_to_one_client() {
        // Pick a free port by binding then immediately dropping.
        let probe = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let server = thread::spawn(move || {
            let mut sender = TcpSender::new(port).unwrap();
            assert!(sender.send(b"0123456789"));
            sender.flush();
            sender.messages_sent()
        });

        // Retry connect until the sender's listener is up.
        let mut client = loop {
            match TcpStream::connect(("127.0.0.1", port)) {
                Ok(s) => break s,
                Err(_) => thread::yield_now(),
            }
        };

        let mut buf = [0u8; 10];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"0123456789");
        assert_eq!(server.join().unwrap(), 1);
    }

    #[test]
    fn udp_multicast_sender_construction_and_send() {
        let mut sender = match UdpMulticastSender::new(Ipv4Addr::new(239, 255, 0, 1), 34567, 1) {
            Ok(s) => s,
            // Multicast may be unavailable in constrained environments.
            Err(_) => return,
        };
        // No receiver required for a datagram send to succeed.
        if sender.send(b"A123") {
            assert_eq!(sender.messages_sent(), 1);
        }
    }
}
