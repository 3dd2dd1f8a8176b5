//! UDP transport for the finished packet.
//!
//! Both connections are datagram sockets with `SO_BROADCAST` enabled, bound to
//! an ephemeral port. "Connecting" only records the default destination; no
//! handshake takes place and nothing is ever read back.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use log::debug;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use crate::PacketBuilder;
use crate::error::RpeError;

/// Something a packet can be written to.
pub trait Transport {
    /// Sets the default destination of subsequent writes.
    fn connect(&mut self, dst_addr: SocketAddrV4) -> Result<(), RpeError>;

    /// Writes one packet as a single datagram.
    ///
    /// # Returns
    /// * `Ok(usize)` - The number of bytes sent
    /// * `Err(RpeError)` - If the packet is invalid or sending fails
    fn write<P: PacketBuilder>(&mut self, packet: &P) -> Result<usize, RpeError>;

    /// Releases the underlying socket. Fails if nothing is connected.
    fn close(&mut self) -> Result<(), RpeError>;
}

/// Creates a UDP socket ready to send broadcasts from an ephemeral port.
fn broadcast_socket() -> io::Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_broadcast(true)?;
    let any = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0));
    socket.bind(&SockAddr::from(any))?;
    Ok(socket)
}

/// A blocking UDP connection.
#[derive(Debug, Default)]
pub struct UdpConnection {
    socket: Option<Socket>,
    write_timeout: Option<Duration>,
}

impl UdpConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout applied to writes, or `None` to block indefinitely.
    ///
    /// Takes effect on the current socket and on any later `connect`.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), RpeError> {
        self.write_timeout = timeout;
        if let Some(socket) = &self.socket {
            socket.set_write_timeout(timeout)?;
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    /// The local address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, RpeError> {
        let socket = self.socket.as_ref().ok_or(RpeError::NotConnected)?;
        socket.local_addr()?.as_socket().ok_or_else(|| {
            RpeError::IoError(io::Error::new(
                io::ErrorKind::InvalidData,
                "Socket is not bound to an IP address",
            ))
        })
    }
}

impl Transport for UdpConnection {
    fn connect(&mut self, dst_addr: SocketAddrV4) -> Result<(), RpeError> {
        let socket = broadcast_socket()?;
        socket.set_write_timeout(self.write_timeout)?;
        socket.connect(&SockAddr::from(SocketAddr::V4(dst_addr)))?;
        debug!("UDP socket connected to {}", dst_addr);
        self.socket = Some(socket);
        Ok(())
    }

    fn write<P: PacketBuilder>(&mut self, packet: &P) -> Result<usize, RpeError> {
        let socket = self.socket.as_ref().ok_or(RpeError::NotConnected)?;
        let bytes = packet.build()?;
        let n = socket.send(&bytes)?;
        debug!("Wrote {} of {} bytes", n, bytes.len());
        Ok(n)
    }

    fn close(&mut self) -> Result<(), RpeError> {
        // Dropping the socket closes the descriptor.
        self.socket.take().map(drop).ok_or(RpeError::NotConnected)
    }
}

/// An asynchronous UDP connection using the Tokio runtime.
#[derive(Debug, Default)]
pub struct AsyncUdpConnection {
    socket: Option<tokio::net::UdpSocket>,
}

impl AsyncUdpConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default destination of subsequent writes.
    pub async fn connect(&mut self, dst_addr: SocketAddrV4) -> Result<(), RpeError> {
        let std_socket = broadcast_socket()?;
        std_socket.set_nonblocking(true)?;

        let socket = tokio::net::UdpSocket::from_std(std_socket.into())?;
        socket.connect(SocketAddr::V4(dst_addr)).await?;
        debug!("UDP socket connected to {}", dst_addr);
        self.socket = Some(socket);
        Ok(())
    }

    /// Writes one packet as a single datagram.
    pub async fn write<P: PacketBuilder>(&self, packet: &P) -> Result<usize, RpeError> {
        let socket = self.socket.as_ref().ok_or(RpeError::NotConnected)?;
        let bytes = packet.build()?;
        Ok(socket.send(&bytes).await?)
    }

    /// Writes one packet, giving up after `timeout`.
    pub async fn write_timeout<P: PacketBuilder>(
        &self,
        packet: &P,
        timeout: Duration,
    ) -> Result<usize, RpeError> {
        tokio::time::timeout(timeout, self.write(packet))
            .await
            .map_err(|_| RpeError::IoError(io::Error::new(io::ErrorKind::TimedOut, "UDP write timed out")))?
    }

    pub fn close(&mut self) -> Result<(), RpeError> {
        self.socket.take().map(drop).ok_or(RpeError::NotConnected)
    }
}
