//! Remote Provisioning Extension (RPE).
//!
//! Broadcasts a single, hand-built DHCP ACK on the local network so that an
//! AMT device picks up a DNS suffix (option 15) without a DHCP server. The
//! crate provides:
//!
//! - A byte-exact DHCP packet model with fixed-offset field accessors
//! - The option set and reply assembly for the ACK
//! - Discovery of the wired interface address behind a swappable enumerator
//! - Blocking and Tokio-based UDP transports

pub mod config;
pub mod dhcp;
pub mod error;
pub mod ethernet;
pub mod locator;
pub mod options;
pub mod reply;
pub mod socket;

use std::net::{IpAddr, Ipv4Addr, SocketAddrV4};

use log::{debug, info, warn};

pub use config::{Config, Flags};
pub use dhcp::{DhcpOption, MessageType, OpCode, OptionCode, Packet};
pub use error::RpeError;
pub use locator::{NetworkEnumerator, SystemEnumerator};
pub use socket::{Transport, UdpConnection};

/// Core trait for packets that can be put on the wire.
pub trait PacketBuilder {
    /// Build the packet and return it as a vector of bytes.
    ///
    /// # Returns
    /// - `Ok(Vec<u8>)` - The serialized packet as a byte vector
    /// - `Err(RpeError)` - If the packet is malformed
    fn build(&self) -> Result<Vec<u8>, RpeError>;

    /// Get the total length of the packet in bytes.
    fn length(&self) -> usize;

    /// Validate the packet fields and structure.
    fn validate(&self) -> Result<(), RpeError>;
}

/// Builds the ACK advertising `config.dns_suffix`, sent by `server_ip`.
pub fn build_ack(config: &Config, server_ip: Ipv4Addr) -> Result<Packet, RpeError> {
    let options = options::dhcp_options(config)?;
    reply::create_reply_packet(
        config,
        MessageType::Ack,
        server_ip,
        IpAddr::V4(config.assigned_address),
        &options,
    )
}

/// Broadcasts one ACK from the wired interface of this host.
///
/// # Returns
/// * `Ok(usize)` - The number of bytes sent
/// * `Err(RpeError)` - If discovery, packet assembly or the write fails
pub fn send_ack(config: &Config) -> Result<usize, RpeError> {
    let mut udp = UdpConnection::new();
    udp.set_timeout(config.write_timeout)?;
    send_ack_with(config, &SystemEnumerator, &mut udp)
}

/// Broadcasts one ACK using the given interface source and transport.
///
/// The transport is closed once the write has been attempted, whether or not
/// it succeeded. A write error takes precedence over a close error.
pub fn send_ack_with<E, T>(config: &Config, enumerator: &E, transport: &mut T) -> Result<usize, RpeError>
where
    E: NetworkEnumerator + ?Sized,
    T: Transport,
{
    let server_ip = locator::current_ipv4_address(enumerator, &config.wired_interfaces)?;
    let broadcast = locator::broadcast_address_for(server_ip);
    let destination = SocketAddrV4::new(broadcast, config.destination_port);
    debug!("Local address {}, broadcasting to {}", server_ip, destination);

    transport.connect(destination)?;

    let written = build_ack(config, server_ip).and_then(|packet| transport.write(&packet));
    let closed = transport.close();
    if let Err(e) = &closed {
        warn!("Failed to close UDP connection: {}", e);
    }

    let n = written?;
    closed?;
    info!("Sent {} byte DHCP ACK to {}", n, destination);
    Ok(n)
}
