//! Assembly of the reply packet sent to the device.

use std::net::{IpAddr, Ipv4Addr};

use crate::RpeError;
use crate::config::Config;
use crate::dhcp::{DhcpOption, MessageType, OpCode, OptionCode, Packet, int_to_bytes};
use crate::ethernet::MacAddress;

/// Transaction ID stamped on every reply. No request is being answered, so
/// any value the device accepts will do.
pub const TRANSACTION_ID: u32 = 10392900;

/// Broadcast bit of the `flags` field.
pub const BROADCAST_FLAG: u32 = 32768;

/// Creates a BOOTREPLY of the given DHCP message type.
///
/// # Arguments
/// * `config` - Supplies the client hardware address
/// * `message_type` - Value of the DHCP message type option
/// * `server_id` - Our own address, sent as the server identifier
/// * `yiaddr` - Address handed to the client
/// * `options` - Extra options, appended in order after the server identifier
pub fn create_reply_packet(
    config: &Config,
    message_type: MessageType,
    server_id: Ipv4Addr,
    yiaddr: IpAddr,
    options: &[DhcpOption],
) -> Result<Packet, RpeError> {
    let mut packet = Packet::new(OpCode::BootReply);

    let xid = int_to_bytes(TRANSACTION_ID, 4)
        .ok_or_else(|| RpeError::InvalidFieldValue("invalid transaction Id".to_string()))?;
    packet.set_xid(&xid);

    let flags = int_to_bytes(BROADCAST_FLAG, 2)
        .ok_or_else(|| RpeError::InvalidFieldValue("invalid flags value".to_string()))?;
    packet.set_flags(&flags);

    packet.set_yiaddr(yiaddr);
    packet.set_giaddr(Ipv4Addr::UNSPECIFIED);

    let chaddr: MacAddress = config.client_mac.parse()?;
    packet.set_chaddr(chaddr.as_bytes());

    packet.add_option(OptionCode::MessageType, &[message_type as u8]);
    packet.add_option(OptionCode::ServerIdentifier, &server_id.octets());
    for opt in options {
        packet.add_option(opt.code, &opt.value);
    }

    packet.pad_to_min_size();
    Ok(packet)
}
