//! DHCP (Dynamic Host Configuration Protocol) packet model.
//!
//! A [`Packet`] is an owned byte buffer laid out exactly as it goes on the
//! wire: a fixed 240-byte BOOTP header including the magic cookie, followed by
//! a variable-length options region closed by the `End` option. Fields are read
//! and written in place at their fixed offsets.

use std::net::{IpAddr, Ipv4Addr};
use std::ops::Range;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::ethernet::HARDWARE_TYPE_ETHERNET;
use crate::{PacketBuilder, RpeError};

/// DHCP "magic cookie" identifying the options region.
pub const MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];

/// Length of a freshly created packet: the fixed header plus the lone terminator.
pub const HEADER_LENGTH: usize = 241;

/// Smallest packet some DHCP clients will accept.
pub const MIN_PACKET_SIZE: usize = 272;

/// Capacity of the `chaddr` field.
pub const MAX_HARDWARE_LENGTH: usize = 16;

const OP: usize = 0;
const HTYPE: usize = 1;
const HLEN: usize = 2;
const HOPS: usize = 3;
const XID: Range<usize> = 4..8;
const SECS: Range<usize> = 8..10;
const FLAGS: Range<usize> = 10..12;
const CIADDR: Range<usize> = 12..16;
const YIADDR: Range<usize> = 16..20;
const SIADDR: Range<usize> = 20..24;
const GIADDR: Range<usize> = 24..28;
const CHADDR: Range<usize> = 28..44;
const SNAME: Range<usize> = 44..108;
const FILE: Range<usize> = 108..236;
const COOKIE: Range<usize> = 236..240;
const OPTIONS_START: usize = 240;

/// BOOTP operation codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    BootRequest = 1,
    BootReply = 2,
}

/// DHCP message types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// DHCP Discover message
    Discover = 1,
    /// DHCP Offer message
    Offer = 2,
    /// DHCP Request message
    Request = 3,
    /// DHCP Decline message
    Decline = 4,
    /// DHCP Acknowledge message
    Ack = 5,
    /// DHCP Not Acknowledge message
    Nak = 6,
    /// DHCP Release message
    Release = 7,
    /// DHCP Inform message
    Inform = 8,
}

/// DHCP option codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[repr(u8)]
pub enum OptionCode {
    /// Subnet Mask
    SubnetMask = 1,
    /// Time Offset
    TimeOffset = 2,
    /// Name Server Option
    NameServer = 5,
    /// Domain Name Server Option
    DomainNameServer = 6,
    /// Host Name Option
    HostName = 12,
    /// Domain Name
    DomainName = 15,
    /// Default IP Time-to-live
    DefaultTtl = 23,
    /// Requested IP Address
    RequestedIpAddress = 50,
    /// IP Address Lease Time
    IpAddressLeaseTime = 51,
    /// Message Type
    MessageType = 53,
    /// Server Identifier
    ServerIdentifier = 54,
    /// Parameter Request List
    ParameterRequestList = 55,
    /// Renewal Time Value
    RenewalTimeValue = 58,
    /// Rebinding Time Value
    RebindingTimeValue = 59,
    /// Client Identifier
    ClientIdentifier = 61,
    /// End Option
    End = 255,
}

/// DHCP option structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DhcpOption {
    pub code: OptionCode,
    #[serde(with = "serde_bytes")]
    pub value: Vec<u8>,
}

impl DhcpOption {
    /// Creates a new DHCP option.
    pub fn new(code: OptionCode, value: Vec<u8>) -> Self {
        Self { code, value }
    }
}

/// Encodes `num` as a little-endian integer of `width` bytes.
///
/// Only 2- and 4-byte widths are supported; anything else yields `None`.
/// Values wider than the requested width are truncated to their low bytes.
pub fn int_to_bytes(num: u32, width: usize) -> Option<Vec<u8>> {
    match width {
        2 => Some((num as u16).to_le_bytes().to_vec()),
        4 => Some(num.to_le_bytes().to_vec()),
        _ => {
            warn!("int_to_bytes: invalid byte count request: {}", width);
            None
        }
    }
}

/// Reduces any IP address to the four bytes a DHCP address field holds.
///
/// IPv6 addresses keep their last four bytes, which is where an IPv4-mapped
/// address carries its IPv4 part.
fn ipv4_octets(addr: IpAddr) -> [u8; 4] {
    match addr {
        IpAddr::V4(v4) => v4.octets(),
        IpAddr::V6(v6) => {
            let o = v6.octets();
            [o[12], o[13], o[14], o[15]]
        }
    }
}

/// A DHCP message under construction.
///
/// Only [`Packet::new`] and the checked [`TryFrom<Vec<u8>>`] create one, so
/// the fixed header is always present.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Packet {
    #[serde(with = "serde_bytes")]
    bytes: Vec<u8>,
}

impl Packet {
    /// Creates an empty packet: opcode, Ethernet hardware type, magic cookie
    /// and the `End` terminator, everything else zeroed.
    pub fn new(op: OpCode) -> Self {
        let mut packet = Self {
            bytes: vec![0; HEADER_LENGTH],
        };
        packet.set_op_code(op);
        packet.set_htype(HARDWARE_TYPE_ETHERNET);
        packet.set_cookie(&MAGIC_COOKIE);
        packet.bytes[OPTIONS_START] = OptionCode::End as u8;
        packet
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn op_code(&self) -> u8 {
        self.bytes[OP]
    }

    pub fn htype(&self) -> u8 {
        self.bytes[HTYPE]
    }

    pub fn hlen(&self) -> u8 {
        self.bytes[HLEN]
    }

    pub fn hops(&self) -> u8 {
        self.bytes[HOPS]
    }

    pub fn xid(&self) -> &[u8] {
        &self.bytes[XID]
    }

    pub fn secs(&self) -> &[u8] {
        &self.bytes[SECS]
    }

    pub fn flags(&self) -> &[u8] {
        &self.bytes[FLAGS]
    }

    pub fn ciaddr(&self) -> Ipv4Addr {
        self.ip_at(CIADDR)
    }

    pub fn yiaddr(&self) -> Ipv4Addr {
        self.ip_at(YIADDR)
    }

    pub fn siaddr(&self) -> Ipv4Addr {
        self.ip_at(SIADDR)
    }

    pub fn giaddr(&self) -> Ipv4Addr {
        self.ip_at(GIADDR)
    }

    /// The meaningful part of `chaddr`, as announced by `hlen`.
    pub fn chaddr(&self) -> &[u8] {
        let hlen = (self.hlen() as usize).min(MAX_HARDWARE_LENGTH);
        &self.bytes[CHADDR.start..CHADDR.start + hlen]
    }

    pub fn sname(&self) -> &[u8] {
        &self.bytes[SNAME]
    }

    pub fn file(&self) -> &[u8] {
        &self.bytes[FILE]
    }

    pub fn cookie(&self) -> &[u8] {
        &self.bytes[COOKIE]
    }

    pub fn set_op_code(&mut self, op: OpCode) {
        self.bytes[OP] = op as u8;
    }

    pub fn set_htype(&mut self, htype: u8) {
        self.bytes[HTYPE] = htype;
    }

    pub fn set_hops(&mut self, hops: u8) {
        self.bytes[HOPS] = hops;
    }

    pub fn set_xid(&mut self, xid: &[u8]) {
        self.copy_into(XID, xid);
    }

    pub fn set_secs(&mut self, secs: &[u8]) {
        self.copy_into(SECS, secs);
    }

    pub fn set_flags(&mut self, flags: &[u8]) {
        self.copy_into(FLAGS, flags);
    }

    pub fn set_ciaddr<A: Into<IpAddr>>(&mut self, addr: A) {
        self.copy_into(CIADDR, &ipv4_octets(addr.into()));
    }

    pub fn set_yiaddr<A: Into<IpAddr>>(&mut self, addr: A) {
        self.copy_into(YIADDR, &ipv4_octets(addr.into()));
    }

    pub fn set_siaddr<A: Into<IpAddr>>(&mut self, addr: A) {
        self.copy_into(SIADDR, &ipv4_octets(addr.into()));
    }

    pub fn set_giaddr<A: Into<IpAddr>>(&mut self, addr: A) {
        self.copy_into(GIADDR, &ipv4_octets(addr.into()));
    }

    /// Writes up to 16 bytes of hardware address and records the copied
    /// length in `hlen`.
    pub fn set_chaddr(&mut self, mac: &[u8]) {
        let copied = self.copy_into(CHADDR, mac);
        self.bytes[HLEN] = copied as u8;
    }

    pub fn set_cookie(&mut self, cookie: &[u8]) {
        self.copy_into(COOKIE, cookie);
    }

    /// Appends an option in front of the `End` terminator.
    ///
    /// # Panics
    /// If `value` is longer than 255 bytes. Option values are assembled from
    /// configuration and must be checked before they reach the packet.
    pub fn add_option(&mut self, code: OptionCode, value: &[u8]) {
        assert!(
            value.len() <= u8::MAX as usize,
            "DHCP option {:?} value is {} bytes, the limit is 255",
            code,
            value.len()
        );

        self.bytes.pop();
        self.bytes.push(code as u8);
        self.bytes.push(value.len() as u8);
        self.bytes.extend_from_slice(value);
        self.bytes.push(OptionCode::End as u8);
    }

    /// Zero-pads the packet up to [`MIN_PACKET_SIZE`]. Never truncates.
    pub fn pad_to_min_size(&mut self) {
        if self.bytes.len() < MIN_PACKET_SIZE {
            self.bytes.resize(MIN_PACKET_SIZE, 0);
        }
    }

    /// Walks the options region and returns every `(code, value)` pair up to
    /// the `End` terminator. Pad bytes (code 0) are skipped.
    pub fn options(&self) -> Result<Vec<(u8, &[u8])>, RpeError> {
        let mut options = Vec::new();
        let mut i = OPTIONS_START;

        loop {
            let code = *self.bytes.get(i).ok_or(RpeError::InvalidHeaderFormat)?;
            if code == OptionCode::End as u8 {
                return Ok(options);
            }
            if code == 0 {
                i += 1;
                continue;
            }

            let len = *self.bytes.get(i + 1).ok_or(RpeError::InvalidHeaderFormat)? as usize;
            let value = self
                .bytes
                .get(i + 2..i + 2 + len)
                .ok_or(RpeError::InvalidHeaderFormat)?;
            options.push((code, value));
            i += 2 + len;
        }
    }

    fn ip_at(&self, range: Range<usize>) -> Ipv4Addr {
        let b = &self.bytes[range];
        Ipv4Addr::new(b[0], b[1], b[2], b[3])
    }

    /// Copies as much of `src` as fits in the field; returns the count copied.
    fn copy_into(&mut self, range: Range<usize>, src: &[u8]) -> usize {
        let n = src.len().min(range.len());
        self.bytes[range.start..range.start + n].copy_from_slice(&src[..n]);
        n
    }
}

impl TryFrom<Vec<u8>> for Packet {
    type Error = RpeError;

    /// Adopts wire bytes after checking them like [`PacketBuilder::validate`].
    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        let packet = Self { bytes };
        packet.validate()?;
        Ok(packet)
    }
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl PacketBuilder for Packet {
    fn build(&self) -> Result<Vec<u8>, RpeError> {
        self.validate()?;
        Ok(self.bytes.clone())
    }

    fn length(&self) -> usize {
        self.bytes.len()
    }

    fn validate(&self) -> Result<(), RpeError> {
        if self.bytes.len() < HEADER_LENGTH {
            return Err(RpeError::InvalidLength);
        }
        if self.cookie() != &MAGIC_COOKIE[..] {
            return Err(RpeError::InvalidFieldValue(
                "DHCP magic cookie is missing".to_string(),
            ));
        }
        if self.hlen() as usize > MAX_HARDWARE_LENGTH {
            return Err(RpeError::InvalidFieldValue(format!(
                "Hardware address length {} exceeds {}",
                self.hlen(),
                MAX_HARDWARE_LENGTH
            )));
        }
        self.options()?;
        Ok(())
    }
}
