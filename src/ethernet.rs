//! Ethernet hardware addresses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RpeError;

/// Hardware type value for 10Mb Ethernet in the DHCP `htype` field.
pub const HARDWARE_TYPE_ETHERNET: u8 = 1;

/// MAC address representation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub fn new(addr: [u8; 6]) -> Self {
        Self(addr)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for MacAddress {
    type Err = RpeError;

    /// Parses `54:b2:03:89:d3:b9` or `54-B2-03-89-D3-B9`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RpeError::InvalidMacAddress(s.to_string());

        let separator = if s.contains('-') { '-' } else { ':' };
        let mut octets = [0u8; 6];
        let mut count = 0;

        for part in s.split(separator) {
            if count == octets.len() || part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            octets[count] = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
            count += 1;
        }

        if count != octets.len() {
            return Err(invalid());
        }
        Ok(Self(octets))
    }
}

impl TryFrom<&[u8]> for MacAddress {
    type Error = RpeError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let octets: [u8; 6] = bytes
            .try_into()
            .map_err(|_| RpeError::InvalidMacAddress(format!("{:02x?}", bytes)))?;
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}
