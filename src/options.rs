//! The configuration options carried by every ACK.

use crate::RpeError;
use crate::config::Config;
use crate::dhcp::{DhcpOption, OptionCode, int_to_bytes};

/// Builds the option list pushed to the device, in the order clients expect:
/// subnet mask, time offset, DNS server, domain name, default TTL, lease time,
/// renewal time and rebinding time.
///
/// Durations and the time offset are encoded as 4-byte little-endian values,
/// which is what the receiving firmware reads.
pub fn dhcp_options(config: &Config) -> Result<Vec<DhcpOption>, RpeError> {
    let domain = config.dns_suffix.as_bytes();
    if domain.len() > u8::MAX as usize {
        return Err(RpeError::InvalidOptionValue(format!(
            "DNS suffix is {} bytes, the limit is 255",
            domain.len()
        )));
    }

    let mut opts = Vec::with_capacity(8);
    opts.push(DhcpOption::new(
        OptionCode::SubnetMask,
        config.subnet_mask.octets().to_vec(),
    ));
    opts.push(DhcpOption::new(
        OptionCode::TimeOffset,
        encode_u32(config.time_offset, "Option Time Offset")?,
    ));
    opts.push(DhcpOption::new(
        OptionCode::DomainNameServer,
        config.dns_server.octets().to_vec(),
    ));
    opts.push(DhcpOption::new(OptionCode::DomainName, domain.to_vec()));
    opts.push(DhcpOption::new(OptionCode::DefaultTtl, vec![config.default_ttl]));
    opts.push(DhcpOption::new(
        OptionCode::IpAddressLeaseTime,
        encode_u32(config.lease_time, "Option IP Lease Time")?,
    ));
    opts.push(DhcpOption::new(
        OptionCode::RenewalTimeValue,
        encode_u32(config.renewal_time, "Option Renewal Time")?,
    ));
    opts.push(DhcpOption::new(
        OptionCode::RebindingTimeValue,
        encode_u32(config.rebinding_time, "Option Rebinding Time")?,
    ));

    Ok(opts)
}

fn encode_u32(value: u32, name: &str) -> Result<Vec<u8>, RpeError> {
    int_to_bytes(value, 4).ok_or_else(|| RpeError::InvalidOptionValue(format!("invalid {}", name)))
}
