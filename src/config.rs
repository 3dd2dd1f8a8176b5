//! Command-line flags and the configuration of a single send.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::RpeError;

/// Destination port of DHCP client messages.
pub const DHCP_CLIENT_PORT: u16 = 68;

/// Interface names treated as the wired NIC, in no particular order.
pub const WIRED_INTERFACES: [&str; 3] = [
    "Ethernet", // Windows
    "eth0",     // Linux legacy
    "eno1",     // Linux
];

/// Port reported when neither `-p` nor a usable `PORT` is given.
pub const DEFAULT_PORT: u16 = 3050;

/// Remote Provisioning Extension (RPE) - used to set DNS Suffix for AMT on
/// static IP or without FQDN.
#[derive(Debug, Parser)]
#[command(name = "rpe", version, after_help = "Example: rpe -p 8005 -d demo.com")]
struct Args {
    /// DNS suffix to broadcast in option 15 of DHCP
    #[arg(short = 'd', long = "dns-suffix", env = "DNS_SUFFIX", default_value = "")]
    dns_suffix: String,

    /// Port to run the RPE service on (overrides the PORT env var) [default: 3050]
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,
}

/// Command-line flags, with environment fallbacks resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flags {
    pub dns_suffix: String,
    pub port: u16,
}

impl Flags {
    /// Parses the process arguments, exiting with usage on malformed flags.
    pub fn parse() -> Self {
        Args::parse().into()
    }

    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Args::try_parse_from(args).map(Self::from)
    }

    /// Rejects flag combinations clap cannot express, i.e. an empty suffix
    /// coming from either the command line or `DNS_SUFFIX`.
    pub fn validate(&self) -> Result<(), RpeError> {
        if self.dns_suffix.is_empty() {
            return Err(RpeError::MissingDnsSuffix);
        }
        Ok(())
    }

    pub fn usage() -> String {
        Args::command().render_long_help().to_string()
    }
}

impl From<Args> for Flags {
    fn from(args: Args) -> Self {
        Self {
            dns_suffix: args.dns_suffix,
            port: args.port.unwrap_or_else(|| lookup_env_or("PORT", DEFAULT_PORT)),
        }
    }
}

/// Reads `key` from the environment, falling back to `default` when it is
/// unset or does not parse. A value that does not parse is logged.
pub fn lookup_env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.parse().unwrap_or_else(|e| {
            warn!("Ignoring {}={:?}: {}", key, val, e);
            default
        }),
        Err(_) => default,
    }
}

/// Everything a send needs to know, fixed for its whole duration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Suffix pushed to the device in the domain name option.
    pub dns_suffix: String,
    /// `yiaddr` of the reply.
    pub assigned_address: Ipv4Addr,
    /// `chaddr` of the reply, parsed when the packet is assembled.
    pub client_mac: String,
    pub subnet_mask: Ipv4Addr,
    pub dns_server: Ipv4Addr,
    pub default_ttl: u8,
    pub time_offset: u32,
    /// Seconds.
    pub lease_time: u32,
    pub renewal_time: u32,
    pub rebinding_time: u32,
    pub destination_port: u16,
    pub wired_interfaces: Vec<String>,
    /// Upper bound for the socket write, none by default.
    pub write_timeout: Option<Duration>,
}

impl Config {
    pub fn new(dns_suffix: impl Into<String>) -> Self {
        Self {
            dns_suffix: dns_suffix.into(),
            assigned_address: Ipv4Addr::new(169, 254, 214, 131),
            client_mac: "54-B2-03-89-D3-B9".to_string(),
            subnet_mask: Ipv4Addr::new(255, 255, 255, 0),
            dns_server: Ipv4Addr::new(8, 8, 8, 8),
            default_ttl: 64,
            time_offset: 0,
            lease_time: 86400,
            renewal_time: 43200,
            rebinding_time: 75600,
            destination_port: DHCP_CLIENT_PORT,
            wired_interfaces: WIRED_INTERFACES.iter().map(|s| s.to_string()).collect(),
            write_timeout: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("")
    }
}

impl From<&Flags> for Config {
    fn from(flags: &Flags) -> Self {
        Self::new(flags.dns_suffix.clone())
    }
}
