use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpeError {
    #[error("Invalid packet length")]
    InvalidLength,

    #[error("Invalid header format")]
    InvalidHeaderFormat,

    #[error("Invalid field value: {0}")]
    InvalidFieldValue(String),

    #[error("Invalid option value: {0}")]
    InvalidOptionValue(String),

    #[error("Invalid MAC address: {0}")]
    InvalidMacAddress(String),

    #[error("Missing required flags: -d flag is required and cannot be empty")]
    MissingDnsSuffix,

    #[error("No wired network interface found")]
    NoInterface,

    #[error("No IPv4 address found on interface {0}")]
    NoIpv4Address(String),

    #[error("Failed getting network interfaces: {0}")]
    Enumeration(#[source] io::Error),

    #[error("No connection to close")]
    NotConnected,

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}
