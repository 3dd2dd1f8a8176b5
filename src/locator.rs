//! Discovery of the local wired interface address.
//!
//! Interface enumeration sits behind the [`NetworkEnumerator`] trait so the
//! lookup logic can run against the operating system ([`SystemEnumerator`])
//! or a fixed table ([`StaticEnumerator`]).

use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr};

use if_addrs::{IfAddr, get_if_addrs};
use log::{debug, warn};

use crate::RpeError;

/// A network interface, identified by its OS name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetInterface {
    pub name: String,
}

impl NetInterface {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// An address assigned to an interface, in CIDR form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub ip: IpAddr,
    pub prefix_len: u8,
}

impl InterfaceAddress {
    pub fn new(ip: IpAddr, prefix_len: u8) -> Self {
        Self { ip, prefix_len }
    }
}

impl fmt::Display for InterfaceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ip, self.prefix_len)
    }
}

/// Source of interfaces and their addresses.
pub trait NetworkEnumerator {
    /// Lists the interfaces of the host, in enumeration order.
    fn interfaces(&self) -> io::Result<Vec<NetInterface>>;

    /// Lists the addresses assigned to `iface`.
    fn addresses(&self, iface: &NetInterface) -> io::Result<Vec<InterfaceAddress>>;
}

/// Enumerates the interfaces of the running host.
///
/// Interfaces are reported under the names an administrator sees: `eth0` or
/// `eno1` on Linux, the friendly name such as `Ethernet` on Windows rather
/// than the adapter GUID.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnumerator;

impl NetworkEnumerator for SystemEnumerator {
    fn interfaces(&self) -> io::Result<Vec<NetInterface>> {
        let mut interfaces: Vec<NetInterface> = Vec::new();
        for iface in get_if_addrs()? {
            if !interfaces.iter().any(|known| known.name == iface.name) {
                interfaces.push(NetInterface::new(iface.name));
            }
        }
        Ok(interfaces)
    }

    fn addresses(&self, iface: &NetInterface) -> io::Result<Vec<InterfaceAddress>> {
        let addrs = get_if_addrs()?
            .into_iter()
            .filter(|addr| addr.name == iface.name)
            .map(|addr| match addr.addr {
                IfAddr::V4(v4) => InterfaceAddress::new(
                    IpAddr::V4(v4.ip),
                    u32::from(v4.netmask).count_ones() as u8,
                ),
                IfAddr::V6(v6) => InterfaceAddress::new(
                    IpAddr::V6(v6.ip),
                    u128::from(v6.netmask).count_ones() as u8,
                ),
            })
            .collect();
        Ok(addrs)
    }
}

/// A fixed interface table.
#[derive(Debug, Clone, Default)]
pub struct StaticEnumerator {
    entries: Vec<(NetInterface, Vec<InterfaceAddress>)>,
}

impl StaticEnumerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an interface with its addresses.
    pub fn interface(mut self, name: impl Into<String>, addrs: Vec<InterfaceAddress>) -> Self {
        self.entries.push((NetInterface::new(name), addrs));
        self
    }
}

impl NetworkEnumerator for StaticEnumerator {
    fn interfaces(&self) -> io::Result<Vec<NetInterface>> {
        Ok(self.entries.iter().map(|(iface, _)| iface.clone()).collect())
    }

    fn addresses(&self, iface: &NetInterface) -> io::Result<Vec<InterfaceAddress>> {
        self.entries
            .iter()
            .find(|(known, _)| known == iface)
            .map(|(_, addrs)| addrs.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no such interface: {}", iface.name)))
    }
}

/// Returns the IPv4 address of the first interface whose name is on
/// `wired_interfaces`.
///
/// IPv6 addresses are skipped and the prefix length is dropped. An interface
/// whose addresses cannot be read is logged and passed over.
pub fn current_ipv4_address<E, S>(enumerator: &E, wired_interfaces: &[S]) -> Result<Ipv4Addr, RpeError>
where
    E: NetworkEnumerator + ?Sized,
    S: AsRef<str>,
{
    let interfaces = enumerator.interfaces().map_err(RpeError::Enumeration)?;

    for iface in interfaces
        .iter()
        .filter(|iface| wired_interfaces.iter().any(|name| name.as_ref() == iface.name))
    {
        let addrs = match enumerator.addresses(iface) {
            Ok(addrs) => addrs,
            Err(e) => {
                warn!("Failed getting addresses of {}: {}", iface.name, e);
                continue;
            }
        };

        return addrs
            .iter()
            .find_map(|addr| match addr.ip {
                IpAddr::V4(ip) => Some(ip),
                IpAddr::V6(_) => None,
            })
            .inspect(|ip| debug!("Using {} on interface {}", ip, iface.name))
            .ok_or_else(|| RpeError::NoIpv4Address(iface.name.clone()));
    }

    Err(RpeError::NoInterface)
}

/// Broadcast address of the /24 network containing `addr`.
///
/// The real netmask is not consulted; every network is assumed to be a /24.
pub fn broadcast_address_for(addr: Ipv4Addr) -> Ipv4Addr {
    let [a, b, c, _] = addr.octets();
    Ipv4Addr::new(a, b, c, 255)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WIRED_INTERFACES;
    use std::net::Ipv6Addr;

    fn ipv4(addr: [u8; 4], prefix_len: u8) -> InterfaceAddress {
        InterfaceAddress::new(IpAddr::V4(Ipv4Addr::from(addr)), prefix_len)
    }

    fn ipv6(addr: &str, prefix_len: u8) -> InterfaceAddress {
        InterfaceAddress::new(IpAddr::V6(addr.parse::<Ipv6Addr>().unwrap()), prefix_len)
    }

    fn create_test_enumerator() -> StaticEnumerator {
        StaticEnumerator::new().interface(
            "Ethernet",
            vec![ipv6("fe80::a853:f61a:b1b6:842", 64), ipv4([10, 20, 30, 34], 24)],
        )
    }

    struct FailingEnumerator;

    impl NetworkEnumerator for FailingEnumerator {
        fn interfaces(&self) -> io::Result<Vec<NetInterface>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }

        fn addresses(&self, _iface: &NetInterface) -> io::Result<Vec<InterfaceAddress>> {
            unreachable!()
        }
    }

    #[test]
    fn test_current_ipv4_address() {
        let enumerator = create_test_enumerator();
        let addr = current_ipv4_address(&enumerator, &WIRED_INTERFACES).unwrap();
        assert_eq!(addr.to_string(), "10.20.30.34");
    }

    #[test]
    fn test_broadcast_address_for() {
        let enumerator = create_test_enumerator();
        let addr = current_ipv4_address(&enumerator, &WIRED_INTERFACES).unwrap();
        assert_eq!(broadcast_address_for(addr).to_string(), "10.20.30.255");
        assert_eq!(
            broadcast_address_for(Ipv4Addr::new(192, 168, 1, 0)),
            Ipv4Addr::new(192, 168, 1, 255)
        );
    }

    #[test]
    fn test_non_wired_interfaces_are_skipped() {
        let enumerator = StaticEnumerator::new()
            .interface("lo", vec![ipv4([127, 0, 0, 1], 8)])
            .interface("wlan0", vec![ipv4([192, 168, 1, 20], 24)])
            .interface("eno1", vec![ipv4([10, 0, 0, 7], 16)]);

        let addr = current_ipv4_address(&enumerator, &WIRED_INTERFACES).unwrap();
        assert_eq!(addr, Ipv4Addr::new(10, 0, 0, 7));
    }

    #[test]
    fn test_name_match_is_exact() {
        let enumerator = StaticEnumerator::new()
            .interface("eth0.100", vec![ipv4([10, 0, 0, 7], 24)])
            .interface("ethernet", vec![ipv4([10, 0, 0, 8], 24)]);

        assert!(matches!(
            current_ipv4_address(&enumerator, &WIRED_INTERFACES),
            Err(RpeError::NoInterface)
        ));
    }

    #[test]
    fn test_no_ipv4_address() {
        let enumerator =
            StaticEnumerator::new().interface("eth0", vec![ipv6("fe80::1", 64)]);

        match current_ipv4_address(&enumerator, &WIRED_INTERFACES) {
            Err(RpeError::NoIpv4Address(name)) => assert_eq!(name, "eth0"),
            other => panic!("Expected NoIpv4Address error, got {:?}", other),
        }
    }

    #[test]
    fn test_no_interface() {
        let enumerator = StaticEnumerator::new();
        assert!(matches!(
            current_ipv4_address(&enumerator, &WIRED_INTERFACES),
            Err(RpeError::NoInterface)
        ));
    }

    #[test]
    fn test_enumeration_failure() {
        match current_ipv4_address(&FailingEnumerator, &WIRED_INTERFACES) {
            Err(RpeError::Enumeration(e)) => assert_eq!(e.kind(), io::ErrorKind::PermissionDenied),
            other => panic!("Expected Enumeration error, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_allow_list() {
        let enumerator = create_test_enumerator().interface("br0", vec![ipv4([172, 16, 0, 1], 24)]);

        let addr = current_ipv4_address(&enumerator, &["br0".to_string()]).unwrap();
        assert_eq!(addr, Ipv4Addr::new(172, 16, 0, 1));
    }

    #[test]
    fn test_interface_address_display() {
        assert_eq!(ipv4([10, 20, 30, 34], 24).to_string(), "10.20.30.34/24");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_system_enumerator_reports_os_names() {
        let enumerator = SystemEnumerator;
        let interfaces = match enumerator.interfaces() {
            Ok(interfaces) => interfaces,
            Err(e) => {
                eprintln!("Skipping test, interfaces unavailable: {}", e);
                return;
            }
        };

        let loopback = interfaces.iter().find(|iface| {
            enumerator
                .addresses(iface)
                .map(|addrs| addrs.iter().any(|addr| addr.ip == IpAddr::V4(Ipv4Addr::LOCALHOST)))
                .unwrap_or(false)
        });
        if let Some(iface) = loopback {
            assert_eq!(iface.name, "lo");
        }
    }

    #[cfg(windows)]
    #[test]
    fn test_system_enumerator_reports_friendly_names() {
        let interfaces = SystemEnumerator.interfaces().unwrap();
        for iface in interfaces {
            assert!(
                !iface.name.starts_with('{'),
                "adapter GUID reported instead of friendly name: {}",
                iface.name
            );
        }
    }

    #[test]
    fn test_system_enumerator() {
        // Whatever the host has, every listed interface must be queryable.
        let enumerator = SystemEnumerator;
        let interfaces = match enumerator.interfaces() {
            Ok(interfaces) => interfaces,
            Err(e) => {
                eprintln!("Skipping test, interfaces unavailable: {}", e);
                return;
            }
        };
        for iface in interfaces {
            assert!(enumerator.addresses(&iface).is_ok());
        }
    }
}
