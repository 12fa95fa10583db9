//! IP address scope classification.
//!
//! Only ordinary global unicast addresses are safe. Everything else is
//! treated as private: loopback, link-local, RFC 1918, shared (CGNAT),
//! multicast, documentation, benchmarking, reserved, broadcast.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::{Ipv4Net, Ipv6Net};

/// Scope of an IP address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressScope {
    Unspecified,
    Loopback,
    LinkLocal,
    Private,
    CarrierGradeNat,
    Multicast,
    Broadcast,
    Documentation,
    Benchmarking,
    /// Translation, tunneling and protocol-assignment ranges.
    Transition,
    Reserved,
    Unicast,
}

impl AddressScope {
    pub fn is_unicast(self) -> bool {
        self == Self::Unicast
    }
}

const IPV4_RANGES: &[(Ipv4Addr, u8, AddressScope, &str)] = &[
    (Ipv4Addr::new(0, 0, 0, 0), 8, AddressScope::Unspecified, "\"this network\" address (0.0.0.0/8)"),
    (Ipv4Addr::new(10, 0, 0, 0), 8, AddressScope::Private, "private address (10.0.0.0/8)"),
    (Ipv4Addr::new(100, 64, 0, 0), 10, AddressScope::CarrierGradeNat, "carrier-grade NAT address (100.64.0.0/10)"),
    (Ipv4Addr::new(127, 0, 0, 0), 8, AddressScope::Loopback, "loopback address (127.0.0.0/8)"),
    (Ipv4Addr::new(169, 254, 0, 0), 16, AddressScope::LinkLocal, "link-local address (169.254.0.0/16)"),
    (Ipv4Addr::new(172, 16, 0, 0), 12, AddressScope::Private, "private address (172.16.0.0/12)"),
    (Ipv4Addr::new(192, 0, 0, 0), 24, AddressScope::Reserved, "IETF protocol assignment (192.0.0.0/24)"),
    (Ipv4Addr::new(192, 0, 2, 0), 24, AddressScope::Documentation, "documentation address (192.0.2.0/24)"),
    (Ipv4Addr::new(192, 88, 99, 0), 24, AddressScope::Transition, "6to4 relay anycast (192.88.99.0/24)"),
    (Ipv4Addr::new(192, 168, 0, 0), 16, AddressScope::Private, "private address (192.168.0.0/16)"),
    (Ipv4Addr::new(198, 18, 0, 0), 15, AddressScope::Benchmarking, "benchmarking address (198.18.0.0/15)"),
    (Ipv4Addr::new(198, 51, 100, 0), 24, AddressScope::Documentation, "documentation address (198.51.100.0/24)"),
    (Ipv4Addr::new(203, 0, 113, 0), 24, AddressScope::Documentation, "documentation address (203.0.113.0/24)"),
    (Ipv4Addr::new(224, 0, 0, 0), 4, AddressScope::Multicast, "multicast address (224.0.0.0/4)"),
];

const IPV6_RANGES: &[(Ipv6Addr, u8, AddressScope, &str)] = &[
    (Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 0), 96, AddressScope::Reserved, "IPv4-compatible address (::/96)"),
    (Ipv6Addr::new(0, 0, 0, 0, 0xffff, 0, 0, 0), 96, AddressScope::Transition, "IPv4-translated address (::ffff:0:0:0/96)"),
    (Ipv6Addr::new(0x64, 0xff9b, 0, 0, 0, 0, 0, 0), 96, AddressScope::Transition, "NAT64 address (64:ff9b::/96)"),
    (Ipv6Addr::new(0x64, 0xff9b, 1, 0, 0, 0, 0, 0), 48, AddressScope::Transition, "local-use NAT64 address (64:ff9b:1::/48)"),
    (Ipv6Addr::new(0x100, 0, 0, 0, 0, 0, 0, 0), 64, AddressScope::Reserved, "discard-only address (100::/64)"),
    (Ipv6Addr::new(0x2001, 0x2, 0, 0, 0, 0, 0, 0), 48, AddressScope::Benchmarking, "benchmarking address (2001:2::/48)"),
    (Ipv6Addr::new(0x2001, 0, 0, 0, 0, 0, 0, 0), 23, AddressScope::Transition, "IETF protocol assignment (2001::/23)"),
    (Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0), 32, AddressScope::Documentation, "documentation address (2001:db8::/32)"),
    (Ipv6Addr::new(0x2002, 0, 0, 0, 0, 0, 0, 0), 16, AddressScope::Transition, "6to4 address (2002::/16)"),
    (Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7, AddressScope::Private, "unique local address (fc00::/7)"),
    (Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10, AddressScope::LinkLocal, "link-local address (fe80::/10)"),
    (Ipv6Addr::new(0xff00, 0, 0, 0, 0, 0, 0, 0), 8, AddressScope::Multicast, "multicast address (ff00::/8)"),
];

/// Parse IP address text. Accepts IPv4 dotted-quad and IPv6, with or without brackets.
pub fn parse_ip(text: &str) -> Option<IpAddr> {
    let text = text
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(text);
    text.parse().ok()
}

/// Is `text` an IPv4 or IPv6 literal?
pub fn is_valid_ip(text: &str) -> bool {
    parse_ip(text).is_some()
}

/// Is `text` an IP literal outside global unicast?
///
/// Text that is not an IP address at all is not private.
pub fn is_private_ip_address(text: &str) -> bool {
    parse_ip(text).is_some_and(is_private_ip)
}

pub fn is_private_ip(ip: IpAddr) -> bool {
    !classify(ip).is_unicast()
}

/// Unwrap IPv4-mapped IPv6 (`::ffff:a.b.c.d`) to the IPv4 address it carries.
pub fn normalize_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(ip, IpAddr::V4),
        v4 => v4,
    }
}

/// Classify an address, unwrapping IPv4-mapped IPv6 first.
pub fn classify(ip: IpAddr) -> AddressScope {
    lookup(ip).0
}

/// Why `ip` is not safe to connect to, or `None` for global unicast.
pub fn non_unicast_reason(ip: IpAddr) -> Option<&'static str> {
    match lookup(ip) {
        (AddressScope::Unicast, _) => None,
        (_, reason) => Some(reason),
    }
}

fn lookup(ip: IpAddr) -> (AddressScope, &'static str) {
    match normalize_ip(ip) {
        IpAddr::V4(v4) => lookup_ipv4(v4),
        IpAddr::V6(v6) => lookup_ipv6(v6),
    }
}

fn lookup_ipv4(ip: Ipv4Addr) -> (AddressScope, &'static str) {
    if ip.is_broadcast() {
        return (AddressScope::Broadcast, "broadcast address (255.255.255.255)");
    }

    for &(net, prefix, scope, reason) in IPV4_RANGES {
        if Ipv4Net::new(net, prefix).is_ok_and(|n| n.contains(&ip)) {
            return (scope, reason);
        }
    }

    // 240.0.0.0/4, checked after broadcast which lives inside it
    if ip.octets()[0] >= 240 {
        return (AddressScope::Reserved, "reserved address (240.0.0.0/4)");
    }

    (AddressScope::Unicast, "global unicast")
}

fn lookup_ipv6(ip: Ipv6Addr) -> (AddressScope, &'static str) {
    // Both live inside ::/96, so check them first for a precise scope
    if ip.is_unspecified() {
        return (AddressScope::Unspecified, "unspecified address (::)");
    }
    if ip.is_loopback() {
        return (AddressScope::Loopback, "loopback address (::1)");
    }

    for &(net, prefix, scope, reason) in IPV6_RANGES {
        if Ipv6Net::new(net, prefix).is_ok_and(|n| n.contains(&ip)) {
            return (scope, reason);
        }
    }

    // Global unicast is 2000::/3, the rest of the space is unassigned
    if (ip.segments()[0] & 0xe000) != 0x2000 {
        return (AddressScope::Reserved, "reserved address (outside 2000::/3)");
    }

    (AddressScope::Unicast, "global unicast")
}
