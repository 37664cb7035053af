//! Pure IP address classification.
//!
//! An address is public iff it is globally routable: not private, loopback,
//! link-local, multicast, reserved, or unspecified. This is the innermost
//! layer of the guard; it never performs I/O and never fails.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// The classification of a single IP address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressClass {
    Private,
    Loopback,
    LinkLocal,
    Multicast,
    Unspecified,
    Reserved,
    Public,
}

impl AddressClass {
    pub fn is_public(self) -> bool {
        self == AddressClass::Public
    }
}

impl fmt::Display for AddressClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressClass::Private => "private",
            AddressClass::Loopback => "loopback",
            AddressClass::LinkLocal => "link-local",
            AddressClass::Multicast => "multicast",
            AddressClass::Unspecified => "unspecified",
            AddressClass::Reserved => "reserved",
            AddressClass::Public => "public",
        };
        write!(f, "{name}")
    }
}

/// Classify an address. Total: every address gets exactly one class.
pub fn classify(address: IpAddr) -> AddressClass {
    match address {
        IpAddr::V4(v4) => classify_v4(v4),
        IpAddr::V6(v6) => classify_v6(v6),
    }
}

/// True iff the address is globally routable.
pub fn is_public(address: IpAddr) -> bool {
    classify(address).is_public()
}

fn classify_v4(ip: Ipv4Addr) -> AddressClass {
    if ip.is_unspecified() {
        AddressClass::Unspecified
    } else if ip.is_loopback() {
        AddressClass::Loopback
    } else if ip.is_link_local() {
        AddressClass::LinkLocal
    } else if ip.is_multicast() {
        AddressClass::Multicast
    } else if ip.is_private() {
        AddressClass::Private
    } else if is_reserved_v4(ip) {
        AddressClass::Reserved
    } else {
        AddressClass::Public
    }
}

/// IANA-reserved IPv4 space that std does not flag behind stable methods:
/// 0.0.0.0/8 (this network), 240.0.0.0/4 (future use, includes broadcast),
/// 192.0.0.0/24 (protocol assignments), the three TEST-NET documentation
/// blocks, and 198.18.0.0/15 (benchmarking).
fn is_reserved_v4(ip: Ipv4Addr) -> bool {
    let o = ip.octets();
    o[0] == 0
        || o[0] >= 240
        || (o[0] == 192 && o[1] == 0 && (o[2] == 0 || o[2] == 2))
        || (o[0] == 198 && (o[1] & 0xfe) == 18)
        || (o[0] == 198 && o[1] == 51 && o[2] == 100)
        || (o[0] == 203 && o[1] == 0 && o[2] == 113)
}

fn classify_v6(ip: Ipv6Addr) -> AddressClass {
    if ip.is_unspecified() {
        return AddressClass::Unspecified;
    }
    if ip.is_loopback() {
        return AddressClass::Loopback;
    }

    // IPv4-mapped (::ffff:a.b.c.d) and the deprecated IPv4-compatible
    // embedding both smuggle an IPv4 address; classify the embedded address
    // so ::ffff:127.0.0.1 is loopback, not an exotic public v6.
    if let Some(v4) = ip.to_ipv4_mapped() {
        return classify_v4(v4);
    }
    if let Some(v4) = compatible_v4(ip) {
        return classify_v4(v4);
    }

    if ip.is_multicast() {
        return AddressClass::Multicast;
    }

    let seg = ip.segments();
    // fe80::/10 link-local, fc00::/7 unique-local.
    if (seg[0] & 0xffc0) == 0xfe80 {
        return AddressClass::LinkLocal;
    }
    if (seg[0] & 0xfe00) == 0xfc00 {
        return AddressClass::Private;
    }

    // Global unicast is currently allocated only from 2000::/3; everything
    // else that reached this point is reserved space. Within 2000::/3 the
    // protocol-assignments block (2001::/23, covering Teredo, ORCHID and
    // friends) and the documentation prefix 2001:db8::/32 are non-routable.
    if (seg[0] & 0xe000) != 0x2000 {
        return AddressClass::Reserved;
    }
    if seg[0] == 0x2001 && (seg[1] & 0xfe00) == 0 {
        return AddressClass::Reserved;
    }
    if seg[0] == 0x2001 && seg[1] == 0x0db8 {
        return AddressClass::Reserved;
    }

    AddressClass::Public
}

/// Deprecated IPv4-compatible embedding ::a.b.c.d (first 96 bits zero).
fn compatible_v4(ip: Ipv6Addr) -> Option<Ipv4Addr> {
    let seg = ip.segments();
    if seg[..6] == [0, 0, 0, 0, 0, 0] && (seg[6] != 0 || seg[7] > 1) {
        Some(Ipv4Addr::new(
            (seg[6] >> 8) as u8,
            seg[6] as u8,
            (seg[7] >> 8) as u8,
            seg[7] as u8,
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_of(text: &str) -> AddressClass {
        classify(text.parse().unwrap())
    }

    #[test]
    fn test_private_ranges_v4() {
        assert_eq!(class_of("10.0.0.1"), AddressClass::Private);
        assert_eq!(class_of("10.255.255.255"), AddressClass::Private);
        assert_eq!(class_of("172.16.0.1"), AddressClass::Private);
        assert_eq!(class_of("172.31.255.255"), AddressClass::Private);
        assert_eq!(class_of("192.168.0.1"), AddressClass::Private);
    }

    #[test]
    fn test_private_range_boundaries_v4() {
        // Just outside 10/8, 172.16/12 and 192.168/16.
        assert!(is_public("9.255.255.255".parse().unwrap()));
        assert!(is_public("11.0.0.0".parse().unwrap()));
        assert!(is_public("172.15.255.255".parse().unwrap()));
        assert!(is_public("172.32.0.0".parse().unwrap()));
        assert!(is_public("192.167.255.255".parse().unwrap()));
        assert!(is_public("192.169.0.0".parse().unwrap()));
    }

    #[test]
    fn test_loopback() {
        assert_eq!(class_of("127.0.0.1"), AddressClass::Loopback);
        assert_eq!(class_of("127.255.255.254"), AddressClass::Loopback);
        assert_eq!(class_of("::1"), AddressClass::Loopback);
    }

    #[test]
    fn test_link_local() {
        assert_eq!(class_of("169.254.1.1"), AddressClass::LinkLocal);
        assert_eq!(class_of("169.254.169.254"), AddressClass::LinkLocal);
        assert_eq!(class_of("fe80::1"), AddressClass::LinkLocal);
        assert_eq!(class_of("fe80::ffff:ffff:ffff:ffff"), AddressClass::LinkLocal);
    }

    #[test]
    fn test_unique_local_v6_is_private() {
        assert_eq!(class_of("fc00::1"), AddressClass::Private);
        assert_eq!(class_of("fd12:3456:789a::1"), AddressClass::Private);
    }

    #[test]
    fn test_multicast() {
        assert_eq!(class_of("224.0.0.1"), AddressClass::Multicast);
        assert_eq!(class_of("239.255.255.255"), AddressClass::Multicast);
        assert_eq!(class_of("ff02::1"), AddressClass::Multicast);
    }

    #[test]
    fn test_unspecified() {
        assert_eq!(class_of("0.0.0.0"), AddressClass::Unspecified);
        assert_eq!(class_of("::"), AddressClass::Unspecified);
    }

    #[test]
    fn test_reserved_v4() {
        assert_eq!(class_of("0.1.2.3"), AddressClass::Reserved);
        assert_eq!(class_of("240.0.0.1"), AddressClass::Reserved);
        assert_eq!(class_of("255.255.255.255"), AddressClass::Reserved);
        assert_eq!(class_of("192.0.2.1"), AddressClass::Reserved);
        assert_eq!(class_of("198.18.0.1"), AddressClass::Reserved);
        assert_eq!(class_of("198.51.100.7"), AddressClass::Reserved);
        assert_eq!(class_of("203.0.113.9"), AddressClass::Reserved);
    }

    #[test]
    fn test_reserved_v6() {
        assert_eq!(class_of("2001:db8::1"), AddressClass::Reserved);
        // Teredo sits inside the 2001::/23 protocol-assignments block.
        assert_eq!(class_of("2001::1"), AddressClass::Reserved);
        assert_eq!(class_of("100::1"), AddressClass::Reserved);
    }

    #[test]
    fn test_ipv4_mapped_embeds_are_classified_as_their_v4() {
        assert_eq!(class_of("::ffff:127.0.0.1"), AddressClass::Loopback);
        assert_eq!(class_of("::ffff:10.0.0.1"), AddressClass::Private);
        assert_eq!(class_of("::ffff:192.168.1.1"), AddressClass::Private);
        assert_eq!(class_of("::ffff:169.254.169.254"), AddressClass::LinkLocal);
        assert!(is_public("::ffff:93.184.216.34".parse().unwrap()));
    }

    #[test]
    fn test_ipv4_compatible_embeds_are_classified_as_their_v4() {
        assert_eq!(class_of("::127.0.0.1"), AddressClass::Loopback);
        assert_eq!(class_of("::169.254.169.254"), AddressClass::LinkLocal);
    }

    #[test]
    fn test_documented_public_examples() {
        assert!(is_public("93.184.216.34".parse().unwrap()));
        assert!(is_public("2606:2800:220:1:248:1893:25c8:1946".parse().unwrap()));
        assert!(is_public("8.8.8.8".parse().unwrap()));
        assert!(is_public("2001:4860:4860::8888".parse().unwrap()));
    }

    #[test]
    fn test_no_special_range_is_ever_public() {
        let specials = [
            "10.0.0.5",
            "127.0.0.1",
            "169.254.0.1",
            "172.16.10.10",
            "192.168.100.1",
            "224.0.0.5",
            "0.0.0.0",
            "240.1.1.1",
            "::",
            "::1",
            "fe80::2",
            "fd00::2",
            "ff02::2",
            "2001:db8::5",
        ];
        for text in specials {
            assert!(
                !is_public(text.parse().unwrap()),
                "{text} must not classify as public"
            );
        }
    }
}
