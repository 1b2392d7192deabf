use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

/// An IPv4 CIDR block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressBlock {
	pub base: Ipv4Addr,
	pub prefix_len: u8,
}

/// Shared address space reserved for carrier-grade NAT (RFC 6598)
pub const CGN_BLOCK: AddressBlock = AddressBlock {
	base: Ipv4Addr::new(100, 64, 0, 0),
	prefix_len: 10,
};

impl AddressBlock {
	fn mask(&self) -> u32 {
		match self.prefix_len {
			0 => 0,
			n => u32::MAX << (32 - u32::from(n.min(32))),
		}
	}

	/// Return true if the address lies inside this block.
	///
	/// IPv6 addresses are never inside an IPv4 block.
	pub fn contains(&self, addr: IpAddr) -> bool {
		match addr {
			IpAddr::V4(v4) => {
				let mask = self.mask();
				u32::from(v4) & mask == u32::from(self.base) & mask
			}
			IpAddr::V6(_) => false,
		}
	}
}

impl fmt::Display for AddressBlock {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.base, self.prefix_len)
	}
}

/// Check whether an address literal falls inside the CGN policy block.
///
/// Strings that do not parse as an address are treated as outside the block.
pub fn is_in_policy_block(address: &str) -> bool {
	address.trim()
		.parse::<IpAddr>()
		.map(|ip| CGN_BLOCK.contains(ip))
		.unwrap_or(false)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_block_edges() {
		assert!(is_in_policy_block("100.64.0.0"));
		assert!(is_in_policy_block("100.127.255.255"));
		assert!(is_in_policy_block("100.64.1.5"));
		assert!(!is_in_policy_block("100.63.255.255"));
		assert!(!is_in_policy_block("100.128.0.0"));
	}

	#[test]
	fn test_public_addresses_rejected() {
		assert!(!is_in_policy_block("8.8.8.8"));
		assert!(!is_in_policy_block("10.0.0.1"));
		assert!(!is_in_policy_block("192.168.1.1"));
	}

	#[test]
	fn test_malformed_rejected() {
		assert!(!is_in_policy_block(""));
		assert!(!is_in_policy_block("not-an-ip"));
		assert!(!is_in_policy_block("100.64.1"));
		assert!(!is_in_policy_block("100.64.1.256"));
		assert!(!is_in_policy_block("a.example."));
	}

	#[test]
	fn test_ipv6_never_in_block() {
		assert!(!is_in_policy_block("::ffff:100.64.1.5"));
		assert!(!is_in_policy_block("2001:db8::1"));
	}

	#[test]
	fn test_custom_block_and_display() {
		let block = AddressBlock { base: Ipv4Addr::new(10, 0, 0, 0), prefix_len: 8 };
		assert!(block.contains("10.255.0.1".parse().unwrap()));
		assert!(!block.contains("11.0.0.1".parse().unwrap()));
		assert_eq!(CGN_BLOCK.to_string(), "100.64.0.0/10");

		let everything = AddressBlock { base: Ipv4Addr::UNSPECIFIED, prefix_len: 0 };
		assert!(everything.contains("203.0.113.9".parse().unwrap()));
	}

	proptest! {
		#[test]
		fn every_address_in_block_matches(second in 64u8..=127, third: u8, fourth: u8) {
			let addr = format!("100.{}.{}.{}", second, third, fourth);
			prop_assert!(is_in_policy_block(&addr));
		}

		#[test]
		fn addresses_outside_block_never_match(
			second in prop_oneof![0u8..=63, 128u8..=255],
			third: u8,
			fourth: u8,
		) {
			let addr = format!("100.{}.{}.{}", second, third, fourth);
			prop_assert!(!is_in_policy_block(&addr));
		}

		#[test]
		fn other_first_octets_never_match(first in any::<u8>().prop_filter("not 100", |o| *o != 100), rest: u32) {
			let addr = Ipv4Addr::from((u32::from(first) << 24) | (rest & 0x00ff_ffff));
			prop_assert!(!CGN_BLOCK.contains(IpAddr::V4(addr)));
		}
	}
}
