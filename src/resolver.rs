use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::{anyhow, Result};

use crate::types::ResolverTarget;

/// Parse a resolver address string into a ResolverTarget.
///
/// Supports formats:
///   "1.1.1.1"              -- IPv4, default port 53
///   "1.1.1.1:53"           -- IPv4 with explicit port
///   "2606:4700::1111"      -- bare IPv6, default port 53
///   "[2606:4700::1111]:53" -- bracketed IPv6 with port
///
/// The label is the address as given, so results stay recognisable.
pub fn parse_resolver(input: &str) -> Result<ResolverTarget> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Err(anyhow!("empty resolver address"));
	}

	let addr: SocketAddr = if trimmed.starts_with('[') {
		// Bracketed IPv6 with port: [::1]:53
		trimmed.parse()
			.map_err(|e| anyhow!("invalid bracketed IPv6 address '{}': {}", trimmed, e))?
	} else if trimmed.contains("::") || trimmed.matches(':').count() > 1 {
		// Bare IPv6 address without port
		let ip: IpAddr = trimmed.parse()
			.map_err(|e| anyhow!("invalid IPv6 address '{}': {}", trimmed, e))?;
		SocketAddr::new(ip, 53)
	} else if let Ok(addr) = trimmed.parse::<SocketAddr>() {
		// IPv4 with port (e.g. "8.8.8.8:5353")
		addr
	} else {
		// Plain IPv4 without port
		let ip: IpAddr = trimmed.parse()
			.map_err(|e| anyhow!("invalid IP address '{}': {}", trimmed, e))?;
		SocketAddr::new(ip, 53)
	};

	Ok(ResolverTarget { label: trimmed.to_string(), addr })
}

/// Read resolver addresses from a file, one per line.
///
/// Blank lines and lines starting with '#' are skipped.
pub fn read_resolver_file(path: &str) -> Result<Vec<ResolverTarget>> {
	let content = std::fs::read_to_string(path)
		.map_err(|e| anyhow!("failed to read resolver file '{}': {}", path, e))?;
	let mut resolvers = Vec::new();
	for line in content.lines() {
		let trimmed = line.trim();
		if trimmed.is_empty() || trimmed.starts_with('#') {
			continue;
		}
		resolvers.push(parse_resolver(trimmed)?);
	}
	Ok(resolvers)
}

/// Public resolvers tested when none are configured: Google and Cloudflare.
pub fn default_resolvers() -> Vec<ResolverTarget> {
	[Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(1, 1, 1, 1)]
		.into_iter()
		.map(|ip| ResolverTarget {
			label: ip.to_string(),
			addr: SocketAddr::new(IpAddr::V4(ip), 53),
		})
		.collect()
}

/// Resolver groups in test order: the system default (None) first if
/// requested, then each explicit resolver.
pub fn resolver_groups(
	include_system: bool,
	resolvers: Vec<ResolverTarget>,
) -> Vec<Option<ResolverTarget>> {
	let system = include_system.then_some(None);
	system.into_iter()
		.chain(resolvers.into_iter().map(Some))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_ipv4_no_port() {
		let r = parse_resolver("1.1.1.1").unwrap();
		assert_eq!(r.addr.port(), 53);
		assert_eq!(r.addr.ip().to_string(), "1.1.1.1");
		assert_eq!(r.label, "1.1.1.1");
	}

	#[test]
	fn test_ipv4_with_port() {
		let r = parse_resolver("8.8.8.8:5353").unwrap();
		assert_eq!(r.addr.port(), 5353);
		assert_eq!(r.addr.ip().to_string(), "8.8.8.8");
	}

	#[test]
	fn test_ipv6_bare() {
		let r = parse_resolver("2606:4700::1111").unwrap();
		assert_eq!(r.addr.port(), 53);
	}

	#[test]
	fn test_ipv6_bracketed() {
		let r = parse_resolver("[2606:4700::1111]:53").unwrap();
		assert_eq!(r.addr.port(), 53);
	}

	#[test]
	fn test_invalid_input() {
		assert!(parse_resolver("not-an-ip").is_err());
		assert!(parse_resolver("  ").is_err());
	}

	#[test]
	fn test_defaults() {
		let labels: Vec<String> = default_resolvers().into_iter().map(|r| r.label).collect();
		assert_eq!(labels, vec!["8.8.8.8", "1.1.1.1"]);
	}

	#[test]
	fn test_resolver_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "# office resolvers\n\n10.0.0.53\n10.0.0.54:5353").unwrap();
		let resolvers = read_resolver_file(file.path().to_str().unwrap()).unwrap();
		assert_eq!(resolvers.len(), 2);
		assert_eq!(resolvers[1].addr.port(), 5353);
	}

	#[test]
	fn test_resolver_groups_order() {
		let groups = resolver_groups(true, default_resolvers());
		assert_eq!(groups.len(), 3);
		assert!(groups[0].is_none());
		assert_eq!(groups[1].as_ref().unwrap().label, "8.8.8.8");

		let without_system = resolver_groups(false, default_resolvers());
		assert_eq!(without_system.len(), 2);
		assert!(without_system[0].is_some());
	}
}
