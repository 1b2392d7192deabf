use std::time::Duration;

/// Placeholder token replaced with the endpoint host
pub const ENDPOINT_PLACEHOLDER: &str = "{server}";

/// Test duration assumed when a scenario declares no `-t` value
pub const DEFAULT_DURATION_SECS: u64 = 60;

/// Extra time granted on top of the declared duration before killing iperf3
pub const TIMEOUT_HEADROOM_SECS: u64 = 20;

/// A named iperf3 parameter template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
	pub name: String,
	pub params: Vec<String>,
}

impl Scenario {
	pub fn new(name: &str, params: &[&str]) -> Self {
		Scenario {
			name: name.to_string(),
			params: params.iter().map(|p| p.to_string()).collect(),
		}
	}

	/// Substitute the endpoint into the parameter template.
	pub fn command_args(&self, endpoint: &str) -> Vec<String> {
		self.params.iter()
			.map(|p| p.replace(ENDPOINT_PLACEHOLDER, endpoint))
			.collect()
	}

	/// Declared `-t` test duration in seconds, if present and numeric.
	pub fn declared_duration_secs(&self) -> Option<u64> {
		self.params.windows(2)
			.find(|w| w[0] == "-t")
			.and_then(|w| w[1].parse().ok())
	}

	/// Hard wall-clock bound for one invocation of this scenario.
	pub fn timeout(&self) -> Duration {
		let secs = self.declared_duration_secs().unwrap_or(DEFAULT_DURATION_SECS);
		Duration::from_secs(secs + TIMEOUT_HEADROOM_SECS)
	}

	/// True for datagram-mode scenarios, which report jitter and loss.
	pub fn is_udp(&self) -> bool {
		self.params.iter().any(|p| p == "-u")
	}
}

/// Return the built-in scenario catalogue.
///
/// Covers TCP parallelism and congestion, TCP window sizes, TCP write
/// sizes, and a UDP bandwidth ladder up to 1 Gbps.
pub fn default_scenarios() -> Vec<Scenario> {
	vec![
		// TCP parallelism and congestion
		Scenario::new("TCP Bandwidth (Parallel 4)", &["-c", "{server}", "-t", "15", "-P", "4", "-J"]),
		Scenario::new("TCP Bandwidth (Parallel 8)", &["-c", "{server}", "-t", "20", "-P", "8", "-J"]),
		Scenario::new("TCP Bandwidth (Reverse, P4)", &["-c", "{server}", "-t", "15", "-R", "-P", "4", "-J"]),
		Scenario::new("TCP Congestion Test (P8, T30)", &["-c", "{server}", "-t", "30", "-P", "8", "-J"]),
		Scenario::new("High Congestion (P16, T60)", &["-c", "{server}", "-t", "60", "-P", "16", "-J"]),
		Scenario::new("Very High Congestion (P32, T90)", &["-c", "{server}", "-t", "90", "-P", "32", "-J"]),
		// TCP window sizes
		Scenario::new("TCP Window Size 64K", &["-c", "{server}", "-t", "10", "-w", "64K", "-J"]),
		Scenario::new("TCP Window Size 128K", &["-c", "{server}", "-t", "10", "-w", "128K", "-J"]),
		Scenario::new("TCP Window Size 256K", &["-c", "{server}", "-t", "10", "-w", "256K", "-J"]),
		Scenario::new("TCP Window Size 512K", &["-c", "{server}", "-t", "10", "-w", "512K", "-J"]),
		Scenario::new("TCP Window Size 1M", &["-c", "{server}", "-t", "10", "-w", "1M", "-J"]),
		// TCP write sizes
		Scenario::new("TCP Small Packets (64B)", &["-c", "{server}", "-t", "10", "-l", "64", "-J"]),
		Scenario::new("TCP Large Packets (64KB)", &["-c", "{server}", "-t", "10", "-l", "64K", "-J"]),
		// UDP bandwidth ladder
		Scenario::new("UDP Bandwidth (100Mbps)", &["-c", "{server}", "-t", "10", "-u", "-b", "100M", "-J"]),
		Scenario::new("UDP Bandwidth (200Mbps)", &["-c", "{server}", "-t", "15", "-u", "-b", "200M", "-J"]),
		Scenario::new("UDP Bandwidth (500Mbps)", &["-c", "{server}", "-t", "20", "-u", "-b", "500M", "-J"]),
		Scenario::new("UDP Bandwidth (1Gbps)", &["-c", "{server}", "-t", "25", "-u", "-b", "1G", "-J"]),
		Scenario::new("UDP Bandwidth (1Gbps, Small Pkt)", &["-c", "{server}", "-t", "25", "-u", "-b", "1G", "-l", "64", "-J"]),
		Scenario::new("UDP Bandwidth (1Gbps, Large Pkt)", &["-c", "{server}", "-t", "25", "-u", "-b", "1G", "-l", "1400", "-J"]),
	]
}

/// Keep scenarios whose name contains any of the filters (case-insensitive).
///
/// An empty filter list keeps everything.
pub fn filter_scenarios(scenarios: Vec<Scenario>, filters: &[String]) -> Vec<Scenario> {
	if filters.is_empty() {
		return scenarios;
	}
	let needles: Vec<String> = filters.iter().map(|f| f.to_lowercase()).collect();
	scenarios.into_iter()
		.filter(|s| {
			let name = s.name.to_lowercase();
			needles.iter().any(|n| name.contains(n.as_str()))
		})
		.collect()
}
