use serde_json::Value;

/// Walk a chain of object keys, returning None at the first missing segment.
///
/// Any non-object node along the way also ends the walk.
pub fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
	path.iter().try_fold(root, |node, segment| node.get(*segment))
}

/// Numeric value at `path`, or None if absent or not a number.
pub fn f64_at(root: &Value, path: &[&str]) -> Option<f64> {
	lookup(root, path)?.as_f64()
}

/// Non-negative count at `path`, accepting integral or float encodings.
pub fn u64_at(root: &Value, path: &[&str]) -> Option<u64> {
	let value = lookup(root, path)?;
	value.as_u64()
		.or_else(|| value.as_f64().map(|f| f.max(0.0).round() as u64))
}

/// String value at `path`.
pub fn str_at<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
	lookup(root, path)?.as_str()
}

/// Headline metrics derived from an iperf3 JSON document
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandwidthMetrics {
	pub bandwidth_mbps: f64,
	pub retransmits: u64,
	pub jitter_ms: f64,
	pub packet_loss_percent: f64,
}

impl BandwidthMetrics {
	/// Extract metrics from an iperf3 `-J` document.
	///
	/// Bandwidth prefers the receiver-side total and falls back to the
	/// sender-side total (reverse tests). Every metric degrades to zero
	/// when its field is missing.
	pub fn extract(payload: &Value) -> Self {
		let bits_per_second = f64_at(payload, &["end", "sum_received", "bits_per_second"])
			.or_else(|| f64_at(payload, &["end", "sum_sent", "bits_per_second"]));

		BandwidthMetrics {
			bandwidth_mbps: bits_per_second.map(|bps| bps / 1_000_000.0).unwrap_or(0.0),
			retransmits: u64_at(payload, &["end", "sum_sent", "retransmits"]).unwrap_or(0),
			jitter_ms: f64_at(payload, &["end", "sum", "jitter_ms"]).unwrap_or(0.0),
			packet_loss_percent: f64_at(payload, &["end", "sum", "lost_percent"]).unwrap_or(0.0),
		}
	}
}

/// Secondary connection details shown alongside aggregated results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadDetails {
	pub tcp_mss: Option<u64>,
	pub congestion_control: Option<String>,
	pub cpu_host_percent: Option<f64>,
	pub cpu_remote_percent: Option<f64>,
}

impl PayloadDetails {
	pub fn extract(payload: &Value) -> Self {
		PayloadDetails {
			tcp_mss: u64_at(payload, &["start", "tcp_mss_default"]),
			congestion_control: str_at(payload, &["end", "sender_tcp_congestion"]).map(String::from),
			cpu_host_percent: f64_at(payload, &["end", "cpu_utilization_percent", "host_total"]),
			cpu_remote_percent: f64_at(payload, &["end", "cpu_utilization_percent", "remote_total"]),
		}
	}
}

/// Diagnostic message iperf3 embeds in its JSON output on failure.
pub fn error_message(payload: &Value) -> Option<&str> {
	str_at(payload, &["error"]).filter(|s| !s.trim().is_empty())
}
