use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Record types retained from the zone registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ZoneRecordType {
	A,
	#[serde(rename = "CNAME")]
	Cname,
}

/// Expected record for a single domain in the zone registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneRecord {
	pub domain: String,
	pub record_type: ZoneRecordType,
	/// IP literal for A records, canonical name for CNAME records
	pub target: String,
}

/// A DNS resolver to direct lookups at
#[derive(Debug, Clone)]
pub struct ResolverTarget {
	pub label: String,
	pub addr: SocketAddr,
}

/// How dig answers are requested and parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AnswerMode {
	/// `+short`: bare answer data, CNAMEs recognised by the literal token only
	Short,
	/// `+noall +answer`: full answer records with explicit types
	Typed,
}

/// Result of a single bandwidth invocation
#[derive(Debug, Clone)]
pub struct TrialResult {
	pub endpoint: String,
	pub scenario: String,
	pub success: bool,
	pub duration_secs: f64,
	pub bandwidth_mbps: f64,
	pub retransmits: u64,
	pub jitter_ms: f64,
	pub packet_loss_percent: f64,
	/// Parsed iperf3 document, `Value::Null` unless the trial succeeded
	pub raw: Value,
	pub error: Option<String>,
}

impl TrialResult {
	/// Build a failed trial with zeroed metrics.
	pub fn failed(endpoint: &str, scenario: &str, duration_secs: f64, error: String) -> Self {
		TrialResult {
			endpoint: endpoint.to_string(),
			scenario: scenario.to_string(),
			success: false,
			duration_secs,
			bandwidth_mbps: 0.0,
			retransmits: 0,
			jitter_ms: 0.0,
			packet_loss_percent: 0.0,
			raw: Value::Null,
			error: Some(error),
		}
	}
}

/// Median summary of the repeated trials of one (endpoint, scenario) pair
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedResult {
	#[serde(rename = "server")]
	pub endpoint: String,
	pub scenario: String,
	pub success: bool,
	pub bandwidth_mbps: f64,
	pub retransmits: u64,
	pub jitter_ms: f64,
	#[serde(rename = "packet_loss")]
	pub packet_loss_percent: f64,
	#[serde(rename = "duration")]
	pub duration_secs: f64,
	pub trials_run: usize,
	pub trials_succeeded: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	/// Raw iperf3 documents of every successful trial
	#[serde(rename = "all_raw_data")]
	pub raw_payloads: Vec<Value>,
}

/// Outcome classification of a DNS lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionStatus {
	Success,
	FailedValidation,
	FailedCgnValidation,
	Timeout,
	Error,
}

impl ResolutionStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			ResolutionStatus::Success => "SUCCESS",
			ResolutionStatus::FailedValidation => "FAILED_VALIDATION",
			ResolutionStatus::FailedCgnValidation => "FAILED_CGN_VALIDATION",
			ResolutionStatus::Timeout => "TIMEOUT",
			ResolutionStatus::Error => "ERROR",
		}
	}
}

impl fmt::Display for ResolutionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Result of one lookup of one domain against one resolver
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionResult {
	pub domain: String,
	/// Resolver label, `None` for the system default resolver
	#[serde(rename = "dns_server", serialize_with = "serialize_resolver")]
	pub resolver: Option<String>,
	pub success: bool,
	pub status: ResolutionStatus,
	pub response_time_ms: f64,
	pub query_time_ms: f64,
	#[serde(rename = "resolved_ips")]
	pub resolved_addresses: Vec<IpAddr>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

fn serialize_resolver<S: Serializer>(resolver: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
	s.serialize_str(resolver.as_deref().unwrap_or("system"))
}

impl ResolutionResult {
	/// Initial state of a lookup before anything has been attempted.
	pub fn pending(domain: &str, resolver: Option<&ResolverTarget>) -> Self {
		ResolutionResult {
			domain: domain.to_string(),
			resolver: resolver.map(|r| r.label.clone()),
			success: false,
			status: ResolutionStatus::FailedValidation,
			response_time_ms: 0.0,
			query_time_ms: 0.0,
			resolved_addresses: Vec::new(),
			error: None,
		}
	}

	/// Resolver name for display, "system" for the default resolver.
	pub fn resolver_name(&self) -> &str {
		self.resolver.as_deref().unwrap_or("system")
	}
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
	pub trials: usize,
	pub trial_pause: Duration,
	pub scenario_pause: Duration,
	pub dns_workers: usize,
	pub dns_timeout: Duration,
	pub dig_time_secs: u32,
	pub dig_tries: u32,
	pub answer_mode: AnswerMode,
	pub iperf_bin: String,
	pub dig_bin: String,
}

impl Default for BenchmarkConfig {
	fn default() -> Self {
		BenchmarkConfig {
			trials: 5,
			trial_pause: Duration::from_secs(1),
			scenario_pause: Duration::from_secs(1),
			dns_workers: 5,
			dns_timeout: Duration::from_secs(10),
			dig_time_secs: 5,
			dig_tries: 3,
			answer_mode: AnswerMode::Short,
			iperf_bin: "iperf3".to_string(),
			dig_bin: "dig".to_string(),
		}
	}
}
