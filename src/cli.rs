use clap::Parser;

use crate::types::AnswerMode;

/// Network path benchmark: iperf3 throughput trials and CGN-validated DNS lookups
#[derive(Parser, Debug)]
#[command(name = "netperf-bench")]
#[command(about = "Benchmark iperf3 throughput and validate DNS resolution against a zone file")]
pub struct Cli {
	/// iperf3 servers to test
	#[arg(long = "iperf-servers", num_args = 1..)]
	pub iperf_servers: Vec<String>,

	/// DNS servers to test (e.g. 8.8.8.8 or 1.1.1.1:53); defaults to 8.8.8.8 and 1.1.1.1
	#[arg(long = "dns-servers", num_args = 1..)]
	pub dns_servers: Vec<String>,

	/// File containing DNS server addresses (one per line)
	#[arg(long = "dns-server-file")]
	pub dns_server_file: Option<String>,

	/// Do not test the system default resolver
	#[arg(long = "no-system-dns")]
	pub no_system_dns: bool,

	/// Skip iperf3 tests
	#[arg(long = "skip-iperf")]
	pub skip_iperf: bool,

	/// Skip DNS tests
	#[arg(long = "skip-dns")]
	pub skip_dns: bool,

	/// Output directory for results
	#[arg(short = 'o', long = "output-dir", default_value = "performance_results")]
	pub output_dir: String,

	/// Zone file listing the domains to test and their expected records
	#[arg(short = 'z', long = "zone-file", default_value = "zone.txt")]
	pub zone_file: String,

	/// Only run scenarios whose name contains this text (repeatable)
	#[arg(long = "scenario")]
	pub scenarios: Vec<String>,

	/// Print the scenario catalogue and exit
	#[arg(long = "list-scenarios")]
	pub list_scenarios: bool,

	/// Trials per scenario and server
	#[arg(short = 'n', long = "trials", default_value = "5")]
	pub trials: usize,

	/// Pause between trials in milliseconds
	#[arg(long = "trial-pause-ms", default_value = "1000")]
	pub trial_pause_ms: u64,

	/// Pause between scenarios in milliseconds
	#[arg(long = "scenario-pause-ms", default_value = "1000")]
	pub scenario_pause_ms: u64,

	/// Maximum concurrent DNS lookups per resolver
	#[arg(long = "dns-workers", default_value = "5")]
	pub dns_workers: usize,

	/// How dig answers are requested and parsed
	#[arg(long = "answer-mode", value_enum, default_value = "short")]
	pub answer_mode: AnswerMode,

	/// iperf3 executable
	#[arg(long = "iperf-bin", default_value = "iperf3")]
	pub iperf_bin: String,

	/// dig executable
	#[arg(long = "dig-bin", default_value = "dig")]
	pub dig_bin: String,

	/// Log level used when RUST_LOG is not set
	#[arg(long = "log-level", default_value = "warn")]
	pub log_level: String,
}
