use serde::Serialize;
use tracing::debug;

use crate::iperf;
use crate::probe::ProbeRunner;
use crate::scenarios::Scenario;
use crate::stats::median;
use crate::types::{AggregatedResult, BenchmarkConfig, ResolutionResult, TrialResult};

/// Separator between individual trial errors in a failed aggregate
pub const ERROR_SEPARATOR: &str = "; ";

/// Results of one run, in the order they were produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunResults {
	pub iperf_tests: Vec<AggregatedResult>,
	pub dns_tests: Vec<ResolutionResult>,
}

impl RunResults {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn record_bandwidth(&mut self, result: AggregatedResult) {
		self.iperf_tests.push(result);
	}

	pub fn record_resolutions(&mut self, results: impl IntoIterator<Item = ResolutionResult>) {
		self.dns_tests.extend(results);
	}
}

/// Reduce repeated trials of one (endpoint, scenario) pair to their medians.
///
/// Only successful trials contribute. If none succeeded the aggregate is
/// failed, carries every trial error, and keeps the median duration of all
/// trials as a cost signal.
pub fn aggregate_trials(endpoint: &str, scenario: &str, trials: Vec<TrialResult>) -> AggregatedResult {
	let trials_run = trials.len();
	let (successful, failed): (Vec<TrialResult>, Vec<TrialResult>) =
		trials.into_iter().partition(|t| t.success);

	if successful.is_empty() {
		let durations: Vec<f64> = failed.iter().map(|t| t.duration_secs).collect();
		let errors: Vec<&str> = failed.iter()
			.map(|t| t.error.as_deref().unwrap_or("Unknown"))
			.collect();
		return AggregatedResult {
			endpoint: endpoint.to_string(),
			scenario: scenario.to_string(),
			success: false,
			bandwidth_mbps: 0.0,
			retransmits: 0,
			jitter_ms: 0.0,
			packet_loss_percent: 0.0,
			duration_secs: median(&durations).unwrap_or(0.0),
			trials_run,
			trials_succeeded: 0,
			error: Some(errors.join(ERROR_SEPARATOR)),
			raw_payloads: Vec::new(),
		};
	}

	let med = |f: fn(&TrialResult) -> f64| {
		let values: Vec<f64> = successful.iter().map(f).collect();
		median(&values).unwrap_or(0.0)
	};
	let bandwidth_mbps = med(|t| t.bandwidth_mbps);
	let retransmits = med(|t| t.retransmits as f64).trunc() as u64;
	let jitter_ms = med(|t| t.jitter_ms);
	let packet_loss_percent = med(|t| t.packet_loss_percent);
	let duration_secs = med(|t| t.duration_secs);

	let trials_succeeded = successful.len();
	AggregatedResult {
		endpoint: endpoint.to_string(),
		scenario: scenario.to_string(),
		success: true,
		bandwidth_mbps,
		retransmits,
		jitter_ms,
		packet_loss_percent,
		duration_secs,
		trials_run,
		trials_succeeded,
		error: None,
		raw_payloads: successful.into_iter().map(|t| t.raw).collect(),
	}
}

/// Run the configured number of sequential trials and aggregate them.
///
/// Trials never overlap; `config.trial_pause` separates consecutive trials.
pub async fn run_scenario(
	runner: &dyn ProbeRunner,
	config: &BenchmarkConfig,
	endpoint: &str,
	scenario: &Scenario,
) -> AggregatedResult {
	let mut trials = Vec::with_capacity(config.trials);
	for i in 0..config.trials {
		if i > 0 && !config.trial_pause.is_zero() {
			tokio::time::sleep(config.trial_pause).await;
		}
		let trial = iperf::run_trial(runner, &config.iperf_bin, endpoint, scenario).await;
		debug!(
			endpoint = %trial.endpoint, scenario = %trial.scenario,
			trial = i + 1, success = trial.success, "trial finished",
		);
		trials.push(trial);
	}
	aggregate_trials(endpoint, &scenario.name, trials)
}
