use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use crate::payload::{self, BandwidthMetrics};
use crate::probe::{ProbeError, ProbeRunner};
use crate::scenarios::Scenario;
use crate::types::TrialResult;

/// Run one iperf3 invocation of a scenario against an endpoint.
///
/// Never fails: timeouts, launch failures, non-zero exits and unparseable
/// output all come back as a failed TrialResult.
pub async fn run_trial(
	runner: &dyn ProbeRunner,
	program: &str,
	endpoint: &str,
	scenario: &Scenario,
) -> TrialResult {
	let args = scenario.command_args(endpoint);
	let timeout = scenario.timeout();

	let start = Instant::now();
	let outcome = runner.run(program, &args, timeout).await;
	let elapsed = start.elapsed().as_secs_f64();

	let output = match outcome {
		Ok(output) => output,
		Err(ProbeError::Timeout(_)) => {
			debug!(endpoint, scenario = %scenario.name, ?timeout, "iperf3 trial timed out");
			return TrialResult::failed(
				endpoint, &scenario.name, timeout.as_secs_f64(), "Timeout".to_string(),
			);
		}
		Err(e) => {
			debug!(endpoint, scenario = %scenario.name, error = %e, "iperf3 could not run");
			return TrialResult::failed(endpoint, &scenario.name, elapsed, e.to_string());
		}
	};

	if !output.success() || output.stdout.trim().is_empty() {
		let error = failure_message(&output.stderr, &output.stdout);
		debug!(endpoint, scenario = %scenario.name, code = ?output.exit_code, %error, "iperf3 trial failed");
		return TrialResult::failed(endpoint, &scenario.name, elapsed, error);
	}

	let raw: Value = match serde_json::from_str(&output.stdout) {
		Ok(v) => v,
		Err(_) => {
			return TrialResult::failed(
				endpoint, &scenario.name, elapsed, "Invalid JSON output".to_string(),
			);
		}
	};

	let metrics = BandwidthMetrics::extract(&raw);
	debug!(endpoint, scenario = %scenario.name, mbps = metrics.bandwidth_mbps, "iperf3 trial complete");
	TrialResult {
		endpoint: endpoint.to_string(),
		scenario: scenario.name.clone(),
		success: true,
		duration_secs: elapsed,
		bandwidth_mbps: metrics.bandwidth_mbps,
		retransmits: metrics.retransmits,
		jitter_ms: metrics.jitter_ms,
		packet_loss_percent: metrics.packet_loss_percent,
		raw,
		error: None,
	}
}

/// Pick the best diagnostic for a failed invocation.
///
/// stderr wins; otherwise iperf3's JSON `error` field; otherwise a fixed message.
fn failure_message(stderr: &str, stdout: &str) -> String {
	let stderr = stderr.trim();
	if !stderr.is_empty() {
		return stderr.to_string();
	}
	serde_json::from_str::<Value>(stdout)
		.ok()
		.and_then(|v| payload::error_message(&v).map(String::from))
		.unwrap_or_else(|| "Unknown error".to_string())
}
