use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use crate::aggregate::RunResults;
use crate::payload::PayloadDetails;
use crate::scenarios::Scenario;
use crate::stats::{summarize, Summary};
use crate::types::{AggregatedResult, BenchmarkConfig, ResolutionResult, ResolutionStatus};

const RULE: &str = "================================================================================";
const SUB_RULE: &str = "----------------------------------------";

fn fmt_opt<T: std::fmt::Display>(value: Option<T>) -> String {
	value.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
}

fn fmt_std(summary: &Summary) -> String {
	summary.stddev.map(|s| format!("{:.2}", s)).unwrap_or_else(|| "n/a".to_string())
}

/// Print a summary of the run configuration before testing starts.
pub fn print_config_summary(
	endpoints: &[String],
	scenarios: &[Scenario],
	resolver_names: &[String],
	domain_count: usize,
	config: &BenchmarkConfig,
) {
	println!("Network Performance Testing Suite");
	println!("=================================");
	println!("iperf3 servers: {}", endpoints.len());
	for e in endpoints {
		println!("  - {}", e);
	}
	println!("Scenarios:      {}", scenarios.len());
	println!("Trials:         {} per scenario", config.trials);
	println!("DNS servers:    {}", resolver_names.len());
	for r in resolver_names {
		println!("  - {}", r);
	}
	println!("Zone domains:   {}", domain_count);
	println!("DNS workers:    {}", config.dns_workers);
	println!("Answer mode:    {:?}", config.answer_mode);
	println!();
}

/// Print one aggregated bandwidth result as a console block.
pub fn print_bandwidth_result(result: &AggregatedResult) {
	println!("  {}", "-".repeat(60));
	if result.success {
		println!("  OK   {} -> {}", result.scenario, result.endpoint);
		println!("     Median Bandwidth: {:.2} Mbps", result.bandwidth_mbps);
		if result.retransmits > 0 {
			println!("     Median Retransmits: {}", result.retransmits);
		}
		if result.jitter_ms > 0.0 {
			println!("     Median Jitter: {:.2} ms", result.jitter_ms);
		}
		if result.packet_loss_percent > 0.0 {
			println!("     Median Packet Loss: {:.2}%", result.packet_loss_percent);
		}
		println!("     Median Duration: {:.1}s", result.duration_secs);
		println!("     Trials: {}/{} succeeded", result.trials_succeeded, result.trials_run);
		if let Some(raw) = result.raw_payloads.first() {
			let details = PayloadDetails::extract(raw);
			println!("     TCP MSS: {}", fmt_opt(details.tcp_mss));
			println!("     Congestion Control: {}", fmt_opt(details.congestion_control));
			println!(
				"     CPU Utilization (Host/Remote): {}% / {}%",
				fmt_opt(details.cpu_host_percent.map(|c| format!("{:.1}", c))),
				fmt_opt(details.cpu_remote_percent.map(|c| format!("{:.1}", c))),
			);
		}
	} else {
		println!("  FAIL {} -> {}", result.scenario, result.endpoint);
		println!("     Error: {}", result.error.as_deref().unwrap_or("Unknown error"));
	}
	println!("  {}", "-".repeat(60));
}

/// Print one DNS lookup result as a single line.
pub fn print_resolution_result(result: &ResolutionResult) {
	if result.success {
		let ips: Vec<String> = result.resolved_addresses.iter().map(|ip| ip.to_string()).collect();
		println!(
			"  OK   {} ({}): {:.2} ms, IPs: {}",
			result.domain, result.resolver_name(), result.query_time_ms, ips.join(", "),
		);
	} else {
		println!(
			"  FAIL {} ({}): {} - {}",
			result.domain, result.resolver_name(), result.status,
			result.error.as_deref().unwrap_or(""),
		);
	}
}

/// Group items by a key while keeping first-seen key order.
fn group_by<'a, T>(items: &'a [&'a T], key: impl Fn(&T) -> &str) -> Vec<(String, Vec<&'a T>)> {
	let mut order: Vec<String> = Vec::new();
	let mut groups: BTreeMap<String, Vec<&T>> = BTreeMap::new();
	for item in items {
		let k = key(item).to_string();
		if !groups.contains_key(&k) {
			order.push(k.clone());
		}
		groups.entry(k).or_default().push(*item);
	}
	order.into_iter()
		.map(|k| {
			let members = groups.remove(&k).unwrap_or_default();
			(k, members)
		})
		.collect()
}

fn push_summary(report: &mut Vec<String>, title: &str, summary: &Summary, full: bool) {
	report.push(format!("{}:", title));
	report.push(format!("  Average: {:.2}", summary.mean));
	report.push(format!("  Median:  {:.2}", summary.median));
	if full {
		report.push(format!("  Samples: {}", summary.count));
		report.push(format!("  Min:     {:.2}", summary.min));
		report.push(format!("  Max:     {:.2}", summary.max));
		report.push(format!("  Std Dev: {}", fmt_std(summary)));
	}
}

/// Render the human-readable bandwidth report.
pub fn bandwidth_report(results: &[AggregatedResult]) -> String {
	if results.is_empty() {
		return "No iperf test results available.".to_string();
	}
	let successful: Vec<&AggregatedResult> = results.iter().filter(|r| r.success).collect();
	if successful.is_empty() {
		return "No successful iperf tests completed.".to_string();
	}

	let mut report = vec![
		RULE.to_string(),
		"IPERF3 PERFORMANCE ANALYSIS REPORT".to_string(),
		RULE.to_string(),
		format!("Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
		format!("Total tests: {}", results.len()),
		format!("Successful: {}", successful.len()),
		format!("Failed: {}", results.len() - successful.len()),
		String::new(),
	];

	let groups = group_by(&successful, |r| r.endpoint.as_str());
	for (endpoint, members) in &groups {
		report.push(format!("Server: {}", endpoint));
		report.push(SUB_RULE.to_string());

		let column = |f: fn(&AggregatedResult) -> f64| -> Vec<f64> {
			members.iter().map(|r| f(r)).collect()
		};
		if let Some(s) = summarize(&column(|r| r.bandwidth_mbps)) {
			push_summary(&mut report, "Bandwidth Statistics (Mbps)", &s, true);
		}
		if let Some(s) = summarize(&column(|r| r.retransmits as f64)) {
			push_summary(&mut report, "Retransmits Statistics", &s, false);
		}
		if let Some(s) = summarize(&column(|r| r.jitter_ms)) {
			push_summary(&mut report, "Jitter Statistics (ms)", &s, false);
		}
		if let Some(s) = summarize(&column(|r| r.packet_loss_percent)) {
			push_summary(&mut report, "Packet Loss Statistics (%)", &s, false);
		}
		report.push(String::new());

		let mut top: Vec<&AggregatedResult> = members.clone();
		top.sort_by(|a, b| b.bandwidth_mbps.total_cmp(&a.bandwidth_mbps));
		report.push("Top 3 Performing Scenarios (by Bandwidth):".to_string());
		for r in top.iter().take(3) {
			report.push(format!(
				"  {}: {:.2} Mbps (Retransmits: {})", r.scenario, r.bandwidth_mbps, r.retransmits,
			));
		}
		report.push(String::new());
	}

	if groups.len() > 1 {
		report.push("SERVER COMPARISON (Median Bandwidth Mbps)".to_string());
		report.push(SUB_RULE.to_string());
		let mut table = Table::new();
		table.load_preset(UTF8_FULL);
		table.set_content_arrangement(ContentArrangement::Dynamic);
		table.set_header(vec!["Server", "Mean", "Median", "Std", "Min", "Max"]);
		for (endpoint, members) in &groups {
			let values: Vec<f64> = members.iter().map(|r| r.bandwidth_mbps).collect();
			if let Some(s) = summarize(&values) {
				table.add_row(vec![
					endpoint.clone(),
					format!("{:.2}", s.mean),
					format!("{:.2}", s.median),
					fmt_std(&s),
					format!("{:.2}", s.min),
					format!("{:.2}", s.max),
				]);
			}
		}
		report.push(table.to_string());
		report.push(String::new());
	}

	report.join("\n")
}

/// Render the human-readable DNS report.
pub fn dns_report(results: &[ResolutionResult]) -> String {
	if results.is_empty() {
		return "No DNS test results available.".to_string();
	}
	let successful: Vec<&ResolutionResult> = results.iter()
		.filter(|r| r.success && r.status == ResolutionStatus::Success)
		.collect();
	let failed: Vec<&ResolutionResult> = results.iter().filter(|r| !r.success).collect();

	let mut report = vec![
		RULE.to_string(),
		"DNS PERFORMANCE ANALYSIS REPORT".to_string(),
		RULE.to_string(),
		format!("Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
		format!("Total DNS queries attempted: {}", results.len()),
		format!("Successful DNS queries (CGN Validated): {}", successful.len()),
		format!("Failed DNS queries: {}", failed.len()),
		String::new(),
	];

	if successful.is_empty() {
		report.push("No successful DNS tests passed CGN validation.".to_string());
	} else {
		for (server, members) in group_by(&successful, |r| r.resolver_name()) {
			report.push(format!("DNS Server: {}", server));
			report.push(SUB_RULE.to_string());

			let times: Vec<f64> = members.iter().map(|r| r.query_time_ms).collect();
			if let Some(s) = summarize(&times) {
				push_summary(&mut report, "Query Time Statistics (ms)", &s, true);
			}
			report.push(String::new());

			let mut slowest = members.clone();
			slowest.sort_by(|a, b| b.query_time_ms.total_cmp(&a.query_time_ms));
			report.push("5 Slowest Domains (CGN Validated):".to_string());
			for r in slowest.iter().take(5) {
				let ips: Vec<String> = r.resolved_addresses.iter().map(|ip| ip.to_string()).collect();
				report.push(format!("  {}: {:.2} ms (IPs: {})", r.domain, r.query_time_ms, ips.join(", ")));
			}
			report.push(String::new());
		}
	}

	if !failed.is_empty() {
		report.push("FAILED DNS QUERIES SUMMARY".to_string());
		report.push(SUB_RULE.to_string());
		let mut table = Table::new();
		table.load_preset(UTF8_FULL);
		table.set_content_arrangement(ContentArrangement::Dynamic);
		table.set_header(vec!["Domain", "Server", "Status", "Error"]);
		for r in &failed {
			table.add_row(vec![
				r.domain.clone(),
				r.resolver_name().to_string(),
				r.status.to_string(),
				r.error.clone().unwrap_or_default(),
			]);
		}
		report.push(table.to_string());
		report.push(String::new());
	}

	report.join("\n")
}

/// Write the full results document as pretty JSON.
pub fn write_json(path: &Path, results: &RunResults) -> Result<()> {
	let file = std::fs::File::create(path)
		.with_context(|| format!("failed to create results file '{}'", path.display()))?;
	let mut writer = BufWriter::new(file);
	serde_json::to_writer_pretty(&mut writer, results)
		.with_context(|| format!("failed to write results file '{}'", path.display()))?;
	writer.flush()?;
	println!("Results saved to: {}", path.display());
	Ok(())
}

/// Write one row per bandwidth aggregate to a CSV file.
pub fn write_bandwidth_csv(path: &Path, results: &[AggregatedResult]) -> Result<()> {
	let mut writer = csv::Writer::from_path(path)?;

	writer.write_record([
		"server", "scenario", "success",
		"bandwidth_mbps", "retransmits", "jitter_ms", "packet_loss",
		"duration", "trials_run", "trials_succeeded", "error",
	])?;

	for r in results {
		writer.write_record([
			r.endpoint.clone(),
			r.scenario.clone(),
			r.success.to_string(),
			format!("{:.2}", r.bandwidth_mbps),
			r.retransmits.to_string(),
			format!("{:.3}", r.jitter_ms),
			format!("{:.3}", r.packet_loss_percent),
			format!("{:.2}", r.duration_secs),
			r.trials_run.to_string(),
			r.trials_succeeded.to_string(),
			r.error.clone().unwrap_or_default(),
		])?;
	}

	writer.flush()?;
	Ok(())
}

/// Write one row per DNS lookup to a CSV file.
pub fn write_dns_csv(path: &Path, results: &[ResolutionResult]) -> Result<()> {
	let mut writer = csv::Writer::from_path(path)?;

	writer.write_record([
		"domain", "dns_server", "success", "status",
		"response_time_ms", "query_time_ms", "resolved_ips", "error",
	])?;

	for r in results {
		let ips: Vec<String> = r.resolved_addresses.iter().map(|ip| ip.to_string()).collect();
		writer.write_record([
			r.domain.clone(),
			r.resolver_name().to_string(),
			r.success.to_string(),
			r.status.to_string(),
			format!("{:.2}", r.response_time_ms),
			format!("{:.2}", r.query_time_ms),
			ips.join(" "),
			r.error.clone().unwrap_or_default(),
		])?;
	}

	writer.flush()?;
	Ok(())
}

/// Persist the results document and CSV exports into `dir`.
///
/// Returns the path of the JSON document.
pub fn save_all(dir: &Path, results: &RunResults) -> Result<PathBuf> {
	std::fs::create_dir_all(dir)
		.with_context(|| format!("failed to create output directory '{}'", dir.display()))?;
	let stamp = Local::now().format("%Y%m%d_%H%M%S");
	let json_path = dir.join(format!("results_{}.json", stamp));
	write_json(&json_path, results)?;
	if !results.iperf_tests.is_empty() {
		write_bandwidth_csv(&dir.join("iperf_summary.csv"), &results.iperf_tests)?;
	}
	if !results.dns_tests.is_empty() {
		write_dns_csv(&dir.join("dns_results.csv"), &results.dns_tests)?;
	}
	Ok(json_path)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::TrialResult;
	use crate::aggregate::aggregate_trials;
	use serde_json::json;

	fn aggregate(endpoint: &str, scenario: &str, mbps: f64) -> AggregatedResult {
		let mut trial = TrialResult::failed(endpoint, scenario, 10.0, String::new());
		trial.success = true;
		trial.error = None;
		trial.bandwidth_mbps = mbps;
		trial.raw = json!({ "end": { "sum_received": { "bits_per_second": mbps * 1e6 } } });
		aggregate_trials(endpoint, scenario, vec![trial])
	}

	fn lookup(domain: &str, resolver: Option<&str>, status: ResolutionStatus, ms: f64) -> ResolutionResult {
		ResolutionResult {
			domain: domain.to_string(),
			resolver: resolver.map(String::from),
			success: status == ResolutionStatus::Success,
			status,
			response_time_ms: ms,
			query_time_ms: if status == ResolutionStatus::Success { ms } else { 0.0 },
			resolved_addresses: vec!["100.64.1.5".parse().unwrap()],
			error: (status != ResolutionStatus::Success).then(|| "bad answer".to_string()),
		}
	}

	#[test]
	fn test_bandwidth_report_empty_and_all_failed() {
		assert_eq!(bandwidth_report(&[]), "No iperf test results available.");
		let failed = aggregate_trials("a", "s", vec![TrialResult::failed("a", "s", 1.0, "Timeout".into())]);
		assert_eq!(bandwidth_report(&[failed]), "No successful iperf tests completed.");
	}

	#[test]
	fn test_bandwidth_report_content() {
		let results = vec![
			aggregate("a.local", "slow", 100.0),
			aggregate("a.local", "fast", 900.0),
			aggregate("a.local", "mid", 500.0),
			aggregate("a.local", "tiny", 10.0),
			aggregate("b.local", "fast", 800.0),
		];
		let report = bandwidth_report(&results);
		assert!(report.contains("Total tests: 5"));
		assert!(report.contains("Server: a.local"));
		assert!(report.contains("Server: b.local"));
		assert!(report.contains("  fast: 900.00 Mbps"));
		assert!(!report.contains("  tiny: 10.00 Mbps"));
		assert!(report.contains("SERVER COMPARISON"));
		// a.local appears before b.local
		assert!(report.find("Server: a.local").unwrap() < report.find("Server: b.local").unwrap());
	}

	#[test]
	fn test_dns_report_content() {
		let results = vec![
			lookup("a.example", None, ResolutionStatus::Success, 12.0),
			lookup("b.example", None, ResolutionStatus::Success, 30.0),
			lookup("a.example", Some("8.8.8.8"), ResolutionStatus::FailedCgnValidation, 20.0),
		];
		let report = dns_report(&results);
		assert!(report.contains("Total DNS queries attempted: 3"));
		assert!(report.contains("Successful DNS queries (CGN Validated): 2"));
		assert!(report.contains("DNS Server: system"));
		assert!(report.contains("b.example: 30.00 ms"));
		assert!(report.contains("FAILED DNS QUERIES SUMMARY"));
		assert!(report.contains("FAILED_CGN_VALIDATION"));
		assert_eq!(dns_report(&[]), "No DNS test results available.");
	}

	#[test]
	fn test_save_all_writes_documents() {
		let dir = tempfile::tempdir().unwrap();
		let out = dir.path().join("nested");
		let mut results = RunResults::new();
		results.record_bandwidth(aggregate("a.local", "fast", 900.0));
		results.record_resolutions(vec![lookup("a.example", None, ResolutionStatus::Success, 5.0)]);

		let json_path = save_all(&out, &results).unwrap();
		let doc: serde_json::Value =
			serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
		assert_eq!(doc["iperf_tests"][0]["server"], "a.local");
		assert_eq!(doc["iperf_tests"][0]["bandwidth_mbps"], 900.0);
		assert_eq!(doc["iperf_tests"][0]["packet_loss"], 0.0);
		assert_eq!(doc["iperf_tests"][0]["duration"], 10.0);
		assert_eq!(doc["iperf_tests"][0]["all_raw_data"].as_array().unwrap().len(), 1);
		assert_eq!(doc["dns_tests"][0]["status"], "SUCCESS");
		assert_eq!(doc["dns_tests"][0]["dns_server"], "system");
		assert_eq!(doc["dns_tests"][0]["resolved_ips"][0], "100.64.1.5");

		let csv = std::fs::read_to_string(out.join("iperf_summary.csv")).unwrap();
		assert!(csv.starts_with("server,scenario,success"));
		assert!(csv.starts_with("server,scenario,success,bandwidth_mbps,retransmits,jitter_ms,packet_loss,duration,"));
		assert!(csv.contains("a.local,fast,true,900.00"));
		let dns_csv = std::fs::read_to_string(out.join("dns_results.csv")).unwrap();
		assert!(dns_csv.starts_with("domain,dns_server,success,status,response_time_ms,query_time_ms,resolved_ips,error"));
		assert!(dns_csv.contains("a.example,system,true,SUCCESS"));
	}
}
