use std::net::IpAddr;
use std::time::Instant;

use hickory_proto::rr::RecordType;
use tracing::debug;

use crate::policy::{CGN_BLOCK, is_in_policy_block};
use crate::probe::{ProbeError, ProbeRunner};
use crate::types::{AnswerMode, BenchmarkConfig, ResolutionResult, ResolutionStatus, ResolverTarget};
use crate::zone::{parse_record_line, ZoneRegistry};

/// Addresses and CNAME continuations recovered from dig output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedAnswer {
	pub addresses: Vec<IpAddr>,
	pub cname_lines: usize,
}

/// Build the dig argument list for one lookup.
pub fn dig_args(
	config: &BenchmarkConfig,
	domain: &str,
	resolver: Option<&ResolverTarget>,
) -> Vec<String> {
	let mut args = vec![
		format!("+time={}", config.dig_time_secs),
		format!("+tries={}", config.dig_tries),
	];
	match config.answer_mode {
		AnswerMode::Short => args.push("+short".to_string()),
		AnswerMode::Typed => {
			args.push("+noall".to_string());
			args.push("+answer".to_string());
		}
	}
	if let Some(r) = resolver {
		args.push(format!("@{}", r.addr.ip()));
		if r.addr.port() != 53 {
			args.push("-p".to_string());
			args.push(r.addr.port().to_string());
		}
	}
	args.push(domain.to_string());
	args
}

/// Parse `+short` output.
///
/// Short output carries no record types, so a line counts as a CNAME
/// continuation only if it contains the literal token "CNAME". Lines that
/// are neither that nor an address literal are dropped.
pub fn parse_short_answer(stdout: &str) -> ParsedAnswer {
	let mut parsed = ParsedAnswer::default();
	for line in stdout.lines() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}
		if line.contains("CNAME") {
			parsed.cname_lines += 1;
		} else if let Ok(ip) = line.parse::<IpAddr>() {
			parsed.addresses.push(ip);
		}
	}
	parsed
}

/// Parse `+noall +answer` output using the explicit record type column.
pub fn parse_typed_answer(stdout: &str) -> ParsedAnswer {
	let mut parsed = ParsedAnswer::default();
	for line in stdout.lines() {
		let line = line.trim();
		if line.is_empty() || line.starts_with(';') {
			continue;
		}
		let Some(rec) = parse_record_line(line) else {
			continue;
		};
		match rec.record_type {
			RecordType::CNAME => parsed.cname_lines += 1,
			RecordType::A | RecordType::AAAA => {
				if let Ok(ip) = rec.data.parse::<IpAddr>() {
					parsed.addresses.push(ip);
				}
			}
			_ => {}
		}
	}
	parsed
}

/// Resolve one registered domain against one resolver and validate the answer.
///
/// Domains missing from the registry fail validation without running dig.
/// A lookup succeeds only if at least one resolved address is inside the
/// CGN block.
pub async fn run_trial(
	runner: &dyn ProbeRunner,
	registry: &ZoneRegistry,
	config: &BenchmarkConfig,
	domain: &str,
	resolver: Option<&ResolverTarget>,
) -> ResolutionResult {
	let mut result = ResolutionResult::pending(domain, resolver);

	let Some(expected) = registry.get(domain) else {
		result.error = Some(format!("Domain '{}' not found in the zone registry.", domain));
		return result;
	};
	debug!(domain, expected_type = ?expected.record_type, expected_target = %expected.target, "resolving");

	let args = dig_args(config, domain, resolver);
	let start = Instant::now();
	let outcome = runner.run(&config.dig_bin, &args, config.dns_timeout).await;
	let response_time_ms = start.elapsed().as_secs_f64() * 1000.0;

	let output = match outcome {
		Ok(output) => output,
		Err(ProbeError::Timeout(_)) => {
			result.response_time_ms = config.dns_timeout.as_secs_f64() * 1000.0;
			result.status = ResolutionStatus::Timeout;
			result.error = Some("Timeout".to_string());
			return result;
		}
		Err(e) => {
			result.status = ResolutionStatus::Error;
			result.error = Some(format!("An unexpected error occurred: {}", e));
			return result;
		}
	};
	result.response_time_ms = response_time_ms;

	if !output.success() {
		let stderr = output.stderr.trim();
		result.error = Some(if stderr.is_empty() {
			"dig command failed".to_string()
		} else {
			stderr.to_string()
		});
		return result;
	}

	let parsed = match config.answer_mode {
		AnswerMode::Short => parse_short_answer(&output.stdout),
		AnswerMode::Typed => parse_typed_answer(&output.stdout),
	};
	result.resolved_addresses = parsed.addresses;

	if parsed.cname_lines > 0 && result.resolved_addresses.is_empty() {
		result.error = Some(format!("CNAME chain for '{}' did not resolve to an A record.", domain));
		return result;
	}

	let in_block = result.resolved_addresses.iter()
		.any(|ip| is_in_policy_block(&ip.to_string()));
	if in_block {
		result.success = true;
		result.status = ResolutionStatus::Success;
		result.query_time_ms = response_time_ms;
	} else {
		result.status = ResolutionStatus::FailedCgnValidation;
		result.error = Some(format!("Resolved IP(s) not within {} CGN range.", CGN_BLOCK));
	}
	debug!(domain, resolver = result.resolver_name(), status = %result.status, "lookup complete");
	result
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::probe::testing::{failed_output, launch_error, FakeRunner};
	use std::time::Duration;

	fn registry() -> ZoneRegistry {
		ZoneRegistry::parse("a.example. 300 IN A 100.64.1.5\nb.example. 300 IN CNAME a.example.\n")
	}

	fn google() -> ResolverTarget {
		ResolverTarget { label: "8.8.8.8".to_string(), addr: "8.8.8.8:53".parse().unwrap() }
	}

	#[tokio::test]
	async fn test_cgn_address_succeeds() {
		let runner = FakeRunner::stdout("100.64.1.5\n");
		let config = BenchmarkConfig::default();
		let result = run_trial(&runner, &registry(), &config, "a.example", None).await;
		assert!(result.success);
		assert_eq!(result.status, ResolutionStatus::Success);
		assert_eq!(result.resolved_addresses, vec!["100.64.1.5".parse::<IpAddr>().unwrap()]);
		assert_eq!(result.query_time_ms, result.response_time_ms);
		assert!(result.resolver.is_none());
		assert!(result.error.is_none());
	}

	#[tokio::test]
	async fn test_public_address_fails_cgn_validation() {
		let runner = FakeRunner::stdout("8.8.8.8\n");
		let config = BenchmarkConfig::default();
		let result = run_trial(&runner, &registry(), &config, "a.example", None).await;
		assert!(!result.success);
		assert_eq!(result.status, ResolutionStatus::FailedCgnValidation);
		assert_eq!(result.query_time_ms, 0.0);
		assert!(result.error.unwrap().contains("100.64.0.0/10"));
	}

	#[tokio::test]
	async fn test_unregistered_domain_never_invokes_dig() {
		let runner = FakeRunner::stdout("100.64.1.5\n");
		let config = BenchmarkConfig::default();
		let result = run_trial(&runner, &registry(), &config, "c.example", Some(&google())).await;
		assert!(!result.success);
		assert_eq!(result.status, ResolutionStatus::FailedValidation);
		assert_eq!(result.resolver.as_deref(), Some("8.8.8.8"));
		assert_eq!(runner.call_count(), 0);
	}

	#[tokio::test]
	async fn test_dig_invocation() {
		let runner = FakeRunner::stdout("100.64.1.5\n");
		let config = BenchmarkConfig::default();
		run_trial(&runner, &registry(), &config, "a.example", Some(&google())).await;
		let calls = runner.calls();
		assert_eq!(calls[0].program, "dig");
		assert_eq!(calls[0].args, vec!["+time=5", "+tries=3", "+short", "@8.8.8.8", "a.example"]);
		assert_eq!(calls[0].timeout, Duration::from_secs(10));
	}

	#[tokio::test]
	async fn test_nonzero_exit_keeps_validation_status() {
		let runner = FakeRunner::new(|_, _| Ok(failed_output(9, "")));
		let config = BenchmarkConfig::default();
		let result = run_trial(&runner, &registry(), &config, "a.example", None).await;
		assert_eq!(result.status, ResolutionStatus::FailedValidation);
		assert_eq!(result.error.as_deref(), Some("dig command failed"));
		assert!(result.resolved_addresses.is_empty());
	}

	#[tokio::test]
	async fn test_timeout_uses_sentinel() {
		let runner = FakeRunner::new(|_, _| Err(ProbeError::Timeout(Duration::from_secs(10))));
		let config = BenchmarkConfig::default();
		let result = run_trial(&runner, &registry(), &config, "a.example", None).await;
		assert_eq!(result.status, ResolutionStatus::Timeout);
		assert_eq!(result.response_time_ms, 10000.0);
		assert_eq!(result.error.as_deref(), Some("Timeout"));
	}

	#[tokio::test]
	async fn test_launch_failure_is_error() {
		let runner = FakeRunner::new(|_, _| Err(launch_error("dig")));
		let config = BenchmarkConfig::default();
		let result = run_trial(&runner, &registry(), &config, "a.example", None).await;
		assert_eq!(result.status, ResolutionStatus::Error);
		assert!(result.error.unwrap().contains("failed to launch 'dig'"));
	}

	#[tokio::test]
	async fn test_unresolved_cname_chain() {
		let runner = FakeRunner::stdout("a.example. CNAME\n");
		let config = BenchmarkConfig::default();
		let result = run_trial(&runner, &registry(), &config, "b.example", None).await;
		assert_eq!(result.status, ResolutionStatus::FailedValidation);
		assert!(result.error.unwrap().contains("did not resolve"));
	}

	#[tokio::test]
	async fn test_typed_mode_detects_cname_chain() {
		let runner = FakeRunner::stdout("b.example.\t300\tIN\tCNAME\ta.example.\n");
		let config = BenchmarkConfig { answer_mode: AnswerMode::Typed, ..BenchmarkConfig::default() };
		let result = run_trial(&runner, &registry(), &config, "b.example", None).await;
		assert_eq!(result.status, ResolutionStatus::FailedValidation);
		assert_eq!(runner.calls()[0].args[2..4], ["+noall".to_string(), "+answer".to_string()]);
	}

	#[test]
	fn test_short_parser_drops_garbage() {
		let parsed = parse_short_answer("a.example.\n100.64.1.5\n;; connection timed out\n\n2001:db8::1\n999.1.1.1\n");
		assert_eq!(parsed.cname_lines, 0);
		assert_eq!(parsed.addresses.len(), 2);
		assert_eq!(parsed.addresses[1].to_string(), "2001:db8::1");
	}

	#[test]
	fn test_typed_parser() {
		let out = "\
b.example.		300	IN	CNAME	a.example.
a.example.		300	IN	A	100.64.1.5
a.example.		300	IN	AAAA	2001:db8::5
a.example.		300	IN	TXT	\"note\"
;; Query time: 3 msec
";
		let parsed = parse_typed_answer(out);
		assert_eq!(parsed.cname_lines, 1);
		assert_eq!(parsed.addresses.len(), 2);
	}

	#[test]
	fn test_custom_port() {
		let target = ResolverTarget { label: "local".to_string(), addr: "127.0.0.1:5353".parse().unwrap() };
		let args = dig_args(&BenchmarkConfig::default(), "a.example", Some(&target));
		assert_eq!(&args[3..], ["@127.0.0.1", "-p", "5353", "a.example"]);
	}
}
