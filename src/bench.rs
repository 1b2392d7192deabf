use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

use crate::aggregate::{run_scenario, RunResults};
use crate::dig;
use crate::probe::ProbeRunner;
use crate::report;
use crate::scenarios::Scenario;
use crate::types::{BenchmarkConfig, ResolutionResult, ResolverTarget};
use crate::zone::ZoneRegistry;

/// Run every scenario against every endpoint and record the aggregates.
///
/// Everything is sequential: a link under test is never saturated by two
/// invocations at once.
pub async fn run_bandwidth_tests(
	runner: &dyn ProbeRunner,
	endpoints: &[String],
	scenarios: &[Scenario],
	config: &BenchmarkConfig,
	results: &mut RunResults,
) {
	if endpoints.is_empty() || scenarios.is_empty() {
		warn!(endpoints = endpoints.len(), scenarios = scenarios.len(), "nothing to run for bandwidth tests");
		return;
	}
	info!(endpoints = endpoints.len(), scenarios = scenarios.len(), trials = config.trials, "starting bandwidth tests");
	println!("Starting iperf3 performance tests...");

	let total = endpoints.len() * scenarios.len();
	let mut current = 0;
	for endpoint in endpoints {
		println!("\nTesting server: {}", endpoint);
		for scenario in scenarios {
			current += 1;
			println!("\nProgress: {}/{} ({})", current, total, scenario.name);
			if current > 1 && !config.scenario_pause.is_zero() {
				tokio::time::sleep(config.scenario_pause).await;
			}
			let aggregated = run_scenario(runner, config, endpoint, scenario).await;
			report::print_bandwidth_result(&aggregated);
			results.record_bandwidth(aggregated);
		}
	}
	info!(aggregates = results.iperf_tests.len(), "bandwidth tests finished");
}

/// Resolve every registered domain against each resolver group in turn.
///
/// Within a group lookups run concurrently on `config.dns_workers` permits;
/// the whole group is collected before the next resolver starts.
pub async fn run_dns_tests(
	runner: Arc<dyn ProbeRunner>,
	registry: Arc<ZoneRegistry>,
	resolvers: &[Option<ResolverTarget>],
	config: &BenchmarkConfig,
	results: &mut RunResults,
) {
	if registry.is_empty() {
		warn!("zone registry is empty, no domains to resolve");
	}
	info!(domains = registry.len(), resolvers = resolvers.len(), "starting DNS tests");
	println!("\nStarting DNS performance tests...");

	for resolver in resolvers {
		let name = resolver.as_ref().map(|r| r.label.as_str()).unwrap_or("system");
		println!("\nTesting with DNS server: {}", name);
		let group = run_resolver_group(
			runner.clone(), registry.clone(), resolver.clone(), config,
		).await;
		results.record_resolutions(group);
	}
	info!(lookups = results.dns_tests.len(), "DNS tests finished");
}

/// Look up every registered domain against one resolver.
///
/// Results are returned in completion order.
pub async fn run_resolver_group(
	runner: Arc<dyn ProbeRunner>,
	registry: Arc<ZoneRegistry>,
	resolver: Option<ResolverTarget>,
	config: &BenchmarkConfig,
) -> Vec<ResolutionResult> {
	let semaphore = Arc::new(Semaphore::new(config.dns_workers.max(1)));
	let config = Arc::new(config.clone());
	let resolver = Arc::new(resolver);
	let (tx, mut rx) = mpsc::unbounded_channel();

	for domain in registry.domains() {
		let domain = domain.to_string();
		let sem = semaphore.clone();
		let runner = runner.clone();
		let registry = registry.clone();
		let config = config.clone();
		let resolver = resolver.clone();
		let tx = tx.clone();

		tokio::spawn(async move {
			// The semaphore is never closed, so acquire cannot fail
			let Ok(_permit) = sem.acquire().await else {
				return;
			};
			let result = dig::run_trial(
				runner.as_ref(), &registry, &config, &domain, (*resolver).as_ref(),
			).await;
			// The receiver outlives every sender
			let _ = tx.send(result);
		});
	}
	drop(tx);

	let mut collected = Vec::with_capacity(registry.len());
	while let Some(result) = rx.recv().await {
		report::print_resolution_result(&result);
		collected.push(result);
	}
	if collected.len() < registry.len() {
		warn!(
			expected = registry.len(), received = collected.len(),
			"some lookup tasks ended without a result",
		);
	}
	collected
}
