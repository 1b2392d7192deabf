mod aggregate;
mod bench;
mod cli;
mod dig;
mod iperf;
mod payload;
mod policy;
mod probe;
mod report;
mod resolver;
mod scenarios;
mod stats;
mod types;
mod zone;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::aggregate::RunResults;
use crate::cli::Cli;
use crate::probe::{ProbeRunner, SystemRunner};
use crate::types::{BenchmarkConfig, ZoneRecordType};

fn init_tracing(default_level: &str) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default_level));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	init_tracing(&cli.log_level);

	let scenarios = scenarios::filter_scenarios(scenarios::default_scenarios(), &cli.scenarios);
	if cli.list_scenarios {
		for s in &scenarios {
			let proto = if s.is_udp() { "udp" } else { "tcp" };
			println!("{:<36} {} {}", s.name, proto, s.params.join(" "));
		}
		return Ok(());
	}

	// Collect resolvers from CLI flags and file, falling back to defaults
	let mut resolvers = Vec::new();
	for r in &cli.dns_servers {
		resolvers.push(resolver::parse_resolver(r)?);
	}
	if let Some(path) = &cli.dns_server_file {
		resolvers.extend(resolver::read_resolver_file(path)?);
	}
	if resolvers.is_empty() {
		resolvers = resolver::default_resolvers();
	}
	let resolver_groups = resolver::resolver_groups(!cli.no_system_dns, resolvers);

	let registry = Arc::new(zone::load_zone_file(Path::new(&cli.zone_file))?);
	let cname_records = registry.records()
		.filter(|r| r.record_type == ZoneRecordType::Cname)
		.count();
	tracing::info!(domains = registry.len(), cname_records, "zone registry ready");

	let config = BenchmarkConfig {
		trials: cli.trials.max(1),
		trial_pause: Duration::from_millis(cli.trial_pause_ms),
		scenario_pause: Duration::from_millis(cli.scenario_pause_ms),
		dns_workers: cli.dns_workers.max(1),
		answer_mode: cli.answer_mode,
		iperf_bin: cli.iperf_bin.clone(),
		dig_bin: cli.dig_bin.clone(),
		..BenchmarkConfig::default()
	};

	let resolver_names: Vec<String> = resolver_groups.iter()
		.map(|g| g.as_ref().map(|r| r.label.clone()).unwrap_or_else(|| "system".to_string()))
		.collect();
	report::print_config_summary(
		&cli.iperf_servers, &scenarios, &resolver_names, registry.len(), &config,
	);

	let runner: Arc<dyn ProbeRunner> = Arc::new(SystemRunner);
	let mut results = RunResults::new();

	// Bandwidth first: saturating the link would skew DNS timings
	if !cli.skip_iperf {
		if cli.iperf_servers.is_empty() {
			tracing::warn!("no --iperf-servers given, skipping bandwidth tests");
		} else {
			bench::run_bandwidth_tests(
				runner.as_ref(), &cli.iperf_servers, &scenarios, &config, &mut results,
			).await;
		}
	}

	if !cli.skip_dns {
		bench::run_dns_tests(
			runner.clone(), registry.clone(), &resolver_groups, &config, &mut results,
		).await;
	}

	println!("\n{}", "=".repeat(80));
	println!("{}", report::bandwidth_report(&results.iperf_tests));
	println!("\n{}", "=".repeat(80));
	println!("{}", report::dns_report(&results.dns_tests));

	let output_dir = Path::new(&cli.output_dir);
	report::save_all(output_dir, &results)?;
	println!("\nAll results saved to: {}/", output_dir.display());

	Ok(())
}
