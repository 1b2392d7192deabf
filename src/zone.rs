use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{anyhow, Result};
use hickory_proto::rr::RecordType;
use tracing::{debug, warn};

use crate::types::{ZoneRecord, ZoneRecordType};

/// One whitespace-separated resource record line: owner, ttl, class, type, data
#[derive(Debug, Clone, PartialEq)]
pub struct RecordLine<'a> {
	pub owner: &'a str,
	pub record_type: RecordType,
	pub data: &'a str,
}

/// Split a zone-style record line into its owner, type and data fields.
///
/// Returns None for lines with fewer than 5 fields or an unknown type.
/// The type field is matched case-insensitively.
pub fn parse_record_line(line: &str) -> Option<RecordLine<'_>> {
	let fields: Vec<&str> = line.split_whitespace().collect();
	if fields.len() < 5 {
		return None;
	}
	let record_type = fields[3].to_ascii_uppercase().parse::<RecordType>().ok()?;
	Some(RecordLine {
		owner: fields[0],
		record_type,
		data: fields[4],
	})
}

/// Domains eligible for testing, keyed by name without the trailing dot
#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
	records: BTreeMap<String, ZoneRecord>,
}

impl ZoneRegistry {
	/// Build a registry from zone file content.
	///
	/// Blank lines, `;` comments and `$` directives are skipped. Only A and
	/// CNAME records are kept; a later record for the same name replaces
	/// an earlier one.
	pub fn parse(content: &str) -> Self {
		let mut records = BTreeMap::new();
		for line in content.lines() {
			let trimmed = line.trim();
			if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('$') {
				continue;
			}
			let Some(rec) = parse_record_line(trimmed) else {
				continue;
			};
			let record_type = match rec.record_type {
				RecordType::A => ZoneRecordType::A,
				RecordType::CNAME => ZoneRecordType::Cname,
				_ => continue,
			};
			let domain = rec.owner.trim_end_matches('.').to_string();
			let target = rec.data.trim_end_matches('.').to_string();
			records.insert(domain.clone(), ZoneRecord { domain, record_type, target });
		}
		ZoneRegistry { records }
	}

	/// Look up the expected record for a domain (trailing dot optional).
	pub fn get(&self, domain: &str) -> Option<&ZoneRecord> {
		self.records.get(domain.trim_end_matches('.'))
	}

	pub fn contains(&self, domain: &str) -> bool {
		self.get(domain).is_some()
	}

	/// Registered domains in sorted order.
	pub fn domains(&self) -> impl Iterator<Item = &str> {
		self.records.keys().map(String::as_str)
	}

	/// Registered records in domain order.
	pub fn records(&self) -> impl Iterator<Item = &ZoneRecord> {
		self.records.values()
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}

/// Read the zone registry from a file.
///
/// A missing file is not an error: a warning is logged and an empty
/// registry is returned. Other read failures are propagated. Invalid UTF-8
/// is replaced rather than rejected, so a stray byte only spoils its line.
pub fn load_zone_file(path: &Path) -> Result<ZoneRegistry> {
	let bytes = match std::fs::read(path) {
		Ok(b) => b,
		Err(e) if e.kind() == ErrorKind::NotFound => {
			warn!(path = %path.display(), "zone file not found, no domains will be tested");
			return Ok(ZoneRegistry::default());
		}
		Err(e) => {
			return Err(anyhow!("failed to read zone file '{}': {}", path.display(), e));
		}
	};
	let registry = ZoneRegistry::parse(&String::from_utf8_lossy(&bytes));
	debug!(path = %path.display(), domains = registry.len(), "loaded zone registry");
	Ok(registry)
}
