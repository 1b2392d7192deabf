use std::cmp::Ordering;

/// Descriptive statistics for a set of samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
	pub count: usize,
	pub mean: f64,
	pub median: f64,
	pub min: f64,
	pub max: f64,
	/// Sample standard deviation, None with fewer than two samples
	pub stddev: Option<f64>,
}

fn sorted(values: &[f64]) -> Vec<f64> {
	let mut sorted = values.to_vec();
	sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
	sorted
}

/// Calculate the median of a slice of values.
///
/// For an even number of samples this is the mean of the two middle values.
///
/// Returns:
///   None if the slice is empty, otherwise the median.
pub fn median(values: &[f64]) -> Option<f64> {
	if values.is_empty() {
		return None;
	}
	let sorted = sorted(values);
	let mid = sorted.len() / 2;
	if sorted.len() % 2 == 1 {
		Some(sorted[mid])
	} else {
		Some((sorted[mid - 1] + sorted[mid]) / 2.0)
	}
}

/// Calculate the arithmetic mean of a slice of values.
pub fn mean(values: &[f64]) -> Option<f64> {
	if values.is_empty() {
		return None;
	}
	let sum: f64 = values.iter().sum();
	Some(sum / values.len() as f64)
}

/// Calculate the sample (n - 1) standard deviation of a slice of values.
pub fn sample_stddev(values: &[f64]) -> Option<f64> {
	if values.len() < 2 {
		return None;
	}
	let avg = mean(values)?;
	let variance = values.iter()
		.map(|v| (v - avg).powi(2))
		.sum::<f64>() / (values.len() - 1) as f64;
	Some(variance.sqrt())
}

/// Summarise a slice of values, None if it is empty.
pub fn summarize(values: &[f64]) -> Option<Summary> {
	let sorted = sorted(values);
	let (&min, &max) = (sorted.first()?, sorted.last()?);
	Some(Summary {
		count: sorted.len(),
		mean: mean(&sorted)?,
		median: median(&sorted)?,
		min,
		max,
		stddev: sample_stddev(&sorted),
	})
}
