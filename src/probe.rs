use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Captured output of a finished external tool
#[derive(Debug, Clone, Default)]
pub struct ProbeOutput {
	/// Exit code, None if the process was killed by a signal
	pub exit_code: Option<i32>,
	pub stdout: String,
	pub stderr: String,
}

impl ProbeOutput {
	pub fn success(&self) -> bool {
		self.exit_code == Some(0)
	}
}

/// Failure to obtain any output from an external tool
#[derive(Debug, Error)]
pub enum ProbeError {
	#[error("timed out after {0:?}")]
	Timeout(Duration),

	#[error("failed to launch '{program}': {source}")]
	Launch {
		program: String,
		#[source]
		source: std::io::Error,
	},

	#[error("I/O error while waiting for '{program}': {source}")]
	Io {
		program: String,
		#[source]
		source: std::io::Error,
	},
}

/// Runs an external measurement tool with a hard wall-clock bound.
#[async_trait]
pub trait ProbeRunner: Send + Sync {
	async fn run(
		&self,
		program: &str,
		args: &[String],
		timeout: Duration,
	) -> Result<ProbeOutput, ProbeError>;
}

/// Runs tools as real child processes.
///
/// The child is killed if it outlives the timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ProbeRunner for SystemRunner {
	async fn run(
		&self,
		program: &str,
		args: &[String],
		timeout: Duration,
	) -> Result<ProbeOutput, ProbeError> {
		debug!(program, ?args, ?timeout, "spawning probe");
		let child = Command::new(program)
			.args(args)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(|source| ProbeError::Launch {
				program: program.to_string(),
				source,
			})?;

		// Dropping the wait future on timeout drops the child, which kills it
		match tokio::time::timeout(timeout, child.wait_with_output()).await {
			Ok(Ok(output)) => Ok(ProbeOutput {
				exit_code: output.status.code(),
				stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
				stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
			}),
			Ok(Err(source)) => Err(ProbeError::Io {
				program: program.to_string(),
				source,
			}),
			Err(_) => Err(ProbeError::Timeout(timeout)),
		}
	}
}
