use std::path::Path;

use crate::engine::batch::{BatchId, Task};

/// The result of running a single conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
	Converted,
	Failed(String),
}

impl Outcome {
	/// Maps the result of a conversion into an outcome, keeping the whole error chain.
	pub fn from_result(result: anyhow::Result<()>) -> Self {
		match result {
			Ok(()) => Self::Converted,
			Err(e) => {
				let message = format!("{e:#}");
				if message.trim().is_empty() {
					Self::Failed("unknown error".into())
				} else {
					Self::Failed(message)
				}
			}
		}
	}
}

/// The outcome record for one task. Produced at most once per task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent {
	pub batch: BatchId,
	pub task: Task,
	pub outcome: Outcome,
}

impl CompletionEvent {
	pub fn input(&self) -> &Path {
		self.task.input()
	}

	pub fn success(&self) -> bool {
		matches!(self.outcome, Outcome::Converted)
	}

	pub fn error_message(&self) -> Option<&str> {
		match &self.outcome {
			Outcome::Converted => None,
			Outcome::Failed(message) => Some(message),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use anyhow::{anyhow, Context};
	use pretty_assertions::assert_eq;

	#[test]
	fn error_chain_is_kept() {
		let result: anyhow::Result<()> = Err(anyhow!("no such file")).context("could not open /scans/b.tif");
		assert_eq!(
			Outcome::from_result(result),
			Outcome::Failed("could not open /scans/b.tif: no such file".into())
		);
	}

	#[test]
	fn blank_errors_get_a_message() {
		let outcome = Outcome::from_result(Err(anyhow!("  ")));
		assert_eq!(outcome, Outcome::Failed("unknown error".into()));
	}

	#[test]
	fn accessors() {
		let event = CompletionEvent {
			batch: BatchId::new(),
			task: Task::new("a.tif", "out/a.tif"),
			outcome: Outcome::Failed("broken".into()),
		};
		assert!(!event.success());
		assert_eq!(event.error_message(), Some("broken"));
		assert_eq!(event.input(), Path::new("a.tif"));
	}
}
