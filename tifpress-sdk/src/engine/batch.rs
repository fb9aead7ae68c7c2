use std::{
	fmt,
	path::{Path, PathBuf},
};

use uuid::Uuid;

/// One input/output pair to be converted.
///
/// A task cannot be changed once built; the runner consumes it exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Task {
	input: PathBuf,
	output: PathBuf,
}

impl Task {
	pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
		Self {
			input: input.into(),
			output: output.into(),
		}
	}

	pub fn input(&self) -> &Path {
		&self.input
	}

	pub fn output(&self) -> &Path {
		&self.output
	}
}

/// Identifies the batch a task was submitted with.
///
/// A new id is minted for every call to [`crate::engine::runner::JobRunner::start`], so
/// consumers can tell stragglers of a torn-down batch apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchId(Uuid);

impl BatchId {
	pub(crate) fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl fmt::Display for BatchId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.simple())
	}
}
