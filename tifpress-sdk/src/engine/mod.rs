pub mod batch;
pub mod event;
pub mod runner;

use serde::{Deserialize, Serialize};
use strum::Display;

/// What to do when the output path of a task is already taken.
#[derive(Eq, Display, PartialEq, Default, Debug, Clone, Copy, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all(serialize = "lowercase", deserialize = "lowercase"))]
#[strum(serialize_all = "snake_case")]
pub enum ConflictResolution {
	#[default]
	Overwrite,
	Skip,
	Rename,
}
