use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for everything that can go wrong before or around a batch.
///
/// Failures of individual conversions never show up here: they are reported as
/// [`crate::engine::event::CompletionEvent`]s instead.
#[derive(Error, Debug)]
pub enum Error {
	#[error("Output folder {} is not usable", path.display())]
	OutputDir {
		#[source]
		source: std::io::Error,
		path: PathBuf,
	},

	#[error("Output path {} is not a directory", .0.display())]
	NotADirectory(PathBuf),

	#[error("Could not start the worker pool")]
	Pool(#[from] rayon::ThreadPoolBuildError),

	#[error("Error in configuration: {0}")]
	Config(#[from] config::ConfigError),

	#[error("Could not find the configuration directory, please set {0}")]
	ConfigDir(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error("Error in prompt")]
	Interaction {
		#[source]
		source: std::io::Error,
		prompt: String,
	},

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}
