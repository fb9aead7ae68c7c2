use std::path::{Path, PathBuf};

use config::{Config as LayeredConfig, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{engine::ConflictResolution, error::Error, PROJECT_NAME};

const MIB: u64 = 1024 * 1024;

/// Everything a run can be tuned with.
///
/// Values are layered: built-in defaults, then the config file, then `TIFPRESS__*`
/// environment variables. Command-line flags are applied on top by the binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
	pub output_dir: Option<PathBuf>,
	/// `0` means one worker per available core.
	pub workers: usize,
	/// Free space, in bytes, that should remain on the output disk after a batch.
	pub min_free_space: u64,
	pub on_conflict: ConflictResolution,
	pub recursive: bool,
	pub log_dir: Option<PathBuf>,
	pub log_level: String,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			output_dir: None,
			workers: 0,
			min_free_space: 100 * MIB,
			on_conflict: ConflictResolution::default(),
			recursive: false,
			log_dir: None,
			log_level: "info".into(),
		}
	}
}

impl Settings {
	pub fn load(path: Option<PathBuf>) -> Result<Self, Error> {
		let path = Self::resolve_path(path)?;
		Self::from_file(&path)
	}

	pub fn from_file(path: &Path) -> Result<Self, Error> {
		let settings = LayeredConfig::builder()
			.add_source(File::from(path).required(false))
			.add_source(
				Environment::with_prefix(&PROJECT_NAME.to_uppercase())
					.prefix_separator("__")
					.try_parsing(true),
			)
			.build()?
			.try_deserialize::<Settings>()?;
		tracing::debug!(path = %path.display(), ?settings, "Settings loaded.");
		Ok(settings)
	}

	/// The config file location: the given path, `$TIFPRESS_CONFIG`, or the platform config dir.
	pub fn resolve_path(path: Option<PathBuf>) -> Result<PathBuf, Error> {
		if let Some(path) = path {
			return Ok(path);
		}
		let var = format!("{}_CONFIG", PROJECT_NAME.to_uppercase());
		if let Ok(path) = std::env::var(&var) {
			return Ok(PathBuf::from(path));
		}
		dirs::config_dir()
			.map(|dir| dir.join(PROJECT_NAME).join("config.toml"))
			.ok_or(Error::ConfigDir(var))
	}

	/// Where the append-only log file lives.
	pub fn log_dir(&self) -> PathBuf {
		self.log_dir.clone().unwrap_or_else(|| {
			dirs::data_local_dir()
				.map(|dir| dir.join(PROJECT_NAME).join("logs"))
				.unwrap_or_else(|| PathBuf::from(".").join("logs"))
		})
	}
}
