use std::{
	fs,
	path::{Path, PathBuf},
};

use sysinfo::Disks;
use tifpress_sdk::error::Error;

/// Makes sure `dir` exists and can be written to.
///
/// Runs before anything is submitted; an error here must stop the whole batch.
pub fn prepare_output_dir(dir: &Path) -> Result<(), Error> {
	if dir.exists() && !dir.is_dir() {
		return Err(Error::NotADirectory(dir.to_path_buf()));
	}
	let usable = |source| Error::OutputDir {
		source,
		path: dir.to_path_buf(),
	};
	fs::create_dir_all(dir).map_err(usable)?;
	// an anonymous file vanishes as soon as it is closed
	tempfile::tempfile_in(dir).map_err(usable)?;
	tracing::debug!(dir = %dir.display(), "Output folder is writable.");
	Ok(())
}

/// Free bytes on the disk holding `dir`, if the platform can tell.
pub fn available_space(dir: &Path) -> Option<u64> {
	let dir = dir.canonicalize().ok()?;
	let disks = Disks::new_with_refreshed_list();
	disks
		.list()
		.iter()
		.filter(|disk| dir.starts_with(disk.mount_point()))
		.max_by_key(|disk| disk.mount_point().as_os_str().len())
		.map(|disk| disk.available_space())
}

/// Total size of the inputs that exist, used as the estimate of what a batch will write.
pub fn estimated_output_size<P: AsRef<Path>>(inputs: &[P]) -> u64 {
	inputs
		.iter()
		.filter_map(|path| fs::metadata(path).ok())
		.map(|meta| meta.len())
		.sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceCheck {
	Enough,
	Low { available: u64, wanted: u64 },
	Unknown,
}

impl SpaceCheck {
	/// Compares what is free with what the batch needs plus the reserve that should stay free.
	pub fn evaluate(available: Option<u64>, needed: u64, reserve: u64) -> Self {
		let Some(available) = available else {
			return Self::Unknown;
		};
		let wanted = needed.saturating_add(reserve);
		if available >= wanted {
			Self::Enough
		} else {
			Self::Low { available, wanted }
		}
	}
}

/// The directory a path would resolve to if it were created now, for display purposes.
pub fn display_dir(dir: &Path) -> PathBuf {
	dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf())
}
