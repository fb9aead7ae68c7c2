use std::{
	ffi::OsStr,
	path::{Path, PathBuf},
};

use tifpress_sdk::error::Error;
use walkdir::WalkDir;

const EXTENSIONS: [&str; 2] = ["tif", "tiff"];

/// Whether the path carries a `.tif`/`.tiff` extension, in any case.
pub fn is_tiff(path: &Path) -> bool {
	path.extension()
		.and_then(OsStr::to_str)
		.is_some_and(|ext| EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// Lists the TIFF files inside `dir`, sorted by name.
///
/// Only the folder itself is scanned unless `recursive` is set. Unreadable subfolders are
/// logged and skipped; an unreadable `dir` is an error.
pub fn scan_folder(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, Error> {
	let mut walker = WalkDir::new(dir).min_depth(1).follow_links(true).sort_by_file_name();
	if !recursive {
		walker = walker.max_depth(1);
	}

	let mut files = Vec::new();
	for entry in walker {
		let entry = match entry {
			Ok(entry) => entry,
			Err(e) if e.depth() == 0 => return Err(Error::Io(e.into())),
			Err(e) => {
				tracing::warn!(folder = %dir.display(), error = %e, "Skipping unreadable entry.");
				continue;
			}
		};
		if entry.file_type().is_file() && is_tiff(entry.path()) {
			files.push(entry.into_path());
		}
	}
	tracing::debug!(folder = %dir.display(), found = files.len(), recursive, "Folder scanned.");
	Ok(files)
}
