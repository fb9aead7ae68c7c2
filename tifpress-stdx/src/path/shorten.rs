use std::path::{Component, Path, PathBuf};

pub trait Shorten {
	/// Keeps the first and last components and collapses the middle into `...`.
	fn shorten(&self, max_depth: usize) -> PathBuf;
}

impl<T: AsRef<Path>> Shorten for T {
	fn shorten(&self, max_depth: usize) -> PathBuf {
		let path = self.as_ref();
		let components: Vec<Component> = path.components().collect();
		if components.len() <= max_depth || max_depth < 3 {
			return path.to_path_buf();
		}

		let mut result = PathBuf::new();
		let num_to_take_start = (max_depth - 1) / 2;
		let num_to_take_end = max_depth - num_to_take_start - 1;

		for component in components.iter().take(num_to_take_start) {
			result.push(component.as_os_str());
		}

		result.push("...");

		for component in components.iter().rev().take(num_to_take_end).rev() {
			result.push(component.as_os_str());
		}
		result
	}
}
