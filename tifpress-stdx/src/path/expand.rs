use std::{ffi::OsStr, path::PathBuf};

pub trait Expand {
	fn expand_user(self) -> PathBuf
	where
		Self: Sized;
}

impl<T: Into<PathBuf>> Expand for T {
	/// Replaces a leading `~` with the home directory. Paths are left alone when there is none.
	fn expand_user(self) -> PathBuf {
		let path = self.into();
		let mut components = path.components();
		if let Some(component) = components.next() {
			if component.as_os_str() == OsStr::new("~") {
				if let Some(mut home) = dirs::home_dir() {
					home.extend(components);
					return home;
				}
			}
		}
		path
	}
}
