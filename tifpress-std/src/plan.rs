use std::{
	collections::HashSet,
	path::{Path, PathBuf},
};

use tifpress_sdk::engine::{batch::Task, ConflictResolution};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
	/// The input path has no file name to carry over, e.g. `/` or `..`.
	NoFileName,
	/// The output path is taken and the policy is to skip.
	OutputTaken(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
	pub input: PathBuf,
	pub reason: SkipReason,
}

/// The tasks of one batch, plus the inputs that did not make it into one.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Plan {
	pub tasks: Vec<Task>,
	pub skipped: Vec<Skipped>,
}

/// Pairs each input with `output_dir/<file name>`, applying `policy` to taken names.
///
/// Two tasks of the same plan never share an output path, whatever the policy.
pub fn plan_tasks<P: AsRef<Path>>(inputs: &[P], output_dir: &Path, policy: ConflictResolution) -> Plan {
	let mut plan = Plan::default();
	let mut reserved: HashSet<PathBuf> = HashSet::new();

	for input in inputs {
		let input = input.as_ref();
		let Some(name) = input.file_name() else {
			plan.skipped.push(Skipped {
				input: input.to_path_buf(),
				reason: SkipReason::NoFileName,
			});
			continue;
		};

		let target = output_dir.join(name);
		match resolve(target, policy, &reserved) {
			Ok(output) => {
				reserved.insert(output.clone());
				plan.tasks.push(Task::new(input, output));
			}
			Err(taken) => plan.skipped.push(Skipped {
				input: input.to_path_buf(),
				reason: SkipReason::OutputTaken(taken),
			}),
		}
	}
	plan
}

fn resolve(target: PathBuf, policy: ConflictResolution, reserved: &HashSet<PathBuf>) -> Result<PathBuf, PathBuf> {
	let taken = |path: &Path| reserved.contains(path) || path.exists();
	match policy {
		ConflictResolution::Overwrite if reserved.contains(&target) => Ok(next_free(&target, taken)),
		ConflictResolution::Overwrite => Ok(target),
		ConflictResolution::Skip if taken(&target) => Err(target),
		ConflictResolution::Rename if taken(&target) => Ok(next_free(&target, taken)),
		ConflictResolution::Skip | ConflictResolution::Rename => Ok(target),
	}
}

/// `name (1).ext`, `name (2).ext`, ... whichever is free first.
fn next_free(path: &Path, taken: impl Fn(&Path) -> bool) -> PathBuf {
	let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
	let ext = path.extension().and_then(|s| s.to_str()).unwrap_or_default();
	let mut n = 1;
	loop {
		let new_name = if ext.is_empty() {
			format!("{stem} ({n})")
		} else {
			format!("{stem} ({n}).{ext}")
		};
		let candidate = path.with_file_name(new_name);
		if !taken(&candidate) {
			return candidate;
		}
		n += 1;
	}
}
