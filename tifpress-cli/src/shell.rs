use std::{
	future::Future,
	path::{Path, PathBuf},
	sync::Arc,
};

use indicatif::HumanBytes;
use tifpress_sdk::{
	engine::{
		batch::Task,
		event::CompletionEvent,
		runner::{JobRunner, RunnerSettings},
		ConflictResolution,
	},
	error::Error,
	plugins::converter::Converter,
	reporter::{ui::ProgressBarHandle, Reporter},
};
use tifpress_std::{
	discover,
	output::{self, SpaceCheck},
	plan::{self, SkipReason},
};
use tifpress_stdx::path::Shorten;
use tokio::sync::mpsc::{self, UnboundedReceiver};

#[derive(Debug, Clone, Default)]
pub struct ShellOptions {
	pub output_dir: Option<PathBuf>,
	pub on_conflict: ConflictResolution,
	/// Bytes that should stay free on the output disk.
	pub min_free_space: u64,
	/// Accept the low-space prompt without asking.
	pub assume_yes: bool,
	pub offer_retry: bool,
}

/// What happened to one batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
	pub submitted: usize,
	pub converted: usize,
	pub failed: usize,
	pub skipped: usize,
	pub discarded: usize,
	/// Conversions still running when a second interrupt stopped the wait.
	pub abandoned: usize,
	pub cancelled: bool,
}

type SpaceProbe = fn(&Path) -> Option<u64>;

/// The interactive side of a run: owns the pending list and drives batches through the runner.
///
/// Completion events are produced on worker threads and only ever forwarded into a channel;
/// the pending list and the progress bar are touched by the shell's own loop alone.
pub struct Shell {
	reporter: Reporter,
	runner: JobRunner,
	events: UnboundedReceiver<CompletionEvent>,
	converter: Arc<dyn Converter>,
	options: ShellOptions,
	pending: Vec<PathBuf>,
	space_probe: SpaceProbe,
}

impl Shell {
	pub fn new(
		reporter: Reporter,
		converter: Arc<dyn Converter>,
		runner_settings: RunnerSettings,
		options: ShellOptions,
	) -> Self {
		let (tx, events) = mpsc::unbounded_channel();
		let runner = JobRunner::new(
			move |event: CompletionEvent| {
				if tx.send(event).is_err() {
					tracing::debug!("Shell is gone, dropping completion event.");
				}
			},
			runner_settings,
		);
		Self {
			reporter,
			runner,
			events,
			converter,
			options,
			pending: Vec::new(),
			space_probe: output::available_space,
		}
	}

	#[cfg(test)]
	fn with_space_probe(mut self, probe: SpaceProbe) -> Self {
		self.space_probe = probe;
		self
	}

	pub fn pending(&self) -> &[PathBuf] {
		&self.pending
	}

	pub fn set_output_dir(&mut self, dir: PathBuf) {
		self.options.output_dir = Some(dir);
	}

	/// Appends files to the pending list as given. Returns how many were new.
	pub fn add_files<I>(&mut self, files: I) -> usize
	where
		I: IntoIterator<Item = PathBuf>,
	{
		let before = self.pending.len();
		for file in files {
			if !self.pending.contains(&file) {
				self.pending.push(file);
			}
		}
		let added = self.pending.len() - before;
		tracing::debug!(added, pending = self.pending.len(), "Files added.");
		added
	}

	/// Adds the TIFF files found in `dir`.
	pub fn add_folder(&mut self, dir: &Path, recursive: bool) -> Result<usize, Error> {
		let found = discover::scan_folder(dir, recursive)?;
		if found.is_empty() {
			self.reporter
				.warning(&format!("No TIF files found in {}.", dir.display()));
		}
		Ok(self.add_files(found))
	}

	/// Adds a mix of files and folders, the way they come from the command line.
	pub fn add_paths(&mut self, paths: &[PathBuf], recursive: bool) -> Result<usize, Error> {
		let mut added = 0;
		for path in paths {
			if path.is_dir() {
				added += self.add_folder(path, recursive)?;
			} else {
				added += self.add_files([path.clone()]);
			}
		}
		Ok(added)
	}

	/// Runs batches until nothing is left to retry.
	///
	/// `interrupt` is called at the start of every batch; when the future it returns resolves,
	/// the batch is cancelled. See [`Shell::start_compression`] for a second interrupt.
	pub async fn run<F, Fut>(&mut self, mut interrupt: F) -> Result<(), Error>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = ()>,
	{
		loop {
			let Some(summary) = self.start_compression(&mut interrupt).await? else {
				return Ok(());
			};
			if summary.cancelled || summary.failed == 0 || self.pending.is_empty() || !self.options.offer_retry {
				return Ok(());
			}
			let prompt = format!("Retry {} failed files?", self.pending.len());
			if !self.reporter.confirm(&prompt)? {
				return Ok(());
			}
		}
	}

	/// Submits the pending list as one batch and waits for it to finish.
	///
	/// The first interrupt cancels the batch and waits for running conversions to report.
	/// A second one stops waiting; those files stay pending.
	///
	/// Returns `None` when nothing was submitted.
	pub async fn start_compression<F, Fut>(&mut self, mut interrupt: F) -> Result<Option<BatchSummary>, Error>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = ()>,
	{
		let Some(output_dir) = self.options.output_dir.clone() else {
			self.reporter.error(
				"Please select an output folder.",
				Some("pass --output or set `output_dir` in the config file"),
			);
			return Ok(None);
		};
		if self.pending.is_empty() {
			self.reporter.info("No files to compress.");
			return Ok(None);
		}

		output::prepare_output_dir(&output_dir)?;
		let plan = plan::plan_tasks(&self.pending, &output_dir, self.options.on_conflict);
		if !plan.tasks.is_empty() && !self.enough_space(&output_dir, &plan.tasks)? {
			self.reporter.info("Compression aborted.");
			return Ok(None);
		}

		let mut summary = BatchSummary {
			submitted: plan.tasks.len(),
			skipped: plan.skipped.len(),
			..Default::default()
		};
		for skipped in &plan.skipped {
			let reason = match &skipped.reason {
				SkipReason::NoFileName => "it has no file name".to_string(),
				SkipReason::OutputTaken(taken) => format!("{} already exists", taken.display()),
			};
			self.reporter
				.info(&format!("Skipping {}: {reason}.", skipped.input.display()));
			self.pending.retain(|p| p != &skipped.input);
		}
		if plan.tasks.is_empty() {
			self.report(&summary);
			return Ok(Some(summary));
		}

		let total = plan.tasks.len();
		let batch = self.runner.start(self.converter.clone(), plan.tasks)?;
		tracing::info!(%batch, total, output_dir = %output_dir.display(), "Compression started.");
		let bar = self.reporter.ui.new_progress_bar("Compressing", total as u64);

		let mut expected = total;
		let mut received = 0;
		let mut interrupted = false;
		let mut signal = Box::pin(interrupt());

		while received < expected {
			tokio::select! {
				event = self.events.recv() => {
					let Some(event) = event else {
						break;
					};
					if event.batch != batch {
						tracing::debug!(stale = %event.batch, current = %batch, "Ignoring event from an earlier batch.");
						continue;
					}
					received += 1;
					self.on_completion(&event, bar.as_ref(), &mut summary);
				}
				_ = &mut signal => {
					if interrupted {
						summary.abandoned = expected - received;
						tracing::warn!(%batch, abandoned = summary.abandoned, "Interrupted again, no longer waiting.");
						self.reporter.warning(&format!(
							"Interrupted again. Not waiting for {} running conversions.",
							summary.abandoned
						));
						break;
					}
					interrupted = true;
					signal = Box::pin(interrupt());
					if let Some(report) = self.runner.cancel() {
						expected = report.delivered + report.in_flight;
						summary.discarded = report.discarded;
						summary.cancelled = true;
						self.reporter.warning(&format!(
							"Cancelled. {} queued files dropped, waiting for {} running conversions.",
							report.discarded, report.in_flight
						));
					}
				}
			}
		}
		bar.finish();

		self.report(&summary);
		Ok(Some(summary))
	}

	fn enough_space(&self, output_dir: &Path, tasks: &[Task]) -> Result<bool, Error> {
		let inputs: Vec<&Path> = tasks.iter().map(Task::input).collect();
		let needed = output::estimated_output_size(&inputs);
		let check = SpaceCheck::evaluate((self.space_probe)(output_dir), needed, self.options.min_free_space);
		tracing::debug!(dir = %output_dir.display(), needed, ?check, "Free space checked.");
		match check {
			SpaceCheck::Enough | SpaceCheck::Unknown => Ok(true),
			SpaceCheck::Low { available, wanted } => {
				self.reporter.warning(&format!(
					"Only {} free in {}, about {} needed.",
					HumanBytes(available),
					output::display_dir(output_dir).display(),
					HumanBytes(wanted)
				));
				if self.options.assume_yes {
					return Ok(true);
				}
				self.reporter.confirm("Continue anyway?")
			}
		}
	}

	fn on_completion(&mut self, event: &CompletionEvent, bar: &dyn ProgressBarHandle, summary: &mut BatchSummary) {
		match event.error_message() {
			None => {
				self.pending.retain(|p| p != event.input());
				summary.converted += 1;
			}
			Some(message) => {
				summary.failed += 1;
				self.reporter
					.error(&format!("Failed to compress {}: {message}", event.input().display()), None);
			}
		}
		bar.set_message(event.input().shorten(4).display().to_string());
		bar.increment(1);
	}

	fn report(&self, summary: &BatchSummary) {
		let mut line = format!("{} converted, {} failed", summary.converted, summary.failed);
		if summary.skipped > 0 {
			line.push_str(&format!(", {} skipped", summary.skipped));
		}
		if summary.discarded > 0 {
			line.push_str(&format!(", {} cancelled", summary.discarded));
		}
		if summary.abandoned > 0 {
			line.push_str(&format!(", {} left running", summary.abandoned));
		}
		line.push('.');

		if summary.failed == 0 && !summary.cancelled {
			self.reporter.success(&line);
		} else {
			self.reporter.warning(&line);
		}

		if !self.pending.is_empty() {
			let list: Vec<String> = self.pending.iter().map(|p| format!("  {}", p.display())).collect();
			self.reporter.info(&format!("Still pending:\n{}", list.join("\n")));
		}
		tracing::info!(?summary, pending = self.pending.len(), "Batch finished.");
	}
}
