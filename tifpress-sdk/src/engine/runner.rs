use std::{
	any::Any,
	panic::{self, AssertUnwindSafe},
	sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{
	engine::{
		batch::{BatchId, Task},
		event::{CompletionEvent, Outcome},
	},
	error::Error,
	plugins::converter::Converter,
};

/// Receives completion events.
///
/// Handlers are called from worker threads while the batch ledger is locked, so they
/// must be quick. The usual implementation forwards the event into a channel drained
/// by whoever owns the user-facing state.
pub trait CompletionHandler: Send + Sync {
	fn on_complete(&self, event: CompletionEvent);
}

impl<F> CompletionHandler for F
where
	F: Fn(CompletionEvent) + Send + Sync,
{
	fn on_complete(&self, event: CompletionEvent) {
		self(event)
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerSettings {
	/// Number of worker threads. `0` sizes the pool to the available parallelism.
	pub workers: usize,
}

/// A snapshot of a batch taken at the moment it was cancelled.
///
/// Exactly `in_flight` more events for `batch` will reach the handler after
/// [`JobRunner::cancel`] returns; the `discarded` tasks never report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelReport {
	pub batch: BatchId,
	pub delivered: usize,
	pub in_flight: usize,
	pub discarded: usize,
}

#[derive(Debug, Default)]
struct Counts {
	cancelled: bool,
	running: usize,
	delivered: usize,
}

/// Per-batch bookkeeping shared with the workers.
#[derive(Debug, Default)]
struct Ledger(Mutex<Counts>);

impl Ledger {
	fn lock(&self) -> MutexGuard<'_, Counts> {
		self.0.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Registers a task as running, unless the batch was cancelled before it got a worker.
	fn begin(&self) -> bool {
		let mut counts = self.lock();
		if counts.cancelled {
			return false;
		}
		counts.running += 1;
		true
	}

	/// Delivers under the lock so `cancel` never sees a task that is neither running nor reported.
	fn deliver(&self, handler: &dyn CompletionHandler, event: CompletionEvent) {
		let mut counts = self.lock();
		counts.running -= 1;
		counts.delivered += 1;
		handler.on_complete(event);
	}

	fn cancel(&self) -> Counts {
		let mut counts = self.lock();
		counts.cancelled = true;
		Counts {
			cancelled: true,
			running: counts.running,
			delivered: counts.delivered,
		}
	}
}

struct ActiveBatch {
	id: BatchId,
	submitted: usize,
	ledger: Arc<Ledger>,
	// Dropping the pool lets its threads exit once the queue has drained.
	// An empty batch never builds one.
	_pool: Option<ThreadPool>,
}

/// Runs batches of conversions on a worker pool owned by this instance.
///
/// At most one batch is active at a time. Starting a new batch cancels the previous one
/// first; cancelled tasks that never reached a worker are dropped silently.
pub struct JobRunner {
	handler: Arc<dyn CompletionHandler>,
	settings: RunnerSettings,
	active: Option<ActiveBatch>,
}

impl JobRunner {
	pub fn new(handler: impl CompletionHandler + 'static, settings: RunnerSettings) -> Self {
		Self {
			handler: Arc::new(handler),
			settings,
			active: None,
		}
	}

	fn pool_size(&self, tasks: usize) -> usize {
		let workers = match self.settings.workers {
			0 => num_cpus::get(),
			n => n,
		};
		workers.min(tasks).max(1)
	}

	/// Submits every task and returns without waiting for any of them.
	///
	/// An empty batch still becomes the current batch, but is never active.
	pub fn start(&mut self, converter: Arc<dyn Converter>, tasks: Vec<Task>) -> Result<BatchId, Error> {
		if let Some(report) = self.cancel() {
			tracing::info!(
				batch = %report.batch,
				in_flight = report.in_flight,
				discarded = report.discarded,
				"Previous batch torn down before starting a new one."
			);
		}

		let id = BatchId::new();
		if tasks.is_empty() {
			tracing::debug!(batch = %id, "Empty batch, nothing to run.");
			self.active = Some(ActiveBatch {
				id,
				submitted: 0,
				ledger: Arc::new(Ledger::default()),
				_pool: None,
			});
			return Ok(id);
		}

		let threads = self.pool_size(tasks.len());
		let pool = ThreadPoolBuilder::new()
			.num_threads(threads)
			.thread_name(|i| format!("tifpress-worker-{i}"))
			.panic_handler(|payload| {
				tracing::error!(reason = %panic_message(payload.as_ref()), "A worker panicked outside of a conversion.");
			})
			.build()?;

		tracing::info!(batch = %id, jobs = tasks.len(), threads, "Starting compression jobs.");

		let ledger = Arc::new(Ledger::default());
		let submitted = tasks.len();
		for task in tasks {
			let ledger = Arc::clone(&ledger);
			let handler = Arc::clone(&self.handler);
			let converter = Arc::clone(&converter);
			pool.spawn(move || {
				if !ledger.begin() {
					tracing::trace!(batch = %id, input = %task.input().display(), "Task discarded.");
					return;
				}
				let outcome = run_guarded(converter.as_ref(), &task);
				if let Outcome::Failed(reason) = &outcome {
					tracing::warn!(batch = %id, input = %task.input().display(), reason = %reason, "Conversion failed.");
				}
				let event = CompletionEvent { batch: id, task, outcome };
				ledger.deliver(handler.as_ref(), event);
			});
		}

		self.active = Some(ActiveBatch {
			id,
			submitted,
			ledger,
			_pool: Some(pool),
		});
		Ok(id)
	}

	/// Stops the active batch. Queued tasks are discarded, running ones still report.
	///
	/// Returns `None` when there was nothing to cancel.
	pub fn cancel(&mut self) -> Option<CancelReport> {
		let batch = self.active.take()?;
		let counts = batch.ledger.cancel();
		let report = CancelReport {
			batch: batch.id,
			delivered: counts.delivered,
			in_flight: counts.running,
			discarded: batch.submitted - counts.delivered - counts.running,
		};
		if report.in_flight + report.discarded > 0 {
			tracing::info!(
				batch = %report.batch,
				in_flight = report.in_flight,
				discarded = report.discarded,
				"Cancelling all jobs."
			);
		}
		Some(report)
	}

	/// Whether the current batch still has tasks that have not reported.
	pub fn is_active(&self) -> bool {
		self.active.as_ref().is_some_and(|batch| {
			let counts = batch.ledger.lock();
			!counts.cancelled && counts.delivered < batch.submitted
		})
	}

	pub fn current_batch(&self) -> Option<BatchId> {
		self.active.as_ref().map(|batch| batch.id)
	}
}

impl Drop for JobRunner {
	fn drop(&mut self) {
		self.cancel();
	}
}

fn run_guarded(converter: &dyn Converter, task: &Task) -> Outcome {
	match panic::catch_unwind(AssertUnwindSafe(|| converter.convert(task.input(), task.output()))) {
		Ok(result) => Outcome::from_result(result),
		Err(payload) => Outcome::Failed(format!("conversion panicked: {}", panic_message(payload.as_ref()))),
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		message.to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic".to_string()
	}
}
