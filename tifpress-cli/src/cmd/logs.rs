use std::{fs, path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, ValueHint};
use tifpress_sdk::settings::Settings;
use tracing_appender::{
	non_blocking::WorkerGuard,
	rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
	filter::LevelFilter,
	fmt::{self},
	layer::SubscriberExt,
	util::SubscriberInitExt,
	Layer,
};

use super::Cmd;

pub const LOG_FILE: &str = "tifpress.log";

/// Installs the file logger. Every run appends to the same file.
///
/// The returned guard flushes the background writer when dropped, so keep it alive for
/// the whole run.
pub fn init(settings: &Settings) -> Result<WorkerGuard> {
	let logs_dir = settings.log_dir();
	fs::create_dir_all(&logs_dir).with_context(|| format!("could not create {}", logs_dir.display()))?;

	let file_appender = RollingFileAppender::builder()
		.rotation(Rotation::NEVER)
		.filename_prefix(LOG_FILE)
		.build(&logs_dir)
		.context("could not open the log file")?;
	let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

	let level = LevelFilter::from_str(&settings.log_level).unwrap_or(LevelFilter::INFO);
	let file_layer = fmt::layer()
		.with_writer(non_blocking_writer)
		.with_ansi(false)
		.with_target(true)
		.with_filter(level);

	tracing_subscriber::registry().with(file_layer).try_init()?;

	tracing::debug!("Logging initialized. Log file in: {}", logs_dir.display());
	Ok(guard)
}

#[derive(Parser, Debug)]
pub struct Logs {
	/// How many of the most recent lines to print.
	#[arg(long, short = 'n', default_value_t = 20)]
	lines: usize,
	#[arg(long, short = 'c', value_hint = ValueHint::FilePath)]
	config: Option<PathBuf>,
}

#[async_trait]
impl Cmd for Logs {
	async fn run(self) -> Result<()> {
		let settings = Settings::load(self.config)?;
		let path = settings.log_dir().join(LOG_FILE);
		println!("{}", path.display());

		let Ok(content) = fs::read_to_string(&path) else {
			println!("No log file yet.");
			return Ok(());
		};
		for line in tail(&content, self.lines) {
			println!("{line}");
		}
		Ok(())
	}
}

fn tail(content: &str, n: usize) -> impl Iterator<Item = &str> {
	let lines: Vec<&str> = content.lines().collect();
	let skip = lines.len().saturating_sub(n);
	lines.into_iter().skip(skip)
}
