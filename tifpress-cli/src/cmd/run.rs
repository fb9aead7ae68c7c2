use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use async_trait::async_trait;
use clap::{Parser, ValueHint};
use tifpress_sdk::{
	engine::{runner::RunnerSettings, ConflictResolution},
	reporter::Reporter,
	settings::Settings,
};
use tifpress_std::convert::LzwTiffConverter;
use tifpress_stdx::path::Expand;

use crate::{
	cli::CliUi,
	shell::{Shell, ShellOptions},
};

use super::{logs, Cmd};

#[derive(Parser, Default, Debug)]
pub struct Run {
	/// TIF files to compress, or folders to scan for them.
	#[arg(value_hint = ValueHint::AnyPath)]
	paths: Vec<PathBuf>,
	/// Where the compressed files are written.
	#[arg(long, short = 'o', value_hint = ValueHint::DirPath)]
	output: Option<PathBuf>,
	#[arg(long, short = 'c', value_hint = ValueHint::FilePath)]
	config: Option<PathBuf>,
	/// Scan folders recursively.
	#[arg(long, short = 'r')]
	recursive: bool,
	/// Number of parallel conversions. Defaults to one per core.
	#[arg(long, short = 'j')]
	workers: Option<usize>,
	/// What to do when an output file already exists.
	#[arg(long, value_enum)]
	on_conflict: Option<ConflictResolution>,
	/// Don't ask before writing to a disk that is low on space.
	#[arg(long, short = 'y')]
	yes: bool,
	/// Don't offer to retry failed files.
	#[arg(long)]
	no_retry: bool,
}

impl Run {
	fn apply(&self, settings: &mut Settings) {
		if let Some(output) = &self.output {
			settings.output_dir = Some(output.clone());
		}
		if let Some(workers) = self.workers {
			settings.workers = workers;
		}
		if let Some(policy) = self.on_conflict {
			settings.on_conflict = policy;
		}
		settings.recursive |= self.recursive;
	}
}

/// Resolves on Ctrl-C. Never resolves when the signal cannot be listened for.
async fn interrupted() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::warn!(error = %e, "Could not listen for Ctrl-C.");
		std::future::pending::<()>().await;
	}
}

#[async_trait]
impl Cmd for Run {
	async fn run(self) -> Result<()> {
		let mut settings = Settings::load(self.config.clone())?;
		self.apply(&mut settings);
		let _guard = logs::init(&settings)?;
		tracing::info!(?settings, inputs = self.paths.len(), "Starting run.");

		let options = ShellOptions {
			on_conflict: settings.on_conflict,
			min_free_space: settings.min_free_space,
			assume_yes: self.yes,
			offer_retry: !self.no_retry && !self.yes && console::user_attended(),
			..Default::default()
		};
		let runner_settings = RunnerSettings {
			workers: settings.workers,
		};

		let ui = CliUi::new();
		let mut shell = Shell::new(Reporter::new(ui), Arc::new(LzwTiffConverter), runner_settings, options);
		if let Some(dir) = settings.output_dir {
			shell.set_output_dir(dir.expand_user());
		}
		let paths: Vec<PathBuf> = self.paths.into_iter().map(Expand::expand_user).collect();
		shell.add_paths(&paths, settings.recursive)?;

		shell.run(interrupted).await?;

		let left = shell.pending().len();
		if left > 0 {
			bail!("{left} file(s) were not compressed");
		}
		Ok(())
	}
}
