use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, ValueHint};
use tifpress_sdk::settings::Settings;

use super::Cmd;

#[derive(Parser, Debug)]
pub struct Config {
	#[arg(long, short = 'c', value_hint = ValueHint::FilePath)]
	config: Option<PathBuf>,
}

#[async_trait]
impl Cmd for Config {
	async fn run(self) -> Result<()> {
		let path = Settings::resolve_path(self.config)?;
		let settings = Settings::from_file(&path)?;
		let rendered = toml::to_string_pretty(&settings).context("could not render settings")?;

		let origin = if path.exists() { "" } else { " (not found, using defaults)" };
		println!("# {}{origin}", path.display());
		println!("{rendered}");
		Ok(())
	}
}
