use async_trait::async_trait;
use clap::{Parser, Subcommand};
use self::config::Config;
use logs::Logs;
use run::Run;

mod config;
pub(crate) mod logs;
mod run;

#[derive(Subcommand)]
enum Command {
	/// Compress TIF files with LZW.
	Run(Run),
	/// Show the resolved settings.
	Config(Config),
	/// Show where the log file is and its last lines.
	Logs(Logs),
}

#[derive(Parser)]
#[command(about, author, version)]
pub struct App {
	#[command(subcommand)]
	command: Command,
}

#[async_trait]
pub trait Cmd {
	async fn run(self) -> anyhow::Result<()>;
}

#[async_trait]
impl Cmd for App {
	async fn run(self) -> anyhow::Result<()> {
		match self.command {
			Command::Run(cmd) => cmd.run().await,
			Command::Config(cmd) => cmd.run().await,
			Command::Logs(cmd) => cmd.run().await,
		}
	}
}
