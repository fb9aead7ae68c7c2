use crate::cmd::{App, Cmd};
use anyhow::Result;
use clap::Parser;
mod cli;
mod cmd;
mod shell;

// The shell owns all user-facing state, so it stays on one thread; conversions run on the
// runner's own pool.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
	let app: App = App::parse();
	app.run().await
}
