use console::{style, Emoji};
use dialoguer::{theme::ColorfulTheme, Confirm};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::{io::Error, sync::Arc};
use tifpress_sdk::reporter::ui::{ProgressBarHandle, UserInterface};

const BAR_TEMPLATE: &str = "{spinner:.blue} {prefix} [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}";

/// Terminal rendering of the shell: one progress bar per batch, with messages printed above it.
pub struct CliUi {
	multi_progress: MultiProgress,
}

impl CliUi {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			multi_progress: MultiProgress::new(),
		})
	}

	fn println(&self, line: String) {
		if self.multi_progress.println(&line).is_err() {
			eprintln!("{line}");
		}
	}
}

impl Drop for CliUi {
	fn drop(&mut self) {
		if let Err(e) = self.multi_progress.clear() {
			eprintln!("Error clearing progress bars: {}", e);
		}
	}
}

struct CliProgressBar(ProgressBar);

impl ProgressBarHandle for CliProgressBar {
	fn increment(&self, delta: u64) {
		self.0.inc(delta);
	}

	fn set_message(&self, message: String) {
		self.0.set_message(message);
	}

	fn finish(&self) {
		self.0.finish();
	}
}

impl UserInterface for CliUi {
	fn new_progress_bar(&self, title: &str, length: u64) -> Arc<dyn ProgressBarHandle> {
		let bar = self.multi_progress.add(ProgressBar::new(length));
		let template = ProgressStyle::with_template(BAR_TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_bar());
		bar.set_style(template.progress_chars("=>-"));
		bar.set_prefix(title.to_string());
		Arc::new(CliProgressBar(bar))
	}

	fn confirm(&self, prompt_text: &str) -> Result<bool, Error> {
		self.multi_progress.suspend(|| {
			Confirm::with_theme(&ColorfulTheme::default())
				.with_prompt(prompt_text)
				.interact()
		})
	}

	fn success(&self, message: &str) {
		self.println(format!("{} {}", style(Emoji("✔", "✓")).green(), message));
	}

	fn info(&self, message: &str) {
		self.println(format!("{} {}", style(Emoji("ℹ", "i")).blue(), message));
	}

	fn warning(&self, message: &str) {
		self.println(format!("{} {}", style(Emoji("⚠", "!")).yellow(), message));
	}

	fn error(&self, message: &str, hint: Option<&str>) {
		let error_prefix = style("Error:").red().bold();
		self.println(format!("{} {}", error_prefix, style(message).red()));

		if let Some(hint_text) = hint {
			let hint_prefix = style("Hint:").cyan();
			self.println(format!("  {} {}", hint_prefix, hint_text));
		}
	}
}
