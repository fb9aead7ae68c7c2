use std::path::Path;

/// Turns one input image into one output image.
///
/// Implementations must be stateless between calls and must not leave a usable-looking
/// output behind when they fail. They run on worker threads, several at a time.
pub trait Converter: Send + Sync {
	fn convert(&self, input: &Path, output: &Path) -> anyhow::Result<()>;
}

impl<F> Converter for F
where
	F: Fn(&Path, &Path) -> anyhow::Result<()> + Send + Sync,
{
	fn convert(&self, input: &Path, output: &Path) -> anyhow::Result<()> {
		self(input, output)
	}
}
