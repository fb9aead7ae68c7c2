pub const PROJECT_NAME: &str = "tifpress";

pub mod engine;
pub mod error;
pub mod plugins;
pub mod reporter;
pub mod settings;
