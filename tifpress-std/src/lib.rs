pub mod convert;
pub mod discover;
pub mod output;
pub mod plan;
