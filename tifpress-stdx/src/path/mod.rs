mod expand;
mod shorten;

pub use expand::Expand;
pub use shorten::Shorten;
