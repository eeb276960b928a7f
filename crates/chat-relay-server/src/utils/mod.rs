pub mod error;
pub mod mask;

pub use mask::{mask_secret, redact_secret};
