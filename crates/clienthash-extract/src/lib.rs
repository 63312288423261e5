pub mod error;
pub mod formats;

pub use error::ExtractError;
pub use formats::{ExtractKind, ExtractOptions, ExtractStage};
