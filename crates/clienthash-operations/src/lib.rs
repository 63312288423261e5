pub mod assemble;
pub mod context;
pub mod error;
pub mod generate;
pub mod report;

pub use context::HashContext;
pub use error::{HashGenError, Result};
pub use generate::{ClientSelection, RunSummary};
