mod checks;
mod types;

pub use checks::ConformanceSuite;
pub use types::{Check, CheckOutcome, SuiteReport};
