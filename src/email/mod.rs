pub mod common;
pub mod formatter;
pub mod processor;

// Re-export commonly used items
pub use common::{bare_address, Disposition, Email, MessageRef, RunOutcome, RunStats};
pub use processor::DigestProcessor;
