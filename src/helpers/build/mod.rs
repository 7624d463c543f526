//! BUILD helpers - transforming acquired artifacts
//!
//! ## Functions
//!
//! - **extract_zip**: Unpack a zip archive with path-traversal checks

pub mod extract;

// Re-export commonly used items
pub use extract::{ExtractSummary, extract_zip};
