//! Cross-phase utility helpers
//!
//! ## Functions
//!
//! - **process**: CommandRunner (spawn, stream stdout/stderr, wait)

pub mod process;

pub use process::{CommandRunner, ProcessResult};
