//! Internal utility modules
//!
//! Shared functionality used by the acquire/build/util helpers and the engine.

pub mod fs_utils;
pub mod hash;
pub mod progress;
pub mod url_utils;
