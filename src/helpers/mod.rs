//! Helper functions used by the provisioning steps
//!
//! ## Categories
//!
//! - **internal**: hashing, mirror URL rewriting, progress bars, fs utilities
//! - **acquire**: HTTP agent, fetcher, repository sync, version manifests
//! - **build**: zip extraction
//! - **util**: subprocess runner

pub mod acquire;
pub mod build;
pub mod internal;
pub mod util;
