//! ACQUIRE helpers - getting artifacts onto disk
//!
//! ## Functions
//!
//! - **http**: shared ureq agent and JSON GET
//! - **download**: Fetcher (stream to a temp file, verify, persist)
//! - **git**: Repository sync (clone once, never refresh)
//! - **manifest**: Minecraft version manifest lookups

pub mod download;
pub mod git;
pub mod http;
pub mod manifest;

// Re-export commonly used items
pub use download::{Fetcher, RetryPolicy};
pub use git::{CloneOutcome, GitCli, VcsClient, ensure_cloned, is_cloned};
pub use manifest::{ManifestClient, ServerDownload};
