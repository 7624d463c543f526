//! Fetcher: download an artifact to disk, verified and all-or-nothing
//!
//! Bytes are streamed into a temporary file next to the destination. The
//! temporary file is verified against the expected digest and only then
//! renamed over the destination, so a failed, cancelled or corrupt transfer
//! never leaves anything at the destination path for a later run to trust.

use crate::core::error::FetchError;
use crate::core::output;
use crate::helpers::internal::fs_utils;
use crate::helpers::internal::hash::{self, ExpectedDigest};
use crate::helpers::internal::progress::{self, ProgressGuard};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::http;

/// Copy buffer size (64KB)
const CHUNK_SIZE: usize = 64 * 1024;

/// How many times a fetch is attempted before giving up.
///
/// The default is a single attempt: a failed fetch is terminal for its step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }

    /// `retries` extra attempts after the first, `delay` apart.
    pub fn retries(retries: u32, delay: Duration) -> Self {
        Self {
            attempts: retries.saturating_add(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Downloads artifacts over HTTP(S).
#[derive(Clone)]
pub struct Fetcher {
    agent: ureq::Agent,
    retry: RetryPolicy,
    cancel: CancellationToken,
    requests: Arc<AtomicUsize>,
}

impl Fetcher {
    pub fn new(agent: ureq::Agent, cancel: CancellationToken) -> Self {
        Self {
            agent,
            retry: RetryPolicy::none(),
            cancel,
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Number of HTTP requests issued so far (all attempts, all clones).
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn agent(&self) -> &ureq::Agent {
        &self.agent
    }

    /// Download `url` to `dest`, verifying against `expected` when given.
    ///
    /// Returns the number of bytes written.
    pub fn fetch(
        &self,
        url: &str,
        dest: &Path,
        expected: Option<&ExpectedDigest>,
    ) -> Result<u64, FetchError> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.fetch_once(url, dest, expected) {
                Ok(bytes) => return Ok(bytes),
                Err(e) if attempt < attempts && is_retryable(&e) => {
                    output::warning(&format!(
                        "attempt {}/{} failed: {}; retrying",
                        attempt, attempts, e
                    ));
                    if !self.retry.delay.is_zero() {
                        std::thread::sleep(self.retry.delay);
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn fetch_once(
        &self,
        url: &str,
        dest: &Path,
        expected: Option<&ExpectedDigest>,
    ) -> Result<u64, FetchError> {
        let transfer = |reason: String| FetchError::TransferFailure {
            url: url.to_string(),
            reason,
        };

        if self.cancel.is_cancelled() {
            return Err(FetchError::Cancelled {
                url: url.to_string(),
            });
        }

        fs_utils::ensure_parent_dir(dest)
            .map_err(|e| transfer(format!("cannot create destination directory: {}", e)))?;
        let dir = fs_utils::parent_or_current(dest);

        let filename = dest
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "download".to_string());

        output::detail(&format!("downloading {}", url));
        let pb = progress::create_spinner(&format!("downloading {}", filename));
        let _guard = ProgressGuard::new(&pb);

        self.requests.fetch_add(1, Ordering::SeqCst);
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| transfer(http::describe_error(e)))?;

        if let Some(len) = response
            .header("content-length")
            .and_then(|s| s.parse().ok())
        {
            progress::upgrade_to_bytes(&pb, len);
        }

        // Dropping `tmp` on any early return deletes the partial file.
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.", filename))
            .suffix(".part")
            .tempfile_in(&dir)
            .map_err(|e| transfer(format!("cannot create temporary file: {}", e)))?;

        let mut reader = response.into_reader();
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut total_bytes = 0u64;

        loop {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled {
                    url: url.to_string(),
                });
            }

            let n = reader
                .read(&mut buffer)
                .map_err(|e| transfer(format!("read error: {}", e)))?;
            if n == 0 {
                break;
            }

            tmp.write_all(&buffer[..n])
                .map_err(|e| transfer(format!("write error: {}", e)))?;
            total_bytes += n as u64;
            pb.set_position(total_bytes);
        }

        tmp.as_file_mut()
            .sync_all()
            .map_err(|e| transfer(format!("write error: {}", e)))?;

        if let Some(expected) = expected {
            let actual = hash::digest_file(tmp.path(), expected.algorithm)?.unwrap_or_default();
            if !expected.matches(&actual) {
                return Err(FetchError::IntegrityMismatch {
                    path: dest.to_path_buf(),
                    algorithm: expected.algorithm.name(),
                    expected: expected.hex.to_lowercase(),
                    actual,
                });
            }
        }

        tmp.persist(dest).map_err(|e| {
            transfer(format!(
                "cannot move download into {}: {}",
                dest.display(),
                e.error
            ))
        })?;

        output::detail(&format!("downloaded {} ({} bytes)", filename, total_bytes));
        Ok(total_bytes)
    }
}

fn is_retryable(err: &FetchError) -> bool {
    matches!(
        err,
        FetchError::TransferFailure { .. } | FetchError::IntegrityMismatch { .. }
    )
}
