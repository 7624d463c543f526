//! Repository sync
//!
//! Clones a remote repository once and never touches it again. A working
//! copy is recognised by its `.git` directory; an existing clone is not
//! fetched, pulled or checked for divergence.
//!
//! Clones land in a staging directory next to the destination and are
//! renamed into place only after `git` succeeds, so an interrupted clone
//! never looks like a finished one on the next run.

use crate::core::error::VcsError;
use crate::core::output;
use crate::helpers::internal::{fs_utils, progress};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Something that can clone a repository.
pub trait VcsClient: Send + Sync {
    fn clone_repo(&self, remote: &str, dest: &Path, branch: &str) -> Result<(), VcsError>;
}

/// Clones by running the `git` command line client.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl GitCli {
    /// `git` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("git")
    }

    /// A specific git executable, such as a freshly installed portable git.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

/// Only https://, http://, ssh://, git@ and local paths are accepted.
fn validate_git_url(url: &str) -> Result<(), VcsError> {
    let remote_ok = url.starts_with("https://")
        || url.starts_with("http://")
        || url.starts_with("git@")
        || url.starts_with("ssh://")
        || url.starts_with("file://");
    if remote_ok || Path::new(url).is_absolute() {
        Ok(())
    } else {
        Err(VcsError::CloneFailed {
            remote: url.to_string(),
            cause: "unsupported URL scheme (use https://, http://, ssh:// or git@)".to_string(),
        })
    }
}

impl VcsClient for GitCli {
    fn clone_repo(&self, remote: &str, dest: &Path, branch: &str) -> Result<(), VcsError> {
        validate_git_url(remote)?;
        let failed = |cause: String| VcsError::CloneFailed {
            remote: remote.to_string(),
            cause,
        };

        output::detail(&format!("git clone --branch {} {}", branch, remote));
        let output = progress::with_spinner(&format!("cloning {}", remote), || {
            Command::new(&self.program)
                .arg("clone")
                .args(["--branch", branch, "--progress", remote])
                .arg(dest)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .output()
        })
        .map_err(|e| failed(format!("failed to run {}: {}", self.program.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(stderr.trim().to_string()));
        }
        Ok(())
    }
}

/// What [`ensure_cloned`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneOutcome {
    AlreadyPresent,
    Cloned,
}

/// True if `path` holds a working copy.
pub fn is_cloned(path: &Path) -> bool {
    path.join(".git").is_dir()
}

/// Clone `remote` into `local` unless a working copy is already there.
pub fn ensure_cloned(
    vcs: &dyn VcsClient,
    remote: &str,
    local: &Path,
    branch: &str,
) -> Result<CloneOutcome, VcsError> {
    if is_cloned(local) {
        output::detail(&format!("{} already cloned", local.display()));
        return Ok(CloneOutcome::AlreadyPresent);
    }

    let failed = |cause: String| VcsError::CloneFailed {
        remote: remote.to_string(),
        cause,
    };

    if local.exists() {
        let empty = local.is_dir()
            && fs_utils::is_empty_dir(local).map_err(|e| failed(e.to_string()))?;
        if !empty {
            return Err(failed(format!(
                "{} exists and is not a git working copy",
                local.display()
            )));
        }
        std::fs::remove_dir(local).map_err(|e| failed(e.to_string()))?;
    }

    let parent = fs_utils::parent_or_current(local);
    std::fs::create_dir_all(&parent).map_err(|e| failed(e.to_string()))?;
    let staging = tempfile::Builder::new()
        .prefix(".clone-")
        .tempdir_in(&parent)
        .map_err(|e| failed(format!("cannot create staging directory: {}", e)))?;
    let staged = staging.path().join("repo");

    vcs.clone_repo(remote, &staged, branch)?;

    std::fs::rename(&staged, local)
        .map_err(|e| failed(format!("cannot move clone into {}: {}", local.display(), e)))?;
    output::detail(&format!("cloned {} to {}", remote, local.display()));
    Ok(CloneOutcome::Cloned)
}
