//! Concrete step kinds
//!
//! - [`ArtifactStep`]: a downloaded file, an extracted archive or a cloned repository
//! - [`EnsureDirectory`]: a directory that must exist
//! - [`InstallerStep`]: a downloaded installer that is run once

use super::step::{Step, Toolbox};
use crate::core::error::{Error, ExtractError, Result};
use crate::core::output;
use crate::helpers::acquire::{ensure_cloned, is_cloned};
use crate::helpers::build::extract_zip;
use crate::helpers::internal::fs_utils;
use crate::helpers::internal::hash::{self, ExpectedDigest, Verification};
use std::path::{Path, PathBuf};

/// How an artifact ends up on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactKind {
    /// `destination` is the file itself.
    SingleFile,
    /// `destination` is the archive; its contents are unpacked into `extract_to`.
    ZipArchive { extract_to: PathBuf },
    /// `source` is a remote repository cloned into `destination`.
    VcsRepository { branch: String },
}

/// Something the build needs and where to get it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub name: String,
    pub source: String,
    pub destination: PathBuf,
    pub digest: Option<ExpectedDigest>,
    pub kind: ArtifactKind,
}

impl ArtifactSpec {
    pub fn file(name: &str, source: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            source: source.into(),
            destination: destination.into(),
            digest: None,
            kind: ArtifactKind::SingleFile,
        }
    }

    pub fn zip(
        name: &str,
        source: impl Into<String>,
        archive: impl Into<PathBuf>,
        extract_to: impl Into<PathBuf>,
    ) -> Self {
        Self {
            kind: ArtifactKind::ZipArchive {
                extract_to: extract_to.into(),
            },
            ..Self::file(name, source, archive)
        }
    }

    pub fn repository(
        name: &str,
        remote: impl Into<String>,
        destination: impl Into<PathBuf>,
        branch: &str,
    ) -> Self {
        Self {
            kind: ArtifactKind::VcsRepository {
                branch: branch.to_string(),
            },
            ..Self::file(name, remote, destination)
        }
    }

    pub fn with_digest(mut self, digest: ExpectedDigest) -> Self {
        self.digest = Some(digest);
        self
    }
}

/// True when `path` is a regular file that matches `digest` (if any).
fn file_is_valid(path: &Path, digest: Option<&ExpectedDigest>) -> Result<bool> {
    match digest {
        Some(d) => Ok(hash::verify_file(path, d)? == Verification::Match),
        None => Ok(path.is_file()),
    }
}

/// Fetch `source` to `dest` unless a verified copy is already there.
fn fetch_if_needed(
    toolbox: &Toolbox,
    source: &str,
    dest: &Path,
    digest: Option<&ExpectedDigest>,
) -> Result<()> {
    if let Some(d) = digest {
        match hash::verify_file(dest, d)? {
            Verification::Match => {
                output::detail(&format!("reusing verified {}", dest.display()));
                return Ok(());
            }
            Verification::Mismatch { actual } => {
                output::warning(&format!(
                    "{} does not match its {} digest (got {}), downloading again",
                    dest.display(),
                    d.algorithm,
                    actual
                ));
            }
            Verification::Absent => {}
        }
    }
    fs_utils::remove_file_if_exists(dest)
        .map_err(|e| Error::io(format!("cannot remove {}", dest.display()), e))?;
    toolbox.fetcher.fetch(source, dest, digest)?;
    Ok(())
}

/// Unpack into a staging directory next to `extract_to`, then move it into place.
fn extract_atomically(archive: &Path, extract_to: &Path) -> Result<()> {
    let parent = fs_utils::parent_or_current(extract_to);
    std::fs::create_dir_all(&parent)
        .map_err(|e| Error::io(format!("cannot create {}", parent.display()), e))?;
    let staging = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(&parent)
        .map_err(|e| Error::io("cannot create staging directory", e))?;
    let staged = staging.path().join("out");

    let summary = extract_zip(archive, &staged)?;
    output::detail(&format!(
        "extracted {} files, {} directories",
        summary.files, summary.dirs
    ));

    if extract_to.is_dir() && fs_utils::is_empty_dir(extract_to).unwrap_or(false) {
        std::fs::remove_dir(extract_to)
            .map_err(|e| Error::io(format!("cannot remove {}", extract_to.display()), e))?;
    }
    std::fs::rename(&staged, extract_to).map_err(|e| {
        Error::Extract(ExtractError::Io {
            path: extract_to.to_path_buf(),
            source: e,
        })
    })
}

/// Provides one [`ArtifactSpec`].
pub struct ArtifactStep {
    spec: ArtifactSpec,
}

impl ArtifactStep {
    pub fn new(spec: ArtifactSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &ArtifactSpec {
        &self.spec
    }
}

impl Step for ArtifactStep {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn is_present(&self) -> Result<bool> {
        let spec = &self.spec;
        match &spec.kind {
            ArtifactKind::SingleFile => file_is_valid(&spec.destination, spec.digest.as_ref()),
            // the extracted tree is what the build uses; the archive may be gone
            ArtifactKind::ZipArchive { extract_to } => Ok(extract_to.is_dir()),
            ArtifactKind::VcsRepository { .. } => {
                Ok(is_cloned(&spec.destination))
            }
        }
    }

    fn remediate(&self, toolbox: &Toolbox) -> Result<()> {
        let spec = &self.spec;
        match &spec.kind {
            ArtifactKind::SingleFile => {
                output::sub_action("fetch");
                fetch_if_needed(toolbox, &spec.source, &spec.destination, spec.digest.as_ref())
            }
            ArtifactKind::ZipArchive { extract_to } => {
                output::sub_action("fetch");
                fetch_if_needed(toolbox, &spec.source, &spec.destination, spec.digest.as_ref())?;
                output::sub_action("extract");
                extract_atomically(&spec.destination, extract_to)
            }
            ArtifactKind::VcsRepository { branch } => {
                output::sub_action("clone");
                ensure_cloned(
                    toolbox.vcs.as_ref(),
                    &spec.source,
                    &spec.destination,
                    branch,
                )?;
                Ok(())
            }
        }
    }
}

/// A directory that must exist.
pub struct EnsureDirectory {
    name: String,
    path: PathBuf,
}

impl EnsureDirectory {
    pub fn new(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
        }
    }
}

impl Step for EnsureDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_present(&self) -> Result<bool> {
        Ok(self.path.is_dir())
    }

    fn remediate(&self, _toolbox: &Toolbox) -> Result<()> {
        std::fs::create_dir_all(&self.path)
            .map_err(|e| Error::io(format!("cannot create {}", self.path.display()), e))
    }
}

/// Downloads an installer and runs it until `installed` exists.
pub struct InstallerStep {
    name: String,
    installer: ArtifactSpec,
    args: Vec<String>,
    installed: PathBuf,
}

impl InstallerStep {
    /// `installer.destination` is where the installer is saved; it runs from
    /// that file's directory.
    pub fn new(
        name: &str,
        installer: ArtifactSpec,
        args: &[&str],
        installed: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.to_string(),
            installer,
            args: args.iter().map(|a| a.to_string()).collect(),
            installed: installed.into(),
        }
    }

    pub fn installed(&self) -> &Path {
        &self.installed
    }
}

impl Step for InstallerStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_present(&self) -> Result<bool> {
        Ok(self.installed.is_file())
    }

    fn remediate(&self, toolbox: &Toolbox) -> Result<()> {
        let installer = &self.installer;
        output::sub_action("fetch");
        fetch_if_needed(
            toolbox,
            &installer.source,
            &installer.destination,
            installer.digest.as_ref(),
        )?;

        output::sub_action("install");
        let dir = fs_utils::parent_or_current(&installer.destination);
        let program = std::path::absolute(&installer.destination)
            .map_err(|e| Error::io("cannot resolve installer path", e))?;
        let result = toolbox
            .runner
            .run(&program.to_string_lossy(), &self.args, Some(&dir))
            .map_err(|e| Error::ToolchainInstall(e.to_string()))?;
        if !result.success() {
            return Err(Error::ToolchainInstall(format!(
                "{} exited with status {}",
                installer.destination.display(),
                result.exit_code
            )));
        }
        Ok(())
    }
}
