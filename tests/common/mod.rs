//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use buildtools_plus::core::error::VcsError;
use buildtools_plus::engine::Toolbox;
use buildtools_plus::helpers::acquire::{Fetcher, VcsClient, http};
use buildtools_plus::helpers::util::CommandRunner;
use sha1::Digest;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Upper-case SHA-1 of `bytes`, the way digests are published.
pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode_upper(sha1::Sha1::digest(bytes))
}

/// An in-memory zip archive.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

/// Fake VCS client: records remotes and writes a `.git` directory.
#[derive(Clone, Default)]
pub struct RecordingVcs {
    pub clones: Arc<Mutex<Vec<String>>>,
}

impl RecordingVcs {
    pub fn count(&self) -> usize {
        self.clones.lock().unwrap().len()
    }
}

impl VcsClient for RecordingVcs {
    fn clone_repo(&self, remote: &str, dest: &Path, _branch: &str) -> Result<(), VcsError> {
        self.clones.lock().unwrap().push(remote.to_string());
        std::fs::create_dir_all(dest.join(".git")).unwrap();
        Ok(())
    }
}

pub fn toolbox_with(vcs: RecordingVcs) -> Toolbox {
    let cancel = CancellationToken::new();
    Toolbox {
        fetcher: Fetcher::new(http::agent(Duration::from_secs(5)), cancel.clone()),
        vcs: Box::new(vcs),
        runner: CommandRunner::new(cancel.clone()),
        cancel,
    }
}

/// Write an executable shell script.
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_path_buf()
}
