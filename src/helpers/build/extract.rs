//! Archive extractor
//!
//! Unpacks a ZIP archive into a destination directory, reproducing its
//! directory tree and file contents. Every entry name is checked before
//! anything is written: one entry that would land outside the destination
//! rejects the whole archive.

use crate::core::error::ExtractError;
use crate::core::output;
use crate::helpers::internal::fs_utils;
use crate::helpers::internal::progress::{self, ProgressGuard};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// What an extraction produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub dirs: usize,
}

/// Resolve an entry name to a path relative to the destination.
///
/// Both separators are accepted. Absolute names, drive prefixes, `..`
/// segments and embedded NULs are rejected.
fn entry_path(name: &str) -> Result<PathBuf, ExtractError> {
    let unsafe_entry = || ExtractError::UnsafeArchiveEntry(name.to_string());

    if name.contains('\0') {
        return Err(unsafe_entry());
    }
    let normalized = name.replace('\\', "/");
    if normalized.starts_with('/') {
        return Err(unsafe_entry());
    }
    // "C:/..." is absolute on Windows whatever the host is
    let bytes = normalized.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return Err(unsafe_entry());
    }

    let mut rel = PathBuf::new();
    for segment in normalized.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(unsafe_entry()),
            other => rel.push(other),
        }
    }
    if !fs_utils::is_safe_path(&rel) {
        return Err(unsafe_entry());
    }
    Ok(rel)
}

fn open_archive(archive_path: &Path) -> Result<zip::ZipArchive<BufReader<File>>, ExtractError> {
    let file = match File::open(archive_path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ExtractError::SourceArchiveMissing(archive_path.to_path_buf()));
        }
        Err(e) => {
            return Err(ExtractError::Io {
                path: archive_path.to_path_buf(),
                source: e,
            });
        }
    };
    zip::ZipArchive::new(BufReader::new(file)).map_err(|e| ExtractError::Malformed {
        path: archive_path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Extract `archive_path` into `dest`, creating `dest` if needed.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<ExtractSummary, ExtractError> {
    if !archive_path.is_file() {
        return Err(ExtractError::SourceArchiveMissing(archive_path.to_path_buf()));
    }
    let mut archive = open_archive(archive_path)?;
    let malformed = |e: zip::result::ZipError| ExtractError::Malformed {
        path: archive_path.to_path_buf(),
        reason: e.to_string(),
    };
    let io_err = |path: &Path, e: std::io::Error| ExtractError::Io {
        path: path.to_path_buf(),
        source: e,
    };

    // Validate every name up front so a hostile entry late in the archive
    // cannot leave earlier entries written.
    let mut plan = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(malformed)?;
        let rel = entry_path(entry.name())?;
        plan.push((rel, entry.is_dir()));
    }

    output::detail(&format!(
        "extracting {} into {}",
        archive_path.display(),
        dest.display()
    ));
    let pb = progress::create_spinner(&format!("extracting {} entries", plan.len()));
    let _guard = ProgressGuard::new(&pb);

    std::fs::create_dir_all(dest).map_err(|e| io_err(dest, e))?;
    let mut summary = ExtractSummary::default();

    for (i, (rel, is_dir)) in plan.into_iter().enumerate() {
        let outpath = dest.join(&rel);
        if is_dir || rel.as_os_str().is_empty() {
            std::fs::create_dir_all(&outpath).map_err(|e| io_err(&outpath, e))?;
            summary.dirs += 1;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let mut file = archive.by_index(i).map_err(malformed)?;
        let mut outfile = File::create(&outpath).map_err(|e| io_err(&outpath, e))?;
        std::io::copy(&mut file, &mut outfile).map_err(|e| io_err(&outpath, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode & 0o777))
                    .map_err(|e| io_err(&outpath, e))?;
            }
        }
        summary.files += 1;
        pb.set_message(format!("extracted {}", rel.display()));
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_zip(path: &Path, entries: &[(&str, Option<&[u8]>)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            match content {
                Some(bytes) => {
                    zip.start_file(*name, options).unwrap();
                    zip.write_all(bytes).unwrap();
                }
                None => zip.add_directory(*name, options).unwrap(),
            }
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_extract_reproduces_tree() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("tree.zip");
        write_zip(
            &archive,
            &[
                ("a/", None),
                ("a/b.txt", Some(b"bee")),
                ("a/c/d.txt", Some(b"dee")),
            ],
        );
        let dest = temp.path().join("out");

        let summary = extract_zip(&archive, &dest).unwrap();

        assert_eq!(summary.files, 2);
        assert_eq!(std::fs::read(dest.join("a/b.txt")).unwrap(), b"bee");
        assert_eq!(std::fs::read(dest.join("a/c/d.txt")).unwrap(), b"dee");
        let files = walkdir::WalkDir::new(&dest)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count();
        assert_eq!(files, 2);
    }

    #[test]
    fn test_extract_creates_implicit_parents() {
        // entries without explicit directory records
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("flat.zip");
        write_zip(&archive, &[("apache-maven-3.6.0/bin/mvn", Some(b"#!/bin/sh\n"))]);
        let dest = temp.path().join("out");

        extract_zip(&archive, &dest).unwrap();
        assert!(dest.join("apache-maven-3.6.0/bin/mvn").is_file());
    }

    #[test]
    fn test_traversal_entry_rejects_whole_archive() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("evil.zip");
        write_zip(
            &archive,
            &[
                ("good.txt", Some(b"fine")),
                ("../../evil.txt", Some(b"gotcha")),
            ],
        );
        let dest = temp.path().join("deep/out");

        let err = extract_zip(&archive, &dest).unwrap_err();

        assert!(matches!(err, ExtractError::UnsafeArchiveEntry(ref name) if name == "../../evil.txt"));
        assert!(!temp.path().join("evil.txt").exists());
        assert!(!temp.path().join("deep/evil.txt").exists());
        assert!(!dest.join("good.txt").exists());
    }

    #[test]
    fn test_missing_archive() {
        let temp = tempfile::tempdir().unwrap();
        let err = extract_zip(&temp.path().join("nope.zip"), temp.path()).unwrap_err();
        assert!(matches!(err, ExtractError::SourceArchiveMissing(_)));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("garbage.zip");
        std::fs::write(&archive, b"this is not a zip file").unwrap();
        let err = extract_zip(&archive, &temp.path().join("out")).unwrap_err();
        assert!(matches!(err, ExtractError::Malformed { .. }));
    }

    #[test]
    fn test_entry_path_rules() {
        assert_eq!(entry_path("a/b.txt").unwrap(), PathBuf::from("a/b.txt"));
        assert_eq!(entry_path("a\\b.txt").unwrap(), PathBuf::from("a/b.txt"));
        assert_eq!(entry_path("./a/./b").unwrap(), PathBuf::from("a/b"));
        assert!(entry_path("/etc/passwd").is_err());
        assert!(entry_path("\\windows\\system32").is_err());
        assert!(entry_path("C:/evil.txt").is_err());
        assert!(entry_path("a/../../b").is_err());
        assert!(entry_path("a\\..\\..\\b").is_err());
        assert!(entry_path("a\0b").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_executable_bit_preserved() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("exec.zip");
        let file = File::create(&archive).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
        zip.start_file("bin/mvn", options).unwrap();
        zip.write_all(b"#!/bin/sh\n").unwrap();
        zip.finish().unwrap();

        let dest = temp.path().join("out");
        extract_zip(&archive, &dest).unwrap();
        let mode = std::fs::metadata(dest.join("bin/mvn")).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[cfg(unix)]
    #[test]
    fn test_entry_mode_applied_exactly() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("modes.zip");
        let file = File::create(&archive).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let read_only = zip::write::SimpleFileOptions::default().unix_permissions(0o444);
        zip.start_file("conf/settings.xml", read_only).unwrap();
        zip.write_all(b"<settings/>").unwrap();
        zip.finish().unwrap();

        let dest = temp.path().join("out");
        let summary = extract_zip(&archive, &dest).unwrap();

        assert_eq!(summary.files, 1);
        let mode = std::fs::metadata(dest.join("conf/settings.xml")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o444);
        assert_eq!(std::fs::read(dest.join("conf/settings.xml")).unwrap(), b"<settings/>");
    }
}
