//! File digests
//!
//! Streams a file through SHA-1, SHA-256, SHA-512 or BLAKE3 and hex-encodes the
//! result. Every digest in the provisioning plan is SHA-1, which is what the
//! upstream version manifests publish.

use crate::core::error::HashError;
use sha2::Digest;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Chunk size for reading files during hashing (64KB)
const CHUNK_SIZE: usize = 64 * 1024;

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha512,
    Blake3,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
            Self::Blake3 => "BLAKE3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            "blake3" => Ok(Self::Blake3),
            other => Err(format!("unsupported hash algorithm: {}", other)),
        }
    }
}

/// A digest an artifact is expected to have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedDigest {
    pub algorithm: HashAlgorithm,
    pub hex: String,
}

impl ExpectedDigest {
    pub fn new(algorithm: HashAlgorithm, hex: impl Into<String>) -> Self {
        Self {
            algorithm,
            hex: hex.into(),
        }
    }

    pub fn sha1(hex: impl Into<String>) -> Self {
        Self::new(HashAlgorithm::Sha1, hex)
    }

    /// Case-insensitive comparison against a computed digest.
    pub fn matches(&self, actual: &str) -> bool {
        self.hex.eq_ignore_ascii_case(actual)
    }
}

/// Result of checking a file on disk against an expected digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Absent,
    Match,
    Mismatch { actual: String },
}

/// Compute the lower-case hex digest of a file.
///
/// Returns `Ok(None)` when the path does not exist or is not a regular file;
/// that is the normal "not downloaded yet" case. Read failures on a file that
/// does exist are `IntegrityCheckFailure`.
pub fn digest_file(file: &Path, algorithm: HashAlgorithm) -> Result<Option<String>, HashError> {
    let metadata = match std::fs::metadata(file) {
        Ok(md) => md,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(HashError::IntegrityCheckFailure {
                path: file.to_path_buf(),
                source: e,
            });
        }
    };
    if !metadata.is_file() {
        return Ok(None);
    }

    let fail = |e| HashError::IntegrityCheckFailure {
        path: file.to_path_buf(),
        source: e,
    };
    let mut f = std::fs::File::open(file).map_err(fail)?;

    let hash = match algorithm {
        HashAlgorithm::Sha1 => hash_reader::<sha1::Sha1>(&mut f),
        HashAlgorithm::Sha256 => hash_reader::<sha2::Sha256>(&mut f),
        HashAlgorithm::Sha512 => hash_reader::<sha2::Sha512>(&mut f),
        HashAlgorithm::Blake3 => hash_blake3(&mut f),
    }
    .map_err(fail)?;

    Ok(Some(hash))
}

/// Check a file against an expected digest without treating absence as an error.
pub fn verify_file(file: &Path, expected: &ExpectedDigest) -> Result<Verification, HashError> {
    Ok(match digest_file(file, expected.algorithm)? {
        None => Verification::Absent,
        Some(actual) if expected.matches(&actual) => Verification::Match,
        Some(actual) => Verification::Mismatch { actual },
    })
}

/// Compute hash using the RustCrypto `Digest` trait (SHA-1/SHA-256/SHA-512)
fn hash_reader<D: Digest>(reader: &mut impl Read) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute BLAKE3 hash (separate implementation due to different API)
fn hash_blake3(reader: &mut impl Read) -> std::io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}
