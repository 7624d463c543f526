//! Host capability probe
//!
//! Decides whether the host can run BuildTools with the tools it already has
//! (a POSIX shell and git) or needs the portable git toolchain installed first.

use crate::core::error::{Error, Result};
use std::fmt;
use std::process::{Command, Stdio};

/// Word size of the host, for picking the portable git build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X64,
    X86,
}

impl Arch {
    pub fn host() -> Self {
        Self::from_target(std::env::consts::ARCH)
    }

    fn from_target(arch: &str) -> Self {
        if arch.ends_with("64") {
            Self::X64
        } else {
            Self::X86
        }
    }

    /// `64` or `32`, as used in portable git file names.
    pub fn bits(&self) -> u32 {
        match self {
            Self::X64 => 64,
            Self::X86 => 32,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCapability {
    PosixShellAvailable,
    PortableToolchainRequired { arch: Arch },
}

fn runs(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Probe the host.
///
/// A working `sh` plus `git` means nothing extra is needed. Without them,
/// Windows hosts get the portable toolchain; anything else cannot continue.
pub fn detect() -> Result<HostCapability> {
    let has_shell = runs("sh", &["-c", "exit 0"]);
    let has_git = runs("git", &["--version"]);
    classify(has_shell, has_git, cfg!(windows), Arch::host())
}

fn classify(has_shell: bool, has_git: bool, windows: bool, arch: Arch) -> Result<HostCapability> {
    if has_shell && has_git {
        Ok(HostCapability::PosixShellAvailable)
    } else if windows {
        Ok(HostCapability::PortableToolchainRequired { arch })
    } else if has_shell {
        Err(Error::Configuration(
            "git was not found on PATH; install git and run again".to_string(),
        ))
    } else {
        Err(Error::Configuration(
            "no POSIX shell (sh) was found on PATH".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_from_target() {
        assert_eq!(Arch::from_target("x86_64"), Arch::X64);
        assert_eq!(Arch::from_target("aarch64"), Arch::X64);
        assert_eq!(Arch::from_target("x86"), Arch::X86);
        assert_eq!(Arch::X86.to_string(), "32-bit");
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(true, true, false, Arch::X64).unwrap(),
            HostCapability::PosixShellAvailable
        );
        assert_eq!(
            classify(true, true, true, Arch::X64).unwrap(),
            HostCapability::PosixShellAvailable
        );
        assert_eq!(
            classify(false, false, true, Arch::X86).unwrap(),
            HostCapability::PortableToolchainRequired { arch: Arch::X86 }
        );
        assert!(classify(true, false, false, Arch::X64).is_err());
        assert!(classify(false, false, false, Arch::X64).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_detect_on_unix_never_requires_portable_git() {
        match detect() {
            Ok(cap) => assert_eq!(cap, HostCapability::PosixShellAvailable),
            Err(Error::Configuration(_)) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }
}
