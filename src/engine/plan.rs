//! The provisioning plan
//!
//! Everything BuildTools needs next to it, in the order it is provided:
//! BuildTools itself, the vanilla server JAR, Maven, portable git (Windows
//! hosts without git only), the four build-data repositories and the
//! redirect agent.

use super::step::Pipeline;
use super::steps::{ArtifactSpec, ArtifactStep, EnsureDirectory, InstallerStep};
use crate::core::config::BuildConfig;
use crate::core::error::Result;
use crate::core::platform::{Arch, HostCapability};
use crate::helpers::acquire::{GitCli, ServerDownload, VcsClient};
use crate::helpers::internal::hash::ExpectedDigest;
use crate::helpers::internal::url_utils::MirrorTemplate;
use std::path::{Path, PathBuf};

const RAW_BASE: &str = "https://raw.githubusercontent.com/SNWCreations/spigotversions/main";

pub const BUILD_TOOLS_JAR: &str = "BuildTools.jar";

const MAVEN_DIR: &str = "apache-maven-3.6.0";
const MAVEN_SHA1: &str = "51819F414A5DA3AAC855BBCA48C68AAFB95AAE81";

const PORTABLE_GIT_RELEASE: &str =
    "https://github.com/git-for-windows/git/releases/download/v2.30.0.windows.1";
const PORTABLE_GIT_SHA1_64: &str = "373ADFE909902354EA6C39C0B5CAF3DEC07972DD";
const PORTABLE_GIT_SHA1_32: &str = "B650383F54DEE64666B97A9F8DCE16ED330D2B2B";
const PORTABLE_GIT_ARGS: [&str; 3] = ["-y", "-gm2", "-nr"];

pub const REDIRECTOR_JAR: &str = "svredirector.jar";
const REDIRECTOR_URL: &str =
    "https://github.com/SNWCreations/svredirector/releases/download/v2.0.0/svredirector-2.0.0.jar";
const REDIRECTOR_SHA1: &str = "F864BAFD4DE5847A51AE3A9F1B92105CFD3EDF6A";

/// Local directory and Gitee repository name for each build-data repository.
const REPOSITORIES: [(&str, &str); 4] = [
    ("Bukkit", "bukkit"),
    ("CraftBukkit", "craftbukkit"),
    ("Spigot", "spigot"),
    ("BuildData", "builddata"),
];
const REPOSITORY_BRANCH: &str = "master";

/// Public proxy used for release assets when the chosen mirror only serves raw files.
const RELEASE_PROXY: &str = "https://ghproxy.com/";

/// Route a GitHub release asset through the mirror when it can proxy any URL.
pub fn release_url(mirror: &MirrorTemplate, url: &str) -> Result<String> {
    if mirror.proxies_any_url() {
        Ok(mirror.rewrite(url)?)
    } else {
        Ok(format!("{}{}", RELEASE_PROXY, url))
    }
}

fn portable_git_dir(arch: Arch) -> String {
    format!("PortableGit-2.30.0-{}-bit", arch.bits())
}

/// Where the portable git binary ends up once installed.
pub fn portable_git_binary(work_dir: &Path, arch: Arch) -> PathBuf {
    work_dir
        .join(portable_git_dir(arch))
        .join("PortableGit")
        .join("bin")
        .join("git.exe")
}

/// The git client repository steps should use on this host.
pub fn vcs_for(capability: HostCapability, work_dir: &Path) -> Box<dyn VcsClient> {
    match capability {
        HostCapability::PosixShellAvailable => Box::new(GitCli::new()),
        HostCapability::PortableToolchainRequired { arch } => {
            Box::new(GitCli::with_program(portable_git_binary(work_dir, arch)))
        }
    }
}

fn portable_git_step(work_dir: &Path, arch: Arch, mirror: &MirrorTemplate) -> Result<InstallerStep> {
    let dir = portable_git_dir(arch);
    let installer = format!("{}.7z.exe", dir);
    let sha1 = match arch {
        Arch::X64 => PORTABLE_GIT_SHA1_64,
        Arch::X86 => PORTABLE_GIT_SHA1_32,
    };
    let source = release_url(mirror, &format!("{}/{}", PORTABLE_GIT_RELEASE, installer))?;
    Ok(InstallerStep::new(
        &dir,
        ArtifactSpec::file(&installer, source, work_dir.join(&dir).join(&installer))
            .with_digest(ExpectedDigest::sha1(sha1)),
        &PORTABLE_GIT_ARGS,
        portable_git_binary(work_dir, arch),
    ))
}

/// Build the step list for one run.
pub fn provisioning_plan(
    config: &BuildConfig,
    server: &ServerDownload,
    capability: HostCapability,
) -> Result<Pipeline> {
    let dir = &config.work_dir;
    let mirror = &config.mirror;
    let mut pipeline = Pipeline::new();

    pipeline.push(ArtifactStep::new(ArtifactSpec::file(
        BUILD_TOOLS_JAR,
        mirror.rewrite(&format!("{}/{}", RAW_BASE, BUILD_TOOLS_JAR))?,
        dir.join(BUILD_TOOLS_JAR),
    )));

    pipeline.push(EnsureDirectory::new("work", dir.join("work")));

    let server_jar = format!("minecraft_server.{}.jar", server.version);
    pipeline.push(ArtifactStep::new(
        ArtifactSpec::file(
            &server_jar,
            server.url.clone(),
            dir.join("work").join(&server_jar),
        )
        .with_digest(ExpectedDigest::sha1(server.sha1.clone())),
    ));

    let maven_zip = format!("{}.zip", MAVEN_DIR);
    pipeline.push(ArtifactStep::new(
        ArtifactSpec::zip(
            MAVEN_DIR,
            mirror.rewrite(&format!("{}/{}", RAW_BASE, maven_zip))?,
            dir.join(&maven_zip),
            dir.join(MAVEN_DIR),
        )
        .with_digest(ExpectedDigest::sha1(MAVEN_SHA1)),
    ));

    if let HostCapability::PortableToolchainRequired { arch } = capability {
        pipeline.push(portable_git_step(dir, arch, mirror)?);
    }

    for (local, remote) in REPOSITORIES {
        pipeline.push(ArtifactStep::new(ArtifactSpec::repository(
            local,
            format!("https://gitee.com/{}/{}", config.gitee_user, remote),
            dir.join(local),
            REPOSITORY_BRANCH,
        )));
    }

    pipeline.push(ArtifactStep::new(
        ArtifactSpec::file(
            REDIRECTOR_JAR,
            release_url(mirror, REDIRECTOR_URL)?,
            dir.join(REDIRECTOR_JAR),
        )
        .with_digest(ExpectedDigest::sha1(REDIRECTOR_SHA1)),
    ));

    Ok(pipeline)
}

/// The BuildTools command line, program first.
pub fn build_command(config: &BuildConfig, version: &str) -> (String, Vec<String>) {
    let args = [
        "-javaagent:svredirector.jar",
        "-jar",
        BUILD_TOOLS_JAR,
        "--rev",
        version,
        "--compile",
        &config.compile_target.to_string(),
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    (config.java.to_string_lossy().into_owned(), args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{ConfigOverrides, MirrorRegistry, Settings};

    fn config(mirror: &str) -> BuildConfig {
        let overrides = ConfigOverrides {
            gitee_user: Some("someone".into()),
            github_mirror: Some(mirror.into()),
            work_dir: Some(PathBuf::from("/srv/build")),
            java: Some(PathBuf::from("java")),
            ..Default::default()
        };
        BuildConfig::resolve(overrides, &Settings::default(), &MirrorRegistry::bundled().unwrap())
            .unwrap()
    }

    fn server() -> ServerDownload {
        ServerDownload {
            version: "1.20.1".into(),
            url: "https://example.com/server.jar".into(),
            sha1: "84194A2F286EF7C14ED7CE0090DBA59902951553".into(),
        }
    }

    #[test]
    fn test_plan_order_with_shell() {
        let plan =
            provisioning_plan(&config("ghproxy"), &server(), HostCapability::PosixShellAvailable)
                .unwrap();
        assert_eq!(
            plan.names(),
            vec![
                "BuildTools.jar",
                "work",
                "minecraft_server.1.20.1.jar",
                "apache-maven-3.6.0",
                "Bukkit",
                "CraftBukkit",
                "Spigot",
                "BuildData",
                "svredirector.jar",
            ]
        );
    }

    #[test]
    fn test_plan_installs_portable_git_before_clones() {
        let plan = provisioning_plan(
            &config("ghproxy"),
            &server(),
            HostCapability::PortableToolchainRequired { arch: Arch::X86 },
        )
        .unwrap();
        let names = plan.names();
        assert_eq!(names.len(), 10);
        assert_eq!(names[4], "PortableGit-2.30.0-32-bit");
        assert_eq!(names[5], "Bukkit");
    }

    #[test]
    fn test_release_url() {
        let registry = MirrorRegistry::bundled().unwrap();
        assert_eq!(
            release_url(&registry.get("ghproxy").unwrap(), REDIRECTOR_URL).unwrap(),
            format!("https://ghproxy.com/{}", REDIRECTOR_URL)
        );
        assert_eq!(
            release_url(&registry.get("github").unwrap(), REDIRECTOR_URL).unwrap(),
            REDIRECTOR_URL
        );
        // raw-only mirrors cannot serve release assets
        assert_eq!(
            release_url(&registry.get("jsdelivr").unwrap(), REDIRECTOR_URL).unwrap(),
            format!("https://ghproxy.com/{}", REDIRECTOR_URL)
        );
    }

    #[test]
    fn test_portable_git_binary() {
        assert_eq!(
            portable_git_binary(Path::new("w"), Arch::X64),
            PathBuf::from("w/PortableGit-2.30.0-64-bit/PortableGit/bin/git.exe")
        );
    }

    #[test]
    fn test_build_command() {
        let mut config = config("ghproxy");
        config.compile_target = crate::core::config::CompileTarget::Craftbukkit;
        let (program, args) = build_command(&config, "1.20.1");
        assert_eq!(program, "java");
        assert_eq!(
            args,
            vec![
                "-javaagent:svredirector.jar",
                "-jar",
                "BuildTools.jar",
                "--rev",
                "1.20.1",
                "--compile",
                "CRAFTBUKKIT",
            ]
        );
    }
}
