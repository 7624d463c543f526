//! Configuration
//!
//! Three layers, highest priority first: command line flags
//! ([`ConfigOverrides`]), the optional `buildtools-plus.toml` settings file
//! ([`Settings`]), built-in defaults. [`BuildConfig::resolve`] folds them into
//! one immutable value that the rest of the program reads.

use crate::core::error::{Error, MirrorError, Result};
use crate::helpers::acquire::http;
use crate::helpers::internal::url_utils::MirrorTemplate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Settings file looked up in the working directory.
pub const SETTINGS_FILE: &str = "buildtools-plus.toml";

pub const DEFAULT_MIRROR: &str = "ghproxy";

const BUNDLED_MIRRORS: &str = include_str!("../../resources/githubproxies.json");

/// Where the vanilla server JAR and version manifests come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServerJarSource {
    Mojang,
    Mcbbs,
    #[default]
    Bmclapi,
}

impl ServerJarSource {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Mojang => "https://launchermeta.mojang.com",
            Self::Mcbbs => "https://download.mcbbs.net",
            Self::Bmclapi => "https://bmclapi2.bangbang93.com",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Mojang => "MOJANG",
            Self::Mcbbs => "MCBBS",
            Self::Bmclapi => "BMCLAPI",
        }
    }
}

impl fmt::Display for ServerJarSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ServerJarSource {
    type Err = String;

    /// Names are matched exactly, upper case.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "MOJANG" => Ok(Self::Mojang),
            "MCBBS" => Ok(Self::Mcbbs),
            "BMCLAPI" => Ok(Self::Bmclapi),
            other => Err(format!(
                "invalid server JAR source '{}': only MOJANG, MCBBS and BMCLAPI are supported (names are case-sensitive)",
                other
            )),
        }
    }
}

/// What BuildTools should compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompileTarget {
    #[default]
    Spigot,
    Craftbukkit,
}

impl CompileTarget {
    fn name(&self) -> &'static str {
        match self {
            Self::Spigot => "SPIGOT",
            Self::Craftbukkit => "CRAFTBUKKIT",
        }
    }

    /// File BuildTools writes on success, e.g. `spigot-1.20.1.jar`.
    pub fn output_jar(&self, version: &str) -> String {
        format!("{}-{}.jar", self.name().to_lowercase(), version)
    }
}

impl fmt::Display for CompileTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompileTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "SPIGOT" => Ok(Self::Spigot),
            "CRAFTBUKKIT" => Ok(Self::Craftbukkit),
            other => Err(format!(
                "invalid compile target '{}': only SPIGOT and CRAFTBUKKIT are supported (names are case-sensitive)",
                other
            )),
        }
    }
}

/// `--rev` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRequest {
    Latest,
    Exact(String),
}

impl VersionRequest {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "latest" | "" => Self::Latest,
            v => Self::Exact(v.to_string()),
        }
    }
}

impl fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Exact(v) => f.write_str(v),
        }
    }
}

/// Named GitHub mirror templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorRegistry {
    templates: BTreeMap<String, String>,
}

impl MirrorRegistry {
    /// The registry shipped inside the binary.
    pub fn bundled() -> std::result::Result<Self, MirrorError> {
        Self::from_json(BUNDLED_MIRRORS)
    }

    /// Parse a `{"name": "template", ...}` document.
    pub fn from_json(text: &str) -> std::result::Result<Self, MirrorError> {
        let templates: BTreeMap<String, String> =
            serde_json::from_str(text).map_err(|e| MirrorError::InvalidRegistry(e.to_string()))?;
        if templates.is_empty() {
            return Err(MirrorError::InvalidRegistry("no mirrors defined".to_string()));
        }
        Ok(Self { templates })
    }

    /// Add or replace entries.
    pub fn merge(&mut self, extra: BTreeMap<String, String>) {
        self.templates.extend(extra);
    }

    pub fn get(&self, name: &str) -> std::result::Result<MirrorTemplate, MirrorError> {
        self.templates
            .get(name)
            .map(|t| MirrorTemplate::new(name, t.clone()))
            .ok_or_else(|| MirrorError::UnknownMirror {
                name: name.to_string(),
                known: self.names(),
            })
    }

    pub fn names(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }
}

/// Contents of `buildtools-plus.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub github_mirror: Option<String>,
    pub server_jar_source: Option<ServerJarSource>,
    pub gitee_user: Option<String>,
    pub http_timeout_secs: Option<u64>,
    pub retries: Option<u32>,
    #[serde(default)]
    pub mirrors: BTreeMap<String, String>,
}

impl Settings {
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|e| {
            Error::Configuration(format!("invalid TOML in {}: {}", origin.display(), e))
        })
    }

    /// Read `explicit` (must exist) or `<work_dir>/buildtools-plus.toml` (may be absent).
    pub fn load(explicit: Option<&Path>, work_dir: &Path) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let candidate = work_dir.join(SETTINGS_FILE);
                if !candidate.is_file() {
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let text = std::fs::read_to_string(&path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&text, &path)
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub rev: Option<String>,
    pub github_mirror: Option<String>,
    pub server_jar_source: Option<ServerJarSource>,
    pub compile: Option<CompileTarget>,
    pub gitee_user: Option<String>,
    pub java: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub retries: Option<u32>,
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub minecraft_version: VersionRequest,
    pub mirror: MirrorTemplate,
    pub server_jar_source: ServerJarSource,
    pub compile_target: CompileTarget,
    pub gitee_user: String,
    pub work_dir: PathBuf,
    pub java: PathBuf,
    pub retries: u32,
    pub http_timeout: Duration,
}

impl BuildConfig {
    /// Merge the layers. `registry` should already include `settings.mirrors`.
    pub fn resolve(
        overrides: ConfigOverrides,
        settings: &Settings,
        registry: &MirrorRegistry,
    ) -> Result<Self> {
        let gitee_user = overrides
            .gitee_user
            .or_else(|| settings.gitee_user.clone())
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                Error::Configuration(
                    "a Gitee user name is required (--gitee-user or gitee_user in the settings file)"
                        .to_string(),
                )
            })?;
        if gitee_user.contains(['/', '\\', ' ']) {
            return Err(Error::Configuration(format!(
                "invalid Gitee user name '{}'",
                gitee_user
            )));
        }

        let mirror_name = overrides
            .github_mirror
            .or_else(|| settings.github_mirror.clone())
            .unwrap_or_else(|| DEFAULT_MIRROR.to_string());
        let mirror = registry.get(&mirror_name)?;

        let http_timeout = match settings.http_timeout_secs {
            Some(secs) => http::clamp_timeout(secs),
            None => http::timeout_from_env(),
        };

        Ok(Self {
            minecraft_version: overrides
                .rev
                .as_deref()
                .map(VersionRequest::parse)
                .unwrap_or(VersionRequest::Latest),
            mirror,
            server_jar_source: overrides
                .server_jar_source
                .or(settings.server_jar_source)
                .unwrap_or_default(),
            compile_target: overrides.compile.unwrap_or_default(),
            gitee_user,
            work_dir: overrides.work_dir.unwrap_or_else(|| PathBuf::from(".")),
            java: overrides.java.unwrap_or_else(default_java),
            retries: overrides.retries.or(settings.retries).unwrap_or(0),
            http_timeout,
        })
    }
}

/// `$JAVA_HOME/bin/java` when `JAVA_HOME` is set, else `java` from `PATH`.
pub fn default_java() -> PathBuf {
    let exe = if cfg!(windows) { "java.exe" } else { "java" };
    match std::env::var_os("JAVA_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home).join("bin").join(exe),
        _ => PathBuf::from("java"),
    }
}
