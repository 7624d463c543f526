//! Provisioning engine
//!
//! Resolves the Minecraft version, provides every artifact BuildTools needs
//! and finally launches BuildTools.

pub mod plan;
pub mod step;
pub mod steps;

pub use plan::{build_command, provisioning_plan, vcs_for};
pub use step::{Pipeline, PipelineReport, Step, StepRecord, StepState, Toolbox};
pub use steps::{ArtifactKind, ArtifactSpec, ArtifactStep, EnsureDirectory, InstallerStep};

use crate::core::config::{BuildConfig, VersionRequest};
use crate::core::error::{Error, Result};
use crate::core::output;
use crate::core::platform::HostCapability;
use crate::helpers::acquire::{Fetcher, ManifestClient, RetryPolicy, ServerDownload, http};
use crate::helpers::util::{CommandRunner, ProcessResult};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Delay between fetch attempts when retries are enabled.
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Drives one run: version lookup, provisioning, build launch.
pub struct Bootstrapper {
    config: BuildConfig,
    capability: HostCapability,
    manifest: ManifestClient,
    toolbox: Toolbox,
}

impl Bootstrapper {
    pub fn new(config: BuildConfig, capability: HostCapability, cancel: CancellationToken) -> Self {
        let manifest = ManifestClient::new(http::agent(config.http_timeout), config.server_jar_source);
        Self::with_manifest(config, capability, cancel, manifest)
    }

    /// Use a specific manifest client (tests point it at a mock server).
    pub fn with_manifest(
        config: BuildConfig,
        capability: HostCapability,
        cancel: CancellationToken,
        manifest: ManifestClient,
    ) -> Self {
        let fetcher = Fetcher::new(http::agent(config.http_timeout), cancel.clone())
            .with_retry(RetryPolicy::retries(config.retries, RETRY_DELAY));
        let toolbox = Toolbox {
            fetcher,
            vcs: vcs_for(capability, &config.work_dir),
            runner: CommandRunner::new(cancel.clone()),
            cancel,
        };
        Self {
            config,
            capability,
            manifest,
            toolbox,
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    /// The host capability both the step table and the VCS client follow.
    pub fn capability(&self) -> HostCapability {
        self.capability
    }

    /// The step table for `server` on this host.
    pub fn plan(&self, server: &ServerDownload) -> Result<Pipeline> {
        provisioning_plan(&self.config, server, self.capability)
    }

    /// Turn the requested version into a concrete one and find its server JAR.
    pub fn resolve_version(&self) -> Result<ServerDownload> {
        let version = match &self.config.minecraft_version {
            VersionRequest::Latest => {
                let latest = self.manifest.latest_release()?;
                output::info(&format!("latest release is {}", latest));
                latest
            }
            VersionRequest::Exact(v) => v.clone(),
        };
        Ok(self.manifest.server_download(&version)?)
    }

    /// Provide every artifact, skipping those already present.
    pub fn provision(&self, server: &ServerDownload) -> Result<PipelineReport> {
        let pipeline = self.plan(server)?;
        output::action(&format!(
            "Preparing {} for Minecraft {} ({} steps)",
            self.config.compile_target,
            server.version,
            pipeline.len()
        ));
        Ok(pipeline.run(&self.toolbox)?)
    }

    /// Run BuildTools in the working directory. A non-zero exit is an error.
    pub fn launch_build(&self, version: &str) -> Result<ProcessResult> {
        let (program, args) = build_command(&self.config, version);
        output::action(&format!("Running {} {}", program, args.join(" ")));
        let result = self
            .toolbox
            .runner
            .run(&program, &args, Some(&self.config.work_dir))?;
        if !result.success() {
            return Err(Error::SubprocessFailure {
                exit_code: result.exit_code,
            });
        }
        Ok(result)
    }
}
