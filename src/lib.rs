//! BuildTools+ bootstrapper
//!
//! Prepares a working directory for Spigot's BuildTools in places where
//! GitHub and the Spigot Stash are slow or unreachable, then runs it.
//!
//! # What gets provisioned
//!
//! - `BuildTools.jar` - fetched through a GitHub mirror
//! - `work/minecraft_server.<version>.jar` - vanilla server, SHA-1 checked
//! - `apache-maven-3.6.0/` - Maven, SHA-1 checked and extracted
//! - `PortableGit-2.30.0-*/` - Windows hosts without git only
//! - `Bukkit/`, `CraftBukkit/`, `Spigot/`, `BuildData/` - cloned from Gitee
//! - `svredirector.jar` - agent that points BuildTools at the Gitee clones
//!
//! Every step first checks whether its artifact is already there, so a
//! failed run can simply be started again.
//!
//! # Example
//!
//! ```no_run
//! use buildtools_plus::core::config::{BuildConfig, ConfigOverrides, MirrorRegistry, Settings};
//! use buildtools_plus::core::platform;
//! use buildtools_plus::engine::Bootstrapper;
//! use tokio_util::sync::CancellationToken;
//!
//! # fn main() -> buildtools_plus::Result<()> {
//! let overrides = ConfigOverrides {
//!     gitee_user: Some("someone".into()),
//!     ..Default::default()
//! };
//! let registry = MirrorRegistry::bundled()?;
//! let config = BuildConfig::resolve(overrides, &Settings::default(), &registry)?;
//! let capability = platform::detect()?;
//!
//! let bootstrapper = Bootstrapper::new(config, capability, CancellationToken::new());
//! let server = bootstrapper.resolve_version()?;
//! bootstrapper.provision(&server)?;
//! bootstrapper.launch_build(&server.version)?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod engine;
pub mod helpers;

pub use core::error::{Error, Result};
pub use engine::Bootstrapper;
