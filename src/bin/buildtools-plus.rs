//! BuildTools+ CLI
//!
//! Usage:
//!   buildtools-plus --gitee-user <name> [--rev <version>] [--compile SPIGOT]
//!   buildtools-plus --see-mirrors

use anyhow::{Context, Result};
use buildtools_plus::Bootstrapper;
use buildtools_plus::core::config::{
    BuildConfig, CompileTarget, ConfigOverrides, MirrorRegistry, ServerJarSource, Settings,
};
use buildtools_plus::core::{output, platform};
use buildtools_plus::engine::build_command;
use clap::Parser;
use clap::error::ErrorKind;
use owo_colors::OwoColorize;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "buildtools-plus")]
#[command(about = "Provision and run Spigot BuildTools through GitHub mirrors and Gitee")]
#[command(version)]
struct Cli {
    /// Minecraft version to build, or "latest"
    #[arg(long, default_value = "latest")]
    rev: String,

    /// GitHub mirror name (see --see-mirrors) [default: ghproxy]
    #[arg(long, env = "BTP_GITHUB_MIRROR")]
    github_mirror: Option<String>,

    /// Vanilla server JAR source: MOJANG, MCBBS or BMCLAPI [default: BMCLAPI]
    #[arg(long, env = "BTP_SERVER_JAR_SOURCE")]
    server_jar_source: Option<ServerJarSource>,

    /// What to build: SPIGOT or CRAFTBUKKIT
    #[arg(long = "compile", default_value = "SPIGOT")]
    compile: CompileTarget,

    /// Gitee account hosting the bukkit, craftbukkit, spigot and builddata repositories
    #[arg(long, env = "BTP_GITEE_USER")]
    gitee_user: Option<String>,

    /// List known GitHub mirror names and exit
    #[arg(long)]
    see_mirrors: bool,

    /// Start the build without asking
    #[arg(short, long)]
    yes: bool,

    /// Java executable used to run BuildTools [default: $JAVA_HOME/bin/java or java]
    #[arg(long)]
    java: Option<PathBuf>,

    /// Working directory; everything is downloaded and built here
    #[arg(short = 'C', long = "dir", default_value = ".")]
    dir: PathBuf,

    /// Extra attempts for each failed download
    #[arg(long)]
    retries: Option<u32>,

    /// Settings file [default: <dir>/buildtools-plus.toml if present]
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // exit 1 on usage errors, not clap's 2
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<buildtools_plus::Error>() {
                // these already carry their causes in the message
                Some(err) => {
                    output::error(&err.to_string());
                    if let Some(hint) = err.remediation_hint() {
                        output::hint(hint);
                    }
                }
                None => output::error(&format!("{:#}", e)),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref(), &cli.dir)?;
    let mut registry = MirrorRegistry::bundled().map_err(buildtools_plus::Error::from)?;
    registry.merge(settings.mirrors.clone());

    if cli.see_mirrors {
        output::info("Known GitHub mirrors:");
        for name in registry.names() {
            println!("  {}", name);
        }
        return Ok(());
    }

    std::fs::create_dir_all(&cli.dir)
        .with_context(|| format!("Failed to create working directory: {}", cli.dir.display()))?;

    let overrides = ConfigOverrides {
        rev: Some(cli.rev),
        github_mirror: cli.github_mirror,
        server_jar_source: cli.server_jar_source,
        compile: Some(cli.compile),
        gitee_user: cli.gitee_user,
        java: cli.java,
        work_dir: Some(cli.dir),
        retries: cli.retries,
    };
    let config = BuildConfig::resolve(overrides, &settings, &registry)?;

    output::info(&format!("Working directory: {}", config.work_dir.display()));
    output::info(&format!("Gitee user: {}", config.gitee_user));
    output::info(&format!("GitHub mirror: {}", config.mirror.name));
    output::info(&format!("Server JAR source: {}", config.server_jar_source));
    output::info(&format!("Building: {}", config.compile_target));

    let capability = platform::detect()?;
    let cancel = CancellationToken::new();
    watch_ctrl_c(cancel.clone())?;

    let compile_target = config.compile_target;
    let bootstrapper = Bootstrapper::new(config, capability, cancel);
    let server = bootstrapper.resolve_version()?;
    let report = bootstrapper.provision(&server)?;
    output::success(&format!(
        "All {} artifacts ready ({} provided this run)",
        report.steps.len(),
        report.remediated()
    ));

    if !cli.yes && !confirm()? {
        let (program, args) = build_command(bootstrapper.config(), &server.version);
        output::info("Not building. To build yourself, run in the working directory:");
        println!("  {} {}", program, args.join(" "));
        return Ok(());
    }

    bootstrapper.launch_build(&server.version)?;
    output::success(&format!(
        "Build finished: {}",
        compile_target.output_jar(&server.version).bold()
    ));
    Ok(())
}

/// Ask before starting the long build. Anything but "n" means yes.
fn confirm() -> Result<bool> {
    print!("Everything is ready. Start the build? [Y/n] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(!answer.trim().eq_ignore_ascii_case("n"))
}

/// Cancel on the first Ctrl-C, exit on the second.
fn watch_ctrl_c(cancel: CancellationToken) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .context("Failed to start signal handler")?;
    std::thread::spawn(move || {
        rt.block_on(async {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            output::warning("interrupted, stopping (press Ctrl-C again to exit now)");
            cancel.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        });
    });
    Ok(())
}
