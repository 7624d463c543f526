//! Command line behavior that needs no network.

use std::process::Command;

fn cli() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_buildtools-plus"));
    cmd.env_remove("BTP_GITEE_USER")
        .env_remove("BTP_GITHUB_MIRROR")
        .env_remove("BTP_SERVER_JAR_SOURCE");
    cmd
}

#[test]
fn see_mirrors_lists_bundled_and_configured_names() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(
        temp.path().join("buildtools-plus.toml"),
        "[mirrors]\ncorp = \"https://proxy.corp.example/{ORIGINAL_URL}\"\n",
    )
    .unwrap();

    let output = cli()
        .args(["--see-mirrors", "--dir"])
        .arg(temp.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["ghproxy", "github", "jsdelivr", "fastgit", "corp"] {
        assert!(stdout.contains(name), "missing {} in {}", name, stdout);
    }
}

#[test]
fn missing_gitee_user_exits_with_failure() {
    let temp = tempfile::tempdir().unwrap();
    let output = cli().arg("--dir").arg(temp.path()).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Gitee"));
}

#[test]
fn unknown_mirror_exits_with_failure_and_hint() {
    let temp = tempfile::tempdir().unwrap();
    let output = cli()
        .args(["--gitee-user", "someone", "--github-mirror", "nope", "--dir"])
        .arg(temp.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nope"));
    assert!(stderr.contains("--see-mirrors"));
}

#[test]
fn lowercase_source_is_rejected() {
    let output = cli()
        .args(["--gitee-user", "someone", "--server-jar-source", "bmclapi"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("case-sensitive"));
}

#[test]
fn lowercase_compile_target_is_rejected() {
    let output = cli()
        .args(["--gitee-user", "someone", "--compile", "spigot"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("spigot"));
}

#[test]
fn unknown_flag_exits_with_failure() {
    let output = cli().arg("--no-such-flag").output().unwrap();

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn help_exits_successfully() {
    let output = cli().arg("--help").output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("--gitee-user"));
}
