//! Subprocess runner
//!
//! Runs an external program, relays its output to the console line by line
//! while it runs, and reports the exit code. A non-zero exit code is a
//! result, not an error; callers decide what it means.
//!
//! The blocking entry point drives a private tokio runtime so callers stay
//! synchronous.

use crate::core::error::ProcessError;
use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

fn runtime() -> Result<&'static tokio::runtime::Runtime, ProcessError> {
    static RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
    if let Some(rt) = RT.get() {
        return Ok(rt);
    }
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_io()
        .enable_time()
        .build()
        .map_err(|e| ProcessError::Io {
            program: "tokio runtime".to_string(),
            source: e,
        })?;
    // Losing the race just drops our runtime.
    let _ = RT.set(rt);
    RT.get().ok_or_else(|| ProcessError::Io {
        program: "tokio runtime".to_string(),
        source: std::io::Error::other("runtime unavailable"),
    })
}

/// Outcome of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessResult {
    /// Exit code, or -1 when the process was killed by a signal.
    pub exit_code: i32,
    /// Captured stdout; empty unless capture is enabled.
    pub stdout: Vec<u8>,
    /// Captured stderr; empty unless capture is enabled.
    pub stderr: Vec<u8>,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Runs subprocesses with output relay and cancellation.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    cancel: CancellationToken,
    capture: bool,
    relay: bool,
}

impl CommandRunner {
    /// Relay output, do not capture it.
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            capture: false,
            relay: true,
        }
    }

    pub fn capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    pub fn relay(mut self, relay: bool) -> Self {
        self.relay = relay;
        self
    }

    /// Run to completion, blocking the calling thread.
    pub fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
    ) -> Result<ProcessResult, ProcessError> {
        let rt = runtime()?;
        if tokio::runtime::Handle::try_current().is_ok() {
            // block_on panics inside another runtime; drive it from a plain thread
            std::thread::scope(|s| {
                s.spawn(|| rt.block_on(self.run_async(program, args, cwd)))
                    .join()
                    .unwrap_or_else(|_| {
                        Err(ProcessError::Io {
                            program: program.to_string(),
                            source: std::io::Error::other("runner thread panicked"),
                        })
                    })
            })
        } else {
            rt.block_on(self.run_async(program, args, cwd))
        }
    }

    pub async fn run_async(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
    ) -> Result<ProcessResult, ProcessError> {
        if self.cancel.is_cancelled() {
            return Err(ProcessError::Cancelled {
                program: program.to_string(),
            });
        }

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| ProcessError::SpawnFailed {
            program: program.to_string(),
            source: e,
        })?;

        let io_err = |e: std::io::Error| ProcessError::Io {
            program: program.to_string(),
            source: e,
        };
        let missing = |what: &str| io_err(std::io::Error::other(format!("no {} pipe", what)));

        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

        let stdout_task = tokio::spawn(pump(
            stdout,
            self.relay.then(tokio::io::stdout),
            self.capture,
        ));
        let stderr_task = tokio::spawn(pump(
            stderr,
            self.relay.then(tokio::io::stderr),
            self.capture,
        ));

        let status = tokio::select! {
            status = child.wait() => status.map_err(io_err)?,
            _ = self.cancel.cancelled() => {
                let _ = child.kill().await;
                let _ = child.wait().await;
                stdout_task.abort();
                stderr_task.abort();
                return Err(ProcessError::Cancelled { program: program.to_string() });
            }
        };

        let join_err = |e: tokio::task::JoinError| io_err(std::io::Error::other(e.to_string()));
        let stdout = stdout_task.await.map_err(join_err)?.map_err(io_err)?;
        let stderr = stderr_task.await.map_err(join_err)?.map_err(io_err)?;

        Ok(ProcessResult {
            exit_code: status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }
}

/// Copy a child stream line by line to `relay`, optionally keeping a copy.
async fn pump<R, W>(reader: R, mut relay: Option<W>, capture: bool) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut captured = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line).await?;
        if n == 0 {
            break;
        }
        if let Some(out) = relay.as_mut() {
            // a closed console must not kill the build
            let _ = out.write_all(&line).await;
            let _ = out.flush().await;
        }
        if capture {
            captured.extend_from_slice(&line);
        }
    }
    Ok(captured)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    fn quiet_runner() -> CommandRunner {
        CommandRunner::new(CancellationToken::new())
            .capture(true)
            .relay(false)
    }

    #[tokio::test]
    async fn test_captures_stdout_and_stderr() {
        let result = quiet_runner()
            .run_async("sh", &sh("echo out; echo err >&2"), None)
            .await
            .unwrap();
        assert!(result.success());
        assert_eq!(result.stdout_lossy(), "out\n");
        assert_eq!(result.stderr_lossy(), "err\n");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_a_result() {
        let result = quiet_runner()
            .run_async("sh", &sh("exit 3"), None)
            .await
            .unwrap();
        assert_eq!(result.exit_code, 3);
        assert!(!result.success());
    }

    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("marker"), "").unwrap();
        let result = quiet_runner()
            .run_async("sh", &sh("ls"), Some(temp.path()))
            .await
            .unwrap();
        assert!(result.stdout_lossy().contains("marker"));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_failure() {
        let err = quiet_runner()
            .run_async("definitely-not-a-real-program-xyz", &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::SpawnFailed { .. }));
    }

    #[tokio::test]
    async fn test_output_without_trailing_newline_is_kept() {
        let result = quiet_runner()
            .run_async("sh", &sh("printf partial"), None)
            .await
            .unwrap();
        assert_eq!(result.stdout, b"partial");
    }

    #[tokio::test]
    async fn test_relay_without_capture_returns_empty_buffers() {
        let result = CommandRunner::new(CancellationToken::new())
            .run_async("sh", &sh("echo hi"), None)
            .await
            .unwrap();
        assert!(result.success());
        assert!(result.stdout.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_kills_child() {
        let cancel = CancellationToken::new();
        let runner = CommandRunner::new(cancel.clone()).relay(false);
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = runner.run_async("sh", &sh("sleep 30"), None).await.unwrap_err();
        assert!(matches!(err, ProcessError::Cancelled { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_already_cancelled_does_not_spawn() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let temp = tempfile::tempdir().unwrap();
        let marker = temp.path().join("ran");
        let err = CommandRunner::new(cancel)
            .run_async("sh", &sh(&format!("touch {}", marker.display())), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Cancelled { .. }));
        assert!(!marker.exists());
    }

    #[test]
    fn test_blocking_run() {
        let result = quiet_runner().run("sh", &sh("echo blocking"), None).unwrap();
        assert_eq!(result.stdout_lossy(), "blocking\n");
    }

    #[tokio::test]
    async fn test_blocking_run_inside_runtime() {
        let result = quiet_runner().run("sh", &sh("exit 7"), None).unwrap();
        assert_eq!(result.exit_code, 7);
    }
}
