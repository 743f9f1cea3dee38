//! Spawning, stream capture and timeout handling for one child process.

use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

use super::executor::{ScriptError, ScriptInput, ScriptOutput};

/// Per-stream capture limit (10 MiB). Output beyond it is read and discarded.
const MAX_OUTPUT_BYTES: u64 = 10 * 1024 * 1024;

/// Run a prepared `cmd` to completion.
///
/// stdin is closed, stdout and stderr are captured separately, and
/// `input`'s environment and working directory are applied. The child is
/// killed when the timeout fires or when the returned future is dropped.
pub async fn run_command(
    cmd: &mut Command,
    input: ScriptInput,
) -> Result<ScriptOutput, ScriptError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .envs(input.env_vars.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    if let Some(dir) = &input.working_directory {
        cmd.current_dir(dir);
    }

    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    let started = Instant::now();
    let mut child = cmd
        .spawn()
        .map_err(|e| ScriptError::from_spawn(&program, e))?;

    // Drain both pipes concurrently so a chatty child never blocks on a
    // full pipe while we wait for it.
    let stdout = capture(child.stdout.take());
    let stderr = capture(child.stderr.take());

    let status = match input.timeout {
        None => child.wait().await?,
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                let _ = child.start_kill();
                stdout.abort();
                stderr.abort();
                return Err(ScriptError::Timeout {
                    elapsed_ms: elapsed_ms(started),
                });
            }
        },
    };

    let duration_ms = elapsed_ms(started);
    let stdout = stdout.await.unwrap_or_default();
    let stderr = stderr.await.unwrap_or_default();

    Ok(ScriptOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        exit_code: status.code().unwrap_or(-1),
        duration_ms,
    })
}

fn capture<R>(stream: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(stream) = stream {
            let mut limited = stream.take(MAX_OUTPUT_BYTES);
            let _ = limited.read_to_end(&mut buf).await;
            // Keep the pipe open past the cap; closing it would kill a
            // healthy child with SIGPIPE.
            let _ = tokio::io::copy(&mut limited.into_inner(), &mut tokio::io::sink()).await;
        }
        buf
    })
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn captures_streams_separately() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo out; echo err >&2"]);
        let output = run_command(&mut cmd, ScriptInput::default())
            .await
            .expect("run");
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[tokio::test]
    async fn stdin_is_closed() {
        // `cat` would block forever on an inherited terminal stdin.
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "cat; echo done"]);
        let input = ScriptInput {
            timeout: Some(Duration::from_secs(5)),
            ..ScriptInput::default()
        };
        let output = run_command(&mut cmd, input).await.expect("run");
        assert_eq!(output.stdout.trim(), "done");
    }

    #[tokio::test]
    async fn output_beyond_cap_is_drained_not_fatal() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "head -c 12582912 /dev/zero | tr '\\0' a; exit 0"]);
        let output = run_command(&mut cmd, ScriptInput::default())
            .await
            .expect("run");
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout.len() as u64, MAX_OUTPUT_BYTES);
        assert!(output.stdout.bytes().all(|b| b == b'a'));
    }

    #[tokio::test]
    async fn missing_program_is_not_found() {
        let mut cmd = Command::new("/nonexistent/interpreter");
        let result = run_command(&mut cmd, ScriptInput::default()).await;
        assert!(matches!(result, Err(ScriptError::NotFound(_))));
    }

    #[tokio::test]
    async fn timeout_kills_the_child() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "exec sleep 30"]);
        let input = ScriptInput {
            timeout: Some(Duration::from_millis(200)),
            ..ScriptInput::default()
        };
        let result = run_command(&mut cmd, input).await;
        assert!(matches!(result, Err(ScriptError::Timeout { .. })));
    }
}
