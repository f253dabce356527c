use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::ExecutionError;

/// Resource bounds applied to one child process
#[derive(Debug, Clone)]
pub struct ProcessLimits {
    /// Wall-clock ceiling, measured from spawn
    pub timeout: Duration,
    /// Cap on each captured stream
    pub max_output_bytes: usize,
}

/// A child process that exited on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, or -1 when the process was killed by a signal
    pub exit_code: i32,
    pub signal: Option<i32>,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && self.signal.is_none()
    }

    pub fn describe_exit(&self) -> String {
        match self.signal {
            Some(signal) => format!("Process terminated by signal {signal}"),
            None => format!("Process exited with code {}", self.exit_code),
        }
    }
}

#[derive(Debug)]
pub enum ProcessOutcome {
    Exited(RunOutcome),
    TimedOut,
    Cancelled,
}

enum Completion {
    Exited,
    TimedOut,
    Cancelled,
}

/// How long capture tasks may keep reading once the process group is gone
///
/// Only a process that moved to another session can still hold the pipes
/// open at that point.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Kills the process group on drop unless disarmed
///
/// Covers the case where the future driving the child is dropped mid-flight.
struct GroupGuard(Option<i32>);

impl GroupGuard {
    fn kill(&mut self) {
        if let Some(pgid) = self.0.take() {
            kill_process_group(pgid);
        }
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

fn kill_process_group(pgid: i32) {
    // SAFETY: killpg has no memory-safety preconditions
    let ret = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if ret != 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            log::warn!("Failed to kill process group {pgid}: {err}");
        }
    }
}

/// Blocks until `pid` has exited, leaving it as an unreaped zombie
///
/// The zombie keeps the pid, and with it the process group id, reserved
/// until `Child::wait` reaps it.
fn wait_exited_unreaped(pid: u32) -> io::Result<()> {
    loop {
        // SAFETY: siginfo_t is plain data, all-zero is a valid value
        let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
        // SAFETY: `info` outlives the call
        let ret = unsafe {
            libc::waitid(
                libc::P_PID,
                pid as libc::id_t,
                &mut info,
                libc::WEXITED | libc::WNOWAIT,
            )
        };
        if ret == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Runs `command` (program followed by its arguments) without a shell
///
/// The child becomes the leader of a new process group so that the whole
/// group, including anything it spawned, can be killed on timeout or
/// cancellation. The group is also killed once the leader exits, before the
/// leader is reaped, so no descendant that stayed in the group outlives the
/// call. Output still held open by a process that left the group is read for
/// at most `DRAIN_GRACE` after that.
pub async fn run_process(
    command: &[String],
    work_dir: &Path,
    stdin: Option<&str>,
    limits: &ProcessLimits,
    cancel: &CancellationToken,
) -> Result<ProcessOutcome, ExecutionError> {
    let (program, args) = command.split_first().ok_or(ExecutionError::EmptyCommand)?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(work_dir)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| ExecutionError::Toolchain {
        program: program.clone(),
        source,
    })?;
    let pid = child
        .id()
        .ok_or_else(|| io::Error::other("child was reaped before its pid was read"))?;
    let mut group = GroupGuard(Some(pid as i32));
    log::debug!("Spawned `{program}` with pid {pid}");

    if let (Some(mut pipe), Some(input)) = (child.stdin.take(), stdin) {
        let input = input.to_owned();
        tokio::spawn(async move {
            // The program may exit without reading its input
            if let Err(e) = pipe.write_all(input.as_bytes()).await {
                log::debug!("Stopped writing stdin: {e}");
            }
        });
    }

    let stdout = SharedCapture::default();
    let stderr = SharedCapture::default();
    let capture_tasks = [
        child
            .stdout
            .take()
            .map(|pipe| tokio::spawn(capture(pipe, limits.max_output_bytes, stdout.clone()))),
        child
            .stderr
            .take()
            .map(|pipe| tokio::spawn(capture(pipe, limits.max_output_bytes, stderr.clone()))),
    ];

    let mut exited = tokio::task::spawn_blocking(move || wait_exited_unreaped(pid));
    let completion = tokio::select! {
        waited = &mut exited => {
            waited.map_err(io::Error::other)??;
            Completion::Exited
        }
        _ = tokio::time::sleep(limits.timeout) => Completion::TimedOut,
        _ = cancel.cancelled() => Completion::Cancelled,
    };

    group.kill();
    let status = child.wait().await?;
    drain(capture_tasks, program).await?;

    Ok(match completion {
        Completion::Exited => ProcessOutcome::Exited(RunOutcome {
            stdout: stdout.render(limits.max_output_bytes),
            stderr: stderr.render(limits.max_output_bytes),
            exit_code: status.code().unwrap_or(-1),
            signal: status.signal(),
        }),
        Completion::TimedOut => {
            log::warn!("`{program}` exceeded {} ms and was killed", limits.timeout.as_millis());
            ProcessOutcome::TimedOut
        }
        Completion::Cancelled => {
            log::info!("`{program}` was killed by cancellation");
            ProcessOutcome::Cancelled
        }
    })
}

/// Waits for the capture tasks to hit end of stream, aborting any still
/// reading after `DRAIN_GRACE`
async fn drain(tasks: [Option<JoinHandle<io::Result<()>>>; 2], program: &str) -> io::Result<()> {
    let deadline = Instant::now() + DRAIN_GRACE;
    for mut task in tasks.into_iter().flatten() {
        match tokio::time::timeout_at(deadline, &mut task).await {
            Ok(joined) => joined.map_err(io::Error::other)??,
            Err(_) => {
                task.abort();
                log::warn!("`{program}` left a detached process holding its output open");
            }
        }
    }
    Ok(())
}

/// Bytes read from one stream, shared between the reader task and the caller
#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    discarded: u64,
}

#[derive(Debug, Clone, Default)]
struct SharedCapture(Arc<Mutex<Captured>>);

impl SharedCapture {
    fn lock(&self) -> MutexGuard<'_, Captured> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn render(&self, limit: usize) -> String {
        let captured = self.lock();
        if captured.discarded == 0 {
            return String::from_utf8_lossy(&captured.bytes).into_owned();
        }

        let mut text = String::from_utf8_lossy(trim_partial_char(&captured.bytes)).into_owned();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&format!("[output truncated after {limit} bytes]\n"));
        text
    }
}

/// Reads a stream to its end, keeping at most `limit` bytes
async fn capture<R>(mut reader: R, limit: usize, sink: SharedCapture) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        let mut captured = sink.lock();
        let kept = n.min(limit.saturating_sub(captured.bytes.len()));
        captured.bytes.extend_from_slice(&chunk[..kept]);
        captured.discarded += (n - kept) as u64;
    }
}

/// Drops a UTF-8 sequence cut short at the end of `bytes`
fn trim_partial_char(bytes: &[u8]) -> &[u8] {
    let tail = bytes.len().saturating_sub(4);
    for i in (tail..bytes.len()).rev() {
        let width = match bytes[i] {
            0x80..=0xBF => continue,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if i + width > bytes.len() {
            &bytes[..i]
        } else {
            bytes
        };
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(timeout_ms: u64) -> ProcessLimits {
        ProcessLimits {
            timeout: Duration::from_millis(timeout_ms),
            max_output_bytes: 1024,
        }
    }

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_captures_streams_separately() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_process(
            &argv(&["/bin/sh", "-c", "echo out; echo err >&2; exit 4"]),
            dir.path(),
            None,
            &limits(5000),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let ProcessOutcome::Exited(outcome) = outcome else {
            panic!("expected exit, got {outcome:?}");
        };
        assert_eq!(outcome.stdout, "out\n");
        assert_eq!(outcome.stderr, "err\n");
        assert_eq!(outcome.exit_code, 4);
        assert!(!outcome.success());
    }

    #[tokio::test]
    async fn test_stdin_is_piped() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_process(
            &argv(&["cat"]),
            dir.path(),
            Some("hello\n"),
            &limits(5000),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let ProcessOutcome::Exited(outcome) = outcome else {
            panic!("expected exit, got {outcome:?}");
        };
        assert!(outcome.success());
        assert_eq!(outcome.stdout, "hello\n");
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let started = std::time::Instant::now();
        let outcome = run_process(
            &argv(&["sleep", "30"]),
            dir.path(),
            None,
            &limits(200),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(matches!(outcome, ProcessOutcome::TimedOut));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_output_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_process(
            &argv(&["/bin/sh", "-c", "head -c 5000 /dev/zero | tr '\\0' 'a'"]),
            dir.path(),
            None,
            &ProcessLimits {
                timeout: Duration::from_secs(5),
                max_output_bytes: 10,
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let ProcessOutcome::Exited(outcome) = outcome else {
            panic!("expected exit, got {outcome:?}");
        };
        assert_eq!(
            outcome.stdout,
            "aaaaaaaaaa\n[output truncated after 10 bytes]\n"
        );
    }

    #[tokio::test]
    async fn test_truncation_does_not_split_a_character() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_process(
            &argv(&["/bin/sh", "-c", "printf 'aaaaaaaaa\\303\\251bbb'"]),
            dir.path(),
            None,
            &ProcessLimits {
                timeout: Duration::from_secs(5),
                max_output_bytes: 10,
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let ProcessOutcome::Exited(outcome) = outcome else {
            panic!("expected exit, got {outcome:?}");
        };
        assert_eq!(
            outcome.stdout,
            "aaaaaaaaa\n[output truncated after 10 bytes]\n"
        );
    }

    #[test]
    fn test_trim_partial_char() {
        let text = "ab\u{e9}\u{20ac}".as_bytes();
        assert_eq!(trim_partial_char(text), text);
        assert_eq!(trim_partial_char(&text[..text.len() - 1]), "ab\u{e9}".as_bytes());
        assert_eq!(trim_partial_char(&text[..3]), b"ab");
        assert_eq!(trim_partial_char(b""), b"");
    }

    #[tokio::test]
    async fn test_detached_descendant_cannot_hold_the_call_open() {
        let dir = tempfile::tempdir().unwrap();
        let started = std::time::Instant::now();
        let outcome = run_process(
            &argv(&["/bin/sh", "-c", "setsid sleep 5 & echo hi"]),
            dir.path(),
            None,
            &limits(500),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(
            started.elapsed() < Duration::from_secs(3),
            "returned after {:?}",
            started.elapsed()
        );
        let ProcessOutcome::Exited(outcome) = outcome else {
            panic!("expected exit, got {outcome:?}");
        };
        assert_eq!(outcome.stdout, "hi\n");
        assert_eq!(outcome.exit_code, 0);
    }

    #[tokio::test]
    async fn test_detached_descendant_after_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let started = std::time::Instant::now();
        let outcome = run_process(
            &argv(&["/bin/sh", "-c", "setsid sleep 5 & sleep 30"]),
            dir.path(),
            None,
            &limits(300),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(matches!(outcome, ProcessOutcome::TimedOut));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_missing_program_is_toolchain_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_process(
            &argv(&["/nonexistent/toolchain"]),
            dir.path(),
            None,
            &limits(1000),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExecutionError::Toolchain { .. }));
    }

    #[tokio::test]
    async fn test_empty_command() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_process(&[], dir.path(), None, &limits(1000), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::EmptyCommand));
    }
}
