// Resolver process runner
//
// One `ResolverProcess` per resolver identity. Each `start` spawns the tool,
// supervises it on a tokio task and hands the caller a `PendingRun` that
// resolves to exactly one terminal event. A second `start` while a run is
// in flight is rejected with `Busy`.

use parking_lot::Mutex;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::{oneshot, watch};

use super::errors::ResolveError;
use super::traits::ResolverBackend;
use super::utils::apply_utf8_env;

/// Captured output of a finished resolver
#[derive(Debug)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: ExitStatus,
}

impl ProcessOutput {
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Terminal event of one run
#[derive(Debug)]
pub enum RunEvent {
    Completed(ProcessOutput),
    /// Spawn failure, kill or timeout
    LaunchFailed(String),
}

/// Completion signal owned by the request that started the run
pub struct PendingRun {
    rx: oneshot::Receiver<RunEvent>,
}

impl PendingRun {
    pub async fn wait(self) -> RunEvent {
        self.rx.await.unwrap_or_else(|_| {
            RunEvent::LaunchFailed("resolver task ended without reporting a result".to_string())
        })
    }
}

enum Stop {
    Exited(std::io::Result<ExitStatus>),
    Killed,
    TimedOut(Duration),
}

pub struct ResolverProcess {
    backend: Arc<dyn ResolverBackend>,
    timeout: Option<Duration>,
    running: Arc<watch::Sender<bool>>,
    kill_switch: Mutex<Option<oneshot::Sender<()>>>,
}

impl ResolverProcess {
    pub fn new(backend: Arc<dyn ResolverBackend>, timeout: Option<Duration>) -> Self {
        let (running, _) = watch::channel(false);
        Self {
            backend,
            timeout,
            running: Arc::new(running),
            kill_switch: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn backend(&self) -> &Arc<dyn ResolverBackend> {
        &self.backend
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Launch the resolver for `url`. Must be called inside a tokio runtime.
    pub fn start(&self, url: &str) -> Result<PendingRun, ResolveError> {
        let acquired = self.running.send_if_modified(|running| {
            if *running {
                false
            } else {
                *running = true;
                true
            }
        });
        if !acquired {
            tracing::warn!("[{}] rejected {}: a resolution is already running", self.name(), url);
            return Err(ResolveError::Busy {
                resolver: self.name(),
            });
        }

        let mut cmd = Command::new(self.backend.program());
        cmd.args(self.backend.args(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        apply_utf8_env(&mut cmd);

        let (done_tx, done_rx) = oneshot::channel();
        let (kill_tx, kill_rx) = oneshot::channel();
        *self.kill_switch.lock() = Some(kill_tx);

        tracing::info!(
            "[{}] starting {} for {}",
            self.name(),
            self.backend.program().display(),
            url
        );

        let name = self.name();
        let timeout = self.timeout;
        let running = Arc::clone(&self.running);
        tokio::spawn(async move {
            let event = supervise(cmd, name, timeout, kill_rx).await;
            running.send_replace(false);
            let _ = done_tx.send(event);
        });

        Ok(PendingRun { rx: done_rx })
    }

    /// Kill a running child and wait until it has been reaped
    pub async fn shutdown(&self) {
        if let Some(kill) = self.kill_switch.lock().take() {
            let _ = kill.send(());
        }
        let mut rx = self.running.subscribe();
        let _ = rx.wait_for(|running| !*running).await;
    }
}

/// Fires the kill switch; the supervising task kills and reaps the child
/// afterwards. Use `shutdown` to wait for that.
impl Drop for ResolverProcess {
    fn drop(&mut self) {
        if let Some(kill) = self.kill_switch.get_mut().take() {
            let _ = kill.send(());
        }
    }
}

async fn supervise(
    mut cmd: Command,
    name: &'static str,
    timeout: Option<Duration>,
    mut kill_rx: oneshot::Receiver<()>,
) -> RunEvent {
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return RunEvent::LaunchFailed(format!("Failed to start {}: {}", name, e)),
    };

    let stdout_task = tokio::spawn(read_pipe(child.stdout.take()));
    let stderr_task = tokio::spawn(read_pipe(child.stderr.take()));

    let stop = tokio::select! {
        status = child.wait() => Stop::Exited(status),
        // A dropped sender means the owner is gone, which is also a kill
        _ = &mut kill_rx => Stop::Killed,
        _ = deadline(timeout) => Stop::TimedOut(timeout.unwrap_or_default()),
    };

    let status = match stop {
        Stop::Exited(Ok(status)) => status,
        Stop::Exited(Err(e)) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            return RunEvent::LaunchFailed(format!("Failed to wait for {}: {}", name, e));
        }
        Stop::Killed => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            tracing::info!("[{}] terminated", name);
            return RunEvent::LaunchFailed(format!("{} was terminated", name));
        }
        Stop::TimedOut(after) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            tracing::warn!("[{}] timed out after {}s", name, after.as_secs());
            return RunEvent::LaunchFailed(format!("{} timed out after {}s", name, after.as_secs()));
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();
    tracing::debug!(
        "[{}] exited with {} ({} bytes stdout, {} bytes stderr)",
        name,
        status,
        stdout.len(),
        stderr.len()
    );

    RunEvent::Completed(ProcessOutput {
        stdout,
        stderr,
        status,
    })
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(after) => tokio::time::sleep(after).await,
        None => std::future::pending().await,
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            tracing::debug!("failed to read resolver output: {}", e);
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::test_support::ScriptBackend;

    fn process(script: &str, timeout: Option<Duration>) -> ResolverProcess {
        ResolverProcess::new(Arc::new(ScriptBackend::new("fake", script)), timeout)
    }

    #[tokio::test]
    async fn captures_output_and_passes_url() {
        let p = process(r#"printf '%s|%s' "$1" "$PYTHONIOENCODING"; echo oops >&2"#, None);
        let event = p.start("https://v.example/1").unwrap().wait().await;

        match event {
            RunEvent::Completed(out) => {
                assert!(out.status.success());
                assert_eq!(String::from_utf8_lossy(&out.stdout), "https://v.example/1|utf8");
                assert_eq!(out.stderr_text(), "oops");
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(!p.is_running());
    }

    #[tokio::test]
    async fn nonzero_exit_is_still_completed() {
        let p = process("exit 4", None);
        match p.start("u").unwrap().wait().await {
            RunEvent::Completed(out) => assert_eq!(out.status.code(), Some(4)),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn second_start_while_running_is_busy() {
        let p = process("exec sleep 0.3", None);
        let first = p.start("u").unwrap();
        assert!(p.is_running());

        let second = p.start("u");
        assert!(matches!(second, Err(ResolveError::Busy { resolver: "fake" })));
        assert!(p.is_running());

        assert!(matches!(first.wait().await, RunEvent::Completed(_)));
        assert!(!p.is_running());
        assert!(p.start("u").is_ok());
    }

    #[tokio::test]
    async fn missing_executable_is_launch_failure() {
        let backend = ScriptBackend::new("ghost", "").with_program("/nonexistent/resolver-bin");
        let p = ResolverProcess::new(Arc::new(backend), None);
        match p.start("u").unwrap().wait().await {
            RunEvent::LaunchFailed(reason) => assert!(reason.contains("Failed to start ghost")),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(!p.is_running());
    }

    #[tokio::test]
    async fn timeout_kills_the_child() {
        let p = process("exec sleep 5", Some(Duration::from_millis(100)));
        match p.start("u").unwrap().wait().await {
            RunEvent::LaunchFailed(reason) => assert!(reason.contains("timed out")),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(!p.is_running());
    }

    fn alive(pid: &str) -> bool {
        std::process::Command::new("kill")
            .args(["-0", pid])
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn dropping_the_runner_kills_the_child() {
        let tmp = tempfile::tempdir().unwrap();
        let pid_file = tmp.path().join("pid");
        let p = process(&format!("echo $$ > '{}'; exec sleep 30", pid_file.display()), None);
        let pending = p.start("u").unwrap();

        let mut pid = String::new();
        for _ in 0..100 {
            pid = std::fs::read_to_string(&pid_file).unwrap_or_default().trim().to_string();
            if !pid.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!pid.is_empty(), "child never wrote its pid");
        assert!(alive(&pid));

        drop(p);

        match tokio::time::timeout(Duration::from_secs(3), pending.wait()).await {
            Ok(RunEvent::LaunchFailed(reason)) => assert!(reason.contains("terminated")),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(!alive(&pid));
    }

    #[tokio::test]
    async fn shutdown_terminates_running_child() {
        let p = process("exec sleep 5", None);
        let pending = p.start("u").unwrap();

        tokio::time::timeout(Duration::from_secs(3), p.shutdown())
            .await
            .expect("shutdown should not wait for the child to finish on its own");
        assert!(!p.is_running());

        match pending.wait().await {
            RunEvent::LaunchFailed(reason) => assert!(reason.contains("terminated")),
            other => panic!("unexpected event {:?}", other),
        }
    }
}
