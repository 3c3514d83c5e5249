// Subprocess invoker implementation
// reason: tokio::process for async launch-wait-capture with timeouts
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use phonetool_core::application::poller::constants::GRACEFUL_TERMINATE_TIMEOUT;
use phonetool_core::port::process_invoker::{
    CapturedOutput, InvokeError, Invocation, ProcessInvoker,
};
use phonetool_core::port::TimeProvider;

use crate::tool_check::ToolResolver;

/// Hide the console window of launched tools
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Subprocess invoker
/// Spawns one child per invocation; output never reaches the caller's console
pub struct SubprocessInvoker {
    time_provider: Arc<dyn TimeProvider>,
    resolver: ToolResolver,
    default_timeout: Duration,
}

impl SubprocessInvoker {
    /// Create a new subprocess invoker
    ///
    /// # Arguments
    /// * `time_provider` - Time provider for duration tracking
    /// * `resolver` - Maps tool names to executables (tools dir first, then PATH)
    /// * `default_timeout` - Used when an invocation carries no timeout
    ///
    /// # Example
    /// ```ignore
    /// let invoker = SubprocessInvoker::new(
    ///     Arc::new(SystemTimeProvider),
    ///     ToolResolver::new(Some("tools".into())),
    ///     Duration::from_secs(15),
    /// );
    /// ```
    pub fn new(
        time_provider: Arc<dyn TimeProvider>,
        resolver: ToolResolver,
        default_timeout: Duration,
    ) -> Self {
        Self {
            time_provider,
            resolver,
            default_timeout,
        }
    }

    fn build_command(&self, invocation: &Invocation) -> Command {
        let program = self.resolver.program_for(&invocation.program);

        let mut command = Command::new(program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Abandoned invocations must not leave the tool running
            .kill_on_drop(true);

        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        command
    }

    /// Spawn child process and wait for exit plus both streams
    async fn spawn_and_wait(
        &self,
        invocation: &Invocation,
        limit: Duration,
    ) -> Result<(std::process::ExitStatus, Vec<u8>, Vec<u8>), InvokeError> {
        let mut child = self
            .build_command(invocation)
            .spawn()
            .map_err(|e| InvokeError::Launch {
                program: invocation.program.clone(),
                reason: e.to_string(),
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let collect = async {
            tokio::try_join!(child.wait(), read_stream(stdout), read_stream(stderr))
        };
        let waited = timeout(limit, collect).await;

        match waited {
            Ok(Ok(captured)) => Ok(captured),
            Ok(Err(e)) => Err(InvokeError::Io {
                program: invocation.program.clone(),
                reason: e.to_string(),
            }),
            Err(_) => {
                warn!(
                    program = %invocation.program,
                    timeout_ms = limit.as_millis() as u64,
                    "Invocation timed out, terminating"
                );
                terminate(&mut child).await;
                Err(InvokeError::Timeout {
                    program: invocation.program.clone(),
                    timeout_ms: limit.as_millis() as u64,
                })
            }
        }
    }
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut s) = stream {
        s.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// SIGTERM first, then SIGKILL after a grace period
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            debug!(pid = pid, "Sending SIGTERM");
            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                && timeout(GRACEFUL_TERMINATE_TIMEOUT, child.wait()).await.is_ok()
            {
                debug!(pid = pid, "Process exited after SIGTERM");
                return;
            }
            warn!(pid = pid, "Process did not exit after SIGTERM, sending SIGKILL");
        }
    }

    if let Err(e) = child.kill().await {
        debug!(error = %e, "Kill after timeout failed (process already gone?)");
    }
}

#[async_trait]
impl ProcessInvoker for SubprocessInvoker {
    async fn invoke(&self, invocation: &Invocation) -> Result<CapturedOutput, InvokeError> {
        let limit = invocation.timeout.unwrap_or(self.default_timeout);
        let start_time = self.time_provider.now_millis();

        debug!(
            command = %invocation.command_line(),
            timeout_ms = limit.as_millis() as u64,
            "Starting invocation"
        );

        let (status, stdout, stderr) = self.spawn_and_wait(invocation, limit).await?;
        let duration_ms = self.time_provider.now_millis() - start_time;

        let output = CapturedOutput {
            stdout: String::from_utf8_lossy(&stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            exit_code: status.code(),
            duration_ms,
        };

        if output.success() {
            debug!(program = %invocation.program, duration_ms = duration_ms, "Invocation completed");
        } else {
            info!(
                program = %invocation.program,
                duration_ms = duration_ms,
                exit_code = ?output.exit_code,
                stderr = %output.stderr,
                "Invocation exited with failure"
            );
        }

        Ok(output)
    }
}
