// Process Invoker Port
// One launch-wait-capture cycle against an external executable

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Request to run one external tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable name, resolved by the adapter (tools dir first, then PATH)
    pub program: String,
    pub args: Vec<String>,
    /// None = adapter default
    pub timeout: Option<Duration>,
}

impl Invocation {
    /// Build an invocation from a fixed argument string
    ///
    /// The string is split without a shell: whitespace separates arguments,
    /// double quotes group them and are removed. Not for paths or other
    /// caller data; see `from_args`.
    ///
    /// # Example
    /// ```text
    /// let inv = Invocation::new("adb", r#"-s ABC backup -f "/tmp/my backup.ab""#);
    /// assert_eq!(inv.args, vec!["-s", "ABC", "backup", "-f", "/tmp/my backup.ab"]);
    /// ```
    pub fn new(program: impl Into<String>, arg_string: &str) -> Self {
        Self {
            program: program.into(),
            args: split_arguments(arg_string),
            timeout: None,
        }
    }

    /// Build an invocation from ready-made argv entries
    ///
    /// Use this whenever an argument carries caller data such as a path;
    /// each entry reaches the child exactly as given.
    pub fn from_args<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Program and arguments as one line (for logs and mock lookups)
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Split an argument string into argv entries without shell interpretation
///
/// Whitespace separates, `"` toggles grouping, `\"` inside quotes is a
/// literal quote. An empty pair of quotes yields an empty argument.
pub fn split_arguments(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            '\\' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if has_token {
        args.push(current);
    }

    args
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Trimmed standard output
    pub stdout: String,
    /// Trimmed standard error, kept for diagnostics
    pub stderr: String,
    /// None when terminated by a signal
    pub exit_code: Option<i32>,
    pub duration_ms: i64,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Short failure description for diagnostics
    pub fn failure_summary(&self) -> String {
        let code = self
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        if self.stderr.is_empty() {
            format!("exit {}", code)
        } else {
            format!("exit {}: {}", code, self.stderr)
        }
    }
}

/// Invocation errors
///
/// A non-zero exit is NOT an error here; callers inspect `CapturedOutput`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    #[error("Failed to launch {program}: {reason}")]
    Launch { program: String, reason: String },

    #[error("{program} timed out after {timeout_ms}ms")]
    Timeout { program: String, timeout_ms: u64 },

    #[error("IO error while running {program}: {reason}")]
    Io { program: String, reason: String },
}

/// Process Invoker trait
///
/// Implementations:
/// - SubprocessInvoker (infra-system): spawns real processes
/// - mocks::ScriptedInvoker: canned responses for tests
#[async_trait]
pub trait ProcessInvoker: Send + Sync {
    /// Run the program to completion and capture its output
    ///
    /// Dropping the returned future abandons the invocation; adapters must
    /// make sure the child does not outlive it.
    ///
    /// # Errors
    /// - InvokeError::Launch if the executable cannot be found or started
    /// - InvokeError::Timeout if the invocation exceeds its timeout
    async fn invoke(&self, invocation: &Invocation) -> Result<CapturedOutput, InvokeError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Canned response for one invocation
    #[derive(Debug, Clone)]
    pub enum MockResponse {
        /// Exit 0 with this stdout
        Stdout(String),
        /// Full control over the captured output
        Output {
            stdout: String,
            stderr: String,
            exit_code: i32,
        },
        LaunchError,
        Timeout,
        /// Wait before producing the inner response
        Delayed(Duration, Box<MockResponse>),
    }

    impl MockResponse {
        pub fn stdout(text: impl Into<String>) -> Self {
            MockResponse::Stdout(text.into())
        }

        pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
            MockResponse::Output {
                stdout: String::new(),
                stderr: stderr.into(),
                exit_code,
            }
        }

        pub fn delayed(self, delay: Duration) -> Self {
            MockResponse::Delayed(delay, Box::new(self))
        }
    }

    /// Scripted invoker
    ///
    /// Lookup order: exact command line, then program name, then default.
    /// Queued responses are consumed in order; the last one is sticky.
    pub struct ScriptedInvoker {
        scripts: Mutex<HashMap<String, VecDeque<MockResponse>>>,
        default: MockResponse,
        calls: Mutex<Vec<Invocation>>,
    }

    impl ScriptedInvoker {
        /// Unscripted invocations fail to launch
        pub fn new() -> Self {
            Self::with_default(MockResponse::LaunchError)
        }

        pub fn with_default(default: MockResponse) -> Self {
            Self {
                scripts: Mutex::new(HashMap::new()),
                default,
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Script a response for a command line or a bare program name
        pub fn on(self, key: impl Into<String>, response: MockResponse) -> Self {
            self.push(key, response);
            self
        }

        pub fn push(&self, key: impl Into<String>, response: MockResponse) {
            self.scripts
                .lock()
                .unwrap()
                .entry(key.into())
                .or_default()
                .push_back(response);
        }

        /// Command lines seen so far, in call order
        pub fn calls(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(Invocation::command_line)
                .collect()
        }

        /// Invocations seen so far, argv intact
        pub fn invocations(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn next_response(&self, invocation: &Invocation) -> MockResponse {
            let mut scripts = self.scripts.lock().unwrap();
            let line = invocation.command_line();
            let key = if scripts.contains_key(&line) {
                line
            } else {
                invocation.program.clone()
            };
            match scripts.get_mut(&key) {
                Some(q) if q.len() > 1 => q.pop_front().unwrap_or_else(|| self.default.clone()),
                Some(q) => q.front().cloned().unwrap_or_else(|| self.default.clone()),
                None => self.default.clone(),
            }
        }
    }

    impl Default for ScriptedInvoker {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ProcessInvoker for ScriptedInvoker {
        async fn invoke(&self, invocation: &Invocation) -> Result<CapturedOutput, InvokeError> {
            self.calls.lock().unwrap().push(invocation.clone());
            let mut response = self.next_response(invocation);

            loop {
                match response {
                    MockResponse::Delayed(delay, inner) => {
                        tokio::time::sleep(delay).await;
                        response = *inner;
                    }
                    MockResponse::Stdout(stdout) => {
                        return Ok(CapturedOutput {
                            stdout: stdout.trim().to_string(),
                            stderr: String::new(),
                            exit_code: Some(0),
                            duration_ms: 1,
                        })
                    }
                    MockResponse::Output {
                        stdout,
                        stderr,
                        exit_code,
                    } => {
                        return Ok(CapturedOutput {
                            stdout: stdout.trim().to_string(),
                            stderr: stderr.trim().to_string(),
                            exit_code: Some(exit_code),
                            duration_ms: 1,
                        })
                    }
                    MockResponse::LaunchError => {
                        return Err(InvokeError::Launch {
                            program: invocation.program.clone(),
                            reason: "No such file or directory (os error 2)".to_string(),
                        })
                    }
                    MockResponse::Timeout => {
                        return Err(InvokeError::Timeout {
                            program: invocation.program.clone(),
                            timeout_ms: invocation
                                .timeout
                                .map(|t| t.as_millis() as u64)
                                .unwrap_or_default(),
                        })
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::{MockResponse, ScriptedInvoker};
    use super::*;

    #[test]
    fn test_split_plain_arguments() {
        assert_eq!(split_arguments("devices -l"), vec!["devices", "-l"]);
        assert_eq!(split_arguments("  -s   ABC  reboot "), vec!["-s", "ABC", "reboot"]);
        assert!(split_arguments("   ").is_empty());
    }

    #[test]
    fn test_split_quoted_arguments() {
        let args = split_arguments(r#"-s ABC backup -f "/tmp/my dir/wa.ab" -apk"#);
        assert_eq!(
            args,
            vec!["-s", "ABC", "backup", "-f", "/tmp/my dir/wa.ab", "-apk"]
        );

        assert_eq!(split_arguments(r#"a "" b"#), vec!["a", "", "b"]);
        assert_eq!(split_arguments(r#""say \"hi\"""#), vec![r#"say "hi""#]);
    }

    #[test]
    fn test_command_line() {
        let inv = Invocation::new("adb", "devices -l");
        assert_eq!(inv.command_line(), "adb devices -l");
        assert_eq!(Invocation::new("fastboot", "").command_line(), "fastboot");
    }

    #[test]
    fn test_from_args_keeps_entries_verbatim() {
        let inv = Invocation::from_args(
            "idevicebackup2",
            ["-u", "U1", "restore", r"C:\Backups\ios_U1\"],
        );
        assert_eq!(inv.args[3], r"C:\Backups\ios_U1\");

        let inv = Invocation::from_args(
            "adb",
            vec!["restore".to_string(), r#"/tmp/my "old" wa.ab"#.to_string()],
        );
        assert_eq!(inv.args, vec!["restore", r#"/tmp/my "old" wa.ab"#]);
        assert_eq!(inv.timeout, None);
    }

    #[test]
    fn test_failure_summary() {
        let out = CapturedOutput {
            stdout: String::new(),
            stderr: "error: device unauthorized".to_string(),
            exit_code: Some(1),
            duration_ms: 3,
        };
        assert!(!out.success());
        assert_eq!(out.failure_summary(), "exit 1: error: device unauthorized");
    }

    #[tokio::test]
    async fn test_scripted_invoker_lookup_order() {
        let invoker = ScriptedInvoker::new()
            .on("adb devices -l", MockResponse::stdout("exact"))
            .on("adb", MockResponse::stdout("by program"));

        let exact = invoker
            .invoke(&Invocation::new("adb", "devices -l"))
            .await
            .unwrap();
        assert_eq!(exact.stdout, "exact");

        let fallback = invoker
            .invoke(&Invocation::new("adb", "-s X reboot"))
            .await
            .unwrap();
        assert_eq!(fallback.stdout, "by program");

        let missing = invoker.invoke(&Invocation::new("fastboot", "-w")).await;
        assert!(matches!(missing, Err(InvokeError::Launch { .. })));

        assert_eq!(invoker.call_count(), 3);
    }

    #[tokio::test]
    async fn test_scripted_invoker_queue_is_sticky() {
        let invoker = ScriptedInvoker::new()
            .on("idevice_id -l", MockResponse::stdout("first"))
            .on("idevice_id -l", MockResponse::stdout("second"));
        let inv = Invocation::new("idevice_id", "-l");

        assert_eq!(invoker.invoke(&inv).await.unwrap().stdout, "first");
        assert_eq!(invoker.invoke(&inv).await.unwrap().stdout, "second");
        assert_eq!(invoker.invoke(&inv).await.unwrap().stdout, "second");
    }
}
