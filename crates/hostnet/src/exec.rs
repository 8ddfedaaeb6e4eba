//! External command execution seam.
//!
//! Every shelled tool (`ip`, `netplan`, `ifup`, `nmcli`, `hostnamectl`,
//! `dhclient`, ...) is invoked through [`CommandRunner`], so the fallback
//! chains in the backend adapters can be exercised against a scripted
//! runner in tests. [`SystemRunner`] is the production implementation on
//! top of `tokio::process`.
//!
//! Commands are awaited to completion with no timeout; a hung tool stalls
//! the calling request. Callers needing bounded latency must impose an
//! external timeout.

use std::future::Future;
use std::io;

use crate::error::{Error, Result};

/// Captured output of a finished command.
#[derive(Debug, Clone)]
pub struct CmdOutput {
    /// The command line that was run, for diagnostics.
    pub command: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
}

impl CmdOutput {
    /// Turn a non-zero exit into [`Error::CommandFailed`].
    pub fn require_success(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(Error::CommandFailed {
                command: self.command,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Errors spawning an external command.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// The program is not installed (ENOENT on spawn).
    #[error("command not found: {program}")]
    NotFound {
        /// The program that could not be found.
        program: String,
    },

    /// Any other spawn failure.
    #[error("failed to run {program}: {source}")]
    Io {
        /// The program that failed to spawn.
        program: String,
        /// The underlying I/O error.
        source: io::Error,
    },
}

impl From<ExecError> for Error {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::NotFound { program } => Error::ToolMissing { program },
            ExecError::Io { source, .. } => Error::Io(source),
        }
    }
}

/// Result type for command execution.
pub type ExecResult = std::result::Result<CmdOutput, ExecError>;

/// Abstraction over external command execution.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, capturing output.
    ///
    /// A non-zero exit is not an error at this level; it is reported in
    /// [`CmdOutput::success`] so callers can choose their fallback.
    fn run(&self, program: &str, args: &[&str]) -> impl Future<Output = ExecResult> + Send;
}

/// Production runner backed by `tokio::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> impl Future<Output = ExecResult> + Send {
        let program = program.to_string();
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();

        async move {
            let command = command_line(&program, &args);
            tracing::debug!(command = %command, "running external command");

            let output = tokio::process::Command::new(&program)
                .args(&args)
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|e| {
                    if e.kind() == io::ErrorKind::NotFound {
                        ExecError::NotFound {
                            program: program.clone(),
                        }
                    } else {
                        ExecError::Io {
                            program: program.clone(),
                            source: e,
                        }
                    }
                })?;

            Ok(CmdOutput {
                command,
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}

fn command_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

#[cfg(any(test, feature = "test-util"))]
pub mod fake {
    //! Scripted runner for fallback-chain tests.

    use std::sync::{Arc, Mutex};

    use super::*;

    enum Script {
        Ok(String),
        Fail(String),
        Missing,
    }

    /// A [`CommandRunner`] that matches command lines against scripted
    /// prefixes. Unscripted commands succeed with empty output. Every
    /// invocation is recorded for assertions.
    #[derive(Clone, Default)]
    pub struct FakeRunner {
        inner: Arc<Mutex<Inner>>,
    }

    #[derive(Default)]
    struct Inner {
        scripts: Vec<(String, Script)>,
        calls: Vec<String>,
    }

    impl FakeRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Commands starting with `prefix` succeed with `stdout`.
        pub fn ok(self, prefix: &str, stdout: &str) -> Self {
            self.script(prefix, Script::Ok(stdout.to_string()))
        }

        /// Commands starting with `prefix` exit non-zero with `stderr`.
        pub fn fail(self, prefix: &str, stderr: &str) -> Self {
            self.script(prefix, Script::Fail(stderr.to_string()))
        }

        /// Commands starting with `prefix` fail to spawn (tool absent).
        pub fn missing(self, prefix: &str) -> Self {
            self.script(prefix, Script::Missing)
        }

        fn script(self, prefix: &str, script: Script) -> Self {
            self.inner
                .lock()
                .unwrap()
                .scripts
                .push((prefix.to_string(), script));
            self
        }

        /// All command lines run so far, in order.
        pub fn calls(&self) -> Vec<String> {
            self.inner.lock().unwrap().calls.clone()
        }

        /// Whether any recorded command line starts with `prefix`.
        pub fn ran(&self, prefix: &str) -> bool {
            self.calls().iter().any(|c| c.starts_with(prefix))
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[&str]) -> impl Future<Output = ExecResult> + Send {
            let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            let command = command_line(program, &args);
            let program = program.to_string();
            let inner = Arc::clone(&self.inner);

            async move {
                let mut inner = inner.lock().unwrap();
                inner.calls.push(command.clone());

                for (prefix, script) in &inner.scripts {
                    if command.starts_with(prefix.as_str()) {
                        return match script {
                            Script::Ok(stdout) => Ok(CmdOutput {
                                command,
                                success: true,
                                stdout: stdout.clone(),
                                stderr: String::new(),
                            }),
                            Script::Fail(stderr) => Ok(CmdOutput {
                                command,
                                success: false,
                                stdout: String::new(),
                                stderr: stderr.clone(),
                            }),
                            Script::Missing => Err(ExecError::NotFound { program }),
                        };
                    }
                }

                Ok(CmdOutput {
                    command,
                    success: true,
                    stdout: String::new(),
                    stderr: String::new(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeRunner;
    use super::*;

    #[tokio::test]
    async fn test_fake_runner_scripts() {
        let runner = FakeRunner::new()
            .ok("ip route", "default via 10.0.0.1 dev eth0")
            .fail("netplan apply", "cannot bind")
            .missing("dhclient");

        let out = runner.run("ip", &["route"]).await.unwrap();
        assert!(out.success);
        assert!(out.stdout.contains("default via"));

        let out = runner.run("netplan", &["apply"]).await.unwrap();
        assert!(!out.success);
        assert!(out.require_success().is_err());

        let err = runner.run("dhclient", &["eth0"]).await.unwrap_err();
        assert!(matches!(err, ExecError::NotFound { .. }));

        assert_eq!(runner.calls().len(), 3);
        assert!(runner.ran("netplan apply"));
    }

    #[test]
    fn test_exec_error_conversion() {
        let err: Error = ExecError::NotFound {
            program: "nmcli".into(),
        }
        .into();
        assert!(matches!(err, Error::ToolMissing { .. }));
    }
}
