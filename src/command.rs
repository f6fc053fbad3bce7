use std::fmt;
use std::fs;
use std::io::Read;
use std::process::Child;
use std::process::Command;
use std::process::Stdio;
use std::thread;
use std::time::Duration;
use tracing::debug;
use tracing::warn;
use wait_timeout::ChildExt;

use crate::error::GatewayError;

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Where a route source reads its raw table from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCommand {
    Exec { program: String, args: Vec<String> },
    ReadFile(String),
}

impl SourceCommand {
    pub fn exec(program: &str, args: &[&str]) -> SourceCommand {
        SourceCommand::Exec {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
    pub fn read_file(path: &str) -> SourceCommand {
        SourceCommand::ReadFile(path.to_string())
    }
}

impl fmt::Display for SourceCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SourceCommand::Exec { program, args } => {
                let mut output = program.clone();
                for a in args {
                    output += " ";
                    output += a;
                }
                write!(f, "{}", output)
            }
            SourceCommand::ReadFile(path) => write!(f, "read {}", path),
        }
    }
}

/// What one command left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub success: bool,
    pub code: Option<i32>,
}

impl RawOutput {
    /// Output of a command that exited with status 0.
    pub fn ok(stdout: &[u8]) -> RawOutput {
        RawOutput {
            stdout: stdout.to_vec(),
            stderr: Vec::new(),
            success: true,
            code: Some(0),
        }
    }
    pub fn failed(stdout: &[u8], code: i32) -> RawOutput {
        RawOutput {
            stdout: stdout.to_vec(),
            stderr: Vec::new(),
            success: false,
            code: Some(code),
        }
    }
}

/// Runs the command of a route source and captures its output.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &SourceCommand) -> Result<RawOutput, GatewayError>;
}

/// Runs commands on this host. With a timeout, a child that outlives it is
/// killed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner {
    pub timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>) -> SystemRunner {
        SystemRunner { timeout }
    }
    fn build(program: &str, args: &[String]) -> Command {
        let mut c = Command::new(program);
        c.args(args);
        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            c.creation_flags(CREATE_NO_WINDOW);
        }
        c
    }
    /// Kill the child and collect its status so no zombie is left behind.
    fn kill_and_reap(command: &SourceCommand, child: &mut Child) {
        if let Err(e) = child.kill() {
            debug!("kill [{}] failed: {}", command, e);
        }
        if let Err(e) = child.wait() {
            warn!("reap [{}] failed: {}", command, e);
        }
    }
    fn run_with_timeout(
        command: &SourceCommand,
        mut c: Command,
        timeout: Duration,
    ) -> Result<RawOutput, GatewayError> {
        let mut child = c
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // drain both pipes so a chatty child never blocks on a full pipe
        let drain = |pipe: Option<Box<dyn Read + Send>>| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                if let Some(mut p) = pipe {
                    if let Err(e) = p.read_to_end(&mut buf) {
                        warn!("read child pipe failed: {}", e);
                    }
                }
                buf
            })
        };
        let stdout = drain(child.stdout.take().map(|p| Box::new(p) as Box<dyn Read + Send>));
        let stderr = drain(child.stderr.take().map(|p| Box::new(p) as Box<dyn Read + Send>));

        let status = match child.wait_timeout(timeout) {
            Ok(Some(s)) => s,
            Err(e) => {
                warn!("wait on [{}] failed: {}, killing it", command, e);
                SystemRunner::kill_and_reap(command, &mut child);
                return Err(GatewayError::IOError(e));
            }
            Ok(None) => {
                warn!("[{}] timed out after {:?}, killing it", command, timeout);
                SystemRunner::kill_and_reap(command, &mut child);
                return Err(GatewayError::CommandTimeout {
                    command: command.to_string(),
                    timeout,
                });
            }
        };
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();
        Ok(RawOutput {
            stdout,
            stderr,
            success: status.success(),
            code: status.code(),
        })
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &SourceCommand) -> Result<RawOutput, GatewayError> {
        debug!("run [{}]", command);
        match command {
            SourceCommand::ReadFile(path) => {
                let stdout = fs::read(path)?;
                Ok(RawOutput {
                    stdout,
                    stderr: Vec::new(),
                    success: true,
                    code: None,
                })
            }
            SourceCommand::Exec { program, args } => {
                let mut c = SystemRunner::build(program, args);
                match self.timeout {
                    Some(t) => SystemRunner::run_with_timeout(command, c, t),
                    None => {
                        let output = c.stdin(Stdio::null()).output()?;
                        Ok(RawOutput {
                            stdout: output.stdout,
                            stderr: output.stderr,
                            success: output.status.success(),
                            code: output.status.code(),
                        })
                    }
                }
            }
        }
    }
}
