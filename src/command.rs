use std::fmt;
use std::io;
use std::process::{Command, ExitStatus, Stdio};

use tracing::debug;

/// A single external process call: a program followed by its ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// The line printed before the command runs, e.g. `> mkdir -p ./out`.
    pub fn echo_line(&self) -> String {
        format!("> {self}")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How an external command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Exited(i32),
    Terminated { signal: Option<i32> },
}

impl CommandStatus {
    pub fn success() -> Self {
        CommandStatus::Exited(0)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CommandStatus::Exited(0))
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            CommandStatus::Exited(code) => Some(*code),
            CommandStatus::Terminated { .. } => None,
        }
    }
}

impl From<ExitStatus> for CommandStatus {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => CommandStatus::Exited(code),
            None => CommandStatus::Terminated {
                signal: termination_signal(&status),
            },
        }
    }
}

#[cfg(unix)]
fn termination_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandStatus::Exited(code) => write!(f, "exit status {code}"),
            CommandStatus::Terminated { signal: Some(sig) } => {
                write!(f, "terminated by signal {sig}")
            }
            CommandStatus::Terminated { signal: None } => f.write_str("terminated without status"),
        }
    }
}

/// Executes invocations. Implementations block until the command has finished.
pub trait CommandRunner {
    fn run(&mut self, invocation: &Invocation) -> io::Result<CommandStatus>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &mut R {
    fn run(&mut self, invocation: &Invocation) -> io::Result<CommandStatus> {
        (**self).run(invocation)
    }
}

/// Spawns real processes with inherited stdin/stdout/stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> io::Result<CommandStatus> {
        let status = Command::new(invocation.program())
            .args(invocation.arguments())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        debug!(command = %invocation, %status, "Command finished");
        Ok(status.into())
    }
}

/// Reports success for every invocation without executing anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn run(&mut self, invocation: &Invocation) -> io::Result<CommandStatus> {
        debug!(command = %invocation, "Dry run, command skipped");
        Ok(CommandStatus::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_line_joins_arguments_with_single_spaces() {
        let invocation = Invocation::new("cp").args(["target/a/release/libx.a", "./libs/a/libx.a"]);
        assert_eq!(
            invocation.echo_line(),
            "> cp target/a/release/libx.a ./libs/a/libx.a"
        );
    }

    #[test]
    fn echo_line_without_arguments_is_just_the_program() {
        assert_eq!(Invocation::new("true").echo_line(), "> true");
    }

    #[test]
    fn only_zero_exit_is_success() {
        assert!(CommandStatus::Exited(0).is_success());
        assert!(!CommandStatus::Exited(101).is_success());
        assert!(!CommandStatus::Terminated { signal: Some(9) }.is_success());
        assert_eq!(CommandStatus::Exited(3).to_string(), "exit status 3");
    }

    #[test]
    fn dry_run_runner_never_fails() {
        let mut runner = DryRunRunner;
        let status = runner.run(&Invocation::new("false")).unwrap();
        assert!(status.is_success());
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_reports_exit_codes() {
        let mut runner = SystemRunner;
        let status = runner
            .run(&Invocation::new("sh").args(["-c", "exit 3"]))
            .unwrap();
        assert_eq!(status, CommandStatus::Exited(3));
    }
}
