use std::io;

use thiserror::Error;

use crate::command::CommandStatus;
use crate::plan::Step;

/// Why a staging run stopped. The first failing command aborts the whole run.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{step} step for target '{target}' failed with {status}: {command}")]
    CommandFailed {
        step: Step,
        target: String,
        command: String,
        status: CommandStatus,
    },
    #[error("{step} step for target '{target}' could not start `{command}`")]
    Spawn {
        step: Step,
        target: String,
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to echo command to output")]
    Echo(#[source] io::Error),
}

impl BuildError {
    pub fn step(&self) -> Option<Step> {
        match self {
            BuildError::CommandFailed { step, .. } | BuildError::Spawn { step, .. } => Some(*step),
            BuildError::Echo(_) => None,
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            BuildError::CommandFailed { target, .. } | BuildError::Spawn { target, .. } => {
                Some(target.as_str())
            }
            BuildError::Echo(_) => None,
        }
    }

    /// Process exit code: the failing command's own code when it has a non-zero one, else 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::CommandFailed { status, .. } => match status.code() {
                Some(code) if code != 0 => code,
                _ => 1,
            },
            BuildError::Spawn { .. } | BuildError::Echo(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(status: CommandStatus) -> BuildError {
        BuildError::CommandFailed {
            step: Step::Compile,
            target: "x86_64-apple-darwin".into(),
            command: "cargo build --release --target x86_64-apple-darwin".into(),
            status,
        }
    }

    #[test]
    fn exit_code_propagates_subprocess_code() {
        assert_eq!(failed(CommandStatus::Exited(101)).exit_code(), 101);
        assert_eq!(
            failed(CommandStatus::Terminated { signal: Some(15) }).exit_code(),
            1
        );
    }

    #[test]
    fn message_names_step_target_and_status() {
        let message = failed(CommandStatus::Exited(2)).to_string();
        assert!(message.contains("compile step"));
        assert!(message.contains("x86_64-apple-darwin"));
        assert!(message.contains("exit status 2"));
    }
}
