//! Error types for environment composition and realization.

use thiserror::Error;

/// Result type alias for composer and engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the composer or by an engine realizing a container.
///
/// Each variant identifies the phase that failed: configuration (`Parse`),
/// command execution (`Execution`), or artifact retrieval (`ArtifactNotFound`).
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed platform string, detected before anything runs.
    #[error("invalid platform `{input}`: {reason}")]
    Parse { input: String, reason: String },

    /// A command exited non-zero inside the container.
    #[error("command `{}` failed with exit code {exit_code}\n{stderr}", args.join(" "))]
    Execution {
        args: Vec<String>,
        exit_code: i32,
        stderr: String,
    },

    /// The requested output path did not exist after execution.
    #[error("artifact not found at `{path}`")]
    ArtifactNotFound { path: String },

    /// The engine could not perform a primitive (pull, mount, commit...).
    #[error("engine failed to {operation}: {message}")]
    Engine { operation: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a platform parse failure.
    pub fn parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an engine primitive failure.
    pub fn engine(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Engine {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns the argument vector of a failed command, if this is an execution error.
    pub fn failed_args(&self) -> Option<&[String]> {
        match self {
            Error::Execution { args, .. } => Some(args),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_names_command() {
        let err = Error::Execution {
            args: vec!["go".into(), "build".into(), ".".into()],
            exit_code: 2,
            stderr: "undefined: foo".into(),
        };

        let msg = err.to_string();
        assert!(msg.contains("go build ."));
        assert!(msg.contains("exit code 2"));
        assert!(msg.contains("undefined: foo"));
        assert_eq!(err.failed_args().unwrap().len(), 3);
    }

    #[test]
    fn test_parse_error_names_input() {
        let err = Error::parse("linux", "expected os/arch[/variant]");
        assert_eq!(
            err.to_string(),
            "invalid platform `linux`: expected os/arch[/variant]"
        );
        assert!(err.failed_args().is_none());
    }
}
