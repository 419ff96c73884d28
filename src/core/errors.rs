//! Error taxonomy for parsing, resolution, compilation and artifact handling.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Malformed command-line grammar.
///
/// Raised before any filesystem or network activity takes place.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("module name is required in `{raw}`")]
    EmptyModule { raw: String },

    #[error("missing version after `@` in `{raw}`")]
    MissingVersion { raw: String },

    #[error("missing replacement after `=` in `{raw}`")]
    MissingReplacement { raw: String },

    #[error("`{raw}` has no replacement; expected `module[@version]=replacement`")]
    ReplacementRequired { raw: String },

    #[error("embed directory is required in `{raw}`")]
    EmptyEmbedDir { raw: String },

    #[error("embed alias must be a relative path without `..` in `{raw}`")]
    InvalidEmbedAlias { raw: String },

    #[error("unable to split {name} `{value}`: unbalanced quotes")]
    InvalidFlags { name: &'static str, value: String },
}

/// Failures of a build or of the artifact it produced.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Module identity could not be established, or dependency resolution failed.
    ///
    /// `streamed` is set when the diagnostic already reached the terminal,
    /// in which case it is left out of the message.
    #[error("{message}{}", diagnostic_suffix(.diagnostic, .streamed))]
    Resolution {
        message: String,
        diagnostic: String,
        streamed: bool,
    },

    /// The compiler could not be invoked or exited unsuccessfully.
    #[error("{message}{}", diagnostic_suffix(.output, .streamed))]
    Compile {
        message: String,
        output: String,
        streamed: bool,
    },

    /// A temporary workspace or artifact could not be removed.
    #[error("failed to remove {}: {source}", .path.display())]
    Lifecycle {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The produced artifact could not be started or did not run cleanly.
    #[error("failed to run {}: {message}", .path.display())]
    Run { path: PathBuf, message: String },

    /// The operator interrupted a child process.
    #[error("`{command}` was cancelled")]
    Cancelled { command: String },
}

fn diagnostic_suffix(text: &str, streamed: &bool) -> String {
    let text = text.trim_end();
    if *streamed || text.is_empty() {
        String::new()
    } else {
        format!("\n{}", text)
    }
}

impl BuildError {
    /// Create a resolution error without attached tool output.
    pub fn resolution(message: impl Into<String>) -> Self {
        BuildError::Resolution {
            message: message.into(),
            diagnostic: String::new(),
            streamed: false,
        }
    }

    /// Attach the diagnostic text of the tool that failed.
    pub fn resolution_with(message: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        BuildError::Resolution {
            message: message.into(),
            diagnostic: diagnostic.into(),
            streamed: false,
        }
    }

    /// Create a compile error carrying the combined output of the failed invocation.
    pub fn compile(message: impl Into<String>, output: impl Into<String>) -> Self {
        BuildError::Compile {
            message: message.into(),
            output: output.into(),
            streamed: false,
        }
    }

    pub fn run(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        BuildError::Run {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Mark the attached tool output as already shown to the operator.
    pub fn streamed(mut self) -> Self {
        if let BuildError::Resolution { streamed, .. } | BuildError::Compile { streamed, .. } =
            &mut self
        {
            *streamed = true;
        }
        self
    }

    /// Check whether the error came from an operator interrupt.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildError::Cancelled { .. })
    }
}
