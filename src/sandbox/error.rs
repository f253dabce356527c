use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::FailureStage;

/// Errors that abort an execution before the program produces an outcome
///
/// Compiler diagnostics, non-zero exits and timeouts are not errors: they are
/// ordinary outcomes carried by `ExecutionResult`.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("No public class found in Java code.")]
    MissingPublicClass,

    #[error("Failed to prepare workspace under {}: {source}", .root.display())]
    Workspace { root: PathBuf, source: io::Error },

    #[error("Failed to start `{program}`: {source}")]
    Toolchain { program: String, source: io::Error },

    #[error("Compiler reported success but produced no {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("Empty command line")]
    EmptyCommand,

    #[error("Execution cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ExecutionError {
    /// Stage reported to the caller when this error ends an execution
    pub fn stage(&self) -> FailureStage {
        match self {
            Self::MissingPublicClass | Self::MissingArtifact(_) => FailureStage::Build,
            _ => FailureStage::Internal,
        }
    }
}
