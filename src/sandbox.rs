mod adapter;
mod error;
mod executor;
mod languages;
mod normalize;
mod process;
mod workspace;

pub use adapter::{ToolchainAdapter, adapter_for};
pub use error::ExecutionError;
pub use executor::Executor;
pub use languages::java::extract_public_class;
pub use normalize::ExecutionOutput;
pub use process::{ProcessLimits, ProcessOutcome, RunOutcome, run_process};
pub use workspace::Workspace;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Languages the dispatcher knows how to build and run
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    C,
    Cpp,
    Java,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Java => "java",
        }
    }
}

impl FromStr for Language {
    type Err = ExecutionError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "python" => Ok(Self::Python),
            "c" => Ok(Self::C),
            "cpp" => Ok(Self::Cpp),
            "java" => Ok(Self::Java),
            other => Err(ExecutionError::UnsupportedLanguage(other.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single piece of code to execute, immutable once received
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub source_code: String,
    pub language: Language,
    pub stdin: String,
}

impl ExecutionRequest {
    pub fn new(source_code: impl Into<String>, language: Language, stdin: Option<String>) -> Self {
        Self {
            source_code: source_code.into(),
            language,
            stdin: stdin.unwrap_or_default(),
        }
    }
}

/// The stage at which an execution stopped, `None` meaning it ran to a zero exit
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    None,
    Build,
    Run,
    Timeout,
    Internal,
}

/// Which child process a timeout interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Build,
    Run,
}

/// Terminal outcome of one execution request
///
/// `stdout` is always empty when the stage is `Build` or `Timeout`. For `Run`
/// failures it keeps whatever the program printed before exiting.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub failure_stage: FailureStage,
}

impl ExecutionResult {
    /// Builds the result of a program that ran to completion
    pub fn from_run(outcome: RunOutcome) -> Self {
        if outcome.success() {
            return Self {
                stdout: outcome.stdout,
                stderr: outcome.stderr,
                exit_code: 0,
                failure_stage: FailureStage::None,
            };
        }

        let stderr = if outcome.stderr.trim().is_empty() {
            outcome.describe_exit()
        } else {
            outcome.stderr
        };

        Self {
            stdout: outcome.stdout,
            stderr,
            exit_code: outcome.exit_code,
            failure_stage: FailureStage::Run,
        }
    }

    /// Builds the result of a compiler that exited unsuccessfully
    pub fn build_failure(outcome: RunOutcome) -> Self {
        let mut diagnostics = String::new();
        for stream in [&outcome.stdout, &outcome.stderr] {
            if stream.trim().is_empty() {
                continue;
            }
            if !diagnostics.is_empty() && !diagnostics.ends_with('\n') {
                diagnostics.push('\n');
            }
            diagnostics.push_str(stream);
        }
        if diagnostics.is_empty() {
            diagnostics = format!("Compilation failed: {}", outcome.describe_exit());
        }

        Self {
            stdout: String::new(),
            stderr: diagnostics,
            exit_code: outcome.exit_code,
            failure_stage: FailureStage::Build,
        }
    }

    pub fn timeout(phase: Phase, limits: &ProcessLimits) -> Self {
        let what = match phase {
            Phase::Build => "Compilation",
            Phase::Run => "Execution",
        };

        Self {
            stdout: String::new(),
            stderr: format!("{what} timed out after {} ms", limits.timeout.as_millis()),
            exit_code: -1,
            failure_stage: FailureStage::Timeout,
        }
    }

    /// Renders an error that aborted the pipeline
    pub fn from_error(error: &ExecutionError) -> Self {
        Self {
            stdout: String::new(),
            stderr: error.to_string(),
            exit_code: -1,
            failure_stage: error.stage(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure_stage == FailureStage::None
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn outcome(stdout: &str, stderr: &str, exit_code: i32, signal: Option<i32>) -> RunOutcome {
        RunOutcome {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code,
            signal,
        }
    }

    #[test]
    fn test_language_tags() {
        assert_eq!("python".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("cpp".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!(Language::Java.to_string(), "java");

        let err = "ruby".parse::<Language>().unwrap_err();
        assert!(matches!(err, ExecutionError::UnsupportedLanguage(ref tag) if tag == "ruby"));
        assert_eq!(
            ExecutionResult::from_error(&err).failure_stage,
            FailureStage::Internal
        );
    }

    #[test]
    fn test_run_failure_keeps_partial_stdout() {
        let result = ExecutionResult::from_run(outcome("partial\n", "boom\n", 1, None));
        assert_eq!(result.failure_stage, FailureStage::Run);
        assert_eq!(result.stdout, "partial\n");
        assert_eq!(result.stderr, "boom\n");
        assert_eq!(result.exit_code, 1);
    }

    #[test]
    fn test_silent_failure_gets_description() {
        let result = ExecutionResult::from_run(outcome("", "", 3, None));
        assert_eq!(result.stderr, "Process exited with code 3");

        let result = ExecutionResult::from_run(outcome("", "", -1, Some(libc::SIGSEGV)));
        assert_eq!(result.stderr, "Process terminated by signal 11");
    }

    #[test]
    fn test_build_failure_merges_streams() {
        let result = ExecutionResult::build_failure(outcome("note: a", "error: b\n", 1, None));
        assert_eq!(result.failure_stage, FailureStage::Build);
        assert_eq!(result.stdout, "");
        assert_eq!(result.stderr, "note: a\nerror: b\n");

        let result = ExecutionResult::build_failure(outcome("", "", 2, None));
        assert_eq!(result.stderr, "Compilation failed: Process exited with code 2");
    }

    #[test]
    fn test_timeout_message() {
        let limits = ProcessLimits {
            timeout: Duration::from_millis(1500),
            max_output_bytes: 16,
        };
        let result = ExecutionResult::timeout(Phase::Run, &limits);
        assert_eq!(result.failure_stage, FailureStage::Timeout);
        assert_eq!(result.stdout, "");
        assert_eq!(result.stderr, "Execution timed out after 1500 ms");
    }
}
