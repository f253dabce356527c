use serde::Serialize;

use super::{ExecutionResult, FailureStage};

/// Wire shape of an execution: at most one of the fields is non-empty
///
/// A clean exit reports stdout only. Every other terminal status reports
/// the error text only, dropping any partial stdout.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionOutput {
    pub output: String,
    pub error: String,
}

impl From<&ExecutionResult> for ExecutionOutput {
    fn from(result: &ExecutionResult) -> Self {
        match result.failure_stage {
            FailureStage::None => Self {
                output: result.stdout.clone(),
                error: String::new(),
            },
            FailureStage::Build
            | FailureStage::Run
            | FailureStage::Timeout
            | FailureStage::Internal => Self {
                output: String::new(),
                error: result.stderr.clone(),
            },
        }
    }
}

impl From<ExecutionResult> for ExecutionOutput {
    fn from(result: ExecutionResult) -> Self {
        Self::from(&result)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn result(stdout: &str, stderr: &str, stage: FailureStage) -> ExecutionResult {
        ExecutionResult {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code: if stage == FailureStage::None { 0 } else { 1 },
            failure_stage: stage,
        }
    }

    #[test]
    fn test_success_reports_stdout_only() {
        let output = ExecutionOutput::from(result("hi\n", "warning: unused\n", FailureStage::None));
        assert_eq!(
            output,
            ExecutionOutput {
                output: "hi\n".to_string(),
                error: String::new(),
            }
        );
    }

    #[test]
    fn test_failures_report_error_only() {
        for stage in [
            FailureStage::Build,
            FailureStage::Run,
            FailureStage::Timeout,
            FailureStage::Internal,
        ] {
            let output = ExecutionOutput::from(result("partial", "went wrong", stage));
            assert_eq!(output.output, "");
            assert_eq!(output.error, "went wrong");
        }
    }
}
