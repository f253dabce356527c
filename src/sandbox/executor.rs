use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::config::{ExecutionConfig, ToolchainConfig};

use super::{
    ExecutionError, ExecutionRequest, ExecutionResult, Phase, ProcessLimits, ProcessOutcome,
    ToolchainAdapter, Workspace, adapter_for, run_process,
};

/// Drives one request through workspace, build and run
///
/// Holds no per-request state: every call gets its own workspace, so a single
/// executor is shared by all request handlers.
#[derive(Debug, Clone)]
pub struct Executor {
    toolchains: ToolchainConfig,
    workspace_root: PathBuf,
    build_limits: ProcessLimits,
    run_limits: ProcessLimits,
    shutdown: CancellationToken,
}

impl Executor {
    pub fn new(config: &ExecutionConfig, shutdown: CancellationToken) -> Self {
        Self {
            toolchains: config.toolchains.clone(),
            workspace_root: config.resolve_workspace_root(),
            build_limits: ProcessLimits {
                timeout: config.build_timeout.into(),
                max_output_bytes: config.max_output_bytes,
            },
            run_limits: ProcessLimits {
                timeout: config.run_timeout.into(),
                max_output_bytes: config.max_output_bytes,
            },
            shutdown,
        }
    }

    pub fn workspace_root(&self) -> &std::path::Path {
        &self.workspace_root
    }

    /// Executes a request, always producing a result
    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        match self.try_execute(request).await {
            Ok(result) => {
                log::info!(
                    "{} execution finished with stage {:?}, exit code {}",
                    request.language,
                    result.failure_stage,
                    result.exit_code
                );
                result
            }
            Err(e) => {
                match &e {
                    ExecutionError::MissingPublicClass | ExecutionError::Cancelled => {
                        log::warn!("{} execution aborted: {e}", request.language)
                    }
                    _ => log::error!("{} execution failed: {e}", request.language),
                }
                ExecutionResult::from_error(&e)
            }
        }
    }

    async fn try_execute(
        &self,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, ExecutionError> {
        let adapter = adapter_for(request.language, &self.toolchains);
        let workspace = Workspace::acquire(&self.workspace_root)?;

        let result = self
            .run_in_workspace(adapter.as_ref(), &workspace, request)
            .await;

        if let Err(e) = workspace.release() {
            log::warn!("Failed to release workspace: {e}");
        }
        result
    }

    async fn run_in_workspace(
        &self,
        adapter: &dyn ToolchainAdapter,
        workspace: &Workspace,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, ExecutionError> {
        let work_dir = workspace.path();
        let source = adapter.materialize(workspace, &request.source_code)?;

        if let Some(build_command) = adapter.build_command(&source, work_dir) {
            let outcome = run_process(
                &build_command,
                work_dir,
                None,
                &self.build_limits,
                &self.shutdown,
            )
            .await?;

            match outcome {
                ProcessOutcome::Exited(outcome) if outcome.success() => {
                    if let Some(artifact) = adapter.artifact(&source, work_dir) {
                        if !artifact.exists() {
                            return Err(ExecutionError::MissingArtifact(artifact));
                        }
                    }
                    log::debug!("{} build succeeded", request.language);
                }
                ProcessOutcome::Exited(outcome) => {
                    return Ok(ExecutionResult::build_failure(outcome));
                }
                ProcessOutcome::TimedOut => {
                    return Ok(ExecutionResult::timeout(Phase::Build, &self.build_limits));
                }
                ProcessOutcome::Cancelled => return Err(ExecutionError::Cancelled),
            }
        }

        let run_command = adapter.run_command(&source, work_dir);
        let outcome = run_process(
            &run_command,
            work_dir,
            Some(&request.stdin),
            &self.run_limits,
            &self.shutdown,
        )
        .await?;

        match outcome {
            ProcessOutcome::Exited(outcome) => Ok(ExecutionResult::from_run(outcome)),
            ProcessOutcome::TimedOut => Ok(ExecutionResult::timeout(Phase::Run, &self.run_limits)),
            ProcessOutcome::Cancelled => Err(ExecutionError::Cancelled),
        }
    }
}
