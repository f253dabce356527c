use std::path::{Path, PathBuf};

use crate::sandbox::adapter::{ToolchainAdapter, path_arg};
use crate::sandbox::{ExecutionError, Language, Workspace};

const SOURCE_NAME: &str = "main.py";

/// Runs source directly through the interpreter, no build step
#[derive(Debug, Clone)]
pub struct PythonAdapter {
    interpreter: String,
}

impl PythonAdapter {
    pub fn new(interpreter: &str) -> Self {
        Self {
            interpreter: interpreter.to_string(),
        }
    }
}

impl ToolchainAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn materialize(
        &self,
        workspace: &Workspace,
        source_code: &str,
    ) -> Result<PathBuf, ExecutionError> {
        workspace.create_file(SOURCE_NAME, source_code)
    }

    fn build_command(&self, _source: &Path, _work_dir: &Path) -> Option<Vec<String>> {
        None
    }

    fn artifact(&self, _source: &Path, _work_dir: &Path) -> Option<PathBuf> {
        None
    }

    fn run_command(&self, source: &Path, _work_dir: &Path) -> Vec<String> {
        vec![self.interpreter.clone(), path_arg(source)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_runs_source_without_build() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::acquire(root.path()).unwrap();
        let adapter = PythonAdapter::new("python3");

        let source = adapter.materialize(&workspace, "print(1)").unwrap();
        assert_eq!(source, workspace.path().join("main.py"));
        assert!(adapter.build_command(&source, workspace.path()).is_none());
        assert_eq!(
            adapter.run_command(&source, workspace.path()),
            vec!["python3".to_string(), path_arg(&source)]
        );
    }
}
