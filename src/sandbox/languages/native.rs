use std::path::{Path, PathBuf};

use crate::sandbox::adapter::{ToolchainAdapter, path_arg};
use crate::sandbox::{ExecutionError, Language, Workspace};

const EXECUTABLE_NAME: &str = "main";

/// Compiles C or C++ into a native executable inside the workspace
#[derive(Debug, Clone)]
pub struct NativeAdapter {
    language: Language,
    compiler: String,
    source_name: &'static str,
}

impl NativeAdapter {
    pub fn c(compiler: &str) -> Self {
        Self {
            language: Language::C,
            compiler: compiler.to_string(),
            source_name: "main.c",
        }
    }

    pub fn cpp(compiler: &str) -> Self {
        Self {
            language: Language::Cpp,
            compiler: compiler.to_string(),
            source_name: "main.cpp",
        }
    }
}

impl ToolchainAdapter for NativeAdapter {
    fn language(&self) -> Language {
        self.language
    }

    fn materialize(
        &self,
        workspace: &Workspace,
        source_code: &str,
    ) -> Result<PathBuf, ExecutionError> {
        workspace.create_file(self.source_name, source_code)
    }

    fn build_command(&self, source: &Path, work_dir: &Path) -> Option<Vec<String>> {
        Some(vec![
            self.compiler.clone(),
            path_arg(source),
            "-o".to_string(),
            path_arg(&work_dir.join(EXECUTABLE_NAME)),
        ])
    }

    fn artifact(&self, _source: &Path, work_dir: &Path) -> Option<PathBuf> {
        Some(work_dir.join(EXECUTABLE_NAME))
    }

    fn run_command(&self, _source: &Path, work_dir: &Path) -> Vec<String> {
        vec![path_arg(&work_dir.join(EXECUTABLE_NAME))]
    }
}
