use std::path::{Path, PathBuf};

use crate::config::ToolchainConfig;

use super::languages::{java::JavaAdapter, native::NativeAdapter, python::PythonAdapter};
use super::{ExecutionError, Language, Workspace};

/// Per-language strategy for turning source text into a running program
///
/// Adapters only describe what to run; the executor owns the processes.
/// Every command is an argument vector and is never passed through a shell.
pub trait ToolchainAdapter: Send + Sync {
    fn language(&self) -> Language;

    /// Writes the source into the workspace under its conventional name
    fn materialize(
        &self,
        workspace: &Workspace,
        source_code: &str,
    ) -> Result<PathBuf, ExecutionError>;

    /// Compiler invocation, or `None` for interpreted languages
    fn build_command(&self, source: &Path, work_dir: &Path) -> Option<Vec<String>>;

    /// File the build must leave behind for the run to make sense
    fn artifact(&self, source: &Path, work_dir: &Path) -> Option<PathBuf>;

    fn run_command(&self, source: &Path, work_dir: &Path) -> Vec<String>;
}

pub fn adapter_for(language: Language, toolchains: &ToolchainConfig) -> Box<dyn ToolchainAdapter> {
    match language {
        Language::Python => Box::new(PythonAdapter::new(&toolchains.python)),
        Language::C => Box::new(NativeAdapter::c(&toolchains.c)),
        Language::Cpp => Box::new(NativeAdapter::cpp(&toolchains.cpp)),
        Language::Java => Box::new(JavaAdapter::new(&toolchains.javac, &toolchains.java)),
    }
}

pub(super) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
