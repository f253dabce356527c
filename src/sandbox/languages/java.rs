use std::path::{Path, PathBuf};

use crate::sandbox::adapter::{ToolchainAdapter, path_arg};
use crate::sandbox::{ExecutionError, Language, Workspace};

/// Compiles with `javac` and runs the public class with `java`
///
/// The Java toolchain insists that a public class lives in a file of the same
/// name, so the class name is resolved before anything touches the disk.
#[derive(Debug, Clone)]
pub struct JavaAdapter {
    compiler: String,
    runtime: String,
}

impl JavaAdapter {
    pub fn new(compiler: &str, runtime: &str) -> Self {
        Self {
            compiler: compiler.to_string(),
            runtime: runtime.to_string(),
        }
    }
}

fn class_name(source: &Path) -> String {
    source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl ToolchainAdapter for JavaAdapter {
    fn language(&self) -> Language {
        Language::Java
    }

    fn materialize(
        &self,
        workspace: &Workspace,
        source_code: &str,
    ) -> Result<PathBuf, ExecutionError> {
        let class = extract_public_class(source_code).ok_or(ExecutionError::MissingPublicClass)?;
        workspace.create_file(&format!("{class}.java"), source_code)
    }

    fn build_command(&self, source: &Path, work_dir: &Path) -> Option<Vec<String>> {
        Some(vec![
            self.compiler.clone(),
            "-d".to_string(),
            path_arg(work_dir),
            path_arg(source),
        ])
    }

    fn artifact(&self, source: &Path, work_dir: &Path) -> Option<PathBuf> {
        Some(work_dir.join(format!("{}.class", class_name(source))))
    }

    fn run_command(&self, source: &Path, work_dir: &Path) -> Vec<String> {
        vec![
            self.runtime.clone(),
            "-cp".to_string(),
            path_arg(work_dir),
            class_name(source),
        ]
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Finds the first `public class <Identifier>` declaration in Java source
///
/// Matching is textual: `public` must start a word and be separated from
/// `class` and from the identifier by whitespace.
pub fn extract_public_class(source: &str) -> Option<&str> {
    let mut search_from = 0;

    while let Some(offset) = source[search_from..].find("public") {
        let start = search_from + offset;
        search_from = start + "public".len();

        let starts_word = source[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !is_identifier_char(c));
        if !starts_word {
            continue;
        }

        let Some(rest) = strip_whitespace_then(&source[search_from..], "class") else {
            continue;
        };
        let Some(rest) = strip_leading_whitespace(rest) else {
            continue;
        };

        let end = rest
            .find(|c: char| !is_identifier_char(c))
            .unwrap_or(rest.len());
        let name = &rest[..end];
        if name.chars().next().is_some_and(|c| !c.is_ascii_digit()) {
            return Some(name);
        }
    }

    None
}

/// Requires at least one whitespace character, then `keyword`
fn strip_whitespace_then<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    strip_leading_whitespace(text)?.strip_prefix(keyword)
}

fn strip_leading_whitespace(text: &str) -> Option<&str> {
    let trimmed = text.trim_start();
    (trimmed.len() < text.len()).then_some(trimmed)
}
