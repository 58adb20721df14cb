// ABOUTME: Invokes the host's external packaging tool against a staged plugin directory.
// ABOUTME: CommandPackager runs a configured program and locates the package named after the directory.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

/// Errors from the external packaging step.
#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("staged path has no directory name: {0}")]
    InvalidStagedDir(PathBuf),

    #[error("failed to run packager '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("packager exited with status {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },

    #[error("packager did not produce {0}")]
    MissingOutput(PathBuf),

    #[error("failed to read package {path}: {source}")]
    ReadPackage {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Turns a staged directory into a package file and returns its path.
pub trait Packager: Send + Sync {
    fn package(&self, staged_dir: &Path) -> Result<PathBuf, PackagingError>;
}

/// Runs `<program> <args...> <staged_dir>` from `output_dir` and expects
/// `<output_dir>/<staged_dir name>.<extension>` afterwards.
#[derive(Debug, Clone)]
pub struct CommandPackager {
    pub program: String,
    pub args: Vec<String>,
    pub extension: String,
    pub output_dir: PathBuf,
}

impl CommandPackager {
    /// The package path the tool is expected to produce for `staged_dir`.
    pub fn expected_output(&self, staged_dir: &Path) -> Result<PathBuf, PackagingError> {
        let name = staged_dir
            .file_name()
            .ok_or_else(|| PackagingError::InvalidStagedDir(staged_dir.to_path_buf()))?;
        Ok(self
            .output_dir
            .join(format!("{}.{}", name.to_string_lossy(), self.extension)))
    }
}

impl Packager for CommandPackager {
    fn package(&self, staged_dir: &Path) -> Result<PathBuf, PackagingError> {
        let expected = self.expected_output(staged_dir)?;
        // The child runs from output_dir, so a relative staged path would not resolve.
        let staged_dir = std::path::absolute(staged_dir)
            .map_err(|_| PackagingError::InvalidStagedDir(staged_dir.to_path_buf()))?;

        tracing::info!(
            "packaging {} with {} {}",
            staged_dir.display(),
            self.program,
            self.args.join(" ")
        );
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&staged_dir)
            .current_dir(&self.output_dir)
            .output()
            .map_err(|source| PackagingError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(PackagingError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !expected.is_file() {
            return Err(PackagingError::MissingOutput(expected));
        }
        Ok(expected)
    }
}
