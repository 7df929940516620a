//! Loading the project's pinned requirement list.
//!
//! A `Pipfile` takes precedence and is flattened by the lock tool
//! (`pipenv lock --requirements`); otherwise `requirements.txt` is read
//! verbatim. Finding neither is an error so a deployment never ships
//! functions without their dependencies.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub const PIPFILE: &str = "Pipfile";
pub const REQUIREMENTS_TXT: &str = "requirements.txt";

#[derive(Debug, Error)]
pub enum RequirementsError {
    #[error("no dependencies found (no requirements.txt and no Pipfile) in {}", .0.display())]
    NoDependencies(PathBuf),
    #[error("{tool} not found! Install it with '{install_hint}'.")]
    ToolNotInstalled { tool: String, install_hint: String },
    #[error("{tool} failed ({status}):\n{stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("{tool} produced non UTF-8 output")]
    InvalidOutput { tool: String },
    #[error("failed to read requirements: {0}")]
    Io(#[from] std::io::Error),
}

/// The project's full pinned requirement set, one specifier per line.
///
/// Loaded once per deployment and shared read-only by every runtime tag.
#[derive(Clone, PartialEq, Eq)]
pub struct Requirements(Arc<str>);

impl Requirements {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Requirement lines, skipping blanks and comments.
    pub fn specifiers(&self) -> impl Iterator<Item = &str> {
        self.0
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
    }
}

impl fmt::Debug for Requirements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Requirements")
            .field(&self.specifiers().count())
            .finish()
    }
}

/// Produces the requirement text for a deployment.
pub trait RequirementsLoader {
    fn load(&self) -> Result<Requirements, RequirementsError>;
}

/// Fixed requirement text, for hosts that already hold it.
#[derive(Debug, Clone)]
pub struct StaticRequirements(pub Requirements);

impl StaticRequirements {
    pub fn new(text: &str) -> Self {
        Self(Requirements::new(text))
    }
}

impl RequirementsLoader for StaticRequirements {
    fn load(&self) -> Result<Requirements, RequirementsError> {
        Ok(self.0.clone())
    }
}

/// Reads requirements from a project directory.
#[derive(Debug, Clone)]
pub struct ProjectRequirements {
    project_dir: PathBuf,
    lock_tool: String,
}

impl ProjectRequirements {
    pub fn new(project_dir: impl Into<PathBuf>, lock_tool: &str) -> Self {
        Self {
            project_dir: project_dir.into(),
            lock_tool: lock_tool.to_owned(),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    fn lock(&self) -> Result<Requirements, RequirementsError> {
        info!("loading dependencies from {}", self.lock_tool);
        let output = Command::new(&self.lock_tool)
            .args(["lock", "--requirements"])
            .current_dir(&self.project_dir)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RequirementsError::ToolNotInstalled {
                    tool: self.lock_tool.clone(),
                    install_hint: format!("pip install {}", self.lock_tool),
                },
                _ => RequirementsError::Io(e),
            })?;

        if !output.status.success() {
            return Err(RequirementsError::ToolFailed {
                tool: self.lock_tool.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let text = String::from_utf8(output.stdout).map_err(|_| {
            RequirementsError::InvalidOutput {
                tool: self.lock_tool.clone(),
            }
        })?;
        Ok(Requirements::new(text))
    }
}

impl RequirementsLoader for ProjectRequirements {
    fn load(&self) -> Result<Requirements, RequirementsError> {
        if self.project_dir.join(PIPFILE).is_file() {
            return self.lock();
        }

        let requirements_txt = self.project_dir.join(REQUIREMENTS_TXT);
        if requirements_txt.is_file() {
            info!("loading dependencies from {}", requirements_txt.display());
            return Ok(Requirements::new(std::fs::read_to_string(
                &requirements_txt,
            )?));
        }

        Err(RequirementsError::NoDependencies(self.project_dir.clone()))
    }
}
