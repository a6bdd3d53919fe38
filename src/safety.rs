use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Keeps every file effect inside the workspace root.
///
/// Targets that do not exist yet (new files, rename destinations) are checked
/// through their nearest existing ancestor.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Canonical workspace root
    workspace_root: PathBuf,
    /// Canonical forbidden directories
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl WorkspaceGuard {
    /// Create a guard for `workspace_root`; `forbidden` entries are root-relative.
    pub fn new(
        workspace_root: impl AsRef<Path>,
        forbidden: &[PathBuf],
    ) -> Result<Self, SafetyError> {
        let workspace_root = workspace_root.as_ref().canonicalize()?;
        let forbidden_paths = forbidden
            .iter()
            .map(|dir| resolve(&workspace_root.join(dir)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            workspace_root,
            forbidden_paths,
        })
    }

    /// Check that `path` may be written, removed or created.
    ///
    /// Returns the resolved absolute path.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };

        let resolved = resolve(&absolute)?;

        if !resolved.starts_with(&self.workspace_root) {
            return Err(SafetyError::OutsideWorkspace {
                path: resolved,
                workspace: self.workspace_root.clone(),
            });
        }

        for forbidden in &self.forbidden_paths {
            if resolved.starts_with(forbidden) {
                return Err(SafetyError::ForbiddenPath {
                    path: resolved,
                    forbidden: forbidden.clone(),
                });
            }
        }

        Ok(resolved)
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }
}

/// Canonicalize the longest existing prefix of `path` and append the rest.
///
/// `.` and `..` are folded lexically first so a missing directory cannot
/// hide an escape like `new_dir/../../outside`.
fn resolve(path: &Path) -> Result<PathBuf, SafetyError> {
    if let Ok(canonical) = path.canonicalize() {
        return Ok(canonical);
    }

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other),
        }
    }

    let mut existing = normalized.as_path();
    let mut pending = Vec::new();
    while !existing.exists() {
        let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) else {
            return Ok(normalized.canonicalize()?);
        };
        pending.push(name);
        existing = parent;
    }

    let mut resolved = existing.canonicalize()?;
    resolved.extend(pending.iter().rev());
    Ok(resolved)
}
