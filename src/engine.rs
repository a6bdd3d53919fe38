//! Applying and skipping actions across a collection of results.
//!
//! Two modes share one [`Engine`]:
//! - incremental: [`Engine::apply_action`] applies one top-level action,
//!   persists the file, and rebases the actions still pending in that result;
//! - batch: [`Engine::apply_result`] and [`Engine::apply_all`] write whole
//!   results and drop them from the collection.
//!
//! [`remove_action`] and [`remove_result`] skip edits without touching any
//! file. Results leave the collection once nothing is left to apply.

use crate::action::{Action, ActionKind};
use crate::config::Settings;
use crate::error::EngineError;
use crate::fs::{DiskFs, FileSystem};
use crate::rebase::rebase;
use crate::result::TestResult;
use crate::safety::WorkspaceGuard;
use crate::splice::{materialize, splice_action, OffsetEncoding};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    pub encoding: OffsetEncoding,
    /// Compare the file on disk with `file_source` before overwriting it
    pub verify_source: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            encoding: OffsetEncoding::default(),
            verify_source: true,
        }
    }
}

impl From<&Settings> for ApplyOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            encoding: settings.offset_encoding,
            verify_source: settings.verify_source,
        }
    }
}

/// What an apply call did on the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Applied reports which file was touched"]
pub enum Applied {
    /// One action written; `remaining` actions still pending in the result
    Edited { file: PathBuf, remaining: usize },
    /// Whole result written
    Written { file: PathBuf },
    Created { file: PathBuf },
    Removed { file: PathBuf },
    Renamed { from: PathBuf, to: PathBuf },
}

impl fmt::Display for Applied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Applied::Edited { file, remaining } => write!(
                f,
                "Edited {} ({} action(s) pending)",
                file.display(),
                remaining
            ),
            Applied::Written { file } => write!(f, "Wrote {}", file.display()),
            Applied::Created { file } => write!(f, "Created {}", file.display()),
            Applied::Removed { file } => write!(f, "Removed {}", file.display()),
            Applied::Renamed { from, to } => {
                write!(f, "Renamed {} -> {}", from.display(), to.display())
            }
        }
    }
}

pub struct Engine<F: FileSystem> {
    fs: F,
    root: PathBuf,
    options: ApplyOptions,
    guard: Option<WorkspaceGuard>,
}

impl Engine<DiskFs> {
    /// Engine writing to disk under `root`, configured from `settings`.
    pub fn on_disk(root: impl Into<PathBuf>, settings: &Settings) -> Result<Self, EngineError> {
        let root = root.into();
        let guard = if settings.guard_workspace {
            Some(WorkspaceGuard::new(&root, &settings.forbidden)?)
        } else {
            None
        };
        Ok(Self {
            fs: DiskFs,
            root,
            options: settings.into(),
            guard,
        })
    }
}

impl<F: FileSystem> Engine<F> {
    pub fn new(fs: F, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
            options: ApplyOptions::default(),
            guard: None,
        }
    }

    pub fn with_options(mut self, options: ApplyOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_guard(mut self, guard: WorkspaceGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn into_fs(self) -> F {
        self.fs
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> ApplyOptions {
        self.options
    }

    /// Apply one top-level action of one result.
    ///
    /// A file-level action consumes its whole result. A Replace or Group is
    /// spliced into `file_source`, written, and removed; the remaining
    /// actions of the result are rebased onto the new content.
    pub fn apply_action(
        &mut self,
        results: &mut Vec<TestResult>,
        result_index: usize,
        action_index: usize,
    ) -> Result<Applied, EngineError> {
        let result = get_result(results, result_index)?;
        let action = get_action(result, action_index)?;

        if let Some(applied) = self.apply_file_level(result, action)? {
            results.remove(result_index);
            return Ok(applied);
        }

        let path = self.check(result.absolute_path(&self.root))?;
        let source = result
            .file_source
            .as_deref()
            .ok_or_else(|| EngineError::MissingSource {
                file: result.file_path.clone(),
            })?;
        let (new_source, offsets) = splice_action(source, action, self.options.encoding)?;
        self.verify_unchanged(&path, source)?;
        self.fs
            .write(&path, &new_source)
            .map_err(EngineError::io(&path))?;

        let result = &mut results[result_index];
        result.actions.remove(action_index);
        rebase(&mut result.actions, &offsets);
        result.file_source = Some(new_source);

        let remaining = result.actions.len();
        tracing::debug!(
            file = %path.display(),
            offsets = offsets.len(),
            remaining,
            "applied action"
        );
        if remaining == 0 {
            results.remove(result_index);
        }
        Ok(Applied::Edited {
            file: path,
            remaining,
        })
    }

    /// Apply a whole result and drop it from the collection.
    ///
    /// On error the result stays in the collection untouched.
    pub fn apply_result(
        &mut self,
        results: &mut Vec<TestResult>,
        result_index: usize,
    ) -> Result<Applied, EngineError> {
        let result = get_result(results, result_index)?;
        let leading = result
            .leading_action()
            .ok_or_else(|| EngineError::EmptyResult {
                file: result.file_path.clone(),
            })?;

        let applied = match self.apply_file_level(result, leading)? {
            Some(applied) => applied,
            None => self.write_result(result)?,
        };
        results.remove(result_index);
        Ok(applied)
    }

    /// Apply every result front to back, stopping at the first failure.
    pub fn apply_all(&mut self, results: &mut Vec<TestResult>) -> Result<Vec<Applied>, EngineError> {
        let mut applied = Vec::with_capacity(results.len());
        while !results.is_empty() {
            applied.push(self.apply_result(results, 0)?);
        }
        Ok(applied)
    }

    fn write_result(&mut self, result: &TestResult) -> Result<Applied, EngineError> {
        let path = self.check(result.absolute_path(&self.root))?;
        let source = result
            .file_source
            .as_deref()
            .ok_or_else(|| EngineError::MissingSource {
                file: result.file_path.clone(),
            })?;
        let content = materialize(result, self.options.encoding)?;
        self.verify_unchanged(&path, source)?;

        match content {
            Some(content) => {
                self.fs
                    .write(&path, &content)
                    .map_err(EngineError::io(&path))?;
                tracing::info!(file = %path.display(), "wrote result");
                Ok(Applied::Written { file: path })
            }
            None => {
                self.fs.remove(&path).map_err(EngineError::io(&path))?;
                tracing::info!(file = %path.display(), "removed file");
                Ok(Applied::Removed { file: path })
            }
        }
    }

    /// Perform add, remove or rename; `None` for content edits.
    fn apply_file_level(
        &mut self,
        result: &TestResult,
        action: &Action,
    ) -> Result<Option<Applied>, EngineError> {
        let applied = match &action.kind {
            ActionKind::Replace { .. } | ActionKind::Group { .. } => return Ok(None),
            ActionKind::AddFile { new_text } => {
                let path = self.check(result.absolute_path(&self.root))?;
                self.fs
                    .write(&path, new_text)
                    .map_err(EngineError::io(&path))?;
                tracing::info!(file = %path.display(), "created file");
                Applied::Created { file: path }
            }
            ActionKind::RemoveFile => {
                let path = self.check(result.absolute_path(&self.root))?;
                self.fs.remove(&path).map_err(EngineError::io(&path))?;
                tracing::info!(file = %path.display(), "removed file");
                Applied::Removed { file: path }
            }
            ActionKind::RenameFile => self.rename(result)?,
        };
        Ok(Some(applied))
    }

    /// Rename the file, then write any content edits merged into the result.
    fn rename(&mut self, result: &TestResult) -> Result<Applied, EngineError> {
        let from = self.check(result.absolute_path(&self.root))?;
        let to = result
            .new_absolute_path(&self.root)
            .ok_or_else(|| EngineError::MissingNewPath {
                file: result.file_path.clone(),
            })?;
        let to = self.check(to)?;

        let has_edits = result.actions.iter().any(|a| !a.is_file_level());
        let content = if has_edits {
            let source = result
                .file_source
                .as_deref()
                .ok_or_else(|| EngineError::MissingSource {
                    file: result.file_path.clone(),
                })?;
            let content = materialize(result, self.options.encoding)?;
            self.verify_unchanged(&from, source)?;
            content
        } else {
            None
        };

        self.fs.rename(&from, &to).map_err(EngineError::io(&from))?;
        if let Some(content) = content {
            self.fs.write(&to, &content).map_err(EngineError::io(&to))?;
        }
        tracing::info!(from = %from.display(), to = %to.display(), "renamed file");
        Ok(Applied::Renamed { from, to })
    }

    fn check(&self, path: PathBuf) -> Result<PathBuf, EngineError> {
        if let Some(guard) = &self.guard {
            guard.validate_path(&path)?;
        }
        Ok(path)
    }

    fn verify_unchanged(&self, path: &Path, source: &str) -> Result<(), EngineError> {
        if !self.options.verify_source {
            return Ok(());
        }
        let on_disk = self
            .fs
            .read_to_string(path)
            .map_err(EngineError::io(path))?;
        if on_disk != source {
            tracing::warn!(file = %path.display(), "file changed since edits were computed");
            return Err(EngineError::StaleSource {
                file: path.to_path_buf(),
            });
        }
        Ok(())
    }
}

/// Skip one top-level action without applying it.
///
/// Sibling offsets stay valid since the buffer is unchanged. The result is
/// dropped once its last action is gone.
pub fn remove_action(
    results: &mut Vec<TestResult>,
    result_index: usize,
    action_index: usize,
) -> Result<Action, EngineError> {
    let result = get_result(results, result_index)?;
    get_action(result, action_index)?;

    let result = &mut results[result_index];
    let removed = result.actions.remove(action_index);
    if result.actions.is_empty() {
        results.remove(result_index);
    }
    Ok(removed)
}

/// Skip a whole result.
pub fn remove_result(
    results: &mut Vec<TestResult>,
    result_index: usize,
) -> Result<TestResult, EngineError> {
    get_result(results, result_index)?;
    Ok(results.remove(result_index))
}

fn get_result(results: &[TestResult], index: usize) -> Result<&TestResult, EngineError> {
    results.get(index).ok_or(EngineError::ResultIndex {
        index,
        len: results.len(),
    })
}

fn get_action(result: &TestResult, index: usize) -> Result<&Action, EngineError> {
    result
        .actions
        .get(index)
        .ok_or_else(|| EngineError::ActionIndex {
            file: result.file_path.clone(),
            index,
            len: result.actions.len(),
        })
}
