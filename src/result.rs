//! Test results: the proposed actions for one file plus its source snapshot.
//!
//! Results arrive as JSON from a rewrite engine's test mode. This module owns
//! that boundary: parsing with key normalization, merging rename results, and
//! reading the `file_source` snapshot each result's offsets refer to.

use crate::action::{Action, ActionKind};
use crate::error::{EngineError, IngestError};
use crate::fs::FileSystem;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Proposed actions for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    #[serde(default)]
    pub affected: bool,
    #[serde(default)]
    pub conflicted: bool,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(alias = "filePath")]
    pub file_path: PathBuf,
    #[serde(default, alias = "newFilePath", skip_serializing_if = "Option::is_none")]
    pub new_file_path: Option<PathBuf>,
    #[serde(default, alias = "rootPath", skip_serializing_if = "Option::is_none")]
    pub root_path: Option<PathBuf>,
    /// Content the action offsets refer to; absent for files not yet created
    #[serde(default, alias = "fileSource", skip_serializing_if = "Option::is_none")]
    pub file_source: Option<String>,
}

impl TestResult {
    pub fn new(file_path: impl Into<PathBuf>, actions: Vec<Action>) -> Self {
        Self {
            affected: true,
            conflicted: false,
            actions,
            file_path: file_path.into(),
            new_file_path: None,
            root_path: None,
            file_source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.file_source = Some(source.into());
        self
    }

    pub fn with_new_path(mut self, new_file_path: impl Into<PathBuf>) -> Self {
        self.new_file_path = Some(new_file_path.into());
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root_path = Some(root.into());
        self
    }

    pub fn leading_action(&self) -> Option<&Action> {
        self.actions.first()
    }

    /// True when the first action renames the file.
    pub fn is_rename(&self) -> bool {
        matches!(
            self.leading_action().map(|a| &a.kind),
            Some(ActionKind::RenameFile)
        )
    }

    /// Absolute path of the file, resolved against this result's root or `default_root`.
    pub fn absolute_path(&self, default_root: &Path) -> PathBuf {
        self.root(default_root).join(&self.file_path)
    }

    /// Absolute rename target, if any.
    pub fn new_absolute_path(&self, default_root: &Path) -> Option<PathBuf> {
        self.new_file_path
            .as_ref()
            .map(|path| self.root(default_root).join(path))
    }

    fn root<'a>(&'a self, default_root: &'a Path) -> &'a Path {
        self.root_path.as_deref().unwrap_or(default_root)
    }
}

/// Outcome of one rewrite-engine run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<TestResult>,
    #[serde(default, alias = "errorMessage")]
    pub error_message: String,
}

impl SearchResults {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            error_message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        !self.error_message.is_empty()
    }
}

/// Parse the JSON a rewrite engine prints in test mode.
///
/// The engine reports failures as a JSON object with an `error` key instead
/// of an array of results.
pub fn parse_test_results(output: &str) -> Result<Vec<TestResult>, IngestError> {
    let value: serde_json::Value = serde_json::from_str(output)?;
    if let Some(error) = value.get("error") {
        let message = match error {
            serde_json::Value::String(message) => message.clone(),
            other => other.to_string(),
        };
        return Err(IngestError::Engine(message));
    }
    Ok(serde_json::from_value(value)?)
}

/// Fold every result that touches a renamed file into the rename result.
///
/// The first rename result per path absorbs the actions of all other results
/// with the same `file_path`, which are dropped. Untouched results keep
/// their order; rename results follow them.
pub fn merge_rename_results(results: Vec<TestResult>) -> Vec<TestResult> {
    let rename_paths: Vec<PathBuf> = results
        .iter()
        .filter(|result| result.is_rename())
        .map(|result| result.file_path.clone())
        .collect();
    if rename_paths.is_empty() {
        return results;
    }

    let mut kept = Vec::with_capacity(results.len());
    let mut renames: Vec<TestResult> = Vec::with_capacity(rename_paths.len());
    let mut absorbed = Vec::new();
    for result in results {
        let first_rename =
            result.is_rename() && !renames.iter().any(|r| r.file_path == result.file_path);
        if first_rename {
            renames.push(result);
        } else if rename_paths.contains(&result.file_path) {
            absorbed.push(result);
        } else {
            kept.push(result);
        }
    }

    for other in absorbed {
        if let Some(target) = renames.iter_mut().find(|r| r.file_path == other.file_path) {
            tracing::debug!(
                file = %other.file_path.display(),
                actions = other.actions.len(),
                "merging edits into rename"
            );
            target.conflicted |= other.conflicted;
            target.affected |= other.affected;
            target.actions.extend(other.actions);
        }
    }

    kept.extend(renames);
    kept
}

/// Snapshot the current content of every result whose file exists.
///
/// Results that already carry a snapshot keep it, so a saved session still
/// detects files changed behind its back.
pub fn load_file_sources<F: FileSystem>(
    results: &mut [TestResult],
    root: &Path,
    fs: &F,
) -> Result<(), EngineError> {
    for result in results.iter_mut() {
        if result.root_path.is_none() {
            result.root_path = Some(root.to_path_buf());
        }
        if result.file_source.is_some() {
            continue;
        }
        let path = result.absolute_path(root);
        if fs.exists(&path) {
            let source = fs.read_to_string(&path).map_err(EngineError::io(&path))?;
            result.file_source = Some(source);
        }
    }
    Ok(())
}

/// Merge renames and load snapshots for freshly parsed results.
pub fn prepare_results<F: FileSystem>(
    results: Vec<TestResult>,
    root: &Path,
    fs: &F,
) -> Result<Vec<TestResult>, EngineError> {
    let mut results = merge_rename_results(results);
    load_file_sources(&mut results, root, fs)?;
    Ok(results)
}

/// Turn a rewrite engine's captured output into [`SearchResults`].
///
/// Any failure, whether reported by the engine or hit while reading the
/// output, is carried in `error_message` with an empty result list.
pub fn handle_test_results<F: FileSystem>(
    output: &str,
    error: Option<&str>,
    root: &Path,
    fs: &F,
) -> SearchResults {
    if let Some(error) = error.filter(|e| !e.is_empty()) {
        return SearchResults::failed(error);
    }
    let parsed = match parse_test_results(output) {
        Ok(results) => results,
        Err(IngestError::Engine(message)) => return SearchResults::failed(message),
        Err(e) => return SearchResults::failed(e.to_string()),
    };
    match prepare_results(parsed, root, fs) {
        Ok(results) => SearchResults {
            results,
            error_message: String::new(),
        },
        Err(e) => SearchResults::failed(e.to_string()),
    }
}
