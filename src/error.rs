use crate::safety::SafetyError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid range [{start}, {end}) in buffer of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("File-level action cannot be spliced into a buffer")]
    FileLevelAction,

    #[error("No source snapshot for {file}")]
    MissingSource { file: PathBuf },

    #[error("Rename of {file} has no target path")]
    MissingNewPath { file: PathBuf },

    #[error("{file} changed on disk since its edits were computed")]
    StaleSource { file: PathBuf },

    #[error("Result index {index} out of range ({len} results)")]
    ResultIndex { index: usize, len: usize },

    #[error("Action index {index} out of range ({len} actions in {file})")]
    ActionIndex {
        file: PathBuf,
        index: usize,
        len: usize,
    },

    #[error("Result for {file} has no actions")]
    EmptyResult { file: PathBuf },

    #[error(transparent)]
    Unsafe(#[from] SafetyError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| EngineError::Io { path, source }
    }
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("malformed rewrite output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rewrite engine reported: {0}")]
    Engine(String),
}

#[derive(Error, Debug)]
#[error("invalid action '{kind}': {message}")]
pub struct InvalidAction {
    pub kind: String,
    pub message: String,
}
