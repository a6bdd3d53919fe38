//! Rewrite Apply: selective application of rewrite-engine edit batches
//!
//! A rewrite engine run in test mode proposes [`Action`]s for a set of files,
//! grouped per file into [`TestResult`]s. This crate lets a caller apply any
//! subset of those actions, one at a time or in bulk, while every action not
//! yet applied keeps pointing at the right text.
//!
//! # Architecture
//!
//! - [`action`]: the action tree and its source ordering
//! - [`splice`]: splicing actions into a buffer, highest offset first
//! - [`rebase`]: shifting pending actions after an edit changes the length
//! - [`result`]: the JSON boundary, rename merging, source snapshots
//! - [`engine`]: incremental and batch application against a [`FileSystem`]
//!
//! # Example
//!
//! ```no_run
//! use rewrite_apply::{Action, Engine, MemoryFs, TestResult};
//!
//! let fs = MemoryFs::new().with_file("/ws/foo.ts", "hello world");
//! let mut engine = Engine::new(fs, "/ws");
//! let mut results = vec![TestResult::new(
//!     "foo.ts",
//!     vec![Action::replace(0, 5, "hi"), Action::replace(6, 11, "foo")],
//! )
//! .with_source("hello world")];
//!
//! let applied = engine.apply_action(&mut results, 0, 0)?;
//! println!("{applied}");
//! assert_eq!(results[0].actions, vec![Action::replace(3, 8, "foo")]);
//! # Ok::<(), rewrite_apply::EngineError>(())
//! ```

pub mod action;
pub mod config;
pub mod engine;
pub mod error;
pub mod fs;
pub mod rebase;
pub mod result;
pub mod safety;
pub mod splice;
pub mod telemetry;

// Re-exports
pub use action::{compare, flatten, sort_actions, sort_flatten, Action, ActionKind};
pub use config::{load_from_path, load_from_str, ConfigError, Settings};
pub use engine::{remove_action, remove_result, Applied, ApplyOptions, Engine};
pub use error::{EngineError, IngestError, InvalidAction};
pub use fs::{DiskFs, FileSystem, MemoryFs};
pub use rebase::{rebase, Offset};
pub use result::{
    handle_test_results, load_file_sources, merge_rename_results, parse_test_results,
    prepare_results, SearchResults, TestResult,
};
pub use safety::{SafetyError, WorkspaceGuard};
pub use splice::{apply_to_buffer, materialize, splice, splice_action, OffsetEncoding};
