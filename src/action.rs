//! The action model and source ordering.
//!
//! An [`Action`] is one proposed edit. Replace and Group actions carry a
//! `[start, end)` range in the coordinate space of the result's current
//! `file_source`; file-level actions (add, remove, rename) carry no
//! meaningful range.

use crate::error::InvalidAction;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One proposed edit, or a group of edits applied as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAction", into = "RawAction")]
pub struct Action {
    pub kind: ActionKind,
    /// Starting offset (inclusive)
    pub start: usize,
    /// Ending offset (exclusive)
    pub end: usize,
    /// Tie-break for actions sharing an identical range
    pub conflict_position: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Replace { new_text: String },
    Group { children: Vec<Action> },
    AddFile { new_text: String },
    RemoveFile,
    RenameFile,
}

impl Action {
    pub fn replace(start: usize, end: usize, new_text: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Replace {
                new_text: new_text.into(),
            },
            start,
            end,
            conflict_position: None,
        }
    }

    /// Create a group spanning all of its children.
    pub fn group(children: Vec<Action>) -> Self {
        let start = children.iter().map(|c| c.start).min().unwrap_or(0);
        let end = children.iter().map(|c| c.end).max().unwrap_or(0);
        Self {
            kind: ActionKind::Group { children },
            start,
            end,
            conflict_position: None,
        }
    }

    pub fn add_file(new_text: impl Into<String>) -> Self {
        Self::file_level(ActionKind::AddFile {
            new_text: new_text.into(),
        })
    }

    pub fn remove_file() -> Self {
        Self::file_level(ActionKind::RemoveFile)
    }

    pub fn rename_file() -> Self {
        Self::file_level(ActionKind::RenameFile)
    }

    fn file_level(kind: ActionKind) -> Self {
        Self {
            kind,
            start: 0,
            end: 0,
            conflict_position: None,
        }
    }

    pub fn with_conflict_position(mut self, position: i64) -> Self {
        self.conflict_position = Some(position);
        self
    }

    /// True for add, remove and rename actions.
    pub fn is_file_level(&self) -> bool {
        matches!(
            self.kind,
            ActionKind::AddFile { .. } | ActionKind::RemoveFile | ActionKind::RenameFile
        )
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, ActionKind::Group { .. })
    }

    pub fn new_text(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::Replace { new_text } | ActionKind::AddFile { new_text } => Some(new_text),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Action] {
        match &self.kind {
            ActionKind::Group { children } => children,
            _ => &[],
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ActionKind::Replace { .. } => "replace",
            ActionKind::Group { .. } => "group",
            ActionKind::AddFile { .. } => "add_file",
            ActionKind::RemoveFile => "remove_file",
            ActionKind::RenameFile => "rename_file",
        }
    }
}

/// Source order: `start`, then `end`, then `conflict_position`.
///
/// Two actions without a conflict position compare equal on identical
/// ranges, so a stable sort keeps their input order. An action without a
/// conflict position sorts before one that has it.
pub fn compare(a: &Action, b: &Action) -> Ordering {
    a.start
        .cmp(&b.start)
        .then(a.end.cmp(&b.end))
        .then(a.conflict_position.cmp(&b.conflict_position))
}

/// Expand every group into its leaves, depth-first, keeping relative order.
pub fn flatten(actions: &[Action]) -> Vec<&Action> {
    let mut leaves = Vec::with_capacity(actions.len());
    collect_leaves(actions, &mut leaves);
    leaves
}

fn collect_leaves<'a>(actions: &'a [Action], leaves: &mut Vec<&'a Action>) {
    for action in actions {
        match &action.kind {
            ActionKind::Group { children } => collect_leaves(children, leaves),
            _ => leaves.push(action),
        }
    }
}

/// Sort one level in source order, recursing into group children.
pub fn sort_actions(actions: &mut [Action]) {
    actions.sort_by(compare);
    for action in actions.iter_mut() {
        if let ActionKind::Group { children } = &mut action.kind {
            sort_actions(children);
        }
    }
}

/// Flatten, then sort the leaves in source order.
pub fn sort_flatten(actions: &[Action]) -> Vec<&Action> {
    let mut leaves = flatten(actions);
    leaves.sort_by(|a, b| compare(a, b));
    leaves
}

/// Visit every action mutably, groups before their children.
pub fn for_each_mut(actions: &mut [Action], f: &mut impl FnMut(&mut Action)) {
    for action in actions.iter_mut() {
        f(action);
        if let ActionKind::Group { children } = &mut action.kind {
            for_each_mut(children, f);
        }
    }
}

/// Wire shape of an action as emitted by the rewrite engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawAction {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    start: i64,
    #[serde(default)]
    end: i64,
    #[serde(
        default,
        alias = "newCode",
        alias = "new_text",
        alias = "newText",
        skip_serializing_if = "Option::is_none"
    )]
    new_code: Option<String>,
    #[serde(
        default,
        alias = "conflictPosition",
        skip_serializing_if = "Option::is_none"
    )]
    conflict_position: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    actions: Option<Vec<Action>>,
}

impl RawAction {
    fn offset(&self, value: i64, field: &str) -> Result<usize, InvalidAction> {
        usize::try_from(value).map_err(|_| InvalidAction {
            kind: self.kind.clone(),
            message: format!("negative {field} offset {value}"),
        })
    }
}

impl TryFrom<RawAction> for Action {
    type Error = InvalidAction;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        let kind = match raw.kind.as_str() {
            "add_file" => ActionKind::AddFile {
                new_text: raw.new_code.unwrap_or_default(),
            },
            "remove_file" => ActionKind::RemoveFile,
            "rename_file" => ActionKind::RenameFile,
            "group" => {
                let start = raw.offset(raw.start, "start")?;
                let end = raw.offset(raw.end, "end")?;
                return Ok(Action {
                    kind: ActionKind::Group {
                        children: raw.actions.unwrap_or_default(),
                    },
                    start,
                    end,
                    conflict_position: raw.conflict_position,
                });
            }
            // insert, delete and replace all reduce to a range replacement
            _ => {
                let start = raw.offset(raw.start, "start")?;
                let end = raw.offset(raw.end, "end")?;
                return Ok(Action {
                    kind: ActionKind::Replace {
                        new_text: raw.new_code.unwrap_or_default(),
                    },
                    start,
                    end,
                    conflict_position: raw.conflict_position,
                });
            }
        };
        Ok(Action {
            kind,
            start: 0,
            end: 0,
            conflict_position: raw.conflict_position,
        })
    }
}

impl From<Action> for RawAction {
    fn from(action: Action) -> Self {
        let kind = action.type_name().to_string();
        let (new_code, actions) = match action.kind {
            ActionKind::Replace { new_text } | ActionKind::AddFile { new_text } => {
                (Some(new_text), None)
            }
            ActionKind::Group { children } => (None, Some(children)),
            ActionKind::RemoveFile | ActionKind::RenameFile => (None, None),
        };
        RawAction {
            kind,
            start: action.start as i64,
            end: action.end as i64,
            new_code,
            conflict_position: action.conflict_position,
            actions,
        }
    }
}
