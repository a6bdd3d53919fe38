use crate::action::{sort_flatten, Action, ActionKind};
use crate::error::EngineError;
use crate::rebase::Offset;
use crate::result::TestResult;
use serde::{Deserialize, Serialize};
use std::iter;

/// Unit in which action offsets are counted.
///
/// Rewrite engines report positions the way their host language indexes
/// strings: Ruby counts characters, JavaScript counts UTF-16 code units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetEncoding {
    /// Unicode scalar values
    #[default]
    Chars,
    /// UTF-16 code units
    Utf16,
    /// UTF-8 bytes
    Bytes,
}

impl OffsetEncoding {
    /// Byte index of `offset` within `text`, if it lands on a character boundary.
    pub fn byte_offset(self, text: &str, offset: usize) -> Option<usize> {
        match self {
            OffsetEncoding::Bytes => text.is_char_boundary(offset).then_some(offset),
            OffsetEncoding::Chars => text
                .char_indices()
                .map(|(idx, _)| idx)
                .chain(iter::once(text.len()))
                .nth(offset),
            OffsetEncoding::Utf16 => {
                let mut units = 0;
                for (idx, ch) in text.char_indices() {
                    if units == offset {
                        return Some(idx);
                    }
                    if units > offset {
                        // Inside a surrogate pair
                        return None;
                    }
                    units += ch.len_utf16();
                }
                (units == offset).then_some(text.len())
            }
        }
    }

    /// Length of `text` in this unit.
    pub fn len(self, text: &str) -> usize {
        match self {
            OffsetEncoding::Bytes => text.len(),
            OffsetEncoding::Chars => text.chars().count(),
            OffsetEncoding::Utf16 => text.encode_utf16().count(),
        }
    }
}

/// Replace `buffer[start, end)` with `new_text`.
pub fn splice(
    buffer: &str,
    start: usize,
    end: usize,
    new_text: &str,
    encoding: OffsetEncoding,
) -> Result<String, EngineError> {
    let invalid = || EngineError::InvalidRange {
        start,
        end,
        len: encoding.len(buffer),
    };
    if start > end {
        return Err(invalid());
    }
    let byte_start = encoding.byte_offset(buffer, start).ok_or_else(invalid)?;
    let byte_end = encoding.byte_offset(buffer, end).ok_or_else(invalid)?;

    let mut spliced =
        String::with_capacity(buffer.len() - (byte_end - byte_start) + new_text.len());
    spliced.push_str(&buffer[..byte_start]);
    spliced.push_str(new_text);
    spliced.push_str(&buffer[byte_end..]);
    Ok(spliced)
}

/// Splice one Replace or Group action into `source`.
///
/// Group children are applied highest offset first. Returns the new buffer
/// and the offsets introduced, in the order they were spliced.
pub fn splice_action(
    source: &str,
    action: &Action,
    encoding: OffsetEncoding,
) -> Result<(String, Vec<Offset>), EngineError> {
    match &action.kind {
        ActionKind::Replace { new_text } => {
            let spliced = splice(source, action.start, action.end, new_text, encoding)?;
            let offset = Offset::of(action.start, action.end, new_text, encoding);
            Ok((spliced, vec![offset]))
        }
        ActionKind::Group { children } => {
            let mut buffer = source.to_string();
            let mut offsets = Vec::with_capacity(children.len());
            for child in sort_flatten(children).into_iter().rev() {
                let ActionKind::Replace { new_text } = &child.kind else {
                    return Err(EngineError::FileLevelAction);
                };
                buffer = splice(&buffer, child.start, child.end, new_text, encoding)?;
                offsets.push(Offset::of(child.start, child.end, new_text, encoding));
            }
            tracing::debug!(children = children.len(), "spliced group");
            Ok((buffer, offsets))
        }
        _ => Err(EngineError::FileLevelAction),
    }
}

/// Apply actions already sorted in descending position order.
pub fn apply_to_buffer<'a>(
    buffer: &str,
    actions_desc: impl IntoIterator<Item = &'a Action>,
    encoding: OffsetEncoding,
) -> Result<String, EngineError> {
    let mut buffer = buffer.to_string();
    for action in actions_desc {
        buffer = splice_action(&buffer, action, encoding)?.0;
    }
    Ok(buffer)
}

/// Compute the fully edited content of a result without touching it.
///
/// Returns `None` when the result removes its file.
pub fn materialize(
    result: &TestResult,
    encoding: OffsetEncoding,
) -> Result<Option<String>, EngineError> {
    let mut buffer = result.file_source.clone();
    for action in sort_flatten(&result.actions).into_iter().rev() {
        match &action.kind {
            ActionKind::AddFile { new_text } => buffer = Some(new_text.clone()),
            ActionKind::RemoveFile => buffer = None,
            ActionKind::RenameFile => {}
            ActionKind::Replace { .. } | ActionKind::Group { .. } => {
                let source = buffer.as_deref().ok_or_else(|| EngineError::MissingSource {
                    file: result.file_path.clone(),
                })?;
                buffer = Some(apply_to_buffer(source, iter::once(action), encoding)?);
            }
        }
    }
    Ok(buffer)
}
