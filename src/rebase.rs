//! Offset rebasing for actions that are still pending after an edit.
//!
//! Every applied edit leaves an [`Offset`]: where it ended in the old buffer
//! and how much it grew or shrank the text. Pending actions that start or end
//! at or after that point move by the same amount.

use crate::action::{for_each_mut, Action};
use crate::splice::OffsetEncoding;

/// Length change left behind by one applied edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    /// Start of the applied edit in the old buffer
    pub start: usize,
    /// End of the applied edit in the old buffer
    pub end: usize,
    /// `len(new_text) - (end - start)`
    pub size: isize,
}

impl Offset {
    pub fn of(start: usize, end: usize, new_text: &str, encoding: OffsetEncoding) -> Self {
        let size = encoding.len(new_text) as isize - (end as isize - start as isize);
        Self { start, end, size }
    }
}

/// Shift every pending action, groups and their children alike.
///
/// Offsets are applied in the order given, which must be the order the edits
/// were spliced (highest position first). Each comparison uses the offset's
/// own `end` from the old buffer.
pub fn rebase(actions: &mut [Action], offsets: &[Offset]) {
    if offsets.is_empty() {
        return;
    }
    for_each_mut(actions, &mut |action| {
        for offset in offsets {
            if action.start >= offset.end {
                action.start = action.start.saturating_add_signed(offset.size);
            }
            if action.end >= offset.end {
                action.end = action.end.saturating_add_signed(offset.size);
            }
        }
    });
}
