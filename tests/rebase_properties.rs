//! Property tests for incremental application.
//!
//! Actions are generated as disjoint ranges with at least one untouched
//! character between neighbours, over text that mixes multi-byte chars.

use proptest::prelude::*;
use proptest::sample::Index;
use rewrite_apply::{
    materialize, rebase, remove_action, splice_action, Action, Engine, MemoryFs, OffsetEncoding,
    TestResult,
};
use std::path::Path;

const ROOT: &str = "/ws";
const FILE: &str = "src/lib.txt";

fn segments() -> impl Strategy<Value = Vec<(usize, usize, String)>> {
    prop::collection::vec((1usize..4, 0usize..4, "[a-zé😀]{0,4}"), 1..8)
}

fn filler() -> impl Strategy<Value = String> {
    "[a-zé ]{64}"
}

/// Lay out separated Replace actions and a buffer long enough to hold them.
fn build(segments: &[(usize, usize, String)], filler: &str) -> (String, Vec<Action>) {
    let mut pos = 0;
    let mut actions = Vec::with_capacity(segments.len());
    for (gap, width, text) in segments {
        let start = pos + gap;
        let end = start + width;
        actions.push(Action::replace(start, end, text.clone()));
        pos = end;
    }
    let source = filler.chars().take(pos + 1).collect();
    (source, actions)
}

/// Wrap runs of `size` neighbouring actions into groups.
fn grouped(actions: Vec<Action>, size: usize) -> Vec<Action> {
    actions
        .chunks(size)
        .map(|chunk| match chunk {
            [single] => single.clone(),
            many => Action::group(many.to_vec()),
        })
        .collect()
}

fn chars(buffer: &str, start: usize, end: usize) -> String {
    buffer.chars().skip(start).take(end - start).collect()
}

fn result_for(source: &str, actions: Vec<Action>) -> TestResult {
    TestResult::new(FILE, actions).with_source(source)
}

proptest! {
    #[test]
    fn prop_rebased_actions_keep_their_target_text(
        segments in segments(),
        filler in filler(),
        order in prop::collection::vec(any::<Index>(), 8),
    ) {
        let (mut buffer, mut actions) = build(&segments, &filler);
        let mut targets: Vec<String> = actions
            .iter()
            .map(|a| chars(&buffer, a.start, a.end))
            .collect();

        for pick in order.iter().cycle().take(actions.len()) {
            let idx = pick.index(actions.len());
            let (spliced, offsets) =
                splice_action(&buffer, &actions[idx], OffsetEncoding::Chars).unwrap();
            buffer = spliced;
            actions.remove(idx);
            targets.remove(idx);
            rebase(&mut actions, &offsets);

            for (action, target) in actions.iter().zip(&targets) {
                prop_assert_eq!(&chars(&buffer, action.start, action.end), target);
            }
        }
        prop_assert!(actions.is_empty());
    }

    #[test]
    fn prop_incremental_in_any_order_matches_materialize(
        segments in segments(),
        filler in filler(),
        group_size in 1usize..4,
        order in prop::collection::vec(any::<Index>(), 8),
    ) {
        let (source, actions) = build(&segments, &filler);
        let result = result_for(&source, grouped(actions, group_size));
        let expected = materialize(&result, OffsetEncoding::Chars).unwrap().unwrap();

        let fs = MemoryFs::new().with_file(Path::new(ROOT).join(FILE), source.as_str());
        let mut engine = Engine::new(fs, ROOT);
        let mut results = vec![result];
        let mut picks = order.iter().cycle();
        while let Some(result) = results.first() {
            let idx = picks.next().unwrap().index(result.actions.len());
            let _ = engine.apply_action(&mut results, 0, idx).unwrap();
        }

        prop_assert_eq!(engine.fs().get(Path::new(ROOT).join(FILE)), Some(expected.as_str()));
    }

    #[test]
    fn prop_skipping_leaves_siblings_untouched(
        segments in segments(),
        filler in filler(),
        skip in any::<Index>(),
    ) {
        let (source, actions) = build(&segments, &filler);
        let idx = skip.index(actions.len());
        let mut without = actions.clone();
        without.remove(idx);

        let mut results = vec![result_for(&source, actions)];
        let skipped = remove_action(&mut results, 0, idx).unwrap();
        prop_assert_eq!(skipped, segments_action(&segments, idx));

        if without.is_empty() {
            prop_assert!(results.is_empty());
        } else {
            prop_assert_eq!(&results[0].actions, &without);
            prop_assert_eq!(results[0].file_source.as_deref(), Some(source.as_str()));
            let expected = materialize(&result_for(&source, without), OffsetEncoding::Chars)
                .unwrap();
            prop_assert_eq!(materialize(&results[0], OffsetEncoding::Chars).unwrap(), expected);
        }
    }
}

fn segments_action(segments: &[(usize, usize, String)], idx: usize) -> Action {
    let start: usize = segments[..idx].iter().map(|(gap, width, _)| gap + width).sum::<usize>()
        + segments[idx].0;
    Action::replace(start, start + segments[idx].1, segments[idx].2.clone())
}
