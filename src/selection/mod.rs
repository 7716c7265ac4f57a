//! Selection resolution and time-ordered traversal
//!
//! A `Selection` is a selector resolved against the current score tree. It
//! borrows the tree, so the borrow checker enforces the model's staleness
//! rule mechanically: no Selection can be cached across a mutation.
//!
//! Every resolution function returns `None` for ordinary bounds mismatches
//! (stale selectors are expected during editing); only corrupted-tree
//! conditions are allowed to panic.

use crate::models::core::{Measure, Note, Pitch, Score, Staff};
use crate::models::modifiers::{create_tie_lines, ModifierPayload, TieLine};
use crate::models::selectors::Selector;

/// A selector resolved against the score tree
///
/// Holds shared references into the tree plus a snapshot of the selected
/// pitch values. Construct on demand via [`resolve`]; never store one across
/// an edit.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    /// The coordinate this selection was resolved from
    pub selector: Selector,

    /// The staff the selector addresses
    pub staff: &'a Staff,

    /// The measure the selector addresses
    pub measure: &'a Measure,

    /// The note, when the selector is note-level and in bounds
    pub note: Option<&'a Note>,

    /// Snapshot of the pitch values named by the selector's pitch indices
    pub pitches: Vec<Pitch>,
}

/// Resolve a selector against the score, bounds-checking at every level
///
/// A measure-level selector (tick sentinel) resolves with `note: None`.
/// Returns `None` whenever any index is out of the tree's current bounds.
pub fn resolve<'a>(score: &'a Score, selector: &Selector) -> Option<Selection<'a>> {
    let staff = score.staff(selector.staff)?;
    let measure = staff.measure(selector.measure)?;

    if selector.is_measure_level() {
        return Some(Selection {
            selector: selector.clone(),
            staff,
            measure,
            note: None,
            pitches: Vec::new(),
        });
    }

    let voice = measure.voice(selector.voice)?;
    let note = voice.note(selector.tick)?;
    let pitches = selector
        .pitches
        .iter()
        .filter_map(|&i| note.pitches.get(i).copied())
        .collect();

    Some(Selection {
        selector: selector.clone(),
        staff,
        measure,
        note: Some(note),
        pitches,
    })
}

/// The following note in the same staff/voice
///
/// Continues into tick 0 of the next measure at a measure boundary; returns
/// `None` past the staff's last measure. A measure-level selector advances
/// to the first note of its own measure.
pub fn next_note<'a>(score: &'a Score, selector: &Selector) -> Option<Selection<'a>> {
    let staff = score.staff(selector.staff)?;
    let measure = staff.measure(selector.measure)?;
    let voice = measure.voice(selector.voice)?;

    let next_tick = selector.tick.max(-1) + 1;
    if (next_tick as usize) < voice.note_count() {
        return resolve(
            score,
            &Selector::note(selector.staff, selector.measure, selector.voice, next_tick),
        );
    }

    if selector.measure + 1 < staff.measure_count() {
        return resolve(
            score,
            &Selector::note(selector.staff, selector.measure + 1, selector.voice, 0),
        );
    }

    None
}

/// The preceding note in the same staff/voice
///
/// Continues into the last note of the previous measure at a measure
/// boundary; returns `None` before the first note of the first measure.
pub fn previous_note<'a>(score: &'a Score, selector: &Selector) -> Option<Selection<'a>> {
    let staff = score.staff(selector.staff)?;

    if selector.tick > 0 {
        return resolve(
            score,
            &Selector::note(
                selector.staff,
                selector.measure,
                selector.voice,
                selector.tick - 1,
            ),
        );
    }

    if selector.measure == 0 {
        return None;
    }
    let prev_measure = staff.measure(selector.measure - 1)?;
    let prev_voice = prev_measure.voice(selector.voice)?;
    if prev_voice.note_count() == 0 {
        return None;
    }
    resolve(
        score,
        &Selector::note(
            selector.staff,
            selector.measure - 1,
            selector.voice,
            prev_voice.note_count() as i32 - 1,
        ),
    )
}

/// The next sounding (non-rest) note, or `None` at the traversal boundary
pub fn next_note_non_rest<'a>(score: &'a Score, selector: &Selector) -> Option<Selection<'a>> {
    let mut cursor = next_note(score, selector);
    while let Some(selection) = cursor {
        match selection.note {
            Some(note) if !note.is_rest() => return Some(selection),
            _ => cursor = next_note(score, &selection.selector),
        }
    }
    None
}

/// The previous sounding (non-rest) note, or `None` at the traversal boundary
pub fn previous_note_non_rest<'a>(score: &'a Score, selector: &Selector) -> Option<Selection<'a>> {
    let mut cursor = previous_note(score, selector);
    while let Some(selection) = cursor {
        match selection.note {
            Some(note) if !note.is_rest() => return Some(selection),
            _ => cursor = previous_note(score, &selection.selector),
        }
    }
    None
}

/// Walk forward note-by-note until `ticks` worth of duration is consumed
///
/// Each step consumes the current note's duration. Returns `None` if the
/// score ends before the count is exhausted, or if a step makes no progress
/// (guards against malformed voices).
pub fn advance_by_ticks<'a>(
    score: &'a Score,
    start: &Selection<'a>,
    ticks: u64,
) -> Option<Selection<'a>> {
    let mut current = resolve(score, &start.selector)?;
    let mut remaining = ticks;

    while remaining > 0 {
        let duration = current.note?.ticks;
        let next = next_note(score, &current.selector)?;
        if Selector::eq(&next.selector, &current.selector) {
            // No progress: malformed voice, bail out instead of spinning
            return None;
        }
        remaining = remaining.saturating_sub(duration);
        current = next;
    }

    Some(current)
}

/// Signed tick distance between two selectors, by repeated traversal
///
/// Positive when `to` is reachable forward from `from`, negative when
/// backward, `Some(0)` when equal, `None` when neither endpoint can reach
/// the other. Computed by stepping and summing note durations, never by
/// arithmetic on tick fields (voices may have differing granularities).
pub fn count_ticks(score: &Score, from: &Selector, to: &Selector) -> Option<i64> {
    if Selector::eq(from, to) {
        return Some(0);
    }
    if let Some(distance) = count_ticks_forward(score, from, to) {
        return Some(distance);
    }
    count_ticks_forward(score, to, from).map(|d| -d)
}

fn count_ticks_forward(score: &Score, from: &Selector, to: &Selector) -> Option<i64> {
    let mut total: i64 = 0;
    let mut current = resolve(score, from)?;
    loop {
        let duration = current.note.map(|n| n.ticks as i64).unwrap_or(0);
        let next = next_note(score, &current.selector)?;
        total += duration;
        if Selector::eq(&next.selector, to) {
            return Some(total);
        }
        current = next;
    }
}

/// Every selection from one endpoint to the other, inclusive, in time order
///
/// Endpoints are ordered by musical time first, then the walk follows
/// [`next_note`] from the earlier one, collecting until past the later one.
/// Each call re-walks from scratch; there is no shared iterator state.
pub fn enumerate_range<'a>(
    score: &'a Score,
    start: &Selector,
    end: &Selector,
) -> Vec<Selection<'a>> {
    let (first, last) = Selector::order(start, end);
    let mut out = Vec::new();

    let mut cursor = resolve(score, first);
    while let Some(selection) = cursor {
        if Selector::gt_in_time(&selection.selector, last) {
            break;
        }
        let next = next_note(score, &selection.selector);
        out.push(selection);
        cursor = next;
    }

    out
}

/// Planned change to one modifier during re-validation
enum Revalidation {
    Drop,
    Update {
        start: Selector,
        end: Selector,
        tie_lines: Option<Vec<TieLine>>,
    },
}

/// Re-validate every modifier on a staff after a structural edit
///
/// Endpoints whose note no longer exists are re-anchored to the last note of
/// the voice when the measure survives, otherwise the modifier is dropped.
/// Inverted start/end pairs are swapped back into editing order. Tie line
/// pairings are recomputed from the resolved pitch counts; a tie with no
/// remaining pairing is dropped silently.
pub fn revalidate_staff_modifiers(score: &mut Score, staff_index: usize) {
    let mut planned: Vec<(u64, Revalidation)> = Vec::new();

    {
        let Some(staff) = score.staff(staff_index) else {
            return;
        };
        for modifier in staff.modifiers.all() {
            let (Some(start), Some(end)) = (
                reanchor(score, &modifier.start),
                reanchor(score, &modifier.end),
            ) else {
                planned.push((modifier.id, Revalidation::Drop));
                continue;
            };
            let (start, end) = if Selector::gt(&start, &end) {
                (end, start)
            } else {
                (start, end)
            };

            let tie_lines = match &modifier.payload {
                ModifierPayload::Tie { .. } => {
                    let from_count = resolve(score, &start)
                        .and_then(|s| s.note.map(|n| n.pitches.len()))
                        .unwrap_or(0);
                    let to_count = resolve(score, &end)
                        .and_then(|s| s.note.map(|n| n.pitches.len()))
                        .unwrap_or(0);
                    let lines = create_tie_lines(from_count, to_count);
                    if lines.is_empty() {
                        planned.push((modifier.id, Revalidation::Drop));
                        continue;
                    }
                    Some(lines)
                }
                _ => None,
            };

            planned.push((modifier.id, Revalidation::Update { start, end, tie_lines }));
        }
    }

    let Some(staff) = score.staff_mut(staff_index) else {
        return;
    };
    for (id, action) in planned {
        match action {
            Revalidation::Drop => {
                staff.modifiers.remove(id);
            }
            Revalidation::Update {
                start,
                end,
                tie_lines,
            } => {
                if let Some(modifier) = staff.modifiers.get_mut(id) {
                    modifier.start = start;
                    modifier.end = end;
                    if let (Some(lines), ModifierPayload::Tie { lines: old }) =
                        (tie_lines, &mut modifier.payload)
                    {
                        *old = lines;
                    }
                }
            }
        }
    }
}

/// Clamp a possibly stale endpoint to the nearest valid position
///
/// Keeps valid selectors unchanged; pulls an out-of-range tick back to the
/// last note of its voice; gives up (None) when the staff, measure, or voice
/// is gone or the voice is empty.
fn reanchor(score: &Score, selector: &Selector) -> Option<Selector> {
    if resolve(score, selector).is_some() {
        return Some(selector.clone());
    }
    let staff = score.staff(selector.staff)?;
    let measure = staff.measure(selector.measure)?;
    let voice = measure.voice(selector.voice)?;
    if voice.note_count() == 0 {
        return None;
    }
    Some(Selector::note(
        selector.staff,
        selector.measure,
        selector.voice,
        voice.note_count() as i32 - 1,
    ))
}
