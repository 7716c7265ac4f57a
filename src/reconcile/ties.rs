//! Tie and slur span pairing
//!
//! Two-endpoint markers (tie/slur start and stop events) use the same
//! recycled-number protocol as tuplets. Pairing produces staff modifiers
//! anchored by selector pairs; tie pitch pairings are computed from the
//! notes the endpoints currently resolve to.

use std::collections::HashMap;

use super::MarkerKind;
use crate::diagnostics::{DiagnosticMark, DiagnosticSeverity, Diagnostics};
use crate::models::core::Score;
use crate::models::modifiers::{create_tie_lines, ModifierPayload, SlurPlacement, StaffModifier};
use crate::models::selectors::Selector;
use crate::selection::resolve;
use serde::{Deserialize, Serialize};

/// One tie or slur marker from an external event stream
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SpanEvent {
    /// Externally-assigned small integer, reused once the span closes
    pub number: u8,

    /// Start or stop
    pub kind: MarkerKind,

    /// Note position the marker is attached to
    pub position: Selector,
}

impl SpanEvent {
    /// Create a start event
    pub fn start(number: u8, position: Selector) -> Self {
        Self {
            number,
            kind: MarkerKind::Start,
            position,
        }
    }

    /// Create a stop event
    pub fn stop(number: u8, position: Selector) -> Self {
        Self {
            number,
            kind: MarkerKind::Stop,
            position,
        }
    }
}

/// Pair flat span events into (start, end) selector pairs
///
/// Same degradation policy as tuplet pairing: double starts overwrite,
/// orphan stops drop, unclosed starts drop, each with a diagnostic. The
/// returned endpoints are normalized into editing order; a degenerate
/// same-note pair is valid (ties and slurs support it).
pub fn pair_spans(
    events: &[SpanEvent],
    kind: &str,
    diagnostics: &mut Diagnostics,
) -> Vec<(Selector, Selector)> {
    let mut open: HashMap<u8, Selector> = HashMap::new();
    let mut completed = Vec::new();

    for event in events {
        match event.kind {
            MarkerKind::Start => {
                if open.contains_key(&event.number) {
                    log::warn!(
                        "{} number {} re-opened before close at {}",
                        kind,
                        event.number,
                        event.position.note_key()
                    );
                    diagnostics.add(DiagnosticMark::at(
                        &event.position,
                        DiagnosticSeverity::Warning,
                        format!("{}_double_start", kind),
                        format!("{} number {} re-opened before close", kind, event.number),
                    ));
                }
                open.insert(event.number, event.position.clone());
            }
            MarkerKind::Stop => match open.remove(&event.number) {
                Some(start) => {
                    let end = event.position.clone();
                    if Selector::gt(&start, &end) {
                        completed.push((end, start));
                    } else {
                        completed.push((start, end));
                    }
                }
                None => {
                    log::warn!(
                        "{} stop for number {} with no matching start at {}",
                        kind,
                        event.number,
                        event.position.note_key()
                    );
                    diagnostics.add(DiagnosticMark::at(
                        &event.position,
                        DiagnosticSeverity::Warning,
                        format!("{}_orphan_stop", kind),
                        format!("stop for {} number {} with no matching start", kind, event.number),
                    ));
                }
            },
        }
    }

    for (number, start) in open {
        log::warn!("{} number {} never closed, dropping", kind, number);
        diagnostics.add(DiagnosticMark::at(
            &start,
            DiagnosticSeverity::Warning,
            format!("{}_unclosed_start", kind),
            format!("{} number {} never closed", kind, number),
        ));
    }

    completed
}

/// Build tie modifiers from a tie marker stream
///
/// Pitch pairings connect index i of the earlier note to index i of the
/// later note, clamped to the shorter pitch list. A pair whose endpoints do
/// not both resolve to notes, or whose pairing comes out empty, is dropped
/// silently rather than reported as an error.
pub fn ties_from_events(
    score: &Score,
    events: &[SpanEvent],
    diagnostics: &mut Diagnostics,
) -> Vec<StaffModifier> {
    pair_spans(events, "tie", diagnostics)
        .into_iter()
        .filter_map(|(start, end)| {
            let from_count = resolve(score, &start)?.note?.pitches.len();
            let to_count = resolve(score, &end)?.note?.pitches.len();
            let lines = create_tie_lines(from_count, to_count);
            if lines.is_empty() {
                return None;
            }
            Some(StaffModifier::new(&start, &end, ModifierPayload::Tie { lines }))
        })
        .collect()
}

/// Build slur modifiers from a slur marker stream
pub fn slurs_from_events(
    score: &Score,
    events: &[SpanEvent],
    diagnostics: &mut Diagnostics,
) -> Vec<StaffModifier> {
    pair_spans(events, "slur", diagnostics)
        .into_iter()
        .filter_map(|(start, end)| {
            // Both endpoints must still resolve; placement defaults below
            resolve(score, &start)?;
            resolve(score, &end)?;
            Some(StaffModifier::new(
                &start,
                &end,
                ModifierPayload::Slur {
                    placement: SlurPlacement::Below,
                },
            ))
        })
        .collect()
}
