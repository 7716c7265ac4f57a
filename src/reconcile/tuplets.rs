//! Tuplet tree reconciliation
//!
//! Converts a flat stream of tuplet start/stop events — numbered with small
//! integers that external formats recycle once a tuplet closes — into a
//! properly nested forest bound to note positions in one voice.
//!
//! The forest is derived data: whenever a voice's note array is replaced
//! (e.g. after re-import), the forest is discarded and rebuilt from the
//! event log, because start/end indices are positional, not identity-based.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::MarkerKind;
use crate::diagnostics::{DiagnosticMark, DiagnosticSeverity, Diagnostics};
use crate::models::core::{Score, Voice};
use crate::models::selectors::Selector;

/// Ratio and duration data carried by a tuplet start marker
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct TupletData {
    /// Actual note count (e.g. 3 for a triplet)
    pub num_notes: usize,

    /// Normal note count the tuplet occupies (e.g. 2 for a triplet)
    pub notes_occupied: usize,

    /// Notated duration in ticks of one member note
    pub stem_ticks: u64,
}

/// One tuplet marker from an external stream
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TupletEvent {
    /// Externally-assigned small integer, reused once the tuplet closes
    pub number: u8,

    /// Start or stop
    pub kind: MarkerKind,

    /// Note position the marker is attached to
    pub position: Selector,

    /// Ratio data (meaningful on start events)
    pub data: TupletData,
}

impl TupletEvent {
    /// Create a start event
    pub fn start(number: u8, position: Selector, data: TupletData) -> Self {
        Self {
            number,
            kind: MarkerKind::Start,
            position,
            data,
        }
    }

    /// Create a stop event
    pub fn stop(number: u8, position: Selector) -> Self {
        Self {
            number,
            kind: MarkerKind::Stop,
            position,
            data: TupletData::default(),
        }
    }
}

/// A start/stop pair completed by the pairing state machine
#[derive(Clone, Debug, PartialEq)]
pub struct CompletedTuplet {
    /// Position of the first member note
    pub start: Selector,

    /// Position of the last member note (inclusive)
    pub end: Selector,

    /// Ratio data from the start marker
    pub data: TupletData,
}

/// One node of the tuplet forest
///
/// Children are integer indices into the forest's node arena, which keeps
/// the nesting hierarchy free of ownership cycles.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TupletNode {
    /// First member note index within the voice (inclusive)
    pub start_index: usize,

    /// Last member note index within the voice (inclusive)
    pub end_index: usize,

    /// Actual note count
    pub num_notes: usize,

    /// Normal note count occupied
    pub notes_occupied: usize,

    /// Notated duration in ticks of one member note
    pub stem_ticks: u64,

    /// Sum of the durations of the member notes in the bound voice
    pub total_ticks: u64,

    /// Arena indices of directly nested tuplets
    pub children: Vec<usize>,
}

/// Ordered forest of tuplet nodes for one voice, arena-allocated
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct TupletForest {
    /// Node arena; `children` entries index into this list
    pub nodes: Vec<TupletNode>,

    /// Indices of top-level tuplets, in start order
    pub roots: Vec<usize>,
}

impl TupletForest {
    /// Whether the forest has no tuplets
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Node lookup by arena index
    pub fn node(&self, index: usize) -> Option<&TupletNode> {
        self.nodes.get(index)
    }
}

/// In-progress entry for one open tuplet number
struct PendingTuplet {
    start: Selector,
    data: TupletData,
}

/// Pair flat start/stop events into completed (start, end) entries
///
/// Protocol violations degrade, never abort: a second start for an open
/// number overwrites the pending start; a stop with no matching start is
/// dropped. Both are logged and recorded as diagnostics. A number is freed
/// for reuse the moment its stop completes the pair. Starts still open at
/// the end of the stream are dropped.
pub fn pair_tuplet_events(
    events: &[TupletEvent],
    diagnostics: &mut Diagnostics,
) -> Vec<CompletedTuplet> {
    let mut open: HashMap<u8, PendingTuplet> = HashMap::new();
    let mut completed = Vec::new();

    for event in events {
        match event.kind {
            MarkerKind::Start => {
                if open.contains_key(&event.number) {
                    log::warn!(
                        "tuplet number {} re-opened before close at {}",
                        event.number,
                        event.position.note_key()
                    );
                    diagnostics.add(DiagnosticMark::at(
                        &event.position,
                        DiagnosticSeverity::Warning,
                        "tuplet_double_start",
                        format!("tuplet number {} re-opened before close", event.number),
                    ));
                }
                open.insert(
                    event.number,
                    PendingTuplet {
                        start: event.position.clone(),
                        data: event.data,
                    },
                );
            }
            MarkerKind::Stop => match open.remove(&event.number) {
                Some(pending) => {
                    completed.push(CompletedTuplet {
                        start: pending.start,
                        end: event.position.clone(),
                        data: pending.data,
                    });
                }
                None => {
                    log::warn!(
                        "tuplet stop for number {} with no matching start at {}",
                        event.number,
                        event.position.note_key()
                    );
                    diagnostics.add(DiagnosticMark::at(
                        &event.position,
                        DiagnosticSeverity::Warning,
                        "tuplet_orphan_stop",
                        format!("stop for tuplet number {} with no matching start", event.number),
                    ));
                }
            },
        }
    }

    for (number, pending) in open {
        log::warn!(
            "tuplet number {} never closed, dropping (start at {})",
            number,
            pending.start.note_key()
        );
        diagnostics.add(DiagnosticMark::at(
            &pending.start,
            DiagnosticSeverity::Warning,
            "tuplet_unclosed_start",
            format!("tuplet number {} never closed", number),
        ));
    }

    completed
}

/// Build the nested forest for one voice from its completed entries
///
/// Entries are sorted by start index ascending, then end index descending so
/// that when two tuplets share a start note the wider (outer) one is
/// processed first and becomes the parent. A stack of active nodes encodes
/// containment: nodes that closed before the current entry's start are
/// popped; whatever remains on top is the parent.
///
/// Binding to the voice clamps end indices to the current note count and
/// drops any entry whose resolved span has fewer than 2 notes (notes may
/// have been deleted since the events were recorded).
pub fn build_voice_forest(completed: &[CompletedTuplet], voice: &Voice) -> TupletForest {
    let mut entries: Vec<&CompletedTuplet> = completed.iter().collect();
    entries.sort_by(|a, b| {
        (a.start.tick, std::cmp::Reverse(a.end.tick)).cmp(&(b.start.tick, std::cmp::Reverse(b.end.tick)))
    });

    let note_count = voice.note_count();
    let mut forest = TupletForest::default();
    let mut stack: Vec<usize> = Vec::new();

    for entry in entries {
        if entry.start.tick < 0 || entry.end.tick < entry.start.tick || note_count == 0 {
            continue;
        }
        let start_index = entry.start.tick as usize;
        let end_index = (entry.end.tick as usize).min(note_count - 1);
        if start_index >= note_count || end_index < start_index + 1 {
            // Fewer than 2 resolvable member notes: drop on rebind
            continue;
        }

        let total_ticks = voice.notes[start_index..=end_index]
            .iter()
            .map(|n| n.ticks)
            .sum();

        let index = forest.nodes.len();
        forest.nodes.push(TupletNode {
            start_index,
            end_index,
            num_notes: entry.data.num_notes,
            notes_occupied: entry.data.notes_occupied,
            stem_ticks: entry.data.stem_ticks,
            total_ticks,
            children: Vec::new(),
        });

        while let Some(&top) = stack.last() {
            if forest.nodes[top].end_index < start_index {
                stack.pop();
            } else {
                break;
            }
        }
        match stack.last() {
            Some(&top) => forest.nodes[top].children.push(index),
            None => forest.roots.push(index),
        }
        stack.push(index);
    }

    forest
}

/// Grouping key for one voice: `"{staff}-{measure}-{voice}"`
pub fn voice_key(selector: &Selector) -> String {
    format!("{}-{}-{}", selector.staff, selector.measure, selector.voice)
}

/// Reconcile a full event stream into per-voice tuplet forests
///
/// Events are partitioned by the voice their position addresses, paired,
/// and bound to the current note arrays. Voices that no longer exist in the
/// score produce a diagnostic and no forest.
pub fn reconcile_tuplets(
    score: &Score,
    events: &[TupletEvent],
    diagnostics: &mut Diagnostics,
) -> HashMap<String, TupletForest> {
    let mut groups: HashMap<String, Vec<TupletEvent>> = HashMap::new();
    for event in events {
        groups
            .entry(voice_key(&event.position))
            .or_default()
            .push(event.clone());
    }

    let mut forests = HashMap::new();
    for (key, group) in groups {
        let completed = pair_tuplet_events(&group, diagnostics);
        if completed.is_empty() {
            continue;
        }
        let position = &completed[0].start;
        let voice = score
            .staff(position.staff)
            .and_then(|s| s.measure(position.measure))
            .and_then(|m| m.voice(position.voice));
        match voice {
            Some(voice) => {
                let forest = build_voice_forest(&completed, voice);
                if !forest.is_empty() {
                    forests.insert(key, forest);
                }
            }
            None => {
                diagnostics.add(DiagnosticMark::at(
                    position,
                    DiagnosticSeverity::Warning,
                    "tuplet_voice_missing",
                    "tuplet events address a voice that no longer exists",
                ));
            }
        }
    }

    forests
}

/// Re-flatten a forest into start/stop events, the inverse of reconciliation
///
/// Numbers follow the external recycling scheme: each start takes the
/// smallest integer not currently open, and a stop frees its number again.
/// Feeding the result back through [`pair_tuplet_events`] and
/// [`build_voice_forest`] reproduces the same forest.
pub fn flatten_forest(
    forest: &TupletForest,
    staff: usize,
    measure: usize,
    voice: usize,
) -> Vec<TupletEvent> {
    let mut events = Vec::new();
    let mut in_use: Vec<bool> = Vec::new();
    for &root in &forest.roots {
        flatten_node(forest, root, staff, measure, voice, &mut in_use, &mut events);
    }
    events
}

fn flatten_node(
    forest: &TupletForest,
    index: usize,
    staff: usize,
    measure: usize,
    voice: usize,
    in_use: &mut Vec<bool>,
    events: &mut Vec<TupletEvent>,
) {
    let node = &forest.nodes[index];
    let number = allocate_number(in_use);

    events.push(TupletEvent::start(
        number,
        Selector::note(staff, measure, voice, node.start_index as i32),
        TupletData {
            num_notes: node.num_notes,
            notes_occupied: node.notes_occupied,
            stem_ticks: node.stem_ticks,
        },
    ));
    for &child in &node.children {
        flatten_node(forest, child, staff, measure, voice, in_use, events);
    }
    events.push(TupletEvent::stop(
        number,
        Selector::note(staff, measure, voice, node.end_index as i32),
    ));
    in_use[number as usize] = false;
}

/// Smallest positive number not currently open
fn allocate_number(in_use: &mut Vec<bool>) -> u8 {
    let mut number = 1;
    while in_use.get(number).copied().unwrap_or(false) {
        number += 1;
    }
    if number >= in_use.len() {
        in_use.resize(number + 1, false);
    }
    in_use[number] = true;
    number as u8
}
