//! Staff modifiers: time-spanning annotations anchored by selector pairs
//!
//! A modifier (tie, slur, hairpin, text bracket, pedal marking, volta) never
//! owns the notes it annotates. It stores a start/end `Selector` pair by
//! value — a weak, re-resolvable reference — and is re-validated by the edit
//! operation whenever the underlying note structure changes.
//!
//! Modifier kinds form a closed tagged union rather than a runtime registry,
//! so the set of kinds is statically enumerable and (de)serialization
//! dispatches on the serde tag.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use super::selectors::Selector;

static NEXT_MODIFIER_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique modifier id
fn next_modifier_id() -> u64 {
    NEXT_MODIFIER_ID.fetch_add(1, Ordering::Relaxed)
}

/// One pitch-index pairing of a tie: pitch `from` of the earlier note
/// connects to pitch `to` of the later note
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TieLine {
    /// Pitch index on the note at the start selector
    pub from: usize,

    /// Pitch index on the note at the end selector
    pub to: usize,
}

/// Vertical placement of a slur curve
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SlurPlacement {
    Above,
    #[default]
    Below,
}

/// Hairpin direction
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HairpinDirection {
    #[default]
    Crescendo,
    Decrescendo,
}

/// Pedal marking shape
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PedalKind {
    #[default]
    Bracket,
    Text,
}

/// Kind-specific payload of a staff modifier
///
/// Serialized with a `ctor` tag so the external form names the concrete
/// kind, mirroring the constructor-tag convention of the document format.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "ctor", rename_all = "camelCase")]
pub enum ModifierPayload {
    /// Tie connecting pitch pairs of two notes
    Tie {
        /// Pitch index pairings, recomputed on re-validation
        lines: Vec<TieLine>,
    },
    /// Slur curve over a note range
    Slur { placement: SlurPlacement },
    /// Crescendo/decrescendo wedge
    Hairpin { direction: HairpinDirection },
    /// Bracket with attached text (e.g. "rit.")
    TextBracket { text: String, position: i8 },
    /// Sustain pedal marking
    PedalMarking { kind: PedalKind },
    /// First/second ending bracket over measures
    Volta { number: u32, label: String },
}

impl ModifierPayload {
    /// The serde tag naming this kind
    pub fn tag(&self) -> &'static str {
        match self {
            ModifierPayload::Tie { .. } => "tie",
            ModifierPayload::Slur { .. } => "slur",
            ModifierPayload::Hairpin { .. } => "hairpin",
            ModifierPayload::TextBracket { .. } => "textBracket",
            ModifierPayload::PedalMarking { .. } => "pedalMarking",
            ModifierPayload::Volta { .. } => "volta",
        }
    }

    /// Factory: default payload for a kind tag, or None for an unknown tag
    pub fn from_tag(tag: &str) -> Option<ModifierPayload> {
        match tag {
            "tie" => Some(ModifierPayload::Tie { lines: Vec::new() }),
            "slur" => Some(ModifierPayload::Slur {
                placement: SlurPlacement::default(),
            }),
            "hairpin" => Some(ModifierPayload::Hairpin {
                direction: HairpinDirection::default(),
            }),
            "textBracket" => Some(ModifierPayload::TextBracket {
                text: String::new(),
                position: 1,
            }),
            "pedalMarking" => Some(ModifierPayload::PedalMarking {
                kind: PedalKind::default(),
            }),
            "volta" => Some(ModifierPayload::Volta {
                number: 1,
                label: String::new(),
            }),
            _ => None,
        }
    }
}

/// A time-spanning annotation anchored by a start/end selector pair
///
/// Invariant: `start` is `lteq` `end` in editing order. Ties and slurs may
/// be degenerate (start == end); callers creating other kinds with inverted
/// endpoints are in error and get them swapped by re-validation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StaffModifier {
    /// Process-unique identifier
    pub id: u64,

    /// Earlier endpoint (editing order)
    pub start: Selector,

    /// Later endpoint (editing order)
    pub end: Selector,

    /// Kind-specific data
    pub payload: ModifierPayload,
}

impl StaffModifier {
    /// Create a modifier, deep-copying both endpoint selectors
    pub fn new(start: &Selector, end: &Selector, payload: ModifierPayload) -> Self {
        Self {
            id: next_modifier_id(),
            start: start.clone(),
            end: end.clone(),
            payload,
        }
    }

    /// Whether this modifier spans a single position
    pub fn is_degenerate(&self) -> bool {
        Selector::eq(&self.start, &self.end)
    }

    /// The kind tag of this modifier
    pub fn kind(&self) -> &'static str {
        self.payload.tag()
    }
}

/// Pair pitch index i of the earlier note to pitch index i of the later
/// note, clamping to the shorter pitch list
///
/// An empty result means the tie has no valid pairing left and should be
/// dropped by the caller.
pub fn create_tie_lines(from_pitch_count: usize, to_pitch_count: usize) -> Vec<TieLine> {
    let count = from_pitch_count.min(to_pitch_count);
    (0..count).map(|i| TieLine { from: i, to: i }).collect()
}

/// The staff's modifier collection with exact-match and overlap queries
///
/// Queries are O(n) scans over the staff's list; at editor scale no
/// secondary index is needed, and any index keyed by the selector note key
/// must preserve the same result sets.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ModifierStore {
    modifiers: Vec<StaffModifier>,
}

impl ModifierStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            modifiers: Vec::new(),
        }
    }

    /// All modifiers, in insertion order
    pub fn all(&self) -> &[StaffModifier] {
        &self.modifiers
    }

    /// Number of modifiers
    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    /// Add a modifier, returning its id
    pub fn add(&mut self, modifier: StaffModifier) -> u64 {
        let id = modifier.id;
        self.modifiers.push(modifier);
        id
    }

    /// Create and add a modifier from endpoints and payload, returning its id
    pub fn create(&mut self, start: &Selector, end: &Selector, payload: ModifierPayload) -> u64 {
        self.add(StaffModifier::new(start, end, payload))
    }

    /// Remove a modifier by id, returning it if present
    pub fn remove(&mut self, id: u64) -> Option<StaffModifier> {
        let index = self.modifiers.iter().position(|m| m.id == id)?;
        Some(self.modifiers.remove(index))
    }

    /// Look up a modifier by id
    pub fn get(&self, id: u64) -> Option<&StaffModifier> {
        self.modifiers.iter().find(|m| m.id == id)
    }

    /// Mutable lookup by id
    pub fn get_mut(&mut self, id: u64) -> Option<&mut StaffModifier> {
        self.modifiers.iter_mut().find(|m| m.id == id)
    }

    /// Modifiers whose start selector exactly matches (editing-order eq)
    pub fn starting_at(&self, selector: &Selector) -> Vec<&StaffModifier> {
        self.modifiers
            .iter()
            .filter(|m| Selector::eq(&m.start, selector))
            .collect()
    }

    /// Modifiers whose end selector exactly matches
    pub fn ending_at(&self, selector: &Selector) -> Vec<&StaffModifier> {
        self.modifiers
            .iter()
            .filter(|m| Selector::eq(&m.end, selector))
            .collect()
    }

    /// Modifiers whose range intersects the given time window
    ///
    /// Staff- and voice-blind, like [`Selector::overlaps`]: layout uses this
    /// to find every annotation that must be redrawn for a measure range,
    /// including cross-staff ones.
    pub fn overlapping(&self, start: &Selector, end: &Selector) -> Vec<&StaffModifier> {
        self.modifiers
            .iter()
            .filter(|m| Selector::overlaps(&m.start, &m.end, start, end))
            .collect()
    }

    /// Keep only modifiers satisfying the predicate
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&StaffModifier) -> bool,
    {
        self.modifiers.retain(f);
    }

    /// Iterate mutably over all modifiers
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StaffModifier> {
        self.modifiers.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(measure: usize, tick: i32) -> Selector {
        Selector::note(0, measure, 0, tick)
    }

    #[test]
    fn test_ids_are_unique() {
        let a = StaffModifier::new(
            &sel(0, 0),
            &sel(0, 1),
            ModifierPayload::Slur {
                placement: SlurPlacement::Above,
            },
        );
        let b = StaffModifier::new(&sel(0, 0), &sel(0, 1), ModifierPayload::Tie { lines: vec![] });
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_starting_and_ending_at() {
        let mut store = ModifierStore::new();
        let slur = store.create(
            &sel(0, 0),
            &sel(1, 2),
            ModifierPayload::Slur {
                placement: SlurPlacement::Below,
            },
        );
        store.create(
            &sel(1, 0),
            &sel(1, 2),
            ModifierPayload::Hairpin {
                direction: HairpinDirection::Crescendo,
            },
        );

        let starting = store.starting_at(&sel(0, 0));
        assert_eq!(starting.len(), 1);
        assert_eq!(starting[0].id, slur);

        let ending = store.ending_at(&sel(1, 2));
        assert_eq!(ending.len(), 2);
    }

    #[test]
    fn test_overlapping_window() {
        let mut store = ModifierStore::new();
        store.create(
            &sel(0, 0),
            &sel(1, 3),
            ModifierPayload::Hairpin {
                direction: HairpinDirection::Decrescendo,
            },
        );
        store.create(
            &sel(3, 0),
            &sel(3, 3),
            ModifierPayload::PedalMarking {
                kind: PedalKind::Bracket,
            },
        );

        assert_eq!(store.overlapping(&sel(1, 0), &sel(2, 0)).len(), 1);
        assert_eq!(store.overlapping(&sel(0, 0), &sel(3, 3)).len(), 2);
        assert_eq!(store.overlapping(&sel(4, 0), &sel(5, 0)).len(), 0);
    }

    #[test]
    fn test_degenerate_range_is_valid() {
        let mut store = ModifierStore::new();
        let s = sel(2, 1);
        store.create(
            &s,
            &s,
            ModifierPayload::Hairpin {
                direction: HairpinDirection::Crescendo,
            },
        );
        let found = store.overlapping(&s, &s);
        assert_eq!(found.len(), 1);
        assert!(found[0].is_degenerate());
    }

    #[test]
    fn test_create_tie_lines_clamps() {
        assert_eq!(
            create_tie_lines(2, 2),
            vec![TieLine { from: 0, to: 0 }, TieLine { from: 1, to: 1 }]
        );
        assert_eq!(create_tie_lines(2, 1), vec![TieLine { from: 0, to: 0 }]);
        assert!(create_tie_lines(3, 0).is_empty());
    }

    #[test]
    fn test_payload_tag_round_trip() {
        for tag in ["tie", "slur", "hairpin", "textBracket", "pedalMarking", "volta"] {
            let payload = ModifierPayload::from_tag(tag).expect("known tag");
            assert_eq!(payload.tag(), tag);
        }
        assert!(ModifierPayload::from_tag("glissando").is_none());
    }

    #[test]
    fn test_serde_tagged_form() {
        let modifier = StaffModifier::new(
            &sel(0, 0),
            &sel(0, 3),
            ModifierPayload::TextBracket {
                text: "rit.".to_string(),
                position: 1,
            },
        );
        let json = serde_json::to_string(&modifier).unwrap();
        assert!(json.contains("\"ctor\":\"textBracket\""));
        let back: StaffModifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, modifier);
    }
}
