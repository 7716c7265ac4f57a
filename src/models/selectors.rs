//! Selector coordinates and their ordering algebra
//!
//! A `Selector` addresses a position in the score tree by
//! (staff, measure, voice, tick, pitches). Two orderings coexist:
//! editing order (staff, measure, voice, tick) used for range selection,
//! and time order (measure, tick) used for playback and visual spanning.

use serde::{Deserialize, Serialize};

/// Sentinel tick value for a measure-level selection (no specific note).
///
/// Sorts below every real tick, so a measure-level selector precedes all
/// note selectors in the same measure.
pub const TICK_UNSET: i32 = -1;

/// Coordinate addressing a staff/measure/voice/note position in the score
///
/// Selectors are plain data and freely copied; a stored modifier endpoint
/// and a traversal cursor must never alias, so every mutation goes through
/// a fresh clone rather than a shared reference.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Selector {
    /// Staff index (0-based)
    pub staff: usize,

    /// Measure index within the staff (0-based)
    pub measure: usize,

    /// Voice index within the measure (0-based)
    pub voice: usize,

    /// Note index within the voice, or [`TICK_UNSET`] for a measure-level selection
    pub tick: i32,

    /// Indices into the addressed note's pitch list (empty = whole note)
    #[serde(default)]
    pub pitches: Vec<usize>,
}

impl Selector {
    /// Create a selector addressing a specific note
    pub fn note(staff: usize, measure: usize, voice: usize, tick: i32) -> Self {
        Self {
            staff,
            measure,
            voice,
            tick,
            pitches: Vec::new(),
        }
    }

    /// Create a measure-level selector (tick sentinel, voice 0)
    pub fn measure_level(staff: usize, measure: usize) -> Self {
        Self {
            staff,
            measure,
            voice: 0,
            tick: TICK_UNSET,
            pitches: Vec::new(),
        }
    }

    /// Create a pitch selection on a note
    pub fn with_pitches(staff: usize, measure: usize, voice: usize, tick: i32, pitches: Vec<usize>) -> Self {
        Self {
            staff,
            measure,
            voice,
            tick,
            pitches,
        }
    }

    /// Whether this selector addresses a measure rather than a note
    pub fn is_measure_level(&self) -> bool {
        self.tick < 0
    }

    /// Structural equality on the four scalar fields
    ///
    /// Pitch indices never participate in equality or ordering.
    pub fn eq(a: &Selector, b: &Selector) -> bool {
        a.staff == b.staff && a.measure == b.measure && a.voice == b.voice && a.tick == b.tick
    }

    /// Negation of [`Selector::eq`]
    pub fn neq(a: &Selector, b: &Selector) -> bool {
        !Selector::eq(a, b)
    }

    /// Editing-order greater-than: staff, then measure, then voice, then tick
    pub fn gt(a: &Selector, b: &Selector) -> bool {
        (a.staff, a.measure, a.voice, a.tick) > (b.staff, b.measure, b.voice, b.tick)
    }

    /// Editing-order less-than
    pub fn lt(a: &Selector, b: &Selector) -> bool {
        Selector::gt(b, a)
    }

    /// Editing-order greater-or-equal
    pub fn gteq(a: &Selector, b: &Selector) -> bool {
        Selector::gt(a, b) || Selector::eq(a, b)
    }

    /// Editing-order less-or-equal
    pub fn lteq(a: &Selector, b: &Selector) -> bool {
        Selector::lt(a, b) || Selector::eq(a, b)
    }

    /// Time-order greater-than: measure then tick only
    ///
    /// Ignores staff and voice so that positions occurring at the same
    /// musical time compare equal regardless of which voice carries them.
    pub fn gt_in_time(a: &Selector, b: &Selector) -> bool {
        (a.measure, a.tick) > (b.measure, b.tick)
    }

    /// Time-order equality: same measure and tick, any staff/voice
    pub fn eq_in_time(a: &Selector, b: &Selector) -> bool {
        a.measure == b.measure && a.tick == b.tick
    }

    /// Order two selectors by musical time, returning (earlier, later)
    ///
    /// Time order, not editing order: callers needing structural edit ranges
    /// must compare with [`Selector::gt`] directly.
    pub fn order<'a>(a: &'a Selector, b: &'a Selector) -> (&'a Selector, &'a Selector) {
        if Selector::gt_in_time(a, b) {
            (b, a)
        } else {
            (a, b)
        }
    }

    /// Whether `test` falls within `[start, end]` considering measure and tick only
    ///
    /// Staff and voice are ignored: containment is a horizontal time band,
    /// which is what cross-staff annotation alignment relies on.
    pub fn contains(test: &Selector, start: &Selector, end: &Selector) -> bool {
        let (first, last) = Selector::order(start, end);
        if test.measure > first.measure && test.measure < last.measure {
            return true;
        }
        if first.measure == last.measure {
            return test.measure == first.measure
                && test.tick >= first.tick
                && test.tick <= last.tick;
        }
        if test.measure == first.measure {
            return test.tick >= first.tick;
        }
        if test.measure == last.measure {
            return test.tick <= last.tick;
        }
        false
    }

    /// Whether the ranges `[s1, e1]` and `[s2, e2]` intersect in time
    ///
    /// Symmetric, and reflexive for degenerate zero-length ranges.
    pub fn overlaps(s1: &Selector, e1: &Selector, s2: &Selector, e2: &Selector) -> bool {
        Selector::contains(s2, s1, e1)
            || Selector::contains(e2, s1, e1)
            || Selector::contains(s1, s2, e2)
            || Selector::contains(e1, s2, e2)
    }

    /// Deterministic per-note grouping key: `"{staff}-{measure}-{voice}-{tick}"`
    pub fn note_key(&self) -> String {
        format!("{}-{}-{}-{}", self.staff, self.measure, self.voice, self.tick)
    }

    /// Deterministic per-measure grouping key: `"{staff}-{measure}"`
    pub fn measure_key(&self) -> String {
        format!("{}-{}", self.staff, self.measure)
    }
}
