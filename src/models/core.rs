//! Core score tree for the selector-addressed model
//!
//! Staves own measures, measures own per-voice note lists, and notes carry
//! a tick duration plus a pitch list. The tree is the single owner of all
//! musical material; selectors and modifiers hold coordinates into it, never
//! live pointers, so edits can splice note arrays freely.

use serde::{Deserialize, Serialize};

use super::modifiers::ModifierStore;

/// Engraving tick resolution: ticks per quarter note
pub const TICKS_QUARTER: u64 = 4096;

/// Ticks in a half note
pub const TICKS_HALF: u64 = TICKS_QUARTER * 2;

/// Ticks in an eighth note
pub const TICKS_EIGHTH: u64 = TICKS_QUARTER / 2;

/// Ticks in a sixteenth note
pub const TICKS_SIXTEENTH: u64 = TICKS_QUARTER / 4;

/// Whether a note sounds or rests
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    /// Sounding note
    Note,
    /// Rest (keeps its pitch list for vertical placement)
    Rest,
}

/// A single pitch: letter name, chromatic alteration, octave
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pitch {
    /// Letter name 'a'..'g'
    pub letter: char,

    /// Accidental offset in semitones (-2..=2)
    pub accidental: i8,

    /// Scientific octave number
    pub octave: i8,
}

impl Pitch {
    /// Create a natural pitch
    pub fn new(letter: char, octave: i8) -> Self {
        Self {
            letter,
            accidental: 0,
            octave,
        }
    }

    /// Create a pitch with an accidental
    pub fn with_accidental(letter: char, accidental: i8, octave: i8) -> Self {
        Self {
            letter,
            accidental,
            octave,
        }
    }
}

/// One note (or rest) within a voice
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Note {
    /// Duration in ticks ([`TICKS_QUARTER`] per quarter note)
    pub ticks: u64,

    /// Pitches sounding on this note (chords carry several)
    pub pitches: Vec<Pitch>,

    /// Sounding note or rest
    pub kind: NoteKind,
}

impl Note {
    /// Create a sounding note
    pub fn new(ticks: u64, pitches: Vec<Pitch>) -> Self {
        Self {
            ticks,
            pitches,
            kind: NoteKind::Note,
        }
    }

    /// Create a rest of the given duration
    pub fn rest(ticks: u64) -> Self {
        Self {
            ticks,
            pitches: Vec::new(),
            kind: NoteKind::Rest,
        }
    }

    /// Whether this note is a rest
    pub fn is_rest(&self) -> bool {
        self.kind == NoteKind::Rest
    }
}

/// One voice: an ordered note sequence within a measure
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Voice {
    /// Notes in temporal order; the selector tick indexes into this list
    pub notes: Vec<Note>,
}

impl Voice {
    /// Create an empty voice
    pub fn new() -> Self {
        Self { notes: Vec::new() }
    }

    /// Create a voice from a note list
    pub fn from_notes(notes: Vec<Note>) -> Self {
        Self { notes }
    }

    /// Bounds-checked note lookup by tick index
    pub fn note(&self, tick: i32) -> Option<&Note> {
        if tick < 0 {
            return None;
        }
        self.notes.get(tick as usize)
    }

    /// Number of notes in this voice
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Sum of all note durations in ticks
    pub fn total_ticks(&self) -> u64 {
        self.notes.iter().map(|n| n.ticks).sum()
    }
}

/// One measure: parallel voices sharing a time window
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Measure {
    /// Simultaneous voices (at least one in a well-formed score)
    pub voices: Vec<Voice>,

    /// Time signature as (beats, beat value)
    pub time_signature: (u8, u8),
}

impl Measure {
    /// Create a measure with a single empty voice in 4/4
    pub fn new() -> Self {
        Self {
            voices: vec![Voice::new()],
            time_signature: (4, 4),
        }
    }

    /// Create a measure from voices
    pub fn from_voices(voices: Vec<Voice>) -> Self {
        Self {
            voices,
            time_signature: (4, 4),
        }
    }

    /// Bounds-checked voice lookup
    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    /// Number of voices
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }
}

impl Default for Measure {
    fn default() -> Self {
        Self::new()
    }
}

/// One staff: an ordered measure list plus the modifiers annotating it
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Staff {
    /// Measures in score order
    pub measures: Vec<Measure>,

    /// Time-spanning annotations anchored by selector pairs
    #[serde(default)]
    pub modifiers: ModifierStore,
}

impl Staff {
    /// Create an empty staff
    pub fn new() -> Self {
        Self {
            measures: Vec::new(),
            modifiers: ModifierStore::new(),
        }
    }

    /// Bounds-checked measure lookup
    pub fn measure(&self, index: usize) -> Option<&Measure> {
        self.measures.get(index)
    }

    /// Number of measures
    pub fn measure_count(&self) -> usize {
        self.measures.len()
    }

    /// Append a measure
    pub fn add_measure(&mut self, measure: Measure) {
        self.measures.push(measure);
    }
}

/// The full score: an ordered staff list
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Score {
    /// Staves in system order
    pub staves: Vec<Staff>,
}

impl Score {
    /// Create an empty score
    pub fn new() -> Self {
        Self { staves: Vec::new() }
    }

    /// Bounds-checked staff lookup
    pub fn staff(&self, index: usize) -> Option<&Staff> {
        self.staves.get(index)
    }

    /// Mutable bounds-checked staff lookup
    pub fn staff_mut(&mut self, index: usize) -> Option<&mut Staff> {
        self.staves.get_mut(index)
    }

    /// Number of staves
    pub fn staff_count(&self) -> usize {
        self.staves.len()
    }

    /// Append a staff
    pub fn add_staff(&mut self, staff: Staff) {
        self.staves.push(staff);
    }
}
