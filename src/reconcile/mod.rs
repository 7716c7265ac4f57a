//! Reconciliation of flat start/stop marker streams into score structures
//!
//! External formats describe tuplets, ties, and slurs as flat, possibly
//! out-of-order start/stop events keyed by a small reused integer. The
//! reconcilers here are the only legal way to turn those streams into
//! persisted structures: `tuplets` builds the nested tuplet forest, `ties`
//! pairs two-endpoint span markers into staff modifiers.

pub mod ties;
pub mod tuplets;

use serde::{Deserialize, Serialize};

pub use ties::{pair_spans, slurs_from_events, ties_from_events, SpanEvent};
pub use tuplets::{
    build_voice_forest, flatten_forest, pair_tuplet_events, reconcile_tuplets, voice_key,
    CompletedTuplet, TupletData, TupletEvent, TupletForest, TupletNode,
};

/// Start or stop marker from an external event stream
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Start,
    Stop,
}
