//! Format converters
//!
//! Boundary between external formats and the score core. The marker
//! importer extracts the flat tuplet/tie/slur event streams that the
//! reconcilers consume.

pub mod musicxml_markers;

pub use musicxml_markers::{extract_markers, MarkerParseError, MarkerStreams};
