//! MusicXML marker extraction
//!
//! Pulls the flat tuplet/tie/slur start/stop streams out of a
//! `score-partwise` document using roxmltree. This is the import-side feed
//! for the reconcilers: parts map to staves, measures to measure indices,
//! and each voice's notes are numbered in document order to produce the
//! selector tick indices the markers attach to.
//!
//! Individual malformed markers degrade to diagnostics; only a document
//! that cannot be read at all is an error.

use std::collections::HashMap;

use roxmltree::{Document as XmlDocument, Node};
use thiserror::Error;

use crate::diagnostics::{DiagnosticMark, DiagnosticSeverity, Diagnostics};
use crate::models::core::TICKS_QUARTER;
use crate::models::selectors::Selector;
use crate::reconcile::{MarkerKind, SpanEvent, TupletData, TupletEvent};

/// Fatal marker extraction errors
#[derive(Debug, Clone, Error)]
pub enum MarkerParseError {
    /// XML is malformed (not well-formed)
    #[error("Invalid XML: {0}")]
    InvalidXml(String),

    /// MusicXML format not supported (e.g., timewise instead of partwise)
    #[error("Unsupported MusicXML format: {0}")]
    UnsupportedFormat(String),
}

/// The flat marker streams extracted from one document
#[derive(Debug, Clone, Default)]
pub struct MarkerStreams {
    /// Tuplet start/stop events in document order
    pub tuplets: Vec<TupletEvent>,

    /// Tie start/stop events in document order
    pub ties: Vec<SpanEvent>,

    /// Slur start/stop events in document order
    pub slurs: Vec<SpanEvent>,
}

/// Per-part parsing state carried across measures
struct PartState {
    /// Divisions per quarter note, from the most recent <attributes>
    divisions: u64,
}

impl Default for PartState {
    fn default() -> Self {
        PartState { divisions: 4 }
    }
}

/// Extract tuplet/tie/slur marker streams from a MusicXML string
pub fn extract_markers(
    xml: &str,
    diagnostics: &mut Diagnostics,
) -> Result<MarkerStreams, MarkerParseError> {
    let doc = XmlDocument::parse(xml).map_err(|e| MarkerParseError::InvalidXml(e.to_string()))?;
    let root = doc.root_element();

    match root.tag_name().name() {
        "score-partwise" => {}
        "score-timewise" => {
            return Err(MarkerParseError::UnsupportedFormat(
                "score-timewise format (use score-partwise instead)".to_string(),
            ))
        }
        other => {
            return Err(MarkerParseError::UnsupportedFormat(format!(
                "unexpected root element <{}>",
                other
            )))
        }
    }

    let mut streams = MarkerStreams::default();
    for (staff_index, part_node) in root
        .children()
        .filter(|n| n.tag_name().name() == "part")
        .enumerate()
    {
        extract_part(&part_node, staff_index, &mut streams, diagnostics);
    }

    Ok(streams)
}

/// Walk one <part>, numbering notes per voice within each measure
fn extract_part(
    part_node: &Node,
    staff_index: usize,
    streams: &mut MarkerStreams,
    diagnostics: &mut Diagnostics,
) {
    let mut state = PartState::default();

    for (measure_index, measure_node) in part_node
        .children()
        .filter(|n| n.tag_name().name() == "measure")
        .enumerate()
    {
        // Note counters per voice, reset every measure: the selector tick is
        // the note's index within its voice
        let mut voice_counters: HashMap<usize, i32> = HashMap::new();

        for child in measure_node.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "attributes" => {
                    if let Some(divisions) = child
                        .children()
                        .find(|n| n.tag_name().name() == "divisions")
                        .and_then(|n| n.text())
                        .and_then(|t| t.parse::<u64>().ok())
                    {
                        state.divisions = divisions.max(1);
                    }
                }
                "note" => {
                    extract_note(
                        &child,
                        staff_index,
                        measure_index,
                        &state,
                        &mut voice_counters,
                        streams,
                        diagnostics,
                    );
                }
                // backup/forward only reposition the write cursor; the
                // per-voice counters already keep voices independent
                _ => {}
            }
        }
    }
}

/// Extract the markers attached to one <note>
fn extract_note(
    note_node: &Node,
    staff_index: usize,
    measure_index: usize,
    state: &PartState,
    voice_counters: &mut HashMap<usize, i32>,
    streams: &mut MarkerStreams,
    diagnostics: &mut Diagnostics,
) {
    let voice = note_node
        .children()
        .find(|n| n.tag_name().name() == "voice")
        .and_then(|n| n.text())
        .and_then(|t| t.parse::<usize>().ok())
        .map(|v| v.saturating_sub(1))
        .unwrap_or(0);

    // Chord members share the base note's tick index
    let is_chord = note_node.children().any(|n| n.tag_name().name() == "chord");
    let counter = voice_counters.entry(voice).or_insert(0);
    let tick = if is_chord {
        (*counter - 1).max(0)
    } else {
        let tick = *counter;
        *counter += 1;
        tick
    };

    let position = Selector::note(staff_index, measure_index, voice, tick);

    // Grace notes carry no duration
    let duration_divs = note_node
        .children()
        .find(|n| n.tag_name().name() == "duration")
        .and_then(|n| n.text())
        .and_then(|t| t.parse::<u64>().ok())
        .unwrap_or(0);
    let note_ticks = duration_divs * TICKS_QUARTER / state.divisions;

    // <tie> lives directly under <note>
    for tie_node in note_node.children().filter(|n| n.tag_name().name() == "tie") {
        if let Some(kind) = marker_kind(&tie_node, &position, "tie", diagnostics) {
            streams.ties.push(SpanEvent {
                number: marker_number(&tie_node),
                kind,
                position: position.clone(),
            });
        }
    }

    // <slur> and <tuplet> live under <notations>
    for notations in note_node
        .children()
        .filter(|n| n.tag_name().name() == "notations")
    {
        for slur_node in notations.children().filter(|n| n.tag_name().name() == "slur") {
            if let Some(kind) = marker_kind(&slur_node, &position, "slur", diagnostics) {
                streams.slurs.push(SpanEvent {
                    number: marker_number(&slur_node),
                    kind,
                    position: position.clone(),
                });
            }
        }

        for tuplet_node in notations
            .children()
            .filter(|n| n.tag_name().name() == "tuplet")
        {
            if let Some(kind) = marker_kind(&tuplet_node, &position, "tuplet", diagnostics) {
                let data = match kind {
                    MarkerKind::Start => tuplet_data(note_node, note_ticks),
                    MarkerKind::Stop => TupletData::default(),
                };
                streams.tuplets.push(TupletEvent {
                    number: marker_number(&tuplet_node),
                    kind,
                    position: position.clone(),
                    data,
                });
            }
        }
    }
}

/// Actual/normal counts from <time-modification>, defaulting to a triplet
fn tuplet_data(note_node: &Node, note_ticks: u64) -> TupletData {
    let time_mod = note_node
        .children()
        .find(|n| n.tag_name().name() == "time-modification");

    let num_notes = time_mod
        .and_then(|tm| tm.children().find(|n| n.tag_name().name() == "actual-notes"))
        .and_then(|n| n.text())
        .and_then(|t| t.parse::<usize>().ok())
        .unwrap_or(3);
    let notes_occupied = time_mod
        .and_then(|tm| tm.children().find(|n| n.tag_name().name() == "normal-notes"))
        .and_then(|n| n.text())
        .and_then(|t| t.parse::<usize>().ok())
        .unwrap_or(2);

    TupletData {
        num_notes,
        notes_occupied,
        stem_ticks: note_ticks,
    }
}

/// The `type` attribute as a marker kind; unknown types degrade to a diagnostic
fn marker_kind(
    node: &Node,
    position: &Selector,
    element: &str,
    diagnostics: &mut Diagnostics,
) -> Option<MarkerKind> {
    match node.attribute("type") {
        Some("start") => Some(MarkerKind::Start),
        Some("stop") => Some(MarkerKind::Stop),
        // "continue" markers restate an open span; pairing needs only the endpoints
        Some("continue") => None,
        other => {
            diagnostics.add(DiagnosticMark::at(
                position,
                DiagnosticSeverity::Warning,
                format!("{}_bad_type", element),
                format!("<{}> with unusable type {:?}", element, other),
            ));
            None
        }
    }
}

/// The `number` attribute, defaulting to 1
fn marker_number(node: &Node) -> u8 {
    node.attribute("number")
        .and_then(|s| s.parse::<u8>().ok())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIPLET_WITH_TIE: &str = r#"<?xml version="1.0"?>
<score-partwise version="3.1">
  <part-list>
    <score-part id="P1"><part-name>Piano</part-name></score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>6</divisions></attributes>
      <note>
        <pitch><step>C</step><octave>4</octave></pitch>
        <duration>2</duration>
        <time-modification><actual-notes>3</actual-notes><normal-notes>2</normal-notes></time-modification>
        <notations><tuplet type="start" number="1"/></notations>
      </note>
      <note>
        <pitch><step>D</step><octave>4</octave></pitch>
        <duration>2</duration>
      </note>
      <note>
        <pitch><step>E</step><octave>4</octave></pitch>
        <duration>2</duration>
        <notations><tuplet type="stop" number="1"/></notations>
      </note>
      <note>
        <pitch><step>F</step><octave>4</octave></pitch>
        <duration>6</duration>
        <tie type="start"/>
      </note>
    </measure>
    <measure number="2">
      <note>
        <pitch><step>F</step><octave>4</octave></pitch>
        <duration>6</duration>
        <tie type="stop"/>
      </note>
    </measure>
  </part>
</score-partwise>"#;

    #[test]
    fn test_extract_tuplet_and_tie_markers() {
        let mut diags = Diagnostics::new();
        let streams = extract_markers(TRIPLET_WITH_TIE, &mut diags).unwrap();
        assert!(diags.is_empty());

        assert_eq!(streams.tuplets.len(), 2);
        let start = &streams.tuplets[0];
        assert_eq!(start.kind, MarkerKind::Start);
        assert_eq!(start.position.note_key(), "0-0-0-0");
        assert_eq!(start.data.num_notes, 3);
        assert_eq!(start.data.notes_occupied, 2);
        // duration 2 at divisions 6 = an eighth-note-triplet member
        assert_eq!(start.data.stem_ticks, 2 * TICKS_QUARTER / 6);

        let stop = &streams.tuplets[1];
        assert_eq!(stop.kind, MarkerKind::Stop);
        assert_eq!(stop.position.tick, 2);

        assert_eq!(streams.ties.len(), 2);
        assert_eq!(streams.ties[0].position.note_key(), "0-0-0-3");
        assert_eq!(streams.ties[1].position.note_key(), "0-1-0-0");
    }

    #[test]
    fn test_chord_members_share_tick() {
        let xml = r#"<?xml version="1.0"?>
<score-partwise version="3.1">
  <part-list><score-part id="P1"><part-name>P</part-name></score-part></part-list>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions></attributes>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration><tie type="start"/></note>
      <note><chord/><pitch><step>E</step><octave>4</octave></pitch><duration>1</duration><tie type="start"/></note>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration><tie type="stop"/></note>
    </measure>
  </part>
</score-partwise>"#;
        let mut diags = Diagnostics::new();
        let streams = extract_markers(xml, &mut diags).unwrap();
        assert_eq!(streams.ties[0].position.tick, 0);
        assert_eq!(streams.ties[1].position.tick, 0);
        assert_eq!(streams.ties[2].position.tick, 1);
    }

    #[test]
    fn test_voices_number_independently() {
        let xml = r#"<?xml version="1.0"?>
<score-partwise version="3.1">
  <part-list><score-part id="P1"><part-name>P</part-name></score-part></part-list>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions></attributes>
      <note><voice>1</voice><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration><notations><slur type="start" number="1"/></notations></note>
      <note><voice>1</voice><pitch><step>D</step><octave>4</octave></pitch><duration>1</duration><notations><slur type="stop" number="1"/></notations></note>
      <backup><duration>2</duration></backup>
      <note><voice>2</voice><pitch><step>E</step><octave>3</octave></pitch><duration>2</duration><notations><slur type="start" number="1"/></notations></note>
      <note><voice>2</voice><pitch><step>F</step><octave>3</octave></pitch><duration>2</duration><notations><slur type="stop" number="1"/></notations></note>
    </measure>
  </part>
</score-partwise>"#;
        let mut diags = Diagnostics::new();
        let streams = extract_markers(xml, &mut diags).unwrap();
        let keys: Vec<String> = streams.slurs.iter().map(|e| e.position.note_key()).collect();
        assert_eq!(keys, vec!["0-0-0-0", "0-0-0-1", "0-0-1-0", "0-0-1-1"]);
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let mut diags = Diagnostics::new();
        assert!(extract_markers("<score-partwise>", &mut diags).is_err());
        assert!(matches!(
            extract_markers("<score-timewise/>", &mut diags),
            Err(MarkerParseError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_bad_marker_type_degrades() {
        let xml = r#"<?xml version="1.0"?>
<score-partwise version="3.1">
  <part-list><score-part id="P1"><part-name>P</part-name></score-part></part-list>
  <part id="P1">
    <measure number="1">
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration><tie/></note>
    </measure>
  </part>
</score-partwise>"#;
        let mut diags = Diagnostics::new();
        let streams = extract_markers(xml, &mut diags).unwrap();
        assert!(streams.ties.is_empty());
        assert_eq!(diags.of_kind("tie_bad_type").len(), 1);
    }
}
