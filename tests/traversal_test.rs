// Traversal behavior over a multi-measure, multi-voice score

use editor_score::models::core::{Measure, Note, Pitch, Score, Staff, Voice, TICKS_EIGHTH, TICKS_QUARTER};
use editor_score::selection::{
    advance_by_ticks, count_ticks, enumerate_range, next_note, next_note_non_rest, previous_note,
    resolve,
};
use editor_score::Selector;

/// Helper to build a voice of quarter notes
fn quarter_voice(count: usize) -> Voice {
    Voice::from_notes(
        (0..count)
            .map(|_| Note::new(TICKS_QUARTER, vec![Pitch::new('c', 4)]))
            .collect(),
    )
}

/// Single-staff score: 4 measures, one voice, 4 quarter notes per measure
fn four_by_four() -> Score {
    let mut staff = Staff::new();
    for _ in 0..4 {
        staff.add_measure(Measure::from_voices(vec![quarter_voice(4)]));
    }
    let mut score = Score::new();
    score.add_staff(staff);
    score
}

#[test]
fn test_end_of_score_traversal() {
    let score = four_by_four();
    // The very last note: the first next_note call already returns None
    assert!(next_note(&score, &Selector::note(0, 3, 0, 3)).is_none());
    assert!(next_note(&score, &Selector::note(0, 3, 0, 2)).is_some());
}

#[test]
fn test_measure_level_selection_resolves_without_note() {
    let score = four_by_four();
    let selection = resolve(&score, &Selector::measure_level(0, 2)).expect("measure resolves");
    assert!(selection.note.is_none());
    assert_eq!(selection.measure.voice_count(), 1);
}

#[test]
fn test_round_trip_traversal_across_measures() {
    let score = four_by_four();
    let origin = Selector::note(0, 0, 0, 0);

    // Walk forward N steps, then back N steps, for every reachable N
    for n in 1..16 {
        let mut cursor = resolve(&score, &origin).unwrap();
        for _ in 0..n {
            cursor = next_note(&score, &cursor.selector).unwrap();
        }
        for _ in 0..n {
            cursor = previous_note(&score, &cursor.selector).unwrap();
        }
        assert!(Selector::eq(&cursor.selector, &origin), "n={}", n);
    }
}

#[test]
fn test_advance_and_count_agree_on_mixed_durations() {
    // Measure of eighths followed by a measure of quarters
    let mut staff = Staff::new();
    staff.add_measure(Measure::from_voices(vec![Voice::from_notes(
        (0..8)
            .map(|_| Note::new(TICKS_EIGHTH, vec![Pitch::new('g', 4)]))
            .collect(),
    )]));
    staff.add_measure(Measure::from_voices(vec![quarter_voice(4)]));
    let mut score = Score::new();
    score.add_staff(staff);

    let origin = Selector::note(0, 0, 0, 0);
    let start = resolve(&score, &origin).unwrap();

    // One full measure of eighths is 4 quarters of ticks
    let landed = advance_by_ticks(&score, &start, TICKS_QUARTER * 4).unwrap();
    assert_eq!(landed.selector.note_key(), "0-1-0-0");

    assert_eq!(
        count_ticks(&score, &origin, &landed.selector),
        Some((TICKS_QUARTER * 4) as i64)
    );
    assert_eq!(
        count_ticks(&score, &landed.selector, &origin),
        Some(-((TICKS_QUARTER * 4) as i64))
    );
}

#[test]
fn test_count_ticks_unreachable_voice_is_none() {
    let mut score = four_by_four();
    // A second voice in measure 0 only
    score.staves[0].measures[0].voices.push(quarter_voice(4));

    // Voice 1 ends with measure 0; voice 0 positions are unreachable from it
    assert_eq!(
        count_ticks(
            &score,
            &Selector::note(0, 0, 1, 0),
            &Selector::note(0, 1, 0, 0)
        ),
        None
    );
}

#[test]
fn test_enumerate_range_is_restartable() {
    let score = four_by_four();
    let a = Selector::note(0, 1, 0, 2);
    let b = Selector::note(0, 2, 0, 1);

    let first = enumerate_range(&score, &a, &b);
    let second = enumerate_range(&score, &a, &b);
    assert_eq!(first.len(), 4);
    for (x, y) in first.iter().zip(second.iter()) {
        assert!(Selector::eq(&x.selector, &y.selector));
    }
}

#[test]
fn test_non_rest_traversal_stops_at_boundary() {
    let mut score = four_by_four();
    // Make the whole last measure rests
    for note in &mut score.staves[0].measures[3].voices[0].notes {
        *note = Note::rest(TICKS_QUARTER);
    }
    assert!(next_note_non_rest(&score, &Selector::note(0, 2, 0, 3)).is_none());
    let hit = next_note_non_rest(&score, &Selector::note(0, 2, 0, 1)).unwrap();
    assert_eq!(hit.selector.note_key(), "0-2-0-2");
}

#[test]
fn test_stale_selector_resolves_to_none_after_edit() {
    let mut score = four_by_four();
    let stale = Selector::note(0, 0, 0, 3);
    assert!(resolve(&score, &stale).is_some());

    score.staves[0].measures[0].voices[0].notes.truncate(2);
    assert!(resolve(&score, &stale).is_none());
}
