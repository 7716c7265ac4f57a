// Native JSON round-trip of the score tree, including attached modifiers

use std::fs;

use editor_score::models::core::{Measure, Note, Pitch, Score, Staff, Voice, TICKS_HALF, TICKS_QUARTER};
use editor_score::models::modifiers::{HairpinDirection, ModifierPayload, TieLine};
use editor_score::Selector;

fn sample_score() -> Score {
    let voice = Voice::from_notes(vec![
        Note::new(TICKS_QUARTER, vec![Pitch::new('c', 4), Pitch::new('e', 4)]),
        Note::new(TICKS_QUARTER, vec![Pitch::new('c', 4)]),
        Note::rest(TICKS_HALF),
    ]);
    let mut staff = Staff::new();
    staff.add_measure(Measure::from_voices(vec![voice]));
    staff.modifiers.create(
        &Selector::note(0, 0, 0, 0),
        &Selector::note(0, 0, 0, 1),
        ModifierPayload::Tie {
            lines: vec![TieLine { from: 0, to: 0 }],
        },
    );
    staff.modifiers.create(
        &Selector::note(0, 0, 0, 0),
        &Selector::note(0, 0, 0, 2),
        ModifierPayload::Hairpin {
            direction: HairpinDirection::Crescendo,
        },
    );

    let mut score = Score::new();
    score.add_staff(staff);
    score
}

#[test]
fn test_score_json_round_trip() {
    let score = sample_score();
    let json = serde_json::to_string_pretty(&score).expect("serialize");
    let back: Score = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, score);
}

#[test]
fn test_score_json_file_round_trip() {
    let score = sample_score();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("score.json");

    fs::write(&path, serde_json::to_vec(&score).unwrap()).expect("write");
    let back: Score = serde_json::from_slice(&fs::read(&path).unwrap()).expect("read back");
    assert_eq!(back, score);
}

#[test]
fn test_selector_json_shape() {
    let selector = Selector::with_pitches(1, 2, 0, 3, vec![0, 1]);
    let json = serde_json::to_value(&selector).unwrap();
    assert_eq!(json["staff"], 1);
    assert_eq!(json["measure"], 2);
    assert_eq!(json["tick"], 3);
    assert_eq!(json["pitches"][1], 1);

    // The sentinel tick survives the round trip
    let measure_level: Selector =
        serde_json::from_str(r#"{"staff":0,"measure":4,"voice":0,"tick":-1}"#).unwrap();
    assert!(measure_level.is_measure_level());
    assert!(measure_level.pitches.is_empty());
}
