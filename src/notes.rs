use once_cell::sync::Lazy;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Equal-temperament frequencies for MIDI notes 0..=127, A4 (MIDI 69) = 440 Hz.
static MIDI_FREQUENCIES: Lazy<[f64; 128]> = Lazy::new(|| {
    let mut table = [0.0; 128];
    for (midi, freq) in table.iter_mut().enumerate() {
        *freq = 440.0 * 2.0_f64.powf((midi as f64 - 69.0) / 12.0);
    }
    table
});

/// Semitone offset within the octave for a spelled note ("C", "C#", "Db", ...).
/// Spellings that name no piano key (e.g. "E#") are not recognized.
fn semitone_of(note: &str) -> Option<i32> {
    match note {
        "C" => Some(0),
        "C#" | "Db" => Some(1),
        "D" => Some(2),
        "D#" | "Eb" => Some(3),
        "E" => Some(4),
        "F" => Some(5),
        "F#" | "Gb" => Some(6),
        "G" => Some(7),
        "G#" | "Ab" => Some(8),
        "A" => Some(9),
        "A#" | "Bb" => Some(10),
        "B" => Some(11),
        _ => None,
    }
}

/// Convert a note name with octave ("A4", "C#5", "Bb3") to its frequency in Hz.
/// Returns None for rests and names that don't parse.
pub fn note_to_frequency(name: &str) -> Option<f64> {
    if name.is_empty() || name == "rest" {
        return None;
    }

    let bytes = name.as_bytes();
    let split = if bytes.len() >= 2 && (bytes[1] == b'#' || bytes[1] == b'b') {
        2
    } else {
        1
    };
    if bytes.len() <= split || !name.is_char_boundary(split) {
        return None;
    }

    let (note, octave_str) = name.split_at(split);
    let semitone = semitone_of(note)?;
    let octave: i32 = octave_str.parse().ok()?;

    let midi = (octave + 1) * 12 + semitone;
    if (0..128).contains(&midi) {
        Some(MIDI_FREQUENCIES[midi as usize])
    } else {
        None
    }
}

/// Nearest note name for a frequency; "Unknown" for non-positive input.
pub fn frequency_to_note(frequency_hz: f64) -> String {
    if frequency_hz <= 0.0 {
        return "Unknown".to_string();
    }

    let midi = (69.0 + 12.0 * (frequency_hz / 440.0).log2()).round() as i64;
    let name = NOTE_NAMES[midi.rem_euclid(12) as usize];
    let octave = midi.div_euclid(12) - 1;
    format!("{}{}", name, octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_pitches() {
        assert_eq!(note_to_frequency("A4"), Some(440.0));
        let c4 = note_to_frequency("C4").unwrap();
        assert!((c4 - 261.6256).abs() < 0.001, "C4 was {}", c4);
        let a3 = note_to_frequency("A3").unwrap();
        assert!((a3 - 220.0).abs() < 1e-9);
    }

    #[test]
    fn test_enharmonic_spellings() {
        assert_eq!(note_to_frequency("C#4"), note_to_frequency("Db4"));
        assert_eq!(note_to_frequency("A#3"), note_to_frequency("Bb3"));
    }

    #[test]
    fn test_rejects_unparseable_names() {
        assert_eq!(note_to_frequency("rest"), None);
        assert_eq!(note_to_frequency(""), None);
        assert_eq!(note_to_frequency("H4"), None);
        assert_eq!(note_to_frequency("E#4"), None);
        assert_eq!(note_to_frequency("A"), None);
        assert_eq!(note_to_frequency("C#"), None);
        assert_eq!(note_to_frequency("Cx4"), None);
    }

    #[test]
    fn test_negative_and_high_octaves() {
        // MIDI range is 0..=127; C-1 is MIDI 0, G9 is MIDI 127.
        assert!(note_to_frequency("C-1").is_some());
        assert!(note_to_frequency("G9").is_some());
        assert_eq!(note_to_frequency("A9"), None);
    }

    #[test]
    fn test_frequency_to_note() {
        assert_eq!(frequency_to_note(440.0), "A4");
        assert_eq!(frequency_to_note(261.63), "C4");
        // 450 Hz is closer to A4 than to A#4
        assert_eq!(frequency_to_note(450.0), "A4");
        assert_eq!(frequency_to_note(0.0), "Unknown");
        assert_eq!(frequency_to_note(-5.0), "Unknown");
    }

    #[test]
    fn test_name_frequency_roundtrip() {
        for name in ["C2", "G3", "A4", "D#5", "B5"] {
            let freq = note_to_frequency(name).unwrap();
            assert_eq!(frequency_to_note(freq), name, "roundtrip for {}", name);
        }
    }
}
