use crate::error::EngineError;
use crate::notes;
use crate::scoring::types::{cents_off, AccuracyLevel, AccuracyVerdict};

/// Detections within this many cents still count as the intended note.
/// Wider than the accuracy grades: the right note played out of tune is
/// graded down, not reported as a wrong note.
const RIGHT_NOTE_CENTS: f64 = 75.0;

pub const DEFAULT_TEMPO_BPM: u32 = 120;

/// A pitched note from the bound excerpt. Rests are filtered out before
/// the tracker ever sees the sequence.
#[derive(Clone, Debug)]
pub struct ExpectedNote {
    pub pitch: String,
    pub frequency: f64,
    pub duration_quarter: f64,
    pub offset_quarter: f64,
}

/// Holds the ordered expected-note sequence for one excerpt and the
/// externally driven cursor into it, and converts detected pitches into
/// accuracy verdicts.
pub struct ScoreTracker {
    expected_notes: Vec<ExpectedNote>,
    current_note_index: usize,
    tempo_bpm: u32,
}

impl ScoreTracker {
    pub fn new(expected_notes: Vec<ExpectedNote>) -> Self {
        ScoreTracker {
            expected_notes,
            current_note_index: 0,
            tempo_bpm: DEFAULT_TEMPO_BPM,
        }
    }

    pub fn expected_notes(&self) -> &[ExpectedNote] {
        &self.expected_notes
    }

    pub fn len(&self) -> usize {
        self.expected_notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expected_notes.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.current_note_index
    }

    pub fn tempo_bpm(&self) -> u32 {
        self.tempo_bpm
    }

    /// Move the cursor. Out-of-range indexes are rejected and leave the
    /// cursor where it was.
    pub fn set_cursor(&mut self, index: usize) -> Result<(), EngineError> {
        if index < self.expected_notes.len() {
            self.current_note_index = index;
            log::info!(
                "note index set to {} (pitch: {})",
                index,
                self.expected_notes[index].pitch
            );
            Ok(())
        } else {
            log::warn!(
                "rejecting note index {} (expected notes: {})",
                index,
                self.expected_notes.len()
            );
            Err(EngineError::InvalidNoteIndex {
                index,
                len: self.expected_notes.len(),
            })
        }
    }

    /// Store the tempo verbatim. Rhythm scoring is out of scope; the value
    /// only has to be a usable positive number.
    pub fn set_tempo(&mut self, bpm: u32) -> Result<(), EngineError> {
        if bpm == 0 {
            log::warn!("rejecting tempo of 0 BPM");
            return Err(EngineError::InvalidTempo(bpm));
        }
        self.tempo_bpm = bpm;
        log::info!("tempo set to {} BPM", bpm);
        Ok(())
    }

    pub fn rewind(&mut self) {
        self.current_note_index = 0;
    }

    /// Compare a detected pitch against the note under the cursor. The
    /// verdict is withheld until the onset has fired so the attack
    /// transient cannot feed misleading accuracy back to the performer.
    pub fn score(&self, pitch_hz: Option<f64>, onset_fired: bool) -> Option<AccuracyVerdict> {
        let detected = pitch_hz?;
        if !onset_fired {
            return None;
        }
        let expected = self.expected_notes.get(self.current_note_index)?;

        let cents = cents_off(detected, expected.frequency);
        let accuracy_level = AccuracyLevel::from_cents(cents);
        Some(AccuracyVerdict {
            expected_pitch: expected.pitch.clone(),
            expected_frequency: expected.frequency,
            cents_off: cents,
            accuracy_level,
            pitch_accurate: accuracy_level <= AccuracyLevel::Fair,
            is_right_note: cents.abs() <= RIGHT_NOTE_CENTS,
            current_note_index: self.current_note_index,
            detected_note: notes::frequency_to_note(detected),
        })
    }

    /// Share of the sequence the cursor has moved past, rounded to one
    /// decimal. Zero when there are no expected notes.
    pub fn completion_percentage(&self) -> f64 {
        if self.expected_notes.is_empty() {
            return 0.0;
        }
        let completion =
            self.current_note_index as f64 / self.expected_notes.len() as f64 * 100.0;
        (completion * 10.0).round() / 10.0
    }
}
