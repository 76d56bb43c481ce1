use serde::Serialize;
use serde_json::Value;

use crate::analysis::analyzer::SignalAnalyzer;
use crate::excerpt::{Excerpt, ExcerptLibrary};
use crate::notes;
use crate::scoring::tracker::{ExpectedNote, ScoreTracker};
use crate::scoring::types::AnalysisFrame;

/// Detected pitches included verbatim in the report, for brevity.
const REPORT_PITCH_LIMIT: usize = 10;

/// End-of-session summary, also served live by the `get_summary` command.
#[derive(Serialize, Clone, Debug)]
pub struct SessionReport {
    pub total_duration_seconds: f64,
    pub total_bytes_received: u64,
    pub onset_detected: bool,
    pub onset_time: Option<f64>,
    pub detected_pitches: Vec<f64>,
    pub average_pitch_hz: Option<f64>,
    pub num_pitch_detections: usize,
    pub excerpt_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt_composer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt_tempo: Option<u32>,
    pub total_notes_in_score: usize,
    pub notes_played: usize,
    pub completion_percentage: f64,
}

/// Structured reply to one control message.
#[derive(Serialize, Clone, Debug)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CommandReply {
    Summary(SessionReport),
    Reset,
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        command: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Error {
        message: String,
    },
}

impl CommandReply {
    fn ack(command: &str) -> Self {
        CommandReply::Ok {
            command: Some(command.to_string()),
            payload: None,
        }
    }

    fn echo(payload: Value) -> Self {
        CommandReply::Ok {
            command: None,
            payload: Some(payload),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        CommandReply::Error {
            message: message.into(),
        }
    }
}

/// One practice session: a signal analyzer and a score tracker bound to
/// one excerpt. All state is owned here; the transport drives it with
/// chunks and control messages in arrival order.
pub struct PerformanceSession {
    excerpt_id: String,
    excerpt: Option<Excerpt>,
    analyzer: SignalAnalyzer,
    tracker: ScoreTracker,
}

impl PerformanceSession {
    /// Bind a session to an excerpt. A resolution miss is not fatal: the
    /// session runs in audio-only mode with an empty expected sequence.
    pub fn new(excerpt_id: &str, library: &ExcerptLibrary) -> Self {
        let excerpt = library.resolve(excerpt_id).cloned();
        match &excerpt {
            Some(found) => log::info!("session bound to excerpt '{}'", found.title),
            None => log::warn!(
                "could not resolve excerpt '{}', session runs audio-only",
                excerpt_id
            ),
        }

        let expected = excerpt.as_ref().map(expected_notes).unwrap_or_default();
        PerformanceSession {
            excerpt_id: excerpt_id.to_string(),
            excerpt,
            analyzer: SignalAnalyzer::new(),
            tracker: ScoreTracker::new(expected),
        }
    }

    pub fn excerpt(&self) -> Option<&Excerpt> {
        self.excerpt.as_ref()
    }

    pub fn tracker(&self) -> &ScoreTracker {
        &self.tracker
    }

    /// Analyze one binary chunk and, when scoring applies, merge the
    /// accuracy verdict into the frame.
    pub fn ingest_chunk(&mut self, chunk: &[u8]) -> AnalysisFrame {
        let mut frame = self.analyzer.ingest(chunk);
        frame.accuracy = self
            .tracker
            .score(frame.pitch_hz, self.analyzer.onset_fired());
        frame
    }

    /// Handle one text control message. Recognized commands are
    /// `get_summary`, `reset`, `set_note_index` and `set_tempo`; anything
    /// else is acknowledged without touching state.
    pub fn handle_command(&mut self, text: &str) -> CommandReply {
        let payload: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            // Free-form text is acknowledged, not rejected.
            Err(_) => return CommandReply::echo(Value::String(text.to_string())),
        };
        let Some(command) = payload.get("command").and_then(Value::as_str) else {
            return CommandReply::echo(payload);
        };

        match command {
            "get_summary" => CommandReply::Summary(self.final_report()),
            "reset" => {
                self.reset();
                CommandReply::Reset
            }
            "set_note_index" => match payload.get("note_index").and_then(Value::as_u64) {
                Some(index) => match self.tracker.set_cursor(index as usize) {
                    Ok(()) => CommandReply::ack("set_note_index"),
                    Err(err) => CommandReply::error(err.to_string()),
                },
                None => {
                    log::warn!("set_note_index without a usable note_index: {}", text);
                    CommandReply::error("set_note_index requires a non-negative integer note_index")
                }
            },
            "set_tempo" => match payload.get("tempo").and_then(Value::as_u64) {
                Some(bpm) => match self.tracker.set_tempo(bpm as u32) {
                    Ok(()) => CommandReply::ack("set_tempo"),
                    Err(err) => CommandReply::error(err.to_string()),
                },
                None => {
                    log::warn!("set_tempo without a usable tempo: {}", text);
                    CommandReply::error("set_tempo requires a positive integer tempo")
                }
            },
            other => CommandReply::ack(other),
        }
    }

    /// Reinitialize the analysis state and rewind the cursor; the excerpt
    /// binding is kept.
    pub fn reset(&mut self) {
        self.analyzer.reset();
        self.tracker.rewind();
        log::info!("session reset for excerpt '{}'", self.excerpt_id);
    }

    /// Aggregate report over everything processed so far.
    pub fn final_report(&self) -> SessionReport {
        let pitches = self.analyzer.detected_pitches();
        let average_pitch_hz = if pitches.is_empty() {
            None
        } else {
            Some(pitches.iter().sum::<f64>() / pitches.len() as f64)
        };

        SessionReport {
            total_duration_seconds: self.analyzer.elapsed_seconds(),
            total_bytes_received: self.analyzer.total_bytes(),
            onset_detected: self.analyzer.onset_fired(),
            onset_time: self.analyzer.onset_time(),
            detected_pitches: pitches.iter().take(REPORT_PITCH_LIMIT).copied().collect(),
            average_pitch_hz,
            num_pitch_detections: pitches.len(),
            excerpt_id: self.excerpt_id.clone(),
            excerpt_title: self.excerpt.as_ref().map(|e| e.title.clone()),
            excerpt_composer: self.excerpt.as_ref().and_then(|e| e.composer.clone()),
            excerpt_tempo: self.excerpt.as_ref().and_then(|e| e.tempo),
            total_notes_in_score: self.tracker.len(),
            notes_played: self.tracker.cursor(),
            completion_percentage: self.tracker.completion_percentage(),
        }
    }
}

/// Build the scoring sequence from an excerpt: rests and notes that don't
/// resolve to a frequency are filtered out, so only pitched entries
/// participate in accuracy scoring.
fn expected_notes(excerpt: &Excerpt) -> Vec<ExpectedNote> {
    excerpt
        .notes_and_rests
        .iter()
        .filter_map(|token| {
            let pitch = token.pitch.as_ref()?;
            let frequency = notes::note_to_frequency(pitch)?;
            Some(ExpectedNote {
                pitch: pitch.clone(),
                frequency,
                duration_quarter: token.duration_quarter,
                offset_quarter: token.offset,
            })
        })
        .collect()
}
