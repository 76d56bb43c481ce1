use serde::Serialize;

/// Outcome of processing one chunk.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FrameStatus {
    Analyzed,
    Empty,
    Error,
}

/// Pitch-accuracy category, ordered best to worst.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl AccuracyLevel {
    /// Category thresholds in absolute cents: 10 / 25 / 50 / 100.
    pub fn from_cents(cents_off: f64) -> Self {
        let cents = cents_off.abs();
        if cents <= 10.0 {
            AccuracyLevel::Excellent
        } else if cents <= 25.0 {
            AccuracyLevel::Good
        } else if cents <= 50.0 {
            AccuracyLevel::Fair
        } else if cents <= 100.0 {
            AccuracyLevel::Poor
        } else {
            AccuracyLevel::VeryPoor
        }
    }
}

/// Signed pitch distance from an expected frequency, in cents
/// (100 cents = one semitone).
pub fn cents_off(detected_hz: f64, expected_hz: f64) -> f64 {
    1200.0 * (detected_hz / expected_hz).log2()
}

/// Verdict comparing a detected pitch against the expected note under the
/// cursor.
#[derive(Serialize, Clone, Debug)]
pub struct AccuracyVerdict {
    pub expected_pitch: String,
    pub expected_frequency: f64,
    pub cents_off: f64,
    pub accuracy_level: AccuracyLevel,
    pub pitch_accurate: bool,
    pub is_right_note: bool,
    pub current_note_index: usize,
    pub detected_note: String,
}

/// Per-chunk analysis result. When scoring applies, the verdict fields are
/// flattened into the serialized record.
#[derive(Serialize, Clone, Debug)]
pub struct AnalysisFrame {
    pub status: FrameStatus,
    pub rms: f64,
    pub onset_detected: bool,
    pub pitch_hz: Option<f64>,
    pub timestamp_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub accuracy: Option<AccuracyVerdict>,
}

impl AnalysisFrame {
    pub fn empty(timestamp_seconds: f64) -> Self {
        AnalysisFrame {
            status: FrameStatus::Empty,
            rms: 0.0,
            onset_detected: false,
            pitch_hz: None,
            timestamp_seconds,
            message: None,
            accuracy: None,
        }
    }

    pub fn error(message: String, timestamp_seconds: f64) -> Self {
        AnalysisFrame {
            status: FrameStatus::Error,
            rms: 0.0,
            onset_detected: false,
            pitch_hz: None,
            timestamp_seconds,
            message: Some(message),
            accuracy: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cents_off_identity() {
        for f in [55.0, 220.0, 440.0, 1318.5] {
            assert_eq!(cents_off(f, f), 0.0);
        }
    }

    #[test]
    fn test_cents_off_reference_intervals() {
        // One semitone up is +100 cents, one octave up +1200.
        let semitone = cents_off(466.16, 440.0);
        assert!((semitone - 100.0).abs() < 0.1, "semitone was {}", semitone);
        let octave = cents_off(880.0, 440.0);
        assert!((octave - 1200.0).abs() < 1e-9);
        let down = cents_off(220.0, 440.0);
        assert!((down + 1200.0).abs() < 1e-9);
    }

    #[test]
    fn test_cents_off_monotonic_in_ratio() {
        let mut previous = f64::MIN;
        for detected in [430.0, 435.0, 440.0, 445.0, 450.0, 460.0] {
            let cents = cents_off(detected, 440.0);
            assert!(cents > previous);
            previous = cents;
        }
    }

    #[test]
    fn test_accuracy_levels() {
        assert_eq!(AccuracyLevel::from_cents(0.0), AccuracyLevel::Excellent);
        assert_eq!(AccuracyLevel::from_cents(-10.0), AccuracyLevel::Excellent);
        assert_eq!(AccuracyLevel::from_cents(10.1), AccuracyLevel::Good);
        assert_eq!(AccuracyLevel::from_cents(25.0), AccuracyLevel::Good);
        assert_eq!(AccuracyLevel::from_cents(-40.0), AccuracyLevel::Fair);
        assert_eq!(AccuracyLevel::from_cents(75.0), AccuracyLevel::Poor);
        assert_eq!(AccuracyLevel::from_cents(101.0), AccuracyLevel::VeryPoor);
        assert!(AccuracyLevel::Excellent < AccuracyLevel::VeryPoor);
    }

    #[test]
    fn test_frame_serialization_shapes() {
        let frame = AnalysisFrame::empty(1.5);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["status"], "empty");
        assert!(json.get("message").is_none());

        let frame = AnalysisFrame::error("bad chunk".to_string(), 0.0);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "bad chunk");

        let mut frame = AnalysisFrame::empty(0.0);
        frame.status = FrameStatus::Analyzed;
        frame.pitch_hz = Some(441.0);
        frame.accuracy = Some(AccuracyVerdict {
            expected_pitch: "A4".to_string(),
            expected_frequency: 440.0,
            cents_off: 3.9,
            accuracy_level: AccuracyLevel::Excellent,
            pitch_accurate: true,
            is_right_note: true,
            current_note_index: 2,
            detected_note: "A4".to_string(),
        });
        let json = serde_json::to_value(&frame).unwrap();
        // Verdict fields are flattened alongside the frame fields.
        assert_eq!(json["status"], "analyzed");
        assert_eq!(json["accuracy_level"], "excellent");
        assert_eq!(json["expected_pitch"], "A4");
        assert_eq!(json["current_note_index"], 2);
    }
}
