use crate::analysis::onset::{OnsetConfig, OnsetDetector};
use crate::error::EngineError;
use crate::pitch;
use crate::scoring::types::{AnalysisFrame, FrameStatus};

/// Sample rate the byte stream is interpreted at.
pub const SAMPLE_RATE: u32 = 44100;

/// Little-endian 16-bit mono PCM.
const BYTES_PER_SAMPLE: u64 = 2;

/// Samples accumulated before a pitch estimate is attempted. After each
/// estimate the trailing half is retained for 50% overlap.
pub const MIN_PITCH_SAMPLES: usize = 2048;

/// Per-session streaming analyzer: owns the rolling sample buffer and the
/// onset state, and turns each incoming chunk into an AnalysisFrame.
pub struct SignalAnalyzer {
    sample_rate: u32,
    total_bytes: u64,
    pitch_buffer: Vec<f32>,
    onset: OnsetDetector,
    detected_pitches: Vec<f64>,
}

impl SignalAnalyzer {
    pub fn new() -> Self {
        Self::with_config(SAMPLE_RATE, OnsetConfig::default())
    }

    pub fn with_config(sample_rate: u32, onset: OnsetConfig) -> Self {
        SignalAnalyzer {
            sample_rate,
            total_bytes: 0,
            pitch_buffer: Vec::new(),
            onset: OnsetDetector::new(onset),
            detected_pitches: Vec::new(),
        }
    }

    /// Analyze one chunk of raw PCM bytes. Processing failures are folded
    /// into an error frame so the stream keeps flowing.
    pub fn ingest(&mut self, chunk: &[u8]) -> AnalysisFrame {
        self.total_bytes += chunk.len() as u64;
        match self.analyze(chunk) {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("chunk analysis failed: {}", err);
                AnalysisFrame::error(err.to_string(), self.elapsed_seconds())
            }
        }
    }

    fn analyze(&mut self, chunk: &[u8]) -> Result<AnalysisFrame, EngineError> {
        let samples = decode_pcm16(chunk)?;
        if samples.is_empty() {
            return Ok(AnalysisFrame::empty(self.elapsed_seconds()));
        }

        let rms = root_mean_square(&samples);
        let timestamp_seconds = self.elapsed_seconds();
        let onset_detected = self.onset.observe(rms, timestamp_seconds);

        self.pitch_buffer.extend_from_slice(&samples);
        let mut pitch_hz = None;
        if self.pitch_buffer.len() >= MIN_PITCH_SAMPLES {
            pitch_hz = pitch::autocorr::estimate(&self.pitch_buffer, self.sample_rate);
            if let Some(hz) = pitch_hz {
                self.detected_pitches.push(hz);
            }
            // Retain the trailing half-window for continuity into the next
            // estimate.
            let keep = MIN_PITCH_SAMPLES / 2;
            let excess = self.pitch_buffer.len() - keep;
            self.pitch_buffer.drain(..excess);
        }

        Ok(AnalysisFrame {
            status: FrameStatus::Analyzed,
            rms,
            onset_detected,
            pitch_hz,
            timestamp_seconds,
            message: None,
            accuracy: None,
        })
    }

    /// Stream position derived from cumulative bytes and the byte rate.
    pub fn elapsed_seconds(&self) -> f64 {
        self.total_bytes as f64 / (self.sample_rate as u64 * BYTES_PER_SAMPLE) as f64
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn onset_fired(&self) -> bool {
        self.onset.fired()
    }

    pub fn onset_time(&self) -> Option<f64> {
        self.onset.onset_time()
    }

    pub fn detected_pitches(&self) -> &[f64] {
        &self.detected_pitches
    }

    /// Return to initial state, as for a brand-new stream.
    pub fn reset(&mut self) {
        self.total_bytes = 0;
        self.pitch_buffer.clear();
        self.onset.reset();
        self.detected_pitches.clear();
    }
}

impl Default for SignalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_pcm16(chunk: &[u8]) -> Result<Vec<f32>, EngineError> {
    if chunk.len() % 2 != 0 {
        return Err(EngineError::MalformedChunk(format!(
            "{} bytes is not a whole number of 16-bit samples",
            chunk.len()
        )));
    }
    Ok(chunk
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}

fn root_mean_square(samples: &[f32]) -> f64 {
    let sum_of_squares: f64 = samples.iter().map(|&s| s as f64 * s as f64).sum();
    (sum_of_squares / samples.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// Little-endian PCM bytes for a continuous sine, sliced per chunk by
    /// the caller via the sample offset.
    fn sine_chunk(freq: f64, amplitude: f64, offset: usize, len: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(len * 2);
        for i in offset..offset + len {
            let value = amplitude * (2.0 * PI * freq * i as f64 / SAMPLE_RATE as f64).sin();
            let sample = (value * 32767.0) as i16;
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }

    fn silent_chunk(len: usize) -> Vec<u8> {
        vec![0u8; len * 2]
    }

    #[test]
    fn test_empty_chunk_yields_empty_frame() {
        let mut analyzer = SignalAnalyzer::new();
        let frame = analyzer.ingest(&[]);
        assert_eq!(frame.status, FrameStatus::Empty);
        assert_eq!(analyzer.total_bytes(), 0);
    }

    #[test]
    fn test_odd_length_chunk_is_a_decode_error() {
        let mut analyzer = SignalAnalyzer::new();
        let frame = analyzer.ingest(&[0x01, 0x02, 0x03]);
        assert_eq!(frame.status, FrameStatus::Error);
        assert!(frame.message.is_some());
        // The stream continues afterwards.
        let frame = analyzer.ingest(&silent_chunk(512));
        assert_eq!(frame.status, FrameStatus::Analyzed);
    }

    #[test]
    fn test_rms_of_full_scale_square_wave() {
        let mut analyzer = SignalAnalyzer::new();
        let mut bytes = Vec::new();
        for i in 0..1024 {
            let sample: i16 = if i % 2 == 0 { 16384 } else { -16384 };
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        let frame = analyzer.ingest(&bytes);
        assert!((frame.rms - 0.5).abs() < 0.001, "rms was {}", frame.rms);
    }

    #[test]
    fn test_timestamps_track_the_byte_rate() {
        let mut analyzer = SignalAnalyzer::new();
        // One second of audio = 44100 samples = 88200 bytes.
        let frame = analyzer.ingest(&silent_chunk(44100));
        assert!((frame.timestamp_seconds - 1.0).abs() < 1e-9);
        let frame = analyzer.ingest(&silent_chunk(22050));
        assert!((frame.timestamp_seconds - 1.5).abs() < 1e-9);
        assert_eq!(analyzer.total_bytes(), 88200 + 44100);
    }

    #[test]
    fn test_pitch_detected_once_buffer_fills() {
        let mut analyzer = SignalAnalyzer::new();
        let first = analyzer.ingest(&sine_chunk(440.0, 0.5, 0, 1024));
        assert_eq!(first.pitch_hz, None, "buffer below minimum, no estimate");

        let second = analyzer.ingest(&sine_chunk(440.0, 0.5, 1024, 1024));
        let hz = second.pitch_hz.expect("buffer filled, pitch expected");
        assert!((hz - 440.0).abs() < 5.0, "expected ~440 Hz, got {}", hz);
        assert_eq!(analyzer.detected_pitches().len(), 1);
    }

    #[test]
    fn test_silence_never_onsets_and_never_pitches() {
        let mut analyzer = SignalAnalyzer::new();
        for _ in 0..50 {
            let frame = analyzer.ingest(&silent_chunk(1024));
            assert_eq!(frame.status, FrameStatus::Analyzed);
            assert!(!frame.onset_detected);
            assert_eq!(frame.pitch_hz, None);
        }
        assert!(!analyzer.onset_fired());
        assert!(analyzer.detected_pitches().is_empty());
    }

    #[test]
    fn test_onset_fires_once_on_a_played_note() {
        let mut analyzer = SignalAnalyzer::new();
        let mut onsets = 0;

        for _ in 0..20 {
            analyzer.ingest(&silent_chunk(1024));
        }
        let mut offset = 20 * 1024;
        for amplitude in [0.07, 0.14, 0.21, 0.28, 0.35, 0.42] {
            let frame = analyzer.ingest(&sine_chunk(440.0, amplitude, offset, 1024));
            offset += 1024;
            onsets += frame.onset_detected as u32;
        }
        assert_eq!(onsets, 1, "ramp should fire the onset exactly once");
        assert!(analyzer.onset_fired());

        // Sustained tone afterwards never re-fires.
        for _ in 0..30 {
            let frame = analyzer.ingest(&sine_chunk(440.0, 0.5, offset, 1024));
            offset += 1024;
            assert!(!frame.onset_detected);
        }
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut analyzer = SignalAnalyzer::new();
        for i in 0..4 {
            analyzer.ingest(&sine_chunk(440.0, 0.5, i * 1024, 1024));
        }
        assert!(analyzer.total_bytes() > 0);
        assert!(!analyzer.detected_pitches().is_empty());

        analyzer.reset();
        assert_eq!(analyzer.total_bytes(), 0);
        assert!(analyzer.detected_pitches().is_empty());
        assert!(!analyzer.onset_fired());
        assert_eq!(analyzer.onset_time(), None);
    }
}
