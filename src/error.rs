use thiserror::Error;

/// Errors raised while processing a session's stream. None of these are
/// fatal: frame-level failures become `status: "error"` frames and control
/// failures become error replies, and the session keeps running.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("malformed PCM chunk: {0}")]
    MalformedChunk(String),

    #[error("invalid note index {index} (expected notes: {len})")]
    InvalidNoteIndex { index: usize, len: usize },

    #[error("invalid tempo: {0} BPM")]
    InvalidTempo(u32),

    #[error("MusicXML parse error: {0}")]
    MusicXml(String),
}
