//! Browser-facing exports. The JS host owns the audio/WebSocket plumbing
//! and drives one `Session` per practice stream.

use std::cell::RefCell;

use wasm_bindgen::prelude::*;

use crate::excerpt::ExcerptLibrary;
use crate::parser::musicxml::parse_excerpt;
use crate::pitch;
use crate::session::PerformanceSession;

thread_local! {
    static LIBRARY: RefCell<ExcerptLibrary> = RefCell::new(ExcerptLibrary::new());
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Parse a MusicXML document and add it to the excerpt library sessions
/// resolve against. Returns the parsed excerpt.
#[wasm_bindgen]
pub fn register_excerpt(xml: &str, source_path: &str) -> Result<JsValue, JsValue> {
    let excerpt = parse_excerpt(xml, source_path).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let value = to_js(&excerpt)?;
    LIBRARY.with(|cell| cell.borrow_mut().register(excerpt));
    Ok(value)
}

/// One practice session bound to an excerpt (audio-only when the id does
/// not resolve).
#[wasm_bindgen]
pub struct Session {
    inner: PerformanceSession,
}

#[wasm_bindgen]
impl Session {
    #[wasm_bindgen(constructor)]
    pub fn new(excerpt_id: &str) -> Session {
        let inner = LIBRARY.with(|cell| PerformanceSession::new(excerpt_id, &cell.borrow()));
        Session { inner }
    }

    /// Feed one binary PCM chunk; returns the analysis frame, with
    /// accuracy fields flattened in when scoring applies.
    pub fn ingest_chunk(&mut self, chunk: &[u8]) -> Result<JsValue, JsValue> {
        to_js(&self.inner.ingest_chunk(chunk))
    }

    /// Feed one text control message; returns the structured reply.
    pub fn handle_command(&mut self, text: &str) -> Result<JsValue, JsValue> {
        to_js(&self.inner.handle_command(text))
    }

    pub fn final_report(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.final_report())
    }
}

/// Standalone pitch probe returning Float64Array [hz, midi_float], both
/// zero when no pitch is found.
#[wasm_bindgen]
pub fn detect_pitch(samples: &[f32], sample_rate: u32) -> js_sys::Float64Array {
    let result = js_sys::Float64Array::new_with_length(2);
    if let Some(hz) = pitch::autocorr::estimate(samples, sample_rate) {
        result.set_index(0, hz);
        result.set_index(1, 69.0 + 12.0 * (hz / 440.0).log2());
    }
    result
}
