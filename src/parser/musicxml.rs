use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::EngineError;
use crate::excerpt::{id_for_path, Excerpt, NoteOrRest};

/// Spell a pitch from its MusicXML parts, e.g. ('C', 1, 4) -> "C#4".
fn pitch_name(step: char, alter: i32, octave: i32) -> String {
    let accidental = match alter {
        1 => "#",
        -1 => "b",
        2 => "##",
        -2 => "bb",
        _ => "",
    };
    format!("{}{}{}", step, accidental, octave)
}

/// Parse an uncompressed MusicXML document into an excerpt: title,
/// composer, tempo, and the ordered note/rest sequence with quarter-length
/// durations and offsets. Chord continuation notes are dropped; the engine
/// tracks a single monophonic line.
pub fn parse_excerpt(xml: &str, source_path: &str) -> Result<Excerpt, EngineError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();

    let mut divisions: f64 = 1.0;
    let mut tempo: Option<u32> = None;
    let mut title: Option<String> = None;
    let mut composer: Option<String> = None;
    let mut notes_and_rests: Vec<NoteOrRest> = Vec::new();

    let mut current_offset: f64 = 0.0;
    let mut current_tag: Option<&'static str> = None;

    // Note state
    let mut in_note = false;
    let mut note_is_rest = false;
    let mut note_is_chord = false;
    let mut note_duration_divs: Option<f64> = None;
    let mut step: Option<char> = None;
    let mut alter: i32 = 0;
    let mut octave: Option<i32> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"note" => {
                    in_note = true;
                    note_is_rest = false;
                    note_is_chord = false;
                    note_duration_divs = None;
                    step = None;
                    alter = 0;
                    octave = None;
                }
                b"rest" => {
                    if in_note {
                        note_is_rest = true;
                    }
                }
                b"chord" => {
                    if in_note {
                        note_is_chord = true;
                    }
                }
                b"divisions" => current_tag = Some("divisions"),
                b"duration" => current_tag = Some("duration"),
                b"step" => current_tag = Some("step"),
                b"alter" => current_tag = Some("alter"),
                b"octave" => current_tag = Some("octave"),
                b"per-minute" => current_tag = Some("per-minute"),
                b"movement-title" => current_tag = Some("movement-title"),
                b"work-title" => current_tag = Some("work-title"),
                b"creator" => {
                    let is_composer = e
                        .attributes()
                        .flatten()
                        .any(|a| a.key.as_ref() == b"type" && a.value.as_ref() == b"composer");
                    if is_composer {
                        current_tag = Some("composer");
                    }
                }
                b"sound" => {
                    if let Some(attr) =
                        e.attributes().flatten().find(|a| a.key.as_ref() == b"tempo")
                    {
                        if let Ok(val) = std::str::from_utf8(&attr.value) {
                            if let Ok(t) = val.parse::<f64>() {
                                tempo = Some(t.round() as u32);
                            }
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                let name = e.name();
                if name.as_ref() == b"sound" {
                    if let Some(attr) =
                        e.attributes().flatten().find(|a| a.key.as_ref() == b"tempo")
                    {
                        if let Ok(val) = std::str::from_utf8(&attr.value) {
                            if let Ok(t) = val.parse::<f64>() {
                                tempo = Some(t.round() as u32);
                            }
                        }
                    }
                }
                if name.as_ref() == b"rest" && in_note {
                    note_is_rest = true;
                }
                if name.as_ref() == b"chord" && in_note {
                    note_is_chord = true;
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(tag) = current_tag.take() {
                    let text = e
                        .unescape()
                        .map_err(|e| EngineError::MusicXml(e.to_string()))?;
                    match tag {
                        "divisions" => {
                            if let Ok(v) = text.parse::<f64>() {
                                if v > 0.0 {
                                    divisions = v;
                                }
                            }
                        }
                        "per-minute" => {
                            if let Ok(v) = text.parse::<f64>() {
                                tempo = Some(v.round() as u32);
                            }
                        }
                        "duration" => {
                            if let Ok(v) = text.parse::<f64>() {
                                note_duration_divs = Some(v);
                            }
                        }
                        "step" => {
                            step = text.chars().next();
                        }
                        "alter" => {
                            if let Ok(v) = text.parse::<i32>() {
                                alter = v;
                            }
                        }
                        "octave" => {
                            if let Ok(v) = text.parse::<i32>() {
                                octave = Some(v);
                            }
                        }
                        "movement-title" | "work-title" => {
                            if title.is_none() {
                                title = Some(text.to_string());
                            }
                        }
                        "composer" => {
                            if composer.is_none() {
                                composer = Some(text.to_string());
                            }
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                if e.name().as_ref() == b"note" && in_note {
                    in_note = false;

                    // A chord tag marks a simultaneous note; the first
                    // chord tone already produced the token.
                    if !note_is_chord {
                        let duration_divs = note_duration_divs.unwrap_or(0.0);
                        let duration_quarter = duration_divs / divisions;

                        let pitch = if note_is_rest {
                            None
                        } else {
                            let s = step
                                .ok_or(EngineError::MusicXml("missing pitch step".to_string()))?;
                            let o = octave
                                .ok_or(EngineError::MusicXml("missing pitch octave".to_string()))?;
                            Some(pitch_name(s, alter, o))
                        };

                        notes_and_rests.push(NoteOrRest {
                            pitch,
                            duration_quarter,
                            offset: current_offset,
                        });
                        current_offset += duration_quarter;
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(EngineError::MusicXml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(Excerpt {
        id: id_for_path(source_path).to_string(),
        source_path: Some(source_path.to_string()),
        title: title.unwrap_or_else(|| "Unknown Title".to_string()),
        composer,
        tempo,
        duration_quarter: current_offset,
        notes_and_rests,
    })
}
