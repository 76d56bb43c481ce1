use serde::Serialize;
use uuid::Uuid;

/// Namespace for ids derived from excerpt source paths, so the same file
/// always maps to the same id.
const EXCERPT_NAMESPACE: Uuid = Uuid::from_u128(0x7c9d2a4e_91b8_4f63_a5d0_c2e8b17f4a29);

pub fn id_for_path(source_path: &str) -> Uuid {
    Uuid::new_v5(&EXCERPT_NAMESPACE, source_path.as_bytes())
}

/// One entry of the reference sequence: a pitched note, or a rest when
/// `pitch` is absent.
#[derive(Serialize, Clone, Debug)]
pub struct NoteOrRest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<String>,
    pub duration_quarter: f64,
    pub offset: f64,
}

impl NoteOrRest {
    pub fn is_rest(&self) -> bool {
        self.pitch.is_none()
    }
}

/// A parsed excerpt: metadata plus the ordered note/rest sequence.
#[derive(Serialize, Clone, Debug)]
pub struct Excerpt {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo: Option<u32>,
    pub duration_quarter: f64,
    pub notes_and_rests: Vec<NoteOrRest>,
}

/// In-memory excerpt registry. Sessions resolve their excerpt through
/// this; a miss degrades the session to audio-only mode rather than
/// failing it.
#[derive(Default)]
pub struct ExcerptLibrary {
    excerpts: Vec<Excerpt>,
}

impl ExcerptLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, excerpt: Excerpt) {
        self.excerpts.push(excerpt);
    }

    pub fn excerpts(&self) -> &[Excerpt] {
        &self.excerpts
    }

    pub fn len(&self) -> usize {
        self.excerpts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.excerpts.is_empty()
    }

    /// Resolve a query to an excerpt: case-insensitive title containment
    /// first, then exact id, then source-path stem containment. Returns
    /// None on a miss.
    pub fn resolve(&self, query: &str) -> Option<&Excerpt> {
        let needle = query.to_lowercase();
        self.excerpts
            .iter()
            .find(|e| e.title.to_lowercase().contains(&needle))
            .or_else(|| self.excerpts.iter().find(|e| e.id == query))
            .or_else(|| {
                self.excerpts.iter().find(|e| {
                    e.source_path
                        .as_deref()
                        .is_some_and(|path| stem(path).to_lowercase().contains(&needle))
                })
            })
    }
}

/// File name without directories or the final extension.
fn stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}
