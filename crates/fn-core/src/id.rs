use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Global string interner for note record ids.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Interned id of a persisted note record.
/// Internally a `Spur` index: 4 bytes, Copy, Eq, Hash in O(1).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteId(Spur);

impl NoteId {
    /// Intern a record id, or return the existing handle if already interned.
    pub fn intern(s: &str) -> Self {
        NoteId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to the record id string.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }
}

impl fmt::Debug for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "note:{}", self.as_str())
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NoteId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NoteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(NoteId::intern(&s))
    }
}

/// Identity of an on-screen overlay.
///
/// Saved notes are keyed by their record id; everything else (the new-note
/// editor, highlight rectangles, the toolbar) gets a transient number that
/// lives only as long as the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayId {
    Note(NoteId),
    Transient(u64),
}

impl OverlayId {
    /// Allocate a fresh transient id.
    pub fn transient() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        OverlayId::Transient(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn note(&self) -> Option<NoteId> {
        match self {
            OverlayId::Note(id) => Some(*id),
            OverlayId::Transient(_) => None,
        }
    }
}

/// Rendered as the `data-overlay-id` attribute: `note:<id>` or `draft:<n>`.
impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayId::Note(id) => write!(f, "note:{id}"),
            OverlayId::Transient(n) => write!(f, "draft:{n}"),
        }
    }
}

impl FromStr for OverlayId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("note:")
            && !rest.is_empty()
        {
            return Ok(OverlayId::Note(NoteId::intern(rest)));
        }
        if let Some(rest) = s.strip_prefix("draft:") {
            return rest
                .parse::<u64>()
                .map(OverlayId::Transient)
                .map_err(|e| format!("bad draft id {s:?}: {e}"));
        }
        Err(format!("unrecognised overlay id {s:?}"))
    }
}

/// Identifier of the diagram a note belongs to (taken from the page URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagramId(String);

impl DiagramId {
    pub fn new(id: impl Into<String>) -> Self {
        DiagramId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiagramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = NoteId::intern("a0B5g00000Xyz");
        let b = NoteId::intern("a0B5g00000Xyz");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "a0B5g00000Xyz");
    }

    #[test]
    fn transient_ids_are_unique() {
        assert_ne!(OverlayId::transient(), OverlayId::transient());
    }

    #[test]
    fn overlay_id_attribute_roundtrip() {
        let note = OverlayId::Note(NoteId::intern("a01"));
        assert_eq!(note.to_string(), "note:a01");
        assert_eq!("note:a01".parse::<OverlayId>().unwrap(), note);
        assert_eq!(
            "draft:7".parse::<OverlayId>().unwrap(),
            OverlayId::Transient(7)
        );
        assert!("note:".parse::<OverlayId>().is_err());
        assert!("toolbar".parse::<OverlayId>().is_err());
    }
}
