use crate::error::DecorateError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Opaque identity of one text segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentKey(String);

impl SegmentKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SegmentKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SegmentKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A leaf run of document text with a stable key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub key: SegmentKey,
    pub text: String,
}

impl Segment {
    pub fn new(key: impl Into<SegmentKey>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }

    /// Length in characters. Every offset in the crate uses this unit.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Concatenates segment texts in order, forming the flat coordinate space.
pub fn concat(segments: &[Segment]) -> String {
    let mut out = String::with_capacity(segments.iter().map(|s| s.text.len()).sum());
    for segment in segments {
        out.push_str(&segment.text);
    }
    out
}

/// Segments and their concatenation captured together for one pass.
///
/// Both halves are owned and never mutated after capture, so the text handed
/// to the lexer and the segments handed to the projector cannot disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    segments: Vec<Segment>,
    text: String,
}

impl Snapshot {
    pub fn capture<I>(segments: I) -> Self
    where
        I: IntoIterator<Item = Segment>,
    {
        let segments: Vec<Segment> = segments.into_iter().collect();
        let text = concat(&segments);
        Self { segments, text }
    }

    /// Splits a document into one segment per line, keeping each line's
    /// terminator. With `chunk > 0` every line is further cut into runs of at
    /// most `chunk` characters.
    pub fn from_lines(document: &str, chunk: usize) -> Self {
        let mut segments = Vec::new();
        for (line_no, line) in document.split_inclusive('\n').enumerate() {
            if chunk == 0 {
                segments.push(Segment::new(line_no.to_string(), line));
                continue;
            }
            let chars: Vec<char> = line.chars().collect();
            for (piece_no, piece) in chars.chunks(chunk).enumerate() {
                segments.push(Segment::new(
                    format!("{line_no}.{piece_no}"),
                    piece.iter().collect::<String>(),
                ));
            }
        }
        Self::capture(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Total length in characters.
    pub fn len(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Character offset at which each segment starts in [`Snapshot::text`].
    /// A repeated key maps to its first segment.
    pub fn offsets(&self) -> HashMap<&SegmentKey, usize> {
        let mut offsets = HashMap::with_capacity(self.segments.len());
        let mut start = 0;
        for segment in &self.segments {
            offsets.entry(&segment.key).or_insert(start);
            start += segment.len();
        }
        offsets
    }

    pub fn validate_keys(&self) -> Result<(), DecorateError> {
        let mut seen = HashSet::with_capacity(self.segments.len());
        for segment in &self.segments {
            if !seen.insert(&segment.key) {
                return Err(DecorateError::DuplicateKey(segment.key.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{concat, Segment, SegmentKey, Snapshot};
    use crate::error::DecorateError;

    #[test]
    fn concat_joins_in_order() {
        let segments = vec![Segment::new("a", "**bo"), Segment::new("b", "ld**")];
        assert_eq!(concat(&segments), "**bold**");
    }

    #[test]
    fn segment_len_counts_chars_not_bytes() {
        let segment = Segment::new("a", "héllo→");
        assert_eq!(segment.len(), 6);
        assert!(segment.text.len() > 6);
    }

    #[test]
    fn snapshot_text_matches_segments() {
        let snapshot = Snapshot::capture(vec![
            Segment::new("a", "one "),
            Segment::new("b", ""),
            Segment::new("c", "two"),
        ]);
        assert_eq!(snapshot.text(), "one two");
        assert_eq!(snapshot.len(), 7);
        let offsets = snapshot.offsets();
        assert_eq!(offsets.get(&SegmentKey::from("b")), Some(&4));
        assert_eq!(offsets.get(&SegmentKey::from("c")), Some(&4));
        assert_eq!(offsets.get(&SegmentKey::from("z")), None);
    }

    #[test]
    fn offsets_keep_first_of_repeated_keys() {
        let snapshot = Snapshot::capture(vec![
            Segment::new("a", "xy"),
            Segment::new("b", "é"),
            Segment::new("a", "z"),
        ]);
        let offsets = snapshot.offsets();
        assert_eq!(offsets.len(), 2);
        assert_eq!(offsets.get(&SegmentKey::from("a")), Some(&0));
        assert_eq!(offsets.get(&SegmentKey::from("b")), Some(&2));
    }

    #[test]
    fn from_lines_keeps_terminators() {
        let snapshot = Snapshot::from_lines("# Hi\nbody\n", 0);
        let texts: Vec<&str> = snapshot.segments().iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["# Hi\n", "body\n"]);
        assert_eq!(snapshot.text(), "# Hi\nbody\n");
    }

    #[test]
    fn from_lines_chunks_each_line() {
        let snapshot = Snapshot::from_lines("abcde\nxy", 2);
        let keys: Vec<&str> = snapshot.segments().iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["0.0", "0.1", "0.2", "1.0"]);
        assert_eq!(snapshot.segments()[2].text, "e\n");
        assert_eq!(snapshot.text(), "abcde\nxy");
    }

    #[test]
    fn validate_keys_rejects_duplicates() {
        let snapshot = Snapshot::capture(vec![Segment::new("a", "x"), Segment::new("a", "y")]);
        match snapshot.validate_keys() {
            Err(DecorateError::DuplicateKey(key)) => assert_eq!(key.as_str(), "a"),
            other => panic!("expected duplicate key error, got {other:?}"),
        }
    }
}
