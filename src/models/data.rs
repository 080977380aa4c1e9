use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One block of recognized text, lines in reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextBlock {
    pub lines: Vec<String>,
}

impl TextBlock {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TextBlock {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// OCR output for a single camera frame.
///
/// Blocks and lines keep the order the recognizer delivered them in, which is
/// top-to-bottom reading order for the engines we care about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecognizedText {
    pub blocks: Vec<TextBlock>,
}

impl RecognizedText {
    pub fn new(blocks: Vec<TextBlock>) -> Self {
        RecognizedText { blocks }
    }

    /// Convenience constructor used by hosts and tests that hold plain strings.
    pub fn from_blocks<B, L, S>(blocks: B) -> Self
    where
        B: IntoIterator<Item = L>,
        L: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RecognizedText::new(blocks.into_iter().map(TextBlock::new).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| b.lines.is_empty())
    }

    /// Every line as `(block_index, line_index, text)` in document order.
    pub fn lines(&self) -> impl Iterator<Item = (usize, usize, &str)> + '_ {
        self.blocks.iter().enumerate().flat_map(|(block_index, block)| {
            block
                .lines
                .iter()
                .enumerate()
                .map(move |(line_index, line)| (block_index, line_index, line.as_str()))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    CardNumber,
    ExpiryDate,
    HolderName,
}

impl FieldKind {
    pub const ALL: [FieldKind; 3] = [
        FieldKind::CardNumber,
        FieldKind::ExpiryDate,
        FieldKind::HolderName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::CardNumber => "card_number",
            FieldKind::ExpiryDate => "expiry_date",
            FieldKind::HolderName => "holder_name",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single filter's proposal for one field, with the line it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldCandidate {
    pub kind: FieldKind,
    pub raw_value: String,
    pub normalized_value: String,
    pub block_index: usize,
    pub line_index: usize,
}

/// Everything the enabled filters found in one frame, keyed by field kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialCardDetails {
    candidates: BTreeMap<FieldKind, FieldCandidate>,
}

impl PartialCardDetails {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a candidate unless its kind is already present. Returns whether
    /// the candidate was kept.
    pub fn insert(&mut self, candidate: FieldCandidate) -> bool {
        if self.candidates.contains_key(&candidate.kind) {
            return false;
        }
        self.candidates.insert(candidate.kind, candidate);
        true
    }

    pub fn get(&self, kind: FieldKind) -> Option<&FieldCandidate> {
        self.candidates.get(&kind)
    }

    pub fn contains(&self, kind: FieldKind) -> bool {
        self.candidates.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldCandidate> {
        self.candidates.values()
    }
}

impl fmt::Display for PartialCardDetails {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PartialCardDetails(")?;
        for (i, candidate) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "{}={} @[{}:{}]",
                candidate.kind,
                candidate.normalized_value,
                candidate.block_index,
                candidate.line_index
            )?;
        }
        write!(f, ")")
    }
}

/// Final merged result of a scan session.
///
/// `observations` records how many frames backed each chosen value, so a
/// caller can tell a corroborated field from a best-effort one produced on
/// timeout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CardDetails {
    pub fields: BTreeMap<FieldKind, String>,
    pub observations: BTreeMap<FieldKind, u32>,
}

impl CardDetails {
    pub fn get(&self, kind: FieldKind) -> Option<&str> {
        self.fields.get(&kind).map(String::as_str)
    }

    pub fn card_number(&self) -> Option<&str> {
        self.get(FieldKind::CardNumber)
    }

    pub fn expiry_date(&self) -> Option<&str> {
        self.get(FieldKind::ExpiryDate)
    }

    pub fn holder_name(&self) -> Option<&str> {
        self.get(FieldKind::HolderName)
    }

    pub fn observations_of(&self, kind: FieldKind) -> u32 {
        self.observations.get(&kind).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "CardDetails(card_number={}, expiry_date={}, holder_name={})",
            self.card_number().unwrap_or(""),
            self.expiry_date().unwrap_or(""),
            self.holder_name().unwrap_or("")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(kind: FieldKind, value: &str) -> FieldCandidate {
        FieldCandidate {
            kind,
            raw_value: value.to_string(),
            normalized_value: value.to_string(),
            block_index: 0,
            line_index: 0,
        }
    }

    #[test]
    fn test_lines_in_document_order() {
        let text = RecognizedText::from_blocks(vec![vec!["a", "b"], vec![], vec!["c"]]);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines, vec![(0, 0, "a"), (0, 1, "b"), (2, 0, "c")]);
        assert!(!text.is_empty());
        assert!(RecognizedText::from_blocks(vec![Vec::<String>::new()]).is_empty());
    }

    #[test]
    fn test_recognized_text_from_json() {
        let text: RecognizedText =
            serde_json::from_str(r#"[["BANK"], ["4111 1111 1111 1111", "12/30"]]"#).unwrap();
        assert_eq!(text.blocks.len(), 2);
        assert_eq!(text.blocks[1].lines[1], "12/30");
    }

    #[test]
    fn test_partial_keeps_first_candidate_per_kind() {
        let mut partial = PartialCardDetails::new();
        assert!(partial.insert(candidate(FieldKind::CardNumber, "1")));
        assert!(!partial.insert(candidate(FieldKind::CardNumber, "2")));
        assert!(partial.insert(candidate(FieldKind::ExpiryDate, "01/30")));
        assert_eq!(partial.len(), 2);
        assert_eq!(partial.get(FieldKind::CardNumber).unwrap().normalized_value, "1");
    }

    #[test]
    fn test_card_details_serializes_snake_case_keys() {
        let mut details = CardDetails::default();
        details.fields.insert(FieldKind::CardNumber, "4111111111111111".into());
        details.observations.insert(FieldKind::CardNumber, 2);
        let json = serde_json::to_string(&details).unwrap();
        assert!(json.contains(r#""card_number":"4111111111111111""#));
        assert_eq!(details.observations_of(FieldKind::HolderName), 0);
    }
}
