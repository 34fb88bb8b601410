//! One line of a Humdrum file: its raw text (preserved byte-for-byte for
//! serialization), its classification, its tab-separated tokens, and the
//! beat position the rhythm analyzer stamps onto it.

use crate::types::rational::Rational;
use crate::types::token::Token;
use num_traits::Zero;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    GlobalComment,
    Bibliographic,
    ExclusiveInterpretation,
    Interpretation,
    LocalComment,
    Barline,
    Data,
    Empty,
}

impl LineType {
    /// Line types that carry one token per active spine.
    pub fn is_spined(self) -> bool {
        matches!(
            self,
            LineType::ExclusiveInterpretation
                | LineType::Interpretation
                | LineType::LocalComment
                | LineType::Barline
                | LineType::Data
        )
    }

    fn classify(text: &str) -> Self {
        if text.is_empty() {
            LineType::Empty
        } else if let Some(rest) = text.strip_prefix("!!!") {
            // `!!!COM: J.S. Bach` — reference records; `!!!!SEGMENT:` and
            // other deeper-bang lines stay global comments.
            if !rest.starts_with('!') && rest.contains(':') {
                LineType::Bibliographic
            } else {
                LineType::GlobalComment
            }
        } else if text.starts_with("!!") {
            LineType::GlobalComment
        } else if text.starts_with('!') {
            LineType::LocalComment
        } else if text.starts_with("**") {
            LineType::ExclusiveInterpretation
        } else if text.starts_with('*') {
            LineType::Interpretation
        } else if text.starts_with('=') {
            LineType::Barline
        } else {
            LineType::Data
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    text: String,
    pub line_type: LineType,
    pub tokens: Vec<Token>,
    /// Beat offset from the start of the file, in timebase units.
    /// Populated by the rhythm analyzer.
    pub absolute_beat: Rational,
    /// How far this line advances the beat cursor (data lines only).
    pub duration_to_next: Rational,
}

impl Line {
    pub fn from_text(text: &str) -> Self {
        let line_type = LineType::classify(text);
        let tokens = if line_type.is_spined() {
            text.split('\t').map(Token::new).collect()
        } else {
            Vec::new()
        };
        Self {
            text: text.to_string(),
            line_type,
            tokens,
            absolute_beat: Rational::zero(),
            duration_to_next: Rational::zero(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn field_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn token(&self, field: usize) -> Option<&Token> {
        self.tokens.get(field)
    }

    pub fn is_data(&self) -> bool {
        self.line_type == LineType::Data
    }

    pub fn is_barline(&self) -> bool {
        self.line_type == LineType::Barline
    }

    pub fn is_interpretation(&self) -> bool {
        matches!(
            self.line_type,
            LineType::Interpretation | LineType::ExclusiveInterpretation
        )
    }

    /// The `key: value` pair of a bibliographic record.
    pub fn bibliographic(&self) -> Option<(&str, &str)> {
        if self.line_type != LineType::Bibliographic {
            return None;
        }
        let rest = self.text.strip_prefix("!!!")?;
        let (key, value) = rest.split_once(':')?;
        Some((key.trim(), value.trim()))
    }

    /// Replace one field, rebuilding the serialized text.
    pub(crate) fn set_token_text(&mut self, field: usize, text: &str) -> bool {
        match self.tokens.get_mut(field) {
            Some(token) => {
                token.set_text(text);
                self.text = self
                    .tokens
                    .iter()
                    .map(|t| t.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\t");
                true
            }
            None => false,
        }
    }

    /// Replace the whole line, re-tokenizing from scratch.
    pub(crate) fn set_text(&mut self, text: &str) {
        *self = Line::from_text(text);
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
