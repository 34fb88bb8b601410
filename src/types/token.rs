//! One spine position on one line: the field text plus everything the
//! analyzers derive from it (classification, track identity, null-token
//! back-reference, rhythm content).

use crate::errors::ModelError;
use crate::types::rational::{Rational, parse_rhythm_code};
use num_traits::Zero;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Data,
    Barline,
    Interpretation,
    ExclusiveInterpretation,
    Terminator,
    LocalComment,
}

impl TokenType {
    fn classify(text: &str) -> Self {
        if text.starts_with("**") {
            TokenType::ExclusiveInterpretation
        } else if text == "*-" {
            TokenType::Terminator
        } else if text.starts_with('*') {
            TokenType::Interpretation
        } else if text.starts_with('=') {
            TokenType::Barline
        } else if text.starts_with('!') {
            TokenType::LocalComment
        } else {
            TokenType::Data
        }
    }
}

/// Coordinates of another token in the same file: (line index, field index).
/// Kept as plain indices so ownership stays tree-shaped.
pub type TokenAddress = (usize, usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub token_type: TokenType,
    /// Stable spine lineage id, 1-based. Zero until the spine pass runs.
    pub track: u32,
    /// 1-based position among spines sharing `track` on this line.
    pub subtrack: u32,
    /// For a null token, the nearest non-null predecessor in its spine.
    pub null_source: Option<TokenAddress>,
}

impl Token {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            token_type: TokenType::classify(text),
            track: 0,
            subtrack: 0,
            null_source: None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.text == "."
    }

    pub fn is_rest(&self) -> bool {
        self.token_type == TokenType::Data && self.text.contains('r')
    }

    pub fn is_grace(&self) -> bool {
        self.text.contains('q') || self.text.contains('Q')
    }

    pub fn is_tie_start(&self) -> bool {
        self.text.contains('[')
    }

    pub fn is_tie_continuation(&self) -> bool {
        self.text.contains('_')
    }

    pub fn is_tie_end(&self) -> bool {
        self.text.contains(']')
    }

    /// Chord subtokens, space-separated. A non-chord token yields itself.
    pub fn subtokens(&self) -> impl Iterator<Item = &str> {
        self.text.split(' ').filter(|s| !s.is_empty())
    }

    /// Duration in whole-note units, from the rhythm code embedded in the
    /// first subtoken. `None` when the token carries no rhythm at all
    /// (null tokens, non-data tokens); grace notes are `Some(0)`.
    pub fn duration(&self) -> Result<Option<Rational>, ModelError> {
        if self.token_type != TokenType::Data || self.is_null() {
            return Ok(None);
        }
        let first = match self.subtokens().next() {
            Some(s) => s,
            None => return Ok(None),
        };
        let code = extract_rhythm_code(first);
        if code.is_empty() {
            if self.is_grace() {
                return Ok(Some(Rational::zero()));
            }
            return Ok(None);
        }
        if self.is_grace() {
            // graced rhythm codes are display-only, they take no time
            return Ok(Some(Rational::zero()));
        }
        parse_rhythm_code(&code).map(Some)
    }

    /// A token that starts a new sounding event: it has rhythm, and is not
    /// a rest or the middle/end of a tie.
    pub fn is_attack(&self) -> Result<bool, ModelError> {
        if self.is_null() || self.is_rest() || self.is_tie_continuation() || self.is_tie_end() {
            return Ok(false);
        }
        Ok(matches!(self.duration()?, Some(d) if d > Rational::zero()))
    }

    /// The measure number on a barline token, e.g. `=12` or `=12-`.
    pub fn barline_number(&self) -> Option<u32> {
        if self.token_type != TokenType::Barline {
            return None;
        }
        let rest = self.text.trim_start_matches('=');
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }

    /// Replace the token text, reclassifying it. The owning line rebuilds
    /// its serialized form afterwards.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.token_type = TokenType::classify(&self.text);
        self.null_source = None;
    }
}

/// The rhythm-code characters of a subtoken: digits, `%`, and augmentation
/// dots, wherever they appear among the pitch/articulation characters.
fn extract_rhythm_code(subtoken: &str) -> String {
    let mut code = String::new();
    let mut seen_digit = false;
    for c in subtoken.chars() {
        if c.is_ascii_digit() || c == '%' {
            code.push(c);
            seen_digit = true;
        } else if c == '.' && seen_digit {
            code.push(c);
        }
    }
    code
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.text)
    }
}
