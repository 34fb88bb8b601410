//! Spine split/join bookkeeping: assigns every token a stable
//! `(track, subtrack)` identity and resolves null tokens to the nearest
//! non-null predecessor in their spine.
//!
//! The pass walks lines once, carrying an ordered map of active spines.
//! Manipulator tokens on interpretation lines (`*^`, `*v`, `*x`, `*+`,
//! `*-`) transform the map for the following line. Each active spine also
//! carries the address of its most recent non-null data token, so `.`
//! resolution is a direct lookup even across splits (both branches of a
//! split inherit the pre-split history).
//!
//! More than two adjacent `*v` tokens join to a single spine; the leftmost
//! track and its history survive. The reference toolkit leaves this case
//! ambiguous, so the rule here is deliberate and fixed.

use crate::errors::{ModelError, ParseIssue, ParseMode};
use crate::types::line::{Line, LineType};
use crate::types::token::{TokenAddress, TokenType};

#[derive(Debug, Clone)]
struct SpineEntry {
    track: u32,
    last_data: Option<TokenAddress>,
}

/// Result of the spine pass, cached on the owning file.
#[derive(Debug, Clone, Default)]
pub struct SpineAnalysis {
    pub max_track: u32,
    /// Exclusive interpretation per track, indexed by `track - 1`.
    /// `None` for a `*+` spine whose declaration never arrived.
    pub track_exclusives: Vec<Option<String>>,
    pub issues: Vec<ParseIssue>,
}

impl SpineAnalysis {
    fn open_track(&mut self, exclusive: Option<String>) -> u32 {
        self.track_exclusives.push(exclusive);
        self.max_track = self.track_exclusives.len() as u32;
        self.max_track
    }

    fn report(
        &mut self,
        mode: ParseMode,
        error: ModelError,
        line: usize,
    ) -> Result<(), ModelError> {
        match mode {
            ParseMode::Strict => Err(error),
            ParseMode::BestEffort => {
                self.issues.push(ParseIssue {
                    line,
                    message: error.to_string(),
                });
                Ok(())
            }
        }
    }
}

pub fn analyze(lines: &mut [Line], mode: ParseMode) -> Result<SpineAnalysis, ModelError> {
    let mut analysis = SpineAnalysis::default();
    let mut active: Vec<SpineEntry> = Vec::new();

    for index in 0..lines.len() {
        let lineno = index + 1;
        let line_type = lines[index].line_type;
        if !line_type.is_spined() {
            continue;
        }

        if active.is_empty() {
            if line_type != LineType::ExclusiveInterpretation {
                let err = ModelError::structure(
                    lineno,
                    "spined line before any exclusive interpretation declaration",
                );
                analysis.report(mode, err, lineno)?;
                continue;
            }
            if let Some(bad) = lines[index]
                .tokens
                .iter()
                .find(|t| t.token_type != TokenType::ExclusiveInterpretation)
            {
                let err = ModelError::structure(
                    lineno,
                    format!("expected **-declaration, found \"{}\"", bad.text),
                );
                analysis.report(mode, err, lineno)?;
                continue;
            }
            for token in &mut lines[index].tokens {
                let track = analysis.open_track(Some(token.text.clone()));
                token.track = track;
                token.subtrack = 1;
                active.push(SpineEntry {
                    track,
                    last_data: None,
                });
            }
            log::debug!("line {}: opened {} spine(s)", lineno, active.len());
            continue;
        }

        if lines[index].field_count() != active.len() {
            let err = ModelError::structure(
                lineno,
                format!(
                    "expected {} fields, found {}",
                    active.len(),
                    lines[index].field_count()
                ),
            );
            analysis.report(mode, err, lineno)?;
            continue;
        }

        assign_identities(&mut lines[index], &active);

        match line_type {
            LineType::Data => {
                for (field, token) in lines[index].tokens.iter_mut().enumerate() {
                    if token.is_null() {
                        token.null_source = active[field].last_data;
                        if token.null_source.is_none() {
                            let err = ModelError::TrackResolution {
                                line: lineno,
                                field: field + 1,
                            };
                            analysis.report(mode, err, lineno)?;
                        }
                    } else {
                        active[field].last_data = Some((index, field));
                    }
                }
            }
            LineType::LocalComment => {
                for (field, token) in lines[index].tokens.iter_mut().enumerate() {
                    if token.is_null() {
                        token.null_source = active[field].last_data;
                    }
                }
            }
            LineType::Interpretation | LineType::ExclusiveInterpretation => {
                match apply_manipulators(&lines[index], &active, &mut analysis, lineno) {
                    Ok(next) => active = next,
                    Err(err) => {
                        analysis.report(mode, err, lineno)?;
                    }
                }
            }
            _ => {}
        }
    }

    if !active.is_empty() {
        log::debug!("{} spine(s) left unterminated at end of input", active.len());
    }

    Ok(analysis)
}

/// Stamp `(track, subtrack)` onto every token of one line. Subtracks are
/// 1-based positions among the active spines sharing a track.
fn assign_identities(line: &mut Line, active: &[SpineEntry]) {
    for (field, token) in line.tokens.iter_mut().enumerate() {
        let track = active[field].track;
        let subtrack = active[..field].iter().filter(|e| e.track == track).count() as u32 + 1;
        token.track = track;
        token.subtrack = subtrack;
    }
}

/// Build the spine map for the following line from this interpretation
/// line's manipulator tokens.
fn apply_manipulators(
    line: &Line,
    active: &[SpineEntry],
    analysis: &mut SpineAnalysis,
    lineno: usize,
) -> Result<Vec<SpineEntry>, ModelError> {
    let tokens = &line.tokens;
    let mut next: Vec<SpineEntry> = Vec::new();
    let mut field = 0;

    while field < tokens.len() {
        match tokens[field].text.as_str() {
            "*^" => {
                next.push(active[field].clone());
                next.push(active[field].clone());
                log::debug!("line {}: split track {}", lineno, active[field].track);
                field += 1;
            }
            "*v" => {
                let start = field;
                while field < tokens.len() && tokens[field].text == "*v" {
                    field += 1;
                }
                let width = field - start;
                if width < 2 {
                    return Err(ModelError::structure(
                        lineno,
                        "spine join *v without an adjacent *v partner",
                    ));
                }
                // leftmost surviving track wins, history included
                next.push(active[start].clone());
                log::debug!(
                    "line {}: joined {} spines into track {}",
                    lineno,
                    width,
                    active[start].track
                );
            }
            "*x" => {
                if field + 1 < tokens.len() && tokens[field + 1].text == "*x" {
                    next.push(active[field + 1].clone());
                    next.push(active[field].clone());
                    field += 2;
                } else {
                    return Err(ModelError::structure(
                        lineno,
                        "spine exchange *x without an adjacent *x partner",
                    ));
                }
            }
            "*-" => {
                field += 1;
            }
            "*+" => {
                next.push(active[field].clone());
                let track = analysis.open_track(None);
                next.push(SpineEntry {
                    track,
                    last_data: None,
                });
                field += 1;
            }
            text if text.starts_with("**") => {
                // late declaration for a spine added with *+
                let track = active[field].track as usize;
                if let Some(slot) = analysis.track_exclusives.get_mut(track - 1)
                    && slot.is_none()
                {
                    *slot = Some(text.to_string());
                }
                next.push(active[field].clone());
                field += 1;
            }
            _ => {
                next.push(active[field].clone());
                field += 1;
            }
        }
    }

    Ok(next)
}
