//! Rhythmic analysis: stamps every line with its absolute beat offset and
//! the duration to the next event, then derives measure structure from
//! barlines and time signature context.
//!
//! All arithmetic is exact. The beat cursor advances per data line by the
//! minimum positive duration among the non-null tokens of rhythmic spines;
//! ties and rests carry duration, grace tokens take no time, and barlines
//! never move the cursor.

use crate::errors::{ModelError, ParseIssue, ParseMode};
use crate::types::line::{Line, LineType};
use crate::types::rational::Rational;
use crate::types::time_signature::TimeSignature;
use num_traits::Zero;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct RhythmOptions {
    /// Unit of the beat axis: 4 means quarter-note beats, 1 whole-note
    /// beats, 8 eighth-note beats.
    pub timebase: i64,
    /// Exclusive interpretations whose spines carry the rhythm.
    pub rhythm_interps: Vec<String>,
    pub mode: ParseMode,
}

impl Default for RhythmOptions {
    fn default() -> Self {
        Self {
            timebase: 4,
            rhythm_interps: vec!["**kern".to_string(), "**recip".to_string()],
            mode: ParseMode::Strict,
        }
    }
}

/// Result of the rhythm pass, cached on the owning file.
#[derive(Debug, Clone, Default)]
pub struct RhythmAnalysis {
    /// Total duration of the file in timebase units.
    pub total_duration: Rational,
    pub issues: Vec<ParseIssue>,
}

pub fn analyze(
    lines: &mut [Line],
    track_exclusives: &[Option<String>],
    opts: &RhythmOptions,
) -> Result<RhythmAnalysis, ModelError> {
    let rhythmic = rhythmic_tracks(track_exclusives, opts);
    let timebase = Rational::from_integer(opts.timebase);
    let mut analysis = RhythmAnalysis::default();
    let mut cursor = Rational::zero();

    for (index, line) in lines.iter_mut().enumerate() {
        let lineno = index + 1;
        line.absolute_beat = cursor;
        line.duration_to_next = Rational::zero();
        if line.line_type != LineType::Data {
            continue;
        }

        let mut shortest: Option<Rational> = None;
        for (field, token) in line.tokens.iter().enumerate() {
            if !rhythmic.contains(&token.track) || token.is_null() {
                continue;
            }
            let duration = match token.duration() {
                Ok(Some(d)) => d,
                Ok(None) | Err(_) => {
                    let err = ModelError::MalformedRhythm {
                        line: lineno,
                        field: field + 1,
                        code: token.text.clone(),
                    };
                    match opts.mode {
                        ParseMode::Strict => return Err(err),
                        ParseMode::BestEffort => {
                            analysis.issues.push(ParseIssue {
                                line: lineno,
                                message: err.to_string(),
                            });
                            continue;
                        }
                    }
                }
            };
            if duration > Rational::zero() {
                shortest = Some(match shortest {
                    Some(s) => s.min(duration),
                    None => duration,
                });
            }
        }

        if let Some(shortest) = shortest {
            let advance = shortest * timebase;
            line.duration_to_next = advance;
            cursor += advance;
        }
    }

    analysis.total_duration = cursor;
    log::debug!(
        "rhythm pass: total duration {} (timebase {})",
        analysis.total_duration,
        opts.timebase
    );
    Ok(analysis)
}

fn rhythmic_tracks(track_exclusives: &[Option<String>], opts: &RhythmOptions) -> HashSet<u32> {
    track_exclusives
        .iter()
        .enumerate()
        .filter(|(_, ex)| {
            ex.as_ref()
                .is_some_and(|name| opts.rhythm_interps.iter().any(|r| r == name))
        })
        .map(|(i, _)| i as u32 + 1)
        .collect()
}

/// One measure, identified by its closing barline.
#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
    /// Line index of the closing barline.
    pub barline_index: usize,
    /// Absolute beat of the barline.
    pub beat: Rational,
    /// Summed data duration since the previous barline (or the file start).
    pub duration: Rational,
    /// Full-measure capacity of the governing time signature, if any.
    pub capacity: Option<Rational>,
    /// Whether the summed duration since the previous controlling barline
    /// exactly fills the meter (or the barline closes a recognized partial
    /// first or final measure).
    pub controlling: bool,
    /// Number already present on the barline token, if any.
    pub existing_number: Option<u32>,
}

/// Segment the file at its barlines. Requires the rhythm pass to have
/// stamped `absolute_beat` onto every line.
///
/// A barline is *controlling* when the duration accumulated since the last
/// controlling barline equals the current time signature's capacity. The
/// first barline of a pickup and the final barline of a truncated ending
/// are recognized partials and also controlling; two adjacent under-filled
/// measures that sum to one full measure therefore surface as one
/// non-controlling/controlling pair rather than two anomalies.
pub fn measures(lines: &[Line], opts: &RhythmOptions) -> Vec<Measure> {
    let mut found = Vec::new();
    let mut timesig: Option<TimeSignature> = None;
    let mut prev_beat = Rational::zero();
    let mut last_controlling_beat = Rational::zero();
    let last_barline = lines.iter().rposition(|l| l.is_barline());

    for (index, line) in lines.iter().enumerate() {
        if line.is_interpretation() {
            for token in &line.tokens {
                if let Some(ts) = TimeSignature::from_tandem(&token.text) {
                    timesig = Some(ts);
                }
            }
            continue;
        }
        if !line.is_barline() {
            continue;
        }

        let beat = line.absolute_beat;
        let duration = beat - prev_beat;
        let since = beat - last_controlling_beat;
        let capacity = timesig.map(|ts| ts.capacity(opts.timebase));
        let controlling = match capacity {
            None => true,
            Some(cap) => {
                let full = since == cap;
                let opening = beat.is_zero();
                // a pickup closes the first data span, whether or not an
                // explicit barline opened it at beat zero
                let no_data_before = found.iter().all(|m: &Measure| m.beat.is_zero());
                let pickup = no_data_before && since > Rational::zero() && since < cap;
                let truncated =
                    Some(index) == last_barline && since > Rational::zero() && since < cap;
                full || opening || pickup || truncated
            }
        };
        if controlling {
            last_controlling_beat = beat;
        }
        found.push(Measure {
            barline_index: index,
            beat,
            duration,
            capacity,
            controlling,
            existing_number: line.tokens.first().and_then(|t| t.barline_number()),
        });
        prev_beat = beat;
    }

    found
}
