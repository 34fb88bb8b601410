//! Tempo context: `*MM` markings, `*accel`/`*rit` spans, and wall-clock
//! timing derived from them.
//!
//! Between two tempo markings bridged by an accelerando or ritardando the
//! tempo is interpolated geometrically, `bpm0 * (bpm1/bpm0)^frac`, since
//! perceived tempo change is multiplicative: halfway from 60 to 120 is
//! sqrt(60*120) ~ 77.46, not 90. This is the only place in the crate where
//! rationals are lowered to floats.

use crate::types::line::Line;
use crate::types::rational::Rational;
use num_traits::ToPrimitive;

const DEFAULT_BPM: f64 = 60.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TempoPoint {
    pub beat: Rational,
    pub bpm: f64,
    /// Interpolate geometrically toward the next point.
    pub interpolated: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TempoMap {
    points: Vec<TempoPoint>,
}

impl TempoMap {
    /// Collect `*MM` tempo markings and `*accel`/`*rit` spans. Requires the
    /// rhythm pass to have stamped beats onto the lines.
    pub fn from_lines(lines: &[Line]) -> Self {
        let mut points: Vec<TempoPoint> = Vec::new();
        let mut gradient_beats: Vec<Rational> = Vec::new();

        for line in lines {
            if !line.is_interpretation() {
                continue;
            }
            for token in &line.tokens {
                if let Some(bpm) = parse_tempo_tandem(&token.text) {
                    if points.last().is_none_or(|p| p.beat != line.absolute_beat) {
                        points.push(TempoPoint {
                            beat: line.absolute_beat,
                            bpm,
                            interpolated: false,
                        });
                    }
                } else if token.text == "*accel" || token.text == "*rit" {
                    gradient_beats.push(line.absolute_beat);
                }
            }
        }

        // a gradient marker turns the span between its surrounding tempo
        // points into an interpolated one
        for window in 0..points.len().saturating_sub(1) {
            let (lo, hi) = (points[window].beat, points[window + 1].beat);
            if gradient_beats.iter().any(|&b| b >= lo && b <= hi) {
                points[window].interpolated = true;
            }
        }

        Self { points }
    }

    pub fn points(&self) -> &[TempoPoint] {
        &self.points
    }

    /// Tempo in quarter notes per minute at the given beat position.
    pub fn tempo_at(&self, beat: Rational) -> f64 {
        let current = match self.points.iter().rposition(|p| p.beat <= beat) {
            Some(i) => i,
            None => return self.points.first().map_or(DEFAULT_BPM, |p| p.bpm),
        };
        let point = &self.points[current];
        if !point.interpolated {
            return point.bpm;
        }
        let next = match self.points.get(current + 1) {
            Some(n) => n,
            None => return point.bpm,
        };
        let span = (next.beat - point.beat).to_f64().unwrap_or(0.0);
        if span == 0.0 {
            return point.bpm;
        }
        let frac = (beat - point.beat).to_f64().unwrap_or(0.0) / span;
        point.bpm * (next.bpm / point.bpm).powf(frac)
    }

    /// Elapsed wall-clock seconds at the start of each line, integrating
    /// each data line's duration at the tempo governing it.
    pub fn timeline(&self, lines: &[Line], timebase: i64) -> Vec<f64> {
        let quarters_per_unit = 4.0 / timebase as f64;
        let mut seconds = 0.0;
        lines
            .iter()
            .map(|line| {
                let at = seconds;
                let units = line.duration_to_next.to_f64().unwrap_or(0.0);
                if units > 0.0 {
                    let bpm = self.tempo_at(line.absolute_beat);
                    seconds += units * quarters_per_unit * 60.0 / bpm;
                }
                at
            })
            .collect()
    }
}

fn parse_tempo_tandem(token: &str) -> Option<f64> {
    let rest = token.strip_prefix("*MM")?;
    let bpm: f64 = rest.parse().ok()?;
    (bpm > 0.0).then_some(bpm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ParseMode;
    use crate::rhythm::{self, RhythmOptions};
    use crate::spines;
    use num_traits::Zero;

    fn analyzed(text: &str) -> Vec<Line> {
        let mut lines: Vec<Line> = text
            .trim_start_matches('\n')
            .lines()
            .map(Line::from_text)
            .collect();
        let spine_analysis = spines::analyze(&mut lines, ParseMode::Strict).unwrap();
        rhythm::analyze(
            &mut lines,
            &spine_analysis.track_exclusives,
            &RhythmOptions::default(),
        )
        .unwrap();
        lines
    }

    #[test]
    fn test_constant_tempo() {
        let lines = analyzed("**kern\n*MM90\n4c\n4d\n*-\n");
        let map = TempoMap::from_lines(&lines);
        assert_eq!(map.tempo_at(Rational::zero()), 90.0);
        assert_eq!(map.tempo_at(Rational::from_integer(100)), 90.0);
    }

    #[test]
    fn test_step_change_without_gradient() {
        let lines = analyzed("**kern\n*MM60\n1c\n1d\n*MM120\n1e\n*-\n");
        let map = TempoMap::from_lines(&lines);
        // no accel marker: a step change, not a ramp
        assert_eq!(map.tempo_at(Rational::from_integer(4)), 60.0);
        assert_eq!(map.tempo_at(Rational::from_integer(8)), 120.0);
    }

    #[test]
    fn test_geometric_interpolation() {
        let lines = analyzed("**kern\n*MM60\n*accel\n1c\n1d\n*MM120\n1e\n*-\n");
        let map = TempoMap::from_lines(&lines);
        let mid = map.tempo_at(Rational::from_integer(4));
        let expected = (60.0f64 * 120.0).sqrt();
        assert!(
            (mid - expected).abs() < 1e-9,
            "expected {} got {}",
            expected,
            mid
        );
        // endpoints stay exact
        assert_eq!(map.tempo_at(Rational::zero()), 60.0);
        assert_eq!(map.tempo_at(Rational::from_integer(8)), 120.0);
    }

    #[test]
    fn test_default_tempo() {
        let lines = analyzed("**kern\n4c\n*-\n");
        let map = TempoMap::from_lines(&lines);
        assert_eq!(map.tempo_at(Rational::zero()), 60.0);
    }

    #[test]
    fn test_timeline() {
        let lines = analyzed("**kern\n*MM120\n4c\n4d\n4e\n*-\n");
        let map = TempoMap::from_lines(&lines);
        let timeline = map.timeline(&lines, 4);
        // at 120 bpm each quarter lasts half a second
        assert_eq!(timeline[2], 0.0);
        assert!((timeline[3] - 0.5).abs() < 1e-12);
        assert!((timeline[4] - 1.0).abs() < 1e-12);
    }
}
