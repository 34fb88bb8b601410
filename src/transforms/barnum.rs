//! Barline renumbering over the controlling-measure analysis.
//!
//! Only controlling barlines receive sequential numbers: the barline that
//! closes an under-filled half of a split measure keeps no number, and an
//! explicit opening barline in front of a pickup is numbered one below the
//! starting number (dropped when that would go negative). Double barlines
//! (`==`) are terminal markers and are left unnumbered.

use crate::file::HumdrumFile;
use crate::rhythm::{Measure, RhythmOptions};
use anyhow::Result;
use num_traits::Zero;

#[derive(Debug, Clone)]
pub struct BarnumConfig {
    /// Number given to the first numbered measure.
    pub start_number: i32,
    /// Number every barline, ignoring the controlling check.
    pub number_all: bool,
    /// Strip numbers instead of assigning them.
    pub remove_numbers: bool,
}

impl Default for BarnumConfig {
    fn default() -> Self {
        Self {
            start_number: 1,
            number_all: false,
            remove_numbers: false,
        }
    }
}

pub fn transform(file: &mut HumdrumFile, config: &BarnumConfig, opts: &RhythmOptions) -> Result<()> {
    if config.remove_numbers {
        let barlines: Vec<usize> = file
            .lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_barline())
            .map(|(i, _)| i)
            .collect();
        for index in barlines {
            rewrite_barline(file, index, None);
        }
        return Ok(());
    }

    file.analyze_rhythm(opts)?;
    let measures = file.measures(opts);
    let assignments = assign_numbers(&measures, file, config);
    for (index, number) in assignments {
        rewrite_barline(file, index, number);
    }
    Ok(())
}

fn assign_numbers(
    measures: &[Measure],
    file: &HumdrumFile,
    config: &BarnumConfig,
) -> Vec<(usize, Option<i32>)> {
    let mut counter = config.start_number;
    let mut assignments = Vec::new();

    for (order, measure) in measures.iter().enumerate() {
        let double = file
            .line(measure.barline_index)
            .and_then(|l| l.tokens.first())
            .is_some_and(|t| t.text.starts_with("=="));
        if double {
            assignments.push((measure.barline_index, None));
            continue;
        }
        if !config.number_all && !measure.controlling {
            assignments.push((measure.barline_index, None));
            continue;
        }

        let opens_pickup = order == 0
            && measure.beat.is_zero()
            && !config.number_all
            && measures.get(1).is_some_and(|next| {
                next.capacity
                    .is_some_and(|cap| !next.duration.is_zero() && next.duration < cap)
            });

        let number = if opens_pickup {
            let n = config.start_number - 1;
            (n >= 0).then_some(n)
        } else {
            let n = counter;
            counter += 1;
            Some(n)
        };
        assignments.push((measure.barline_index, number));
    }

    assignments
}

/// Rewrite every token of a barline line, keeping the `=` count and any
/// style suffix while replacing (or stripping) the number.
fn rewrite_barline(file: &mut HumdrumFile, index: usize, number: Option<i32>) {
    let texts: Vec<String> = match file.line(index) {
        Some(line) if line.is_barline() => line
            .tokens
            .iter()
            .map(|t| renumber_token(&t.text, number))
            .collect(),
        _ => return,
    };
    let joined = texts.join("\t");
    if file.line(index).map(|l| l.text()) != Some(joined.as_str()) {
        file.set_line_text(index, &joined);
    }
}

fn renumber_token(text: &str, number: Option<i32>) -> String {
    let equals = text.chars().take_while(|&c| c == '=').count();
    let suffix: String = text[equals..]
        .chars()
        .skip_while(|c| c.is_ascii_digit())
        .collect();
    match number {
        Some(n) => format!("{}{}{}", "=".repeat(equals), n, suffix),
        None => format!("{}{}", "=".repeat(equals), suffix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_humdrum;
    use crate::util::assert_lines;

    fn renumbered(input: &str, config: &BarnumConfig) -> String {
        let mut file = parse_humdrum(input).unwrap();
        transform(&mut file, config, &RhythmOptions::default()).unwrap();
        file.to_string()
    }

    #[test]
    fn test_plain_renumber() {
        let input = "**kern\n*M4/4\n=9\n1c\n=12\n1d\n==\n*-\n";
        let output = renumbered(input, &BarnumConfig::default());
        assert_lines(&output, &["**kern", "*M4/4", "=1", "1c", "=2", "1d", "==", "*-"]);
    }

    #[test]
    fn test_start_number() {
        let input = "**kern\n*M4/4\n=1\n1c\n=2\n1d\n==\n*-\n";
        let config = BarnumConfig {
            start_number: 10,
            ..Default::default()
        };
        let output = renumbered(input, &config);
        assert_lines(&output, &["**kern", "*M4/4", "=10", "1c", "=11", "1d", "==", "*-"]);
    }

    #[test]
    fn test_split_measure_pair_keeps_one_number() {
        // measure of 3 beats followed by its 1-beat completion
        let input = "**kern\n*M4/4\n=1\n1c\n=2\n2.d\n=3\n4e\n=4\n1f\n==\n*-\n";
        let output = renumbered(input, &BarnumConfig::default());
        assert_lines(
            &output,
            &[
                "**kern", "*M4/4", "=1", "1c", "=2", "2.d", "=", "4e", "=3", "1f", "==", "*-",
            ],
        );
    }

    #[test]
    fn test_number_all_ignores_controlling() {
        let input = "**kern\n*M4/4\n=1\n1c\n=2\n2.d\n=3\n4e\n==\n*-\n";
        let config = BarnumConfig {
            number_all: true,
            ..Default::default()
        };
        let output = renumbered(input, &config);
        assert_lines(
            &output,
            &["**kern", "*M4/4", "=1", "1c", "=2", "2.d", "=3", "4e", "==", "*-"],
        );
    }

    #[test]
    fn test_pickup_opening_barline_gets_zero() {
        let input = "**kern\n*M4/4\n=\n4c\n=\n1d\n==\n*-\n";
        let output = renumbered(input, &BarnumConfig::default());
        assert_lines(&output, &["**kern", "*M4/4", "=0", "4c", "=1", "1d", "==", "*-"]);
    }

    #[test]
    fn test_pickup_without_opening_barline() {
        let input = "**kern\n*M4/4\n4c\n=\n1d\n=\n1e\n==\n*-\n";
        let output = renumbered(input, &BarnumConfig::default());
        assert_lines(
            &output,
            &["**kern", "*M4/4", "4c", "=1", "1d", "=2", "1e", "==", "*-"],
        );
    }

    #[test]
    fn test_remove_numbers() {
        let input = "**kern\n*M4/4\n=1\n1c\n=2\n1d\n==\n*-\n";
        let config = BarnumConfig {
            remove_numbers: true,
            ..Default::default()
        };
        let output = renumbered(input, &config);
        assert_lines(&output, &["**kern", "*M4/4", "=", "1c", "=", "1d", "==", "*-"]);
    }

    #[test]
    fn test_style_suffix_preserved() {
        assert_eq!(renumber_token("=12-", Some(3)), "=3-");
        assert_eq!(renumber_token("=12:|!", None), "=:|!");
        assert_eq!(renumber_token("==", None), "==");
    }
}
