use crate::errors::ParseMode;
use crate::file::HumdrumFile;
use crate::types::line::{Line, LineType};
use anyhow::{Result, bail};

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub mode: ParseMode,
}

pub struct HumdrumParser {
    options: ParseOptions,
}

/// Parse one complete Humdrum text in strict mode.
pub fn parse_humdrum(content: &str) -> Result<HumdrumFile> {
    HumdrumParser::new().parse(content)
}

impl Default for HumdrumParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HumdrumParser {
    pub fn new() -> Self {
        Self {
            options: ParseOptions::default(),
        }
    }

    pub fn with_options(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn parse(&self, content: &str) -> Result<HumdrumFile> {
        let lines: Vec<Line> = content.lines().map(Line::from_text).collect();

        if !lines
            .iter()
            .any(|l| l.line_type == LineType::ExclusiveInterpretation)
        {
            bail!("missing exclusive interpretation declaration");
        }

        let mut file = HumdrumFile::from_lines(lines);
        file.set_trailing_newline(content.ends_with('\n'));
        file.analyze_spines(self.options.mode)?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ParseMode;

    #[test]
    fn test_parse_minimal() {
        let file = parse_humdrum("**kern\n4c\n*-\n").unwrap();
        assert_eq!(file.line_count(), 3);
        assert_eq!(file.max_track(), 1);
    }

    #[test]
    fn test_missing_declaration() {
        assert!(parse_humdrum("!! only comments\n").is_err());
        assert!(parse_humdrum("").is_err());
    }

    #[test]
    fn test_error_carries_line_number() {
        let err = parse_humdrum("**kern\t**kern\n4c\t4d\n*v\t*\n*-\n").unwrap_err();
        assert!(err.to_string().contains("line 3"), "got: {}", err);
    }

    #[test]
    fn test_best_effort_keeps_going() {
        let text = "**kern\n.\n4c\n*-\n";
        assert!(parse_humdrum(text).is_err());

        let parser = HumdrumParser::with_options(ParseOptions {
            mode: ParseMode::BestEffort,
        });
        let file = parser.parse(text).unwrap();
        assert_eq!(file.issues().count(), 1);
        // serialization still round-trips
        assert_eq!(file.to_string(), text);
    }
}
