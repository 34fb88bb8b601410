use crate::errors::{ModelError, ParseIssue, ParseMode};
use crate::rhythm::{self, Measure, RhythmAnalysis, RhythmOptions};
use crate::spines::{self, SpineAnalysis};
use crate::types::line::{Line, LineType};
use std::fmt;

/// One logical Humdrum file: an ordered sequence of lines, the track table
/// derived from them, and cached analysis state.
///
/// Ownership is strictly tree-shaped (file owns lines, lines own tokens);
/// null-token back-references are (line, field) coordinates, never
/// pointers. A file is a single-owner, single-thread structure: analysis
/// caches are invalidated per edit, not per thread.
#[derive(Debug, Clone)]
pub struct HumdrumFile {
    pub lines: Vec<Line>,
    filename: Option<String>,
    segment_label: Option<String>,
    spine_analysis: Option<SpineAnalysis>,
    rhythm_analysis: Option<RhythmAnalysis>,
    /// Whether the source text ended with a newline; serialization preserves it.
    trailing_newline: bool,
}

impl Default for HumdrumFile {
    fn default() -> Self {
        Self::from_lines(Vec::new())
    }
}

impl HumdrumFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines(lines: Vec<Line>) -> Self {
        let segment_label = lines.iter().find_map(segment_label_of);
        Self {
            lines,
            filename: None,
            segment_label,
            spine_analysis: None,
            rhythm_analysis: None,
            trailing_newline: true,
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.filename = Some(filename.into());
    }

    /// Label from a `!!!!SEGMENT:` marker, when the file came from a
    /// multi-segment stream.
    pub fn segment_label(&self) -> Option<&str> {
        self.segment_label.as_deref()
    }

    /// Run (or re-run) the spine/track pass. Idempotent until an edit
    /// invalidates it.
    pub fn analyze_spines(&mut self, mode: ParseMode) -> Result<&SpineAnalysis, ModelError> {
        if self.spine_analysis.is_none() {
            let analysis = spines::analyze(&mut self.lines, mode)?;
            self.spine_analysis = Some(analysis);
        }
        match &self.spine_analysis {
            Some(analysis) => Ok(analysis),
            None => unreachable!("populated just above"),
        }
    }

    /// Run the rhythm pass, running the spine pass first if needed.
    pub fn analyze_rhythm(&mut self, opts: &RhythmOptions) -> Result<RhythmAnalysis, ModelError> {
        self.analyze_spines(opts.mode)?;
        let exclusives = self
            .spine_analysis
            .as_ref()
            .map(|a| a.track_exclusives.clone())
            .unwrap_or_default();
        let analysis = rhythm::analyze(&mut self.lines, &exclusives, opts)?;
        self.rhythm_analysis = Some(analysis.clone());
        Ok(analysis)
    }

    /// Measure segmentation; requires `analyze_rhythm` to have run.
    pub fn measures(&self, opts: &RhythmOptions) -> Vec<Measure> {
        rhythm::measures(&self.lines, opts)
    }

    pub fn is_rhythm_analyzed(&self) -> bool {
        self.rhythm_analysis.is_some()
    }

    pub fn max_track(&self) -> u32 {
        self.spine_analysis.as_ref().map_or(0, |a| a.max_track)
    }

    /// The exclusive interpretation declared for a 1-based track.
    pub fn exclusive_of(&self, track: u32) -> Option<&str> {
        self.spine_analysis
            .as_ref()?
            .track_exclusives
            .get(track.checked_sub(1)? as usize)?
            .as_deref()
    }

    /// All tracks declared with the given exclusive interpretation.
    pub fn tracks_with_exclusive(&self, name: &str) -> Vec<u32> {
        match &self.spine_analysis {
            Some(analysis) => analysis
                .track_exclusives
                .iter()
                .enumerate()
                .filter(|(_, ex)| ex.as_deref() == Some(name))
                .map(|(i, _)| i as u32 + 1)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn kern_tracks(&self) -> Vec<u32> {
        self.tracks_with_exclusive("**kern")
    }

    /// Addresses of every data token belonging to a spine declared with the
    /// given exclusive interpretation.
    pub fn tokens_with_exclusive(&self, name: &str) -> Vec<(usize, usize)> {
        let tracks = self.tracks_with_exclusive(name);
        self.data_lines()
            .flat_map(|(index, line)| {
                line.tokens
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| tracks.contains(&t.track))
                    .map(move |(field, _)| (index, field))
            })
            .collect()
    }

    /// Issues collected by best-effort analysis passes, spine issues first.
    pub fn issues(&self) -> impl Iterator<Item = &ParseIssue> {
        self.spine_analysis
            .iter()
            .flat_map(|a| a.issues.iter())
            .chain(self.rhythm_analysis.iter().flat_map(|a| a.issues.iter()))
    }

    /// Bibliographic reference records as key/value pairs.
    pub fn bibliographic_records(&self) -> Vec<(&str, &str)> {
        self.lines
            .iter()
            .filter_map(|line| line.bibliographic())
            .collect()
    }

    pub fn bibliographic_value(&self, key: &str) -> Option<&str> {
        self.lines
            .iter()
            .find_map(|line| match line.bibliographic() {
                Some((k, v)) if k == key => Some(v),
                _ => None,
            })
    }

    /// Replace a whole line. Invalidates cached analysis.
    pub fn set_line_text(&mut self, index: usize, text: &str) -> bool {
        match self.lines.get_mut(index) {
            Some(line) => {
                line.set_text(text);
                self.invalidate();
                true
            }
            None => false,
        }
    }

    /// Replace one field of a spined line. Invalidates cached analysis.
    pub fn set_token_text(&mut self, index: usize, field: usize, text: &str) -> bool {
        let replaced = self
            .lines
            .get_mut(index)
            .is_some_and(|line| line.set_token_text(field, text));
        if replaced {
            self.invalidate();
        }
        replaced
    }

    pub(crate) fn set_trailing_newline(&mut self, trailing_newline: bool) {
        self.trailing_newline = trailing_newline;
    }

    fn invalidate(&mut self) {
        self.spine_analysis = None;
        self.rhythm_analysis = None;
    }

    /// Data lines only, with their indices.
    pub fn data_lines(&self) -> impl Iterator<Item = (usize, &Line)> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.line_type == LineType::Data)
    }
}

impl fmt::Display for HumdrumFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, line) in self.lines.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", line)?;
        }
        if self.trailing_newline && !self.lines.is_empty() {
            f.write_str("\n")?;
        }
        Ok(())
    }
}

fn segment_label_of(line: &Line) -> Option<String> {
    let rest = line.text().strip_prefix("!!!!SEGMENT")?;
    let rest = rest.strip_prefix(':')?;
    Some(rest.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_humdrum;
    use crate::types::rational::Rational;
    use pretty_assertions::assert_eq;

    const CHORALE: &str = "\
!!!COM: Fixture, Anonymous
**kern\t**kern
*M4/4\t*M4/4
=1\t=1
2c\t4e
.\t4f
4d\t4g
4e\t4a
=2\t=2
1f\t1cc
==\t==
*-\t*-
";

    #[test]
    fn test_round_trip() {
        let file = parse_humdrum(CHORALE).unwrap();
        assert_eq!(file.to_string(), CHORALE);
    }

    #[test]
    fn test_round_trip_without_trailing_newline() {
        let text = "**kern\n4c\n*-";
        let file = parse_humdrum(text).unwrap();
        assert_eq!(file.to_string(), text);
    }

    #[test]
    fn test_track_queries() {
        let file = parse_humdrum(CHORALE).unwrap();
        assert_eq!(file.max_track(), 2);
        assert_eq!(file.kern_tracks(), vec![1, 2]);
        assert_eq!(file.exclusive_of(2), Some("**kern"));
        assert_eq!(file.exclusive_of(3), None);
        assert_eq!(file.tracks_with_exclusive("**text"), Vec::<u32>::new());

        // 5 data lines x 2 kern spines
        assert_eq!(file.tokens_with_exclusive("**kern").len(), 10);
        assert!(file.tokens_with_exclusive("**text").is_empty());
    }

    #[test]
    fn test_bibliographic() {
        let file = parse_humdrum(CHORALE).unwrap();
        assert_eq!(file.bibliographic_value("COM"), Some("Fixture, Anonymous"));
        assert_eq!(file.bibliographic_value("OTL"), None);
    }

    #[test]
    fn test_edit_invalidates_and_recomputes() {
        let mut file = parse_humdrum(CHORALE).unwrap();
        file.analyze_rhythm(&RhythmOptions::default()).unwrap();
        assert_eq!(file.lines[6].absolute_beat, Rational::from_integer(2));

        // halve the second voice's note on the shared line: the line's
        // advance shrinks from a quarter to an eighth
        assert!(file.set_token_text(4, 1, "8e"));
        assert!(!file.is_rhythm_analyzed());
        file.analyze_rhythm(&RhythmOptions::default()).unwrap();
        assert_eq!(file.lines[5].absolute_beat, Rational::new(1, 2));
    }

    #[test]
    fn test_rhythm_issues_are_reported() {
        let parser = crate::parser::HumdrumParser::with_options(crate::parser::ParseOptions {
            mode: ParseMode::BestEffort,
        });
        let mut file = parser.parse("**kern\nxyz\n4c\n*-\n").unwrap();
        let opts = RhythmOptions {
            mode: ParseMode::BestEffort,
            ..Default::default()
        };
        file.analyze_rhythm(&opts).unwrap();

        let issues: Vec<_> = file.issues().collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 2);
        assert!(issues[0].message.contains("malformed rhythm"));

        // editing drops the cached issues along with the analyses
        assert!(file.set_token_text(1, 0, "4b"));
        assert_eq!(file.issues().count(), 0);
    }

    #[test]
    fn test_serialization_after_edit() {
        let mut file = parse_humdrum(CHORALE).unwrap();
        assert!(file.set_token_text(9, 0, "1g"));
        assert!(file.to_string().contains("1g\t1cc"));
    }
}
