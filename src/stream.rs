//! Pull-based reading of multi-segment input: one physical stream holding
//! several logical Humdrum files separated by `!!!!SEGMENT: name` markers.
//!
//! Segments are parsed one at a time and handed off to the caller; once a
//! segment has been consumed there is no seeking back into it. The marker
//! line stays as the first line of its segment, so serializing a segment
//! emits it exactly once.

use crate::file::HumdrumFile;
use crate::parser::{HumdrumParser, ParseOptions};
use anyhow::{Context, Result};
use std::io::BufRead;

pub struct HumdrumStream<R: BufRead> {
    reader: R,
    options: ParseOptions,
    /// A segment marker that terminated the previous read.
    pending: Option<String>,
    lineno: usize,
    done: bool,
}

impl<R: BufRead> HumdrumStream<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, ParseOptions::default())
    }

    pub fn with_options(reader: R, options: ParseOptions) -> Self {
        Self {
            reader,
            options,
            pending: None,
            lineno: 0,
            done: false,
        }
    }

    /// Read the next logical segment, or `None` at end of input.
    pub fn read_next(&mut self) -> Result<Option<HumdrumFile>> {
        if self.done && self.pending.is_none() {
            return Ok(None);
        }

        let mut collected: Vec<String> = Vec::new();
        // a pending marker was followed by more input, so it had a newline
        let mut last_terminated = true;
        if let Some(marker) = self.pending.take() {
            collected.push(marker);
        }

        loop {
            let mut raw = String::new();
            let read = self
                .reader
                .read_line(&mut raw)
                .with_context(|| format!("read failed after line {}", self.lineno))?;
            if read == 0 {
                self.done = true;
                break;
            }
            self.lineno += 1;
            let line = raw.trim_end_matches(['\n', '\r']).to_string();

            if is_segment_marker(&line) && !collected.is_empty() {
                self.pending = Some(line);
                break;
            }
            last_terminated = raw.ends_with('\n');
            collected.push(line);
        }

        // skip blank leading runs between segments
        if collected.iter().all(|l| l.trim().is_empty()) {
            if self.pending.is_some() {
                return self.read_next();
            }
            return Ok(None);
        }

        let content = collected.join("\n");
        let mut file = HumdrumParser::with_options(self.options.clone())
            .parse(&content)
            .with_context(|| match segment_name(collected.first()) {
                Some(name) => format!("in segment \"{}\"", name),
                None => "in unnamed segment".to_string(),
            })?;
        // joining dropped the line terminators, so restore the real state
        file.set_trailing_newline(last_terminated);
        Ok(Some(file))
    }

    /// Drain the stream into a vector of segments.
    pub fn read_all(mut self) -> Result<Vec<HumdrumFile>> {
        let mut files = Vec::new();
        while let Some(file) = self.read_next()? {
            files.push(file);
        }
        Ok(files)
    }
}

fn is_segment_marker(line: &str) -> bool {
    line.starts_with("!!!!SEGMENT")
}

fn segment_name(line: Option<&String>) -> Option<&str> {
    let rest = line?.strip_prefix("!!!!SEGMENT")?;
    Some(rest.strip_prefix(':')?.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TWO_SEGMENTS: &str = "\
!!!!SEGMENT: first.krn
**kern
4c
*-
!!!!SEGMENT: second.krn
**kern
4d
4e
*-
";

    #[test]
    fn test_two_segments() {
        let mut stream = HumdrumStream::new(Cursor::new(TWO_SEGMENTS));
        let first = stream.read_next().unwrap().unwrap();
        assert_eq!(first.segment_label(), Some("first.krn"));
        assert_eq!(first.line_count(), 4);

        let second = stream.read_next().unwrap().unwrap();
        assert_eq!(second.segment_label(), Some("second.krn"));
        assert_eq!(second.line_count(), 5);

        assert!(stream.read_next().unwrap().is_none());
    }

    #[test]
    fn test_marker_emitted_once_per_segment() {
        let stream = HumdrumStream::new(Cursor::new(TWO_SEGMENTS));
        let files = stream.read_all().unwrap();
        assert_eq!(files.len(), 2);
        let rejoined: String = files.iter().map(|f| f.to_string()).collect();
        assert_eq!(rejoined, TWO_SEGMENTS);
        assert_eq!(rejoined.matches("!!!!SEGMENT").count(), 2);
    }

    #[test]
    fn test_stream_preserves_missing_final_newline() {
        let input = "!!!!SEGMENT: a.krn\n**kern\n4c\n*-\n!!!!SEGMENT: b.krn\n**kern\n4d\n*-";
        let stream = HumdrumStream::new(Cursor::new(input));
        let files = stream.read_all().unwrap();
        assert_eq!(files.len(), 2);
        let rejoined: String = files.iter().map(|f| f.to_string()).collect();
        assert_eq!(rejoined, input);
    }

    #[test]
    fn test_unmarked_input_is_one_segment() {
        let mut stream = HumdrumStream::new(Cursor::new("**kern\n4c\n*-\n"));
        let file = stream.read_next().unwrap().unwrap();
        assert_eq!(file.segment_label(), None);
        assert!(stream.read_next().unwrap().is_none());
    }

    #[test]
    fn test_parse_error_names_segment() {
        let bad = "!!!!SEGMENT: broken.krn\n**kern\t**kern\n*v\t*\n*-\t*-\n";
        let mut stream = HumdrumStream::new(Cursor::new(bad));
        let err = stream.read_next().unwrap_err();
        assert!(format!("{:#}", err).contains("broken.krn"));
    }
}
