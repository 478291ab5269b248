//! Line-oriented record parsing.
//!
//! Each input line holds three coordinates and an optional value, separated
//! by whitespace. Blank lines and lines whose first non-blank characters are
//! `//` are skipped. Fields after the fourth are ignored.

use crate::error::{Error, Result};
use crate::resolve::CoordinateMode;
use std::io::BufRead;

/// Maximum number of numeric fields read from one line.
const MAX_FIELDS: usize = 4;

/// One parsed input line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelRecord<'a> {
    /// Raw coordinate triple, as written.
    pub coords: [f64; 3],
    /// Explicit value; `None` means the configured default applies.
    pub value: Option<f64>,
    /// Name of the source the line came from (`-` for standard input).
    pub source: &'a str,
    /// 1-based line number within the source.
    pub line: usize,
    /// How `coords` is to be interpreted.
    pub mode: CoordinateMode,
}

impl VoxelRecord<'_> {
    /// Value to store, falling back to `default`.
    pub fn value_or(&self, default: f64) -> f64 {
        self.value.unwrap_or(default)
    }
}

/// True for lines carrying no record.
pub fn is_skippable(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.is_empty() || trimmed.starts_with("//")
}

/// Leading numeric fields of a line, stopping at the first non-number.
fn scan_fields(text: &str) -> ([f64; MAX_FIELDS], usize) {
    let mut fields = [0.0; MAX_FIELDS];
    let mut count = 0;
    for token in text.split_whitespace().take(MAX_FIELDS) {
        match token.parse::<f64>() {
            Ok(v) => {
                fields[count] = v;
                count += 1;
            }
            Err(_) => break,
        }
    }
    (fields, count)
}

/// Parse one line.
///
/// Returns `Ok(None)` for blank and comment lines and
/// [`Error::MalformedRecord`] when fewer than three numbers can be read.
pub fn parse_line<'a>(
    source: &'a str,
    line: usize,
    text: &str,
    mode: CoordinateMode,
) -> Result<Option<VoxelRecord<'a>>> {
    if is_skippable(text) {
        return Ok(None);
    }

    let (fields, count) = scan_fields(text);
    if count < 3 {
        return Err(Error::MalformedRecord {
            source_name: source.to_string(),
            line,
            fields: count,
        });
    }

    Ok(Some(VoxelRecord {
        coords: [fields[0], fields[1], fields[2]],
        value: (count == MAX_FIELDS).then_some(fields[3]),
        source,
        line,
        mode,
    }))
}

/// Iterator over the lines of a reader, numbered from 1.
///
/// Invalid UTF-8 is replaced rather than rejected, so a stray byte only
/// affects the line it sits on.
pub struct Lines<R> {
    reader: R,
    buf: Vec<u8>,
    line: usize,
}

impl<R: BufRead> Lines<R> {
    /// Wrap a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(128),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for Lines<R> {
    type Item = std::io::Result<(usize, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.line += 1;
                let text = String::from_utf8_lossy(&self.buf);
                let text = text.trim_end_matches(['\n', '\r']).to_string();
                Some(Ok((self.line, text)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> Result<Option<VoxelRecord<'static>>> {
        parse_line("input.txt", 7, text, CoordinateMode::Index)
    }

    #[test]
    fn test_three_fields_use_default() {
        let record = parse("1 2 3").unwrap().unwrap();
        assert_eq!(record.coords, [1.0, 2.0, 3.0]);
        assert_eq!(record.value, None);
        assert_eq!(record.value_or(1.0), 1.0);
        assert_eq!(record.line, 7);
        assert_eq!(record.source, "input.txt");
    }

    #[test]
    fn test_fourth_field_is_value() {
        let record = parse("3 2 1 5").unwrap().unwrap();
        assert_eq!(record.coords, [3.0, 2.0, 1.0]);
        assert_eq!(record.value_or(1.0), 5.0);
    }

    #[test]
    fn test_skip_lines() {
        for text in ["", "   ", "\t", "// comment", "   // indented comment 1 2 3"] {
            assert_eq!(parse(text).unwrap(), None, "{text:?}");
        }
        // a single slash is not a comment
        assert!(parse("/ 1 2 3").is_err());
    }

    #[test]
    fn test_incomplete_line() {
        let err = parse("1 2").unwrap_err();
        match err {
            Error::MalformedRecord {
                source_name,
                line,
                fields,
            } => {
                assert_eq!(source_name, "input.txt");
                assert_eq!(line, 7);
                assert_eq!(fields, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_scan_stops_at_first_non_number() {
        // value missing because the fourth token is not numeric
        let record = parse("1 2 3 x 9").unwrap().unwrap();
        assert_eq!(record.value, None);
        assert!(parse("1 x 2 3").is_err());
    }

    #[test]
    fn test_extra_fields_ignored() {
        let record = parse("  -1.5\t2e1 +3 4.25 99 100").unwrap().unwrap();
        assert_eq!(record.coords, [-1.5, 20.0, 3.0]);
        assert_eq!(record.value, Some(4.25));
    }

    #[test]
    fn test_lines_numbering() {
        let input = Cursor::new(b"0 0 0\r\n\n1 1 1\n\xff 2 2 2".to_vec());
        let lines: Vec<(usize, String)> = Lines::new(input).map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], (1, "0 0 0".to_string()));
        assert_eq!(lines[1], (2, String::new()));
        assert_eq!(lines[2], (3, "1 1 1".to_string()));
        assert_eq!(lines[3].0, 4);
        assert!(lines[3].1.ends_with(" 2 2 2"));
    }
}
