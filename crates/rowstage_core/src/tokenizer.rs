// tokenizer.rs: splits one delimited text line into fields and feeds them to a RecordStage
use memchr::memchr;

use crate::error::StageError;
use crate::settings::ParserSettings;
use crate::staging::RecordStage;

/// Line-oriented field scanner. One line is one record; multi-line quoted
/// values are not supported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tokenizer {
    delimiter: u8,
    quote: u8,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self { delimiter: b',', quote: b'"' }
    }
}

impl Tokenizer {
    /// Both bytes must be ASCII; `ParserSettings::validate` enforces this.
    pub fn new(delimiter: u8, quote: u8) -> Self {
        debug_assert!(delimiter.is_ascii() && quote.is_ascii());
        Self { delimiter, quote }
    }

    pub fn from_settings(settings: &ParserSettings) -> Self {
        let mut buf = [0u8; 4];
        let delimiter = settings.delimiter.encode_utf8(&mut buf).as_bytes()[0];
        let quote = settings.quote.encode_utf8(&mut buf).as_bytes()[0];
        Self::new(delimiter, quote)
    }

    /// Append every field of `line` to `stage`. Does not finalize the row.
    ///
    /// An empty line has no fields. Empty unquoted fields are appended as
    /// empty (null); quoted fields always carry a value, possibly `""`.
    pub fn feed_line(&self, line: &str, stage: &mut RecordStage) -> Result<(), StageError> {
        let bytes = line.as_bytes();
        let n = bytes.len();
        if n == 0 {
            return Ok(());
        }
        let mut i = 0usize;
        loop {
            if i < n && bytes[i] == self.quote {
                i = self.feed_quoted(line, i + 1, stage);
                stage.value_parsed()?;
            } else {
                let end = memchr(self.delimiter, &bytes[i..]).map_or(n, |pos| i + pos);
                if end == i {
                    stage.append_empty()?;
                } else {
                    stage.push_str(&line[i..end]);
                    stage.value_parsed()?;
                }
                i = end;
            }
            if i < n {
                // consume the delimiter; a trailing one opens a final empty field
                i += 1;
            } else {
                break;
            }
        }
        Ok(())
    }

    // Scans a quoted field starting just after the opening quote. Returns the
    // position of the delimiter ending the field, or the line length.
    fn feed_quoted(&self, line: &str, mut i: usize, stage: &mut RecordStage) -> usize {
        let bytes = line.as_bytes();
        let n = bytes.len();
        while i < n {
            match memchr(self.quote, &bytes[i..]) {
                Some(pos) => {
                    stage.push_str(&line[i..i + pos]);
                    i += pos + 1;
                    if i < n && bytes[i] == self.quote {
                        stage.push_char(self.quote as char);
                        i += 1;
                    } else {
                        break;
                    }
                }
                None => {
                    // unterminated: take the rest of the line
                    stage.push_str(&line[i..]);
                    i = n;
                }
            }
        }
        // anything between the closing quote and the delimiter is dropped
        memchr(self.delimiter, &bytes[i..]).map_or(n, |pos| i + pos)
    }
}

#[cfg(test)]
mod tests {
    use super::Tokenizer;
    use crate::settings::ParserSettings;
    use crate::staging::{Record, RecordStage, RowOutcome};

    fn split_with(tok: Tokenizer, line: &str) -> Record {
        let settings = ParserSettings {
            max_columns: 16,
            skip_empty_lines: false,
            null_value: Some("<null>".to_string()),
            ..ParserSettings::default()
        };
        let mut stage = RecordStage::new(&settings);
        tok.feed_line(line, &mut stage).expect("feed");
        match stage.finalize_row().expect("finalize") {
            RowOutcome::Emit(values) => values,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    fn split(line: &str) -> Vec<String> {
        split_with(Tokenizer::default(), line).into_iter().map(|v| v.unwrap_or_default()).collect()
    }

    #[test]
    fn test_split_basic_and_quotes() {
        // Basic
        assert_eq!(split("a,b,c"), vec!["a", "b", "c"]);
        // Quoted with comma and escaped quotes
        assert_eq!(split("\"a,b\",\"c\"\"d\"\"e\",f"), vec!["a,b", "c\"d\"e", "f"]);
        // Trailing empty field
        assert_eq!(split("a,b,"), vec!["a", "b", "<null>"]);
        // Empty line has no fields
        assert!(split("").is_empty());
    }

    #[test]
    fn test_empty_and_quoted_empty_fields() {
        assert_eq!(split(",x,,"), vec!["<null>", "x", "<null>", "<null>"]);
        assert_eq!(split("\"\",x"), vec!["", "x"]);
        assert_eq!(split(","), vec!["<null>", "<null>"]);
    }

    #[test]
    fn test_text_after_closing_quote_is_dropped() {
        assert_eq!(split("\"ab\"cd,e"), vec!["ab", "e"]);
        assert_eq!(split("\"ab\"cd"), vec!["ab"]);
    }

    #[test]
    fn test_unterminated_quote_takes_rest_of_line() {
        assert_eq!(split("a,\"b,c"), vec!["a", "b,c"]);
    }

    #[test]
    fn test_multibyte_text_is_preserved() {
        assert_eq!(split("héllo,\"wörld, ok\",🚀"), vec!["héllo", "wörld, ok", "🚀"]);
    }

    #[test]
    fn test_custom_delimiter_and_quote() {
        let tok = Tokenizer::new(b';', b'\'');
        let got: Vec<String> =
            split_with(tok, "a;'b;c';'it''s'").into_iter().map(|v| v.unwrap_or_default()).collect();
        assert_eq!(got, vec!["a", "b;c", "it's"]);
    }

    #[test]
    fn test_from_settings_uses_configured_bytes() {
        let settings = ParserSettings { delimiter: '\t', quote: '\'', ..ParserSettings::default() };
        assert_eq!(Tokenizer::from_settings(&settings), Tokenizer::new(b'\t', b'\''));
    }

    #[test]
    fn test_overlong_line_reports_capacity() {
        let settings = ParserSettings { max_columns: 2, ..ParserSettings::default() };
        let mut stage = RecordStage::new(&settings);
        let err = Tokenizer::default().feed_line("a,b,c", &mut stage).unwrap_err();
        assert_eq!(err, crate::error::StageError::CapacityExceeded { max_columns: 2, column: 2 });
    }
}
