// parser.rs: one parse session binding a tokenizer to a record stage
use std::collections::HashMap;
use std::io::BufRead;

use crate::error::{ParseError, SettingsError, StageError};
use crate::selector::FieldSelector;
use crate::settings::ParserSettings;
use crate::staging::{Record, RecordStage, RowOutcome};
use crate::tokenizer::Tokenizer;

pub struct RecordParser {
    stage: RecordStage,
    tokenizer: Tokenizer,
    line: usize,
}

impl RecordParser {
    pub fn new(settings: &ParserSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self::from_stage(settings, RecordStage::new(settings)))
    }

    /// Like [`new`](Self::new) but with a caller-supplied selector in place of
    /// `settings.select`.
    pub fn with_selector(
        settings: &ParserSettings,
        selector: Box<dyn FieldSelector>,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self::from_stage(settings, RecordStage::with_selector(settings, Some(selector))))
    }

    fn from_stage(settings: &ParserSettings, stage: RecordStage) -> Self {
        Self { stage, tokenizer: Tokenizer::from_settings(settings), line: 0 }
    }

    /// Parse one line as one record. On a capacity violation the row is
    /// dropped and the error carries the 1-based line number.
    pub fn parse_line(&mut self, line: &str) -> Result<RowOutcome, ParseError> {
        self.line += 1;
        if let Err(source) = self.tokenizer.feed_line(line, &mut self.stage) {
            self.stage.abort_row();
            tracing::warn!(line = self.line, error = %source, "row rejected");
            return Err(ParseError::Row { line: self.line, source });
        }
        let outcome = self.stage.finalize_row().map_err(|e| self.row_error(e))?;
        self.stage.reset().map_err(|e| self.row_error(e))?;
        Ok(outcome)
    }

    fn row_error(&self, source: StageError) -> ParseError {
        ParseError::Row { line: self.line, source }
    }

    /// Parse every line of `text`, returning the emitted records.
    pub fn parse_str(&mut self, text: &str) -> Result<Vec<Record>, ParseError> {
        let mut out = Vec::new();
        for line in text.lines() {
            if let RowOutcome::Emit(values) = self.parse_line(line)? {
                out.push(values);
            }
        }
        Ok(out)
    }

    pub fn parse_reader<R: BufRead>(&mut self, reader: R) -> Result<Vec<Record>, ParseError> {
        let mut out = Vec::new();
        self.for_each_record(reader, |values| {
            out.push(values);
            Ok(())
        })?;
        Ok(out)
    }

    /// Stream every emitted record of `reader` into `f`; returns how many
    /// records were emitted.
    pub fn for_each_record<R, F>(&mut self, reader: R, mut f: F) -> Result<usize, ParseError>
    where
        R: BufRead,
        F: FnMut(Record) -> Result<(), ParseError>,
    {
        let start = self.stage.record_count();
        for line_res in reader.lines() {
            let line = line_res?;
            if let RowOutcome::Emit(values) = self.parse_line(&line)? {
                f(values)?;
            }
        }
        let emitted = self.stage.record_count() - start;
        tracing::debug!(lines = self.line, records = emitted, "input parsed");
        Ok(emitted)
    }

    /// Headers lined up with emitted records: the selected headers in
    /// selection order when reordering, otherwise the input headers.
    /// Selected positions without a header are `""`.
    pub fn output_headers(&self) -> Option<Vec<String>> {
        let headers = self.stage.headers()?;
        match self.stage.selected_indexes() {
            Some(selected) if self.stage.is_reordering_enabled() => Some(
                selected.iter().map(|&i| headers.get(i).cloned().unwrap_or_default()).collect(),
            ),
            _ => Some(headers.to_vec()),
        }
    }

    pub fn headers(&self) -> Option<&[String]> {
        self.stage.headers()
    }

    pub fn selected_indexes(&self) -> Option<&[usize]> {
        self.stage.selected_indexes()
    }

    pub fn is_reordering_enabled(&self) -> bool {
        self.stage.is_reordering_enabled()
    }

    pub fn record_count(&self) -> usize {
        self.stage.record_count()
    }

    /// Lines consumed so far, including suppressed, skipped and rejected ones.
    pub fn line_count(&self) -> usize {
        self.line
    }

    pub fn stage(&self) -> &RecordStage {
        &self.stage
    }
}

/// Pair a record with its headers. Header positions past the end of the
/// record map to `None`; values without a header are left out.
pub fn record_to_map(headers: &[String], record: &[Option<String>]) -> HashMap<String, Option<String>> {
    let mut map_out: HashMap<String, Option<String>> = HashMap::with_capacity(headers.len());
    for (i, name) in headers.iter().enumerate() {
        let v = record.get(i).cloned().flatten();
        map_out.insert(name.clone(), v);
    }
    map_out
}

/// Split a single line with default settings and no selection.
pub fn split_line(line: &str) -> Result<Record, StageError> {
    let settings = ParserSettings { skip_empty_lines: false, ..ParserSettings::default() };
    let mut stage = RecordStage::new(&settings);
    Tokenizer::from_settings(&settings).feed_line(line, &mut stage)?;
    match stage.finalize_row()? {
        RowOutcome::Emit(values) => Ok(values),
        _ => Ok(Vec::new()),
    }
}
