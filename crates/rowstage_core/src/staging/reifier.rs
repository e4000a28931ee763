// staging/reifier.rs: turns the staged fields of a row into its outcome
use super::router::RowPhase;
use super::{Record, RecordStage};
use crate::error::StageError;

/// What a finished row turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// A data record to hand downstream.
    Emit(Record),
    /// The row was consumed as the header row.
    Suppressed,
    /// An empty row dropped by `skip_empty_lines`.
    Skipped,
}

impl RecordStage {
    /// Close the current row. Must be followed by [`reset`](Self::reset)
    /// before the next row's fields are appended.
    pub fn finalize_row(&mut self) -> Result<RowOutcome, StageError> {
        if self.phase == RowPhase::Finalized {
            return Err(StageError::OutOfSequence {
                operation: "finalize_row",
                expected: "reset before the next row",
            });
        }
        self.phase = RowPhase::Finalized;

        if self.column > 0 {
            if !self.resolved {
                let row = self.staged[..self.column].to_vec();
                self.resolve(&row);
                if self.header_extraction {
                    self.staged[..self.column].fill(None);
                    tracing::trace!(columns = self.column, "header row consumed");
                    return Ok(RowOutcome::Suppressed);
                }
            }
            self.record_count += 1;
            let values = if self.reordered {
                self.reordered_values()
            } else {
                self.staged[..self.column].iter_mut().map(Option::take).collect()
            };
            Ok(RowOutcome::Emit(values))
        } else if !self.skip_empty_lines {
            if !self.resolved {
                self.resolve(&[]);
            }
            self.record_count += 1;
            let values = match &self.selected {
                Some(selected) if self.reordered => vec![self.null_value.clone(); selected.len()],
                _ => Vec::new(),
            };
            Ok(RowOutcome::Emit(values))
        } else {
            tracing::trace!("empty row skipped");
            Ok(RowOutcome::Skipped)
        }
    }

    fn reordered_values(&self) -> Record {
        let selected = self.selected.as_deref().unwrap_or_default();
        selected
            .iter()
            .map(|&idx| {
                if idx < self.column {
                    self.staged[idx].clone()
                } else {
                    self.null_value.clone()
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::{FieldIndexes, FieldNames};
    use crate::settings::ParserSettings;

    fn some(values: &[&str]) -> Record {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    fn finish(stage: &mut RecordStage, values: &[&str]) -> RowOutcome {
        for v in values {
            stage.append_value(*v).unwrap();
        }
        let out = stage.finalize_row().unwrap();
        stage.reset().unwrap();
        out
    }

    #[test]
    fn test_unselected_rows_pass_through_in_order() {
        let mut stage = RecordStage::new(&ParserSettings { max_columns: 4, ..ParserSettings::default() });
        assert_eq!(finish(&mut stage, &["a", "b", "c"]), RowOutcome::Emit(some(&["a", "b", "c"])));
        assert_eq!(finish(&mut stage, &["d"]), RowOutcome::Emit(some(&["d"])));
        assert_eq!(finish(&mut stage, &["e", "f", "g", "h"]), RowOutcome::Emit(some(&["e", "f", "g", "h"])));
        assert_eq!(stage.record_count(), 3);
    }

    #[test]
    fn test_skip_empty_lines_never_counts() {
        let s = ParserSettings { max_columns: 2, skip_empty_lines: true, ..ParserSettings::default() };
        let mut stage = RecordStage::new(&s);
        assert_eq!(finish(&mut stage, &[]), RowOutcome::Skipped);
        assert_eq!(finish(&mut stage, &["a"]), RowOutcome::Emit(some(&["a"])));
        assert_eq!(finish(&mut stage, &[]), RowOutcome::Skipped);
        assert_eq!(stage.record_count(), 1);
    }

    #[test]
    fn test_empty_row_under_reordered_selection_is_all_null() {
        let s = ParserSettings {
            max_columns: 3,
            skip_empty_lines: false,
            reorder_columns: true,
            null_value: Some("NULL".into()),
            ..ParserSettings::default()
        };
        let mut stage = RecordStage::with_selector(&s, Some(Box::new(FieldIndexes::new([2, 0]))));
        assert_eq!(finish(&mut stage, &["a", "b", "c"]), RowOutcome::Emit(some(&["c", "a"])));
        assert_eq!(finish(&mut stage, &[]), RowOutcome::Emit(some(&["NULL", "NULL"])));
        assert_eq!(stage.record_count(), 2);
    }

    #[test]
    fn test_empty_row_under_non_reordered_selection_is_empty() {
        let s = ParserSettings {
            max_columns: 3,
            skip_empty_lines: false,
            reorder_columns: false,
            ..ParserSettings::default()
        };
        let mut stage = RecordStage::with_selector(&s, Some(Box::new(FieldIndexes::new([1]))));
        finish(&mut stage, &["a", "b"]);
        assert_eq!(finish(&mut stage, &[]), RowOutcome::Emit(vec![]));
    }

    #[test]
    fn test_empty_first_row_with_header_extraction_defers_headers() {
        let s = ParserSettings {
            max_columns: 3,
            skip_empty_lines: false,
            header_extraction: true,
            ..ParserSettings::default()
        };
        let mut stage = RecordStage::new(&s);
        assert_eq!(finish(&mut stage, &[]), RowOutcome::Emit(vec![]));
        assert_eq!(finish(&mut stage, &["h1", "h2"]), RowOutcome::Suppressed);
        assert_eq!(stage.headers(), Some(&["h1".to_string(), "h2".to_string()][..]));
        assert_eq!(finish(&mut stage, &["1", "2"]), RowOutcome::Emit(some(&["1", "2"])));
        assert_eq!(stage.record_count(), 2);
    }

    #[test]
    fn test_header_row_suppressed_even_with_configured_headers() {
        let s = ParserSettings {
            max_columns: 3,
            headers: Some(vec!["x".into(), "y".into()]),
            header_extraction: true,
            ..ParserSettings::default()
        };
        let mut stage = RecordStage::new(&s);
        assert_eq!(finish(&mut stage, &["a", "b"]), RowOutcome::Suppressed);
        assert_eq!(stage.headers(), Some(&["x".to_string(), "y".to_string()][..]));
        assert_eq!(finish(&mut stage, &["1", "2"]), RowOutcome::Emit(some(&["1", "2"])));
    }

    #[test]
    fn test_non_reordered_selection_nulls_unselected_columns() {
        let s = ParserSettings {
            max_columns: 5,
            header_extraction: true,
            reorder_columns: false,
            ..ParserSettings::default()
        };
        let mut stage = RecordStage::with_selector(&s, Some(Box::new(FieldNames::new(["b"]))));
        finish(&mut stage, &["a", "b"]);
        // columns past the header row stay captured
        assert_eq!(
            finish(&mut stage, &["1", "2", "3", "4"]),
            RowOutcome::Emit(vec![None, Some("2".into()), Some("3".into()), Some("4".into())])
        );
    }

    #[test]
    fn test_duplicate_selected_index_repeats_value() {
        let s = ParserSettings { max_columns: 3, reorder_columns: true, ..ParserSettings::default() };
        let mut stage = RecordStage::with_selector(&s, Some(Box::new(FieldIndexes::new([0, 0]))));
        assert_eq!(finish(&mut stage, &["a", "b"]), RowOutcome::Emit(some(&["a", "a"])));
    }
}
