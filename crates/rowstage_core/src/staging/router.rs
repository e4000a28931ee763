// staging/router.rs: per-column capture/discard routing and field staging
use super::RecordStage;
use crate::error::StageError;

/// Where the characters of a column go while the tokenizer scans it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnTarget {
    Capture,
    Discard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RowPhase {
    Open,
    Finalized,
}

impl RecordStage {
    /// Target for the column the next characters belong to. Past the last
    /// column nothing can be captured.
    pub fn active_target(&self) -> ColumnTarget {
        self.active
    }

    pub(crate) fn target_at(&self, column: usize) -> ColumnTarget {
        self.targets.get(column).copied().unwrap_or(ColumnTarget::Discard)
    }

    /// Accumulate characters for the current field. Dropped when the column
    /// is routed to discard.
    pub fn push_str(&mut self, s: &str) {
        if self.active == ColumnTarget::Capture {
            self.field_buf.push_str(s);
        }
    }

    pub fn push_char(&mut self, c: char) {
        if self.active == ColumnTarget::Capture {
            self.field_buf.push(c);
        }
    }

    /// Stage the characters accumulated with `push_str`/`push_char` as the
    /// current field's value.
    pub fn value_parsed(&mut self) -> Result<(), StageError> {
        let text = std::mem::take(&mut self.field_buf);
        self.append_value(text)
    }

    /// Stage `text` as the current field and move to the next column.
    /// Discarded columns stage a null since none of their characters were
    /// kept.
    pub fn append_value(&mut self, text: impl Into<String>) -> Result<(), StageError> {
        self.ensure_open("append_value")?;
        let value = match self.active {
            ColumnTarget::Capture => Some(text.into()),
            ColumnTarget::Discard => None,
        };
        self.stage(value)
    }

    /// Stage the null value for a field that produced no characters.
    pub fn append_empty(&mut self) -> Result<(), StageError> {
        self.ensure_open("append_empty")?;
        let value = self.null_value.clone();
        self.stage(value)
    }

    /// Return to column 0 after `finalize_row`.
    pub fn reset(&mut self) -> Result<(), StageError> {
        if self.phase != RowPhase::Finalized {
            return Err(StageError::OutOfSequence {
                operation: "reset",
                expected: "finalize_row before reset",
            });
        }
        self.rewind();
        Ok(())
    }

    /// Drop the record in progress whatever the protocol phase, e.g. after a
    /// capacity violation. Nothing staged so far is emitted.
    pub fn abort_row(&mut self) {
        self.staged[..self.column].fill(None);
        self.rewind();
    }

    fn rewind(&mut self) {
        self.column = 0;
        self.active = self.target_at(0);
        self.field_buf.clear();
        self.phase = RowPhase::Open;
    }

    fn ensure_open(&self, operation: &'static str) -> Result<(), StageError> {
        if self.phase == RowPhase::Finalized {
            return Err(StageError::OutOfSequence { operation, expected: "reset after finalize_row" });
        }
        Ok(())
    }

    fn stage(&mut self, value: Option<String>) -> Result<(), StageError> {
        if self.column >= self.max_columns {
            self.field_buf.clear();
            return Err(StageError::CapacityExceeded {
                max_columns: self.max_columns,
                column: self.column,
            });
        }
        self.staged[self.column] = value;
        self.column += 1;
        self.active = self.target_at(self.column);
        Ok(())
    }
}
