//! Record staging buffer.
//!
//! A [`RecordStage`] owns the per-record staging area a tokenizer writes
//! into. It routes each column to capture or discard, resolves column
//! selection, reordering and headers once from the first usable row, and
//! turns each finished row into a [`RowOutcome`].
//!
//! The driver protocol per record is: zero or more
//! [`append_value`](RecordStage::append_value) /
//! [`append_empty`](RecordStage::append_empty) calls, one
//! [`finalize_row`](RecordStage::finalize_row), then one
//! [`reset`](RecordStage::reset). Calls out of that order fail with
//! [`StageError::OutOfSequence`](crate::error::StageError::OutOfSequence).

mod reifier;
mod resolver;
mod router;

pub use reifier::RowOutcome;
pub use router::ColumnTarget;

use crate::selector::FieldSelector;
use crate::settings::ParserSettings;
use router::RowPhase;

/// One emitted row. `None` is a null value.
pub type Record = Vec<Option<String>>;

pub struct RecordStage {
    // configuration, fixed for the session
    max_columns: usize,
    configured_headers: Option<Vec<String>>,
    selector: Option<Box<dyn FieldSelector>>,
    reorder_enabled: bool,
    skip_empty_lines: bool,
    header_extraction: bool,
    null_value: Option<String>,

    // column router
    staged: Box<[Option<String>]>,
    targets: Box<[ColumnTarget]>,
    column: usize,
    active: ColumnTarget,
    field_buf: String,
    phase: RowPhase,

    // selection state, frozen once `resolved` is set
    resolved: bool,
    reordered: bool,
    selected: Option<Vec<usize>>,
    headers: Option<Vec<String>>,

    record_count: usize,
}

impl RecordStage {
    /// Build a stage using the selector described by `settings.select`.
    pub fn new(settings: &ParserSettings) -> Self {
        Self::with_selector(settings, settings.field_selector())
    }

    /// Build a stage with an explicit selector, ignoring `settings.select`.
    pub fn with_selector(settings: &ParserSettings, selector: Option<Box<dyn FieldSelector>>) -> Self {
        let max_columns = settings.max_columns;
        Self {
            max_columns,
            configured_headers: settings.headers.clone(),
            selector,
            reorder_enabled: settings.reorder_columns,
            skip_empty_lines: settings.skip_empty_lines,
            header_extraction: settings.header_extraction,
            null_value: settings.null_value.clone(),
            staged: vec![None; max_columns].into_boxed_slice(),
            targets: vec![ColumnTarget::Capture; max_columns].into_boxed_slice(),
            column: 0,
            active: if max_columns > 0 { ColumnTarget::Capture } else { ColumnTarget::Discard },
            field_buf: String::new(),
            phase: RowPhase::Open,
            resolved: false,
            reordered: false,
            selected: None,
            headers: None,
            record_count: 0,
        }
    }

    /// Headers in effect: configured, or extracted from the first usable row.
    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    pub fn selected_indexes(&self) -> Option<&[usize]> {
        self.selected.as_deref()
    }

    /// True only when a selector produced indexes and reordering is enabled.
    pub fn is_reordering_enabled(&self) -> bool {
        self.reordered
    }

    pub fn current_column(&self) -> usize {
        self.column
    }

    /// Records emitted so far; suppressed header rows and skipped empty rows
    /// are not counted.
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn max_columns(&self) -> usize {
        self.max_columns
    }

    pub fn null_value(&self) -> Option<&str> {
        self.null_value.as_deref()
    }
}
