// staging/resolver.rs: one-time header, selection and reorder resolution
use super::{ColumnTarget, RecordStage};

impl RecordStage {
    /// Resolve headers, selected columns, reordering and column targets.
    ///
    /// Configured headers take precedence over `parsed_row`. Without them a
    /// non-empty `parsed_row` is used, and becomes the headers when header
    /// extraction is on. With neither, nothing is resolved and the next row
    /// gets another chance. Once resolved the state never changes again.
    ///
    /// Returns whether this call performed the resolution.
    pub fn resolve(&mut self, parsed_row: &[Option<String>]) -> bool {
        if self.resolved {
            return false;
        }
        if let Some(configured) = self.configured_headers.clone() {
            let row: Vec<Option<String>> = configured.iter().cloned().map(Some).collect();
            self.headers = Some(configured);
            self.apply_selection(&row);
        } else if !parsed_row.is_empty() {
            self.apply_selection(parsed_row);
            if self.header_extraction {
                self.headers = Some(parsed_row.iter().map(|v| v.clone().unwrap_or_default()).collect());
            }
        } else {
            return false;
        }
        self.resolved = true;
        self.active = self.target_at(self.column);
        tracing::debug!(
            headers = ?self.headers,
            selector = ?self.selector.as_ref().map(|s| s.describe()),
            selected = ?self.selected,
            reordered = self.reordered,
            "column selection resolved"
        );
        true
    }

    fn apply_selection(&mut self, row: &[Option<String>]) {
        self.reordered = false;
        self.selected = None;
        let Some(selector) = self.selector.as_ref() else {
            return;
        };
        let Some(indexes) = selector.select(row) else {
            return;
        };

        self.targets.fill(ColumnTarget::Discard);
        for &idx in &indexes {
            // indexes past max_columns can never be staged; they read as null
            if let Some(target) = self.targets.get_mut(idx) {
                *target = ColumnTarget::Capture;
            }
        }
        self.reordered = self.reorder_enabled;
        // rows may be wider than the one the selector saw; in input order
        // those trailing columns are still emitted
        if !self.reordered && row.len() < self.targets.len() {
            self.targets[row.len()..].fill(ColumnTarget::Capture);
        }
        self.selected = Some(indexes);
    }
}
