// selector.rs: field selection by name or position
use std::collections::HashSet;

/// Picks the columns to keep, given one representative row (configured
/// headers or the first usable parsed row).
///
/// Returning `None` means selection does not apply and every column passes
/// through untouched. The order of the returned indexes is the order used
/// when column reordering is enabled.
pub trait FieldSelector: Send + Sync {
    fn select(&self, row: &[Option<String>]) -> Option<Vec<usize>>;

    /// Short human-readable form used in log events.
    fn describe(&self) -> String;
}

fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

fn normalized_row(row: &[Option<String>]) -> Vec<Option<String>> {
    row.iter().map(|v| v.as_deref().map(normalize_name)).collect()
}

/// Keep the named columns, in the order given.
pub struct FieldNames {
    names: Vec<String>,
}

impl FieldNames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { names: names.into_iter().map(Into::into).collect() }
    }
}

impl FieldSelector for FieldNames {
    fn select(&self, row: &[Option<String>]) -> Option<Vec<usize>> {
        let headers = normalized_row(row);
        let mut out = Vec::with_capacity(self.names.len());
        for name in &self.names {
            let wanted = normalize_name(name);
            match headers.iter().position(|h| h.as_deref() == Some(wanted.as_str())) {
                Some(idx) => out.push(idx),
                None => tracing::warn!(field = %name, "selected field not found in headers; ignoring"),
            }
        }
        Some(out)
    }

    fn describe(&self) -> String {
        format!("names {:?}", self.names)
    }
}

/// Keep the columns at the given positions, in the order given.
pub struct FieldIndexes {
    indexes: Vec<usize>,
}

impl FieldIndexes {
    pub fn new<I: IntoIterator<Item = usize>>(indexes: I) -> Self {
        Self { indexes: indexes.into_iter().collect() }
    }
}

impl FieldSelector for FieldIndexes {
    fn select(&self, _row: &[Option<String>]) -> Option<Vec<usize>> {
        Some(self.indexes.clone())
    }

    fn describe(&self) -> String {
        format!("indexes {:?}", self.indexes)
    }
}

/// Keep every column except the named ones.
pub struct ExcludeFieldNames {
    names: HashSet<String>,
}

impl ExcludeFieldNames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| {
                    let n: String = n.into();
                    normalize_name(&n)
                })
                .collect(),
        }
    }
}

impl FieldSelector for ExcludeFieldNames {
    fn select(&self, row: &[Option<String>]) -> Option<Vec<usize>> {
        let headers = normalized_row(row);
        let kept = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.as_ref().map_or(true, |h| !self.names.contains(h)))
            .map(|(i, _)| i)
            .collect();
        Some(kept)
    }

    fn describe(&self) -> String {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        format!("all except names {:?}", names)
    }
}

/// Keep every column except the ones at the given positions.
pub struct ExcludeFieldIndexes {
    indexes: HashSet<usize>,
}

impl ExcludeFieldIndexes {
    pub fn new<I: IntoIterator<Item = usize>>(indexes: I) -> Self {
        Self { indexes: indexes.into_iter().collect() }
    }
}

impl FieldSelector for ExcludeFieldIndexes {
    fn select(&self, row: &[Option<String>]) -> Option<Vec<usize>> {
        Some((0..row.len()).filter(|i| !self.indexes.contains(i)).collect())
    }

    fn describe(&self) -> String {
        let mut idx: Vec<usize> = self.indexes.iter().copied().collect();
        idx.sort_unstable();
        format!("all except indexes {:?}", idx)
    }
}
