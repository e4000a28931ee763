// settings.rs: parser settings, JSON loading and the process-wide settings cache
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::RwLock;
use std::time::SystemTime;

use crate::error::SettingsError;
use crate::selector::{
    ExcludeFieldIndexes, ExcludeFieldNames, FieldIndexes, FieldNames, FieldSelector,
};

pub const DEFAULT_MAX_COLUMNS: usize = 512;

/// Which columns to keep, as written in the settings JSON:
/// `{"names": ["b", "a"]}`, `{"indexes": [1, 0]}`, `{"exclude_names": [..]}`
/// or `{"exclude_indexes": [..]}`.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectorSpec {
    Names(Vec<String>),
    Indexes(Vec<usize>),
    ExcludeNames(Vec<String>),
    ExcludeIndexes(Vec<usize>),
}

impl SelectorSpec {
    pub fn build(&self) -> Box<dyn FieldSelector> {
        match self {
            SelectorSpec::Names(n) => Box::new(FieldNames::new(n.iter().cloned())),
            SelectorSpec::Indexes(i) => Box::new(FieldIndexes::new(i.iter().copied())),
            SelectorSpec::ExcludeNames(n) => Box::new(ExcludeFieldNames::new(n.iter().cloned())),
            SelectorSpec::ExcludeIndexes(i) => {
                Box::new(ExcludeFieldIndexes::new(i.iter().copied()))
            }
        }
    }
}

/// Configuration read once per parse session.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ParserSettings {
    pub version: Option<u32>,
    /// Capacity of every column-indexed buffer in a session.
    pub max_columns: usize,
    /// Field names supplied up front instead of being read from the input.
    pub headers: Option<Vec<String>>,
    pub select: Option<SelectorSpec>,
    /// Emit selected columns in selection order instead of input order.
    pub reorder_columns: bool,
    pub skip_empty_lines: bool,
    /// Consume the first usable row as headers.
    pub header_extraction: bool,
    pub null_value: Option<String>,
    pub delimiter: char,
    pub quote: char,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            version: None,
            max_columns: DEFAULT_MAX_COLUMNS,
            headers: None,
            select: None,
            reorder_columns: true,
            skip_empty_lines: true,
            header_extraction: false,
            null_value: None,
            delimiter: ',',
            quote: '"',
        }
    }
}

impl ParserSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if let Some(v) = self.version {
            if v != 1 {
                return Err(SettingsError::UnsupportedVersion(v));
            }
        }
        if self.max_columns == 0 {
            return Err(SettingsError::Invalid("max_columns must be at least 1".to_string()));
        }
        if !self.delimiter.is_ascii() || !self.quote.is_ascii() {
            return Err(SettingsError::Invalid(format!(
                "delimiter {:?} and quote {:?} must be ASCII",
                self.delimiter, self.quote
            )));
        }
        if self.delimiter == self.quote {
            return Err(SettingsError::Invalid(format!(
                "delimiter and quote must differ (both {:?})",
                self.delimiter
            )));
        }
        Ok(())
    }

    pub fn field_selector(&self) -> Option<Box<dyn FieldSelector>> {
        self.select.as_ref().map(SelectorSpec::build)
    }
}

pub fn settings_from_json(json: &str) -> Result<ParserSettings, SettingsError> {
    let settings: ParserSettings = serde_json::from_str(json)?;
    settings.validate()?;
    Ok(settings)
}

pub struct LoadedSettings {
    pub path: String,
    pub mtime: Option<SystemTime>,
    pub settings: ParserSettings,
}

pub static SETTINGS_CACHE: Lazy<RwLock<Option<LoadedSettings>>> = Lazy::new(|| RwLock::new(None));

fn read_mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok().and_then(|m| m.modified().ok())
}

pub fn load_settings_internal(settings_path: &str) -> Result<LoadedSettings, SettingsError> {
    let data = fs::read_to_string(settings_path).map_err(|source| SettingsError::Read {
        path: settings_path.to_string(),
        source,
    })?;
    let settings = settings_from_json(&data)?;
    let mtime = read_mtime(Path::new(settings_path));
    Ok(LoadedSettings { path: settings_path.to_string(), mtime, settings })
}

/// Load `settings_path` into [`SETTINGS_CACHE`] unless the cached copy came
/// from the same path and the file has not been modified since.
pub fn ensure_settings_loaded(settings_path: &str) -> Result<(), SettingsError> {
    let mut guard = SETTINGS_CACHE.write().unwrap_or_else(|e| e.into_inner());
    let need_reload = match guard.as_ref() {
        None => true,
        Some(ls) => {
            if ls.path != settings_path {
                true
            } else {
                read_mtime(Path::new(settings_path)) != ls.mtime
            }
        }
    };
    if need_reload {
        let loaded = load_settings_internal(settings_path)?;
        tracing::debug!(path = settings_path, "settings (re)loaded");
        *guard = Some(loaded);
    }
    Ok(())
}
