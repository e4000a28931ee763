// PyO3 bindings for rowstage_core
use once_cell::sync::Lazy;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyModule};
use std::time::Instant;

use rowstage_core as core;

use rowstage_core::{ParserSettings, Record, RecordParser, RowOutcome, SETTINGS_CACHE};

// Parallel iterators for batch parsing
use rayon::prelude::*;

// Used whenever no settings were loaded.
static DEFAULT_SETTINGS: Lazy<ParserSettings> = Lazy::new(ParserSettings::default);

/// Everything a parse of one text produces, gathered without touching Python.
struct ParsedText {
    headers: Option<Vec<String>>,
    output_headers: Option<Vec<String>>,
    records: Vec<Record>,
    selected_indexes: Option<Vec<usize>>,
    reordered: bool,
    lines: usize,
    runtime_ns: u128,
}

fn parse_text_internal(text: &str, settings: &ParserSettings) -> Result<ParsedText, String> {
    let t0 = Instant::now();
    let mut parser = RecordParser::new(settings).map_err(|e| e.to_string())?;
    let records = parser.parse_str(text).map_err(|e| e.to_string())?;
    Ok(ParsedText {
        headers: parser.headers().map(<[String]>::to_vec),
        output_headers: parser.output_headers(),
        records,
        selected_indexes: parser.selected_indexes().map(<[usize]>::to_vec),
        reordered: parser.is_reordering_enabled(),
        lines: parser.line_count(),
        runtime_ns: t0.elapsed().as_nanos(),
    })
}

fn parsed_to_dict<'py>(py: Python<'py>, parsed: ParsedText) -> PyResult<Bound<'py, PyDict>> {
    let d = PyDict::new(py);
    d.set_item("record_count", parsed.records.len())?;
    d.set_item("records", parsed.records)?;
    d.set_item("headers", parsed.headers)?;
    d.set_item("output_headers", parsed.output_headers)?;
    d.set_item("selected_indexes", parsed.selected_indexes)?;
    d.set_item("reordered", parsed.reordered)?;
    d.set_item("lines", parsed.lines)?;
    d.set_item("runtime_ns", parsed.runtime_ns)?;
    Ok(d)
}

/// Run `f` against the cached settings, or the defaults when none are loaded.
fn with_settings<T>(f: impl FnOnce(&ParserSettings) -> T) -> T {
    let guard = SETTINGS_CACHE.read().unwrap_or_else(|e| e.into_inner());
    match guard.as_ref() {
        Some(loaded) => f(&loaded.settings),
        None => f(&DEFAULT_SETTINGS),
    }
}

/// Load parser settings from a JSON file path. Returns True on success.
/// Raises ValueError if the file cannot be read, parsed or validated.
#[pyfunction]
#[pyo3(text_signature = "(settings_path)")]
fn load_settings(settings_path: &str) -> PyResult<bool> {
    let loaded =
        core::load_settings_internal(settings_path).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let mut guard = SETTINGS_CACHE.write().unwrap_or_else(|e| e.into_inner());
    *guard = Some(loaded);
    Ok(true)
}

/// Set parser settings from a JSON string. Returns True on success.
#[pyfunction]
#[pyo3(text_signature = "(settings_json)")]
fn set_settings_json(settings_json: &str) -> PyResult<bool> {
    let settings =
        core::settings_from_json(settings_json).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let mut guard = SETTINGS_CACHE.write().unwrap_or_else(|e| e.into_inner());
    *guard = Some(core::LoadedSettings { path: "<json>".to_string(), mtime: None, settings });
    Ok(true)
}

/// Return the settings currently in effect and where they came from.
#[pyfunction]
#[pyo3(text_signature = "()")]
fn get_settings_status(py: Python) -> PyResult<Py<PyDict>> {
    use std::time::SystemTime;
    let guard = SETTINGS_CACHE.read().unwrap_or_else(|e| e.into_inner());
    let d = PyDict::new(py);
    let settings = match guard.as_ref() {
        Some(ls) => {
            d.set_item("loaded", true)?;
            d.set_item("path", ls.path.clone())?;
            let ms = ls
                .mtime
                .and_then(|mt| mt.duration_since(SystemTime::UNIX_EPOCH).ok())
                .map(|dur| (dur.as_secs() as i64) * 1000 + (dur.subsec_millis() as i64));
            d.set_item("mtime_epoch_ms", ms)?;
            &ls.settings
        }
        None => {
            d.set_item("loaded", false)?;
            d.set_item("path", py.None())?;
            d.set_item("mtime_epoch_ms", py.None())?;
            &*DEFAULT_SETTINGS
        }
    };
    d.set_item("max_columns", settings.max_columns)?;
    d.set_item("headers", settings.headers.clone())?;
    d.set_item("reorder_columns", settings.reorder_columns)?;
    d.set_item("skip_empty_lines", settings.skip_empty_lines)?;
    d.set_item("header_extraction", settings.header_extraction)?;
    d.set_item("null_value", settings.null_value.clone())?;
    d.set_item("delimiter", settings.delimiter.to_string())?;
    d.set_item("quote", settings.quote.to_string())?;
    Ok(d.unbind())
}

/// Parse a block of delimited text with the loaded settings.
/// Returns a dict with records, headers, selection details and timing.
#[pyfunction]
#[pyo3(text_signature = "(text)")]
fn parse_text(py: Python, text: &str) -> PyResult<Py<PyDict>> {
    let parsed = with_settings(|s| parse_text_internal(text, s)).map_err(PyValueError::new_err)?;
    Ok(parsed_to_dict(py, parsed)?.unbind())
}

/// Parse text using the settings at the given path (reloaded when the file changes).
#[pyfunction]
#[pyo3(text_signature = "(text, settings_path)")]
fn parse_text_with_settings(py: Python, text: &str, settings_path: &str) -> PyResult<Py<PyDict>> {
    core::ensure_settings_loaded(settings_path).map_err(|e| PyValueError::new_err(e.to_string()))?;
    parse_text(py, text)
}

/// Parse several independent texts in parallel, one parse session each.
/// Heavy parsing happens in Rayon workers; Python dicts are built afterwards.
#[pyfunction]
#[pyo3(text_signature = "(texts)")]
fn parse_batch(py: Python, texts: Vec<String>) -> PyResult<Vec<Py<PyDict>>> {
    let results: Vec<Result<ParsedText, String>> = with_settings(|settings| {
        texts.par_iter().map(|text| parse_text_internal(text, settings)).collect()
    });

    let mut out: Vec<Py<PyDict>> = Vec::with_capacity(results.len());
    for (i, r) in results.into_iter().enumerate() {
        let parsed = r.map_err(|e| PyValueError::new_err(format!("text {}: {}", i, e)))?;
        out.push(parsed_to_dict(py, parsed)?.unbind());
    }
    Ok(out)
}

/// Split one line (quote-aware, default settings) into a list of fields.
/// Empty fields come back as None.
#[pyfunction]
#[pyo3(text_signature = "(line)")]
fn split_line(line: &str) -> PyResult<Record> {
    core::split_line(line).map_err(|e| PyValueError::new_err(e.to_string()))
}

fn record_to_json(headers: Option<&[String]>, values: Record) -> serde_json::Value {
    let to_json = |v: Option<String>| v.map_or(serde_json::Value::Null, serde_json::Value::String);
    match headers {
        Some(names) => {
            let width = names.len().max(values.len());
            let mut obj = serde_json::Map::with_capacity(width);
            let mut values = values.into_iter();
            for i in 0..width {
                let key = names.get(i).cloned().unwrap_or_else(|| format!("column_{}", i));
                obj.insert(key, to_json(values.next().flatten()));
            }
            serde_json::Value::Object(obj)
        }
        None => serde_json::Value::Array(values.into_iter().map(to_json).collect()),
    }
}

/// Parse a file with the loaded settings and write one JSON value per
/// emitted record: an object keyed by header when headers are known, an
/// array otherwise. Rows over the column limit are skipped.
/// Returns the number of records written.
#[pyfunction]
#[pyo3(text_signature = "(input_path, output_path)")]
fn parse_file_to_ndjson(input_path: &str, output_path: &str) -> PyResult<usize> {
    use std::io::{BufRead, BufReader, BufWriter, Write};

    let mut parser = with_settings(RecordParser::new).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let infile = std::fs::File::open(input_path).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let outfile = std::fs::File::create(output_path).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let reader = BufReader::new(infile);
    let mut writer = BufWriter::new(outfile);

    let mut headers: Option<Vec<String>> = None;
    let mut count: usize = 0;
    for line_res in reader.lines() {
        let line = line_res.map_err(|e| PyValueError::new_err(e.to_string()))?;
        let values = match parser.parse_line(&line) {
            Ok(RowOutcome::Emit(values)) => values,
            Ok(_) => continue,
            Err(core::ParseError::Row { .. }) => continue, // skip malformed rows
            Err(e) => return Err(PyValueError::new_err(e.to_string())),
        };
        if headers.is_none() {
            headers = parser.output_headers();
        }
        let value = record_to_json(headers.as_deref(), values);
        serde_json::to_writer(&mut writer, &value).map_err(|e| PyValueError::new_err(e.to_string()))?;
        writer.write_all(b"\n").map_err(|e| PyValueError::new_err(e.to_string()))?;
        count += 1;
    }
    writer.flush().map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(count)
}

#[pymodule]
#[pyo3(module = "rowstage_rs")]
fn rowstage_rs(_py: Python, m: &Bound<PyModule>) -> PyResult<()> {
    m.add(
        "__doc__",
        "Streaming delimited-text parsing with column selection.\n\n\
        Features:\n\
        - Header extraction or configured headers\n\
        - Column selection by name or index, with optional reordering\n\
        - Fast Rust core with Python bindings\n\n\
        Quick start:\n\
        >>> import rowstage_rs as rs\n\
        >>> rs.set_settings_json('{\"header_extraction\": true, \"select\": {\"names\": [\"b\", \"a\"]}}')\n\
        >>> result = rs.parse_text('a,b,c\\n1,2,3')\n\
        >>> print(result['records'])",
    )?;

    // Settings
    m.add_function(wrap_pyfunction!(load_settings, m)?)?;
    m.add_function(wrap_pyfunction!(set_settings_json, m)?)?;
    m.add_function(wrap_pyfunction!(get_settings_status, m)?)?;

    // Parsing
    m.add_function(wrap_pyfunction!(parse_text, m)?)?;
    m.add_function(wrap_pyfunction!(parse_text_with_settings, m)?)?;
    m.add_function(wrap_pyfunction!(parse_batch, m)?)?;
    m.add_function(wrap_pyfunction!(parse_file_to_ndjson, m)?)?;
    m.add_function(wrap_pyfunction!(split_line, m)?)?;

    // Optional: preload settings from env var for a faster startup in hot paths.
    if let Ok(path) = std::env::var("ROWSTAGE_SETTINGS") {
        if let Ok(loaded) = core::load_settings_internal(&path) {
            let mut guard = SETTINGS_CACHE.write().unwrap_or_else(|e| e.into_inner());
            *guard = Some(loaded);
        }
    }

    Ok(())
}

