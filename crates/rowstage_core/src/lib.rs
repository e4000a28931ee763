// rowstage_core: record staging, column selection and row assembly for delimited text parsing.
pub mod error;
pub mod parser;
pub mod selector;
pub mod settings;
pub mod staging;
pub mod tokenizer;

pub use error::{ParseError, SettingsError, StageError};
pub use parser::{record_to_map, split_line, RecordParser};
pub use selector::{ExcludeFieldIndexes, ExcludeFieldNames, FieldIndexes, FieldNames, FieldSelector};
pub use settings::{
    ensure_settings_loaded, load_settings_internal, settings_from_json, LoadedSettings, ParserSettings,
    SelectorSpec, SETTINGS_CACHE,
};
pub use staging::{ColumnTarget, Record, RecordStage, RowOutcome};
pub use tokenizer::Tokenizer;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_to_end_from_json_settings() {
        let settings = settings_from_json(
            r#"{
              "version": 1,
              "max_columns": 8,
              "header_extraction": true,
              "select": { "exclude_names": ["secret"] },
              "reorder_columns": false
            }"#,
        )
        .expect("settings");
        let mut parser = RecordParser::new(&settings).expect("parser");
        let records = parser
            .parse_str("user,secret,host\nalice,hunter2,db1\nbob,,db2,extra\n")
            .expect("parse");
        assert_eq!(
            records,
            vec![
                vec![Some("alice".to_string()), None, Some("db1".to_string())],
                vec![Some("bob".to_string()), None, Some("db2".to_string()), Some("extra".to_string())],
            ]
        );
        let headers = parser.output_headers().expect("headers");
        let map = record_to_map(&headers, &records[0]);
        assert_eq!(map.get("user").unwrap().as_deref(), Some("alice"));
        assert_eq!(map.get("secret").unwrap(), &None);
    }
}
