
use std::io::Write;

use sdg::{ContextPolicy, Error, InstrumentConfig};

fn write_config(text:&str) -> tempfile::NamedTempFile {
	let mut file = tempfile::NamedTempFile::new().unwrap();
	file.write_all(text.as_bytes()).unwrap();
	file.flush().unwrap();
	file
}

#[test]
fn partial_file_keeps_defaults() {
	let file = write_config(r#"{ "context_policy": "strict", "transport": { "query_delay_ms": 250 } }"#);
	let config = InstrumentConfig::from_json_file(file.path()).unwrap();
	assert_eq!(config.context_policy, ContextPolicy::Strict);
	assert_eq!(config.transport.query_delay_ms, 250);
	assert_eq!(config.transport.device_name, "inst0");
	assert_eq!(config.transport.write_termination, "\n");
}

#[test]
fn invalid_values_are_configuration_errors() {
	for text in &[
		r#"{ "transport": { "query_delay_ms": 0 } }"#,
		r#"{ "context_policy": "lenient" }"#,
		r#"{ "transport": { "baud": 9600 } }"#,
		"not json",
	] {
		let file = write_config(text);
		assert!(matches!(InstrumentConfig::from_json_file(file.path()), Err(Error::Configuration(_))), "{}", text);
	}
}

#[test]
fn missing_file_is_a_configuration_error() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("absent.json");
	assert!(matches!(InstrumentConfig::from_json_file(&path), Err(Error::Configuration(_))));
}
