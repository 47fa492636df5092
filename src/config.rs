
// Connection and instrument settings.  Everything has a default that works with a stock SDG on the LAN, so a
// config file only has to name what it wants to change.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};

pub const DEFAULT_QUERY_DELAY_MS:u64 = 100;
pub const DEFAULT_IO_TIMEOUT_MS:u64   = 5000;
pub const DEFAULT_LOCK_TIMEOUT_MS:u64 = 10000;
pub const DEFAULT_DEVICE_NAME:&str    = "inst0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
	pub write_termination: String,
	pub read_termination: String,
	// Pause between sending a query and reading its reply; the SDG firmware drops replies that are asked for
	// too quickly
	pub query_delay_ms: u64,
	pub io_timeout_ms: u64,
	pub lock_timeout_ms: u64,
	pub device_name: String,
}

impl Default for TransportConfig {
	fn default() -> Self {
		Self {
			write_termination: "\n".to_owned(),
			read_termination: "\n".to_owned(),
			query_delay_ms: DEFAULT_QUERY_DELAY_MS,
			io_timeout_ms: DEFAULT_IO_TIMEOUT_MS,
			lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
			device_name: DEFAULT_DEVICE_NAME.to_owned(),
		}
	}
}

impl TransportConfig {
	pub fn query_delay(&self) -> Duration { Duration::from_millis(self.query_delay_ms) }
	pub fn io_timeout(&self) -> Duration { Duration::from_millis(self.io_timeout_ms) }

	pub fn validate(&self) -> Result<()> {
		if self.query_delay_ms == 0 {
			return Err(Error::Configuration("query_delay_ms must be non-zero".to_owned()));
		}
		if self.io_timeout_ms == 0 {
			return Err(Error::Configuration("io_timeout_ms must be non-zero".to_owned()));
		}
		if self.io_timeout_ms > u32::MAX as u64 || self.lock_timeout_ms > u32::MAX as u64 {
			return Err(Error::Configuration("timeouts must fit in 32 bits of milliseconds".to_owned()));
		}
		if self.device_name.is_empty() || !self.device_name.is_ascii() {
			return Err(Error::Configuration(format!("invalid VXI-11 device name '{}'", self.device_name)));
		}
		Ok(())
	}
}

// What a setter does when it can't read the channel state it needs for validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextPolicy {
	// Validate with the waveform cap left out and the strictest load limits, then write
	BestEffort,
	// Fail the call with the lookup error
	Strict,
}

impl Default for ContextPolicy {
	fn default() -> Self { ContextPolicy::BestEffort }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstrumentConfig {
	pub transport: TransportConfig,
	pub context_policy: ContextPolicy,
}

impl InstrumentConfig {

	pub fn from_json_str(s:&str) -> Result<Self> {
		let config:Self = serde_json::from_str(s)
			.map_err(|e| Error::Configuration(format!("invalid instrument config: {}", e)))?;
		config.transport.validate()?;
		Ok(config)
	}

	pub fn from_json_file<P: AsRef<Path>>(path:P) -> Result<Self> {
		let path = path.as_ref();
		let text = fs::read_to_string(path)
			.map_err(|e| Error::Configuration(format!("unable to read {}: {}", path.display(), e)))?;
		log::debug!("Loaded instrument config from {}", path.display());
		Self::from_json_str(&text)
	}

}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_object_gives_defaults() {
		let config = InstrumentConfig::from_json_str("{}").unwrap();
		assert_eq!(config, InstrumentConfig::default());
		assert_eq!(config.transport.query_delay(), Duration::from_millis(100));
		assert_eq!(config.context_policy, ContextPolicy::BestEffort);
	}

	#[test]
	fn partial_override() {
		let config = InstrumentConfig::from_json_str(r#"{
			"transport": { "query_delay_ms": 250, "device_name": "inst1" },
			"context_policy": "strict"
		}"#).unwrap();
		assert_eq!(config.transport.query_delay_ms, 250);
		assert_eq!(config.transport.device_name, "inst1");
		assert_eq!(config.transport.write_termination, "\n");
		assert_eq!(config.context_policy, ContextPolicy::Strict);
	}

	#[test]
	fn zero_query_delay_is_rejected() {
		let e = InstrumentConfig::from_json_str(r#"{ "transport": { "query_delay_ms": 0 } }"#).unwrap_err();
		assert!(matches!(e, Error::Configuration(_)));
	}

	#[test]
	fn unknown_keys_are_rejected() {
		assert!(InstrumentConfig::from_json_str(r#"{ "transprot": {} }"#).is_err());
	}
}
