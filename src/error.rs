
// Errors for everything from the RPC layer up to the instrument facade.  Transport failures keep the original
// io::Error so callers can still match on ErrorKind::TimedOut and friends.

use std::fmt;
use std::io;

use serde::Serialize;

use crate::devices::family::ModelFamily;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unsupported model: {0}")]
	UnsupportedModel(String),

	#[error(transparent)]
	Range(#[from] RangeError),

	#[error("unable to decode response: {0}")]
	Decode(String),

	#[error("transport error: {0}")]
	Transport(#[from] io::Error),

	#[error("RPC error: {0}")]
	Rpc(String),

	#[error("configuration error: {0}")]
	Configuration(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
	pub fn decode<S: Into<String>>(msg:S) -> Self { Error::Decode(msg.into()) }
	pub fn rpc<S: Into<String>>(msg:S) -> Self { Error::Rpc(msg.into()) }
}

// The limit that a rejected value ran into
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Bound {
	Min(f64),
	Max(f64),
	Between(f64, f64),
	Magnitude(f64),
	OneOf,
	Finite,
}

impl fmt::Display for Bound {
	fn fmt(&self, f:&mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Bound::Min(min)          => write!(f, ">= {}", min),
			Bound::Max(max)          => write!(f, "<= {}", max),
			Bound::Between(min, max) => write!(f, "in [{}, {}]", min, max),
			Bound::Magnitude(max)    => write!(f, "within +/-{}", max),
			Bound::OneOf             => write!(f, "one of the supported values"),
			Bound::Finite            => write!(f, "a finite number"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{parameter} {value} is out of range for {family}: must be {bound}")]
pub struct RangeError {
	pub family: ModelFamily,
	pub parameter: String,
	pub value: String,
	pub bound: Bound,
}

impl RangeError {
	pub fn new<P: Into<String>, V: fmt::Display>(family:ModelFamily, parameter:P, value:V, bound:Bound) -> Self {
		Self{ family, parameter: parameter.into(), value: value.to_string(), bound }
	}
}
