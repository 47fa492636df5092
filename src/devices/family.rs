
// Model detection from the *IDN? reply

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFamily {
	// Narrow-band, 50 ohm or High-Z output only
	#[serde(rename = "SDG1000")]
	Sdg1000,
	// Wide-band, variable load
	#[serde(rename = "SDG2000X")]
	Sdg2000x,
	// Recognized so it can be reported, but there is no profile for it yet
	#[serde(rename = "SDG6000X")]
	Sdg6000x,
}

impl ModelFamily {

	// Detection priority order
	pub const ALL:[ModelFamily; 3] = [ModelFamily::Sdg1000, ModelFamily::Sdg2000x, ModelFamily::Sdg6000x];

	pub fn name(self) -> &'static str {
		match self {
			ModelFamily::Sdg1000  => "SDG1000",
			ModelFamily::Sdg2000x => "SDG2000X",
			ModelFamily::Sdg6000x => "SDG6000X",
		}
	}

	pub fn is_implemented(self) -> bool {
		match self {
			ModelFamily::Sdg1000 | ModelFamily::Sdg2000x => true,
			ModelFamily::Sdg6000x => false,
		}
	}

	pub fn ensure_implemented(self) -> Result<Self> {
		if self.is_implemented() { Ok(self) }
		else { Err(Error::UnsupportedModel(format!("{} not yet implemented", self))) }
	}

}

impl fmt::Display for ModelFamily {
	fn fmt(&self, f:&mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

// Accepts the family names used as model hints ("SDG1000", "sdg2000x", ...)
impl FromStr for ModelFamily {
	type Err = Error;

	fn from_str(s:&str) -> Result<Self> {
		ModelFamily::ALL.iter()
			.copied()
			.find(|family| family.name().eq_ignore_ascii_case(s.trim()))
			.ok_or_else(|| Error::UnsupportedModel(format!("Unknown model hint: {}", s)))
	}
}

pub const SDG1000_PATTERNS:&[&str] = &[
	r"SDG1\d{3}[A-Z]*",      // SDG1025, SDG1050
	r"SDG10\d{2}[A-Z]*",     // SDG1032
];

pub const SDG2000X_PATTERNS:&[&str] = &[
	r"SDG2\d{3}X[A-Z]*",     // SDG2042X, SDG2122X
	r"SDG20\d{2}X[A-Z]*",
];

pub const SDG6000X_PATTERNS:&[&str] = &[
	r"SDG6\d{3}X[A-Z]*",     // SDG6032X
	r"SDG60\d{2}X[A-Z]*",
];

pub fn patterns_for(family:ModelFamily) -> &'static [&'static str] {
	match family {
		ModelFamily::Sdg1000  => SDG1000_PATTERNS,
		ModelFamily::Sdg2000x => SDG2000X_PATTERNS,
		ModelFamily::Sdg6000x => SDG6000X_PATTERNS,
	}
}

pub fn supported_families() -> Vec<ModelFamily> {
	ModelFamily::ALL.iter().copied().filter(|f| f.is_implemented()).collect()
}

// Ordered list of families, each with its ordered, compiled patterns
pub struct PatternRegistry<F> {
	entries: Vec<(F, Vec<(&'static str, Regex)>)>,
}

impl<F: Copy> PatternRegistry<F> {

	pub fn new(families:&[(F, &[&'static str])]) -> Result<Self> {
		let mut entries = Vec::with_capacity(families.len());
		for (family, patterns) in families {
			let mut compiled = Vec::with_capacity(patterns.len());
			for pattern in patterns.iter() {
				let re = RegexBuilder::new(pattern)
					.case_insensitive(true)
					.build()
					.map_err(|e| Error::Configuration(format!("bad model pattern {}: {}", pattern, e)))?;
				compiled.push((*pattern, re));
			}
			entries.push((*family, compiled));
		}
		Ok(Self{ entries })
	}

	// First family, in registry order, with any pattern found in the designator
	pub fn classify(&self, designator:&str) -> Option<(F, &'static str)> {
		self.entries.iter()
			.find_map(|(family, patterns)| {
				patterns.iter()
					.find(|(_, re)| re.is_match(designator))
					.map(|(pattern, _)| (*family, *pattern))
			})
	}

}

lazy_static! {
	static ref REGISTRY:PatternRegistry<ModelFamily> = {
		let families:Vec<(ModelFamily, &[&'static str])> = ModelFamily::ALL.iter()
			.map(|f| (*f, patterns_for(*f)))
			.collect();
		PatternRegistry::new(&families).expect("built-in model patterns are valid regexes")
	};
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentificationRecord {
	pub manufacturer: String,
	pub model: String,
	pub serial_number: String,
	pub firmware_version: String,
}

impl IdentificationRecord {

	// Only manufacturer and model are required; the rest default to empty
	pub fn parse(idn_response:&str) -> Result<Self> {
		let idn_response = idn_response.trim();
		if idn_response.is_empty() {
			return Err(Error::UnsupportedModel("Empty or invalid *IDN? response".to_owned()));
		}

		let fields:Vec<&str> = idn_response.split(',').map(str::trim).collect();
		if fields.len() < 2 {
			return Err(Error::UnsupportedModel(format!("Invalid *IDN? format: {}", idn_response)));
		}

		let field = |i:usize| fields.get(i).map(|s| s.to_string()).unwrap_or_default();
		Ok(Self {
			manufacturer: field(0),
			model: field(1),
			serial_number: field(2),
			firmware_version: field(3),
		})
	}

}

pub fn detect_in<F: Copy>(registry:&PatternRegistry<F>, idn_response:&str) -> Result<F> {
	let record = IdentificationRecord::parse(idn_response)?;
	registry.classify(&record.model)
		.map(|(family, _)| family)
		.ok_or_else(|| Error::UnsupportedModel(format!("Unsupported model detected: {}", record.model)))
}

pub fn detect(idn_response:&str) -> Result<ModelFamily> {
	let family = detect_in(&REGISTRY, idn_response)?;
	log::info!("Detected {} from '{}'", family, idn_response.trim());
	Ok(family)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameCheck {
	pub is_supported: bool,
	pub family: Option<ModelFamily>,
	pub matched_pattern: Option<&'static str>,
}

// Offline classification of a bare model designator; never fails
pub fn validate_name(designator:&str) -> NameCheck {
	match REGISTRY.classify(designator.trim()) {
		Some((family, pattern)) => NameCheck{ is_supported: true, family: Some(family), matched_pattern: Some(pattern) },
		None => NameCheck{ is_supported: false, family: None, matched_pattern: None },
	}
}
