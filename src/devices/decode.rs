
// Query replies look like "C1:BSWV WVTP,SINE,FRQ,1000HZ,AMP,2V,...": a header, then comma separated key/value
// pairs.  Each reply type has a table saying which keys it cares about, whether the value is text or a number
// with a unit suffix, and where it goes.  Keys not in the table are skipped so newer firmware doesn't break us.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Error, Result};
use super::{Load, ModulationKind, Polarity, SweepKind, TriggerSource, WaveformKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field {
	Text,
	// Numeric value; the unit suffix is stripped (case-insensitively) when present
	Number(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
	Text(&'a str),
	Number(f64),
}

impl<'a> Value<'a> {
	pub fn text(self) -> Option<&'a str> {
		match self { Value::Text(s) => Some(s), Value::Number(_) => None }
	}
	pub fn number(self) -> Option<f64> {
		match self { Value::Number(x) => Some(x), Value::Text(_) => None }
	}
}

pub struct FieldSpec<T> {
	pub key: &'static str,
	pub field: Field,
	pub apply: fn(&mut T, Value<'_>),
}

// A reply split at its header, with an optional bare value right after the header ("C1:OUTP ON,LOAD,...")
#[derive(Debug, Clone, PartialEq)]
pub struct Body<'a> {
	pub lead: Option<&'a str>,
	pub tokens: Vec<&'a str>,
}

impl<'a> Body<'a> {
	pub fn pairs(&self) -> Result<Vec<(&'a str, &'a str)>> {
		if self.tokens.len() % 2 != 0 {
			return Err(Error::decode(format!("odd number of key/value tokens: {}", self.tokens.join(","))));
		}
		Ok(self.tokens.chunks(2).map(|kv| (kv[0], kv[1])).collect())
	}
}

// Burst, sweep and modulation replies append the carrier's parameters after a bare CARR token
pub const CARRIER_MARKER:&str = "CARR";

pub fn split_response<'a>(response:&'a str, header:&str, leading_value:bool, stop_at:Option<&str>) -> Result<Body<'a>> {
	let response = response.trim();
	let (head, rest) = match response.find(char::is_whitespace) {
		Some(i) => (&response[..i], response[i..].trim_start()),
		None    => (response, ""),
	};
	if !head.eq_ignore_ascii_case(header) {
		return Err(Error::decode(format!("expected '{}' header in '{}'", header, response)));
	}

	let mut tokens:Vec<&str> = if rest.is_empty() { vec![] } else { rest.split(',').map(str::trim).collect() };
	if let Some(marker) = stop_at {
		if let Some(i) = tokens.iter().position(|t| t.eq_ignore_ascii_case(marker)) {
			tokens.truncate(i);
		}
	}

	let lead = if leading_value {
		if tokens.is_empty() {
			return Err(Error::decode(format!("missing value after '{}'", header)));
		}
		Some(tokens.remove(0))
	} else {
		None
	};
	Ok(Body{ lead, tokens })
}

pub fn strip_unit<'a>(raw:&'a str, unit:&str) -> &'a str {
	let n = raw.len();
	if unit.is_empty() || n < unit.len() { return raw; }
	match (raw.get(..n - unit.len()), raw.get(n - unit.len()..)) {
		(Some(number), Some(suffix)) if suffix.eq_ignore_ascii_case(unit) => number,
		_ => raw,
	}
}

pub fn parse_number(key:&str, raw:&str, unit:&str) -> Result<f64> {
	strip_unit(raw, unit).trim().parse::<f64>()
		.map_err(|_| Error::decode(format!("{} value '{}' is not a number", key, raw)))
}

pub fn apply_fields<T>(target:&mut T, pairs:&[(&str, &str)], table:&[FieldSpec<T>]) -> Result<()> {
	for &(key, raw) in pairs {
		if let Some(spec) = table.iter().find(|spec| spec.key.eq_ignore_ascii_case(key)) {
			let value = match spec.field {
				Field::Text         => Value::Text(raw),
				Field::Number(unit) => Value::Number(parse_number(key, raw, unit)?),
			};
			(spec.apply)(&mut *target, value);
		}
	}
	Ok(())
}

pub fn raw_map(pairs:&[(&str, &str)]) -> BTreeMap<String, String> {
	pairs.iter().map(|(k, v)| (k.to_ascii_lowercase(), v.to_string())).collect()
}

fn on_off(raw:&str) -> Result<bool> {
	match raw.trim() {
		s if s.eq_ignore_ascii_case("ON")  => Ok(true),
		s if s.eq_ignore_ascii_case("OFF") => Ok(false),
		s => Err(Error::decode(format!("expected ON or OFF, got '{}'", s))),
	}
}

// Output

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputState {
	pub enabled: bool,
	pub load: Option<Load>,
	pub polarity: Option<Polarity>,
	pub power_on_state: Option<f64>,
}

const OUTPUT_FIELDS:&[FieldSpec<OutputState>] = &[
	FieldSpec{ key: "LOAD", field: Field::Text, apply: |s, v| s.load = v.text().and_then(|t| t.parse().ok()) },
	FieldSpec{ key: "PLRT", field: Field::Text, apply: |s, v| s.polarity = v.text().and_then(|t| t.parse().ok()) },
	FieldSpec{ key: "POWERON_STATE", field: Field::Number(""), apply: |s, v| s.power_on_state = v.number() },
];

pub fn decode_output_state(response:&str, header:&str) -> Result<OutputState> {
	let body = split_response(response, header, true, None)?;
	let mut state = OutputState::default();
	state.enabled = on_off(body.lead.unwrap_or_default())?;
	apply_fields(&mut state, &body.pairs()?, OUTPUT_FIELDS)?;
	Ok(state)
}

// Basic wave

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WaveInfo {
	pub kind: Option<WaveformKind>,
	pub frequency: Option<f64>,
	pub period: Option<f64>,
	pub amplitude: Option<f64>,
	pub amplitude_vrms: Option<f64>,
	pub amplitude_dbm: Option<f64>,
	pub max_output_amplitude: Option<f64>,
	pub offset: Option<f64>,
	pub high_level: Option<f64>,
	pub low_level: Option<f64>,
	pub phase: Option<f64>,
	pub duty: Option<f64>,
	pub band_state: Option<String>,
	pub symmetry: Option<f64>,
	pub width: Option<f64>,
	pub rise: Option<f64>,
	pub fall: Option<f64>,
	pub delay: Option<f64>,
	pub stdev: Option<f64>,
	pub mean: Option<f64>,
}

const WAVE_FIELDS:&[FieldSpec<WaveInfo>] = &[
	FieldSpec{ key: "WVTP", field: Field::Text, apply: |w, v| w.kind = v.text().and_then(|t| t.parse().ok()) },
	FieldSpec{ key: "FRQ", field: Field::Number("HZ"), apply: |w, v| w.frequency = v.number() },
	FieldSpec{ key: "PERI", field: Field::Number("S"), apply: |w, v| w.period = v.number() },
	FieldSpec{ key: "AMP", field: Field::Number("V"), apply: |w, v| w.amplitude = v.number() },
	FieldSpec{ key: "AMPVRMS", field: Field::Number("Vrms"), apply: |w, v| w.amplitude_vrms = v.number() },
	FieldSpec{ key: "AMPDBM", field: Field::Number("dBm"), apply: |w, v| w.amplitude_dbm = v.number() },
	FieldSpec{ key: "MAX_OUTPUT_AMP", field: Field::Number("V"), apply: |w, v| w.max_output_amplitude = v.number() },
	FieldSpec{ key: "OFST", field: Field::Number("V"), apply: |w, v| w.offset = v.number() },
	FieldSpec{ key: "HLEV", field: Field::Number("V"), apply: |w, v| w.high_level = v.number() },
	FieldSpec{ key: "LLEV", field: Field::Number("V"), apply: |w, v| w.low_level = v.number() },
	FieldSpec{ key: "PHSE", field: Field::Number(""), apply: |w, v| w.phase = v.number() },
	FieldSpec{ key: "DUTY", field: Field::Number(""), apply: |w, v| w.duty = v.number() },
	FieldSpec{ key: "BANDSTATE", field: Field::Text, apply: |w, v| w.band_state = v.text().map(str::to_owned) },
	FieldSpec{ key: "SYM", field: Field::Number(""), apply: |w, v| w.symmetry = v.number() },
	FieldSpec{ key: "WIDTH", field: Field::Number("S"), apply: |w, v| w.width = v.number() },
	FieldSpec{ key: "RISE", field: Field::Number("S"), apply: |w, v| w.rise = v.number() },
	FieldSpec{ key: "FALL", field: Field::Number("S"), apply: |w, v| w.fall = v.number() },
	FieldSpec{ key: "DLY", field: Field::Number("S"), apply: |w, v| w.delay = v.number() },
	FieldSpec{ key: "STDEV", field: Field::Number("V"), apply: |w, v| w.stdev = v.number() },
	FieldSpec{ key: "MEAN", field: Field::Number("V"), apply: |w, v| w.mean = v.number() },
];

pub fn decode_wave_info(response:&str, header:&str) -> Result<WaveInfo> {
	let body = split_response(response, header, false, None)?;
	let mut info = WaveInfo::default();
	apply_fields(&mut info, &body.pairs()?, WAVE_FIELDS)?;
	Ok(info)
}

// Arbitrary wave selection

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArbWaveform {
	pub index: Option<u32>,
	pub name: Option<String>,
}

const ARB_FIELDS:&[FieldSpec<ArbWaveform>] = &[
	FieldSpec{ key: "INDEX", field: Field::Number(""), apply: |a, v| a.index = v.number().filter(|n| *n >= 0.0).map(|n| n as u32) },
	FieldSpec{ key: "NAME", field: Field::Text, apply: |a, v| a.name = v.text().map(str::to_owned) },
];

pub fn decode_arb_waveform(response:&str, header:&str) -> Result<ArbWaveform> {
	let body = split_response(response, header, false, None)?;
	let mut arb = ArbWaveform::default();
	apply_fields(&mut arb, &body.pairs()?, ARB_FIELDS)?;
	Ok(arb)
}

// Store list, "STL M1,SINE,M2,NOISE,...".  Keys that aren't memory slots are skipped.
pub fn decode_store_list(response:&str) -> Result<BTreeMap<u32, String>> {
	let body = split_response(response, "STL", false, None)?;
	let mut slots = BTreeMap::new();
	for (key, name) in body.pairs()? {
		let slot = key.strip_prefix('M').or_else(|| key.strip_prefix('m'));
		if let Some(Ok(n)) = slot.map(str::parse::<u32>) {
			slots.insert(n, name.to_owned());
		}
	}
	Ok(slots)
}

// Burst

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BurstState {
	pub enabled: bool,
	pub period: Option<f64>,
	pub start_phase: Option<f64>,
	pub mode: Option<String>,
	pub cycles: Option<u32>,
	pub trigger_source: Option<TriggerSource>,
	pub delay: Option<f64>,
	pub raw: BTreeMap<String, String>,
}

const BURST_FIELDS:&[FieldSpec<BurstState>] = &[
	FieldSpec{ key: "STATE", field: Field::Text, apply: |b, v| b.enabled = v.text().map_or(false, |t| t.eq_ignore_ascii_case("ON")) },
	FieldSpec{ key: "PRD", field: Field::Number("S"), apply: |b, v| b.period = v.number() },
	FieldSpec{ key: "STPS", field: Field::Number(""), apply: |b, v| b.start_phase = v.number() },
	FieldSpec{ key: "GATE_NCYC", field: Field::Text, apply: |b, v| b.mode = v.text().map(str::to_owned) },
	// "INF" for infinite bursts, which leaves cycles unset
	FieldSpec{ key: "TIME", field: Field::Text, apply: |b, v| b.cycles = v.text().and_then(|t| t.parse().ok()) },
	FieldSpec{ key: "TRSR", field: Field::Text, apply: |b, v| b.trigger_source = v.text().and_then(|t| t.parse().ok()) },
	FieldSpec{ key: "DLAY", field: Field::Number("S"), apply: |b, v| b.delay = v.number() },
];

pub fn decode_burst(response:&str, header:&str) -> Result<BurstState> {
	let body = split_response(response, header, false, Some(CARRIER_MARKER))?;
	let pairs = body.pairs()?;
	let mut burst = BurstState::default();
	apply_fields(&mut burst, &pairs, BURST_FIELDS)?;
	burst.raw = raw_map(&pairs);
	Ok(burst)
}

// Sweep

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepState {
	pub enabled: bool,
	pub time: Option<f64>,
	pub start: Option<f64>,
	pub stop: Option<f64>,
	pub kind: Option<SweepKind>,
	pub trigger_source: Option<TriggerSource>,
	pub raw: BTreeMap<String, String>,
}

const SWEEP_FIELDS:&[FieldSpec<SweepState>] = &[
	FieldSpec{ key: "STATE", field: Field::Text, apply: |s, v| s.enabled = v.text().map_or(false, |t| t.eq_ignore_ascii_case("ON")) },
	FieldSpec{ key: "TIME", field: Field::Number("S"), apply: |s, v| s.time = v.number() },
	FieldSpec{ key: "START", field: Field::Number("HZ"), apply: |s, v| s.start = v.number() },
	FieldSpec{ key: "STOP", field: Field::Number("HZ"), apply: |s, v| s.stop = v.number() },
	FieldSpec{ key: "SWMD", field: Field::Text, apply: |s, v| s.kind = v.text().and_then(|t| t.parse().ok()) },
	FieldSpec{ key: "TRSR", field: Field::Text, apply: |s, v| s.trigger_source = v.text().and_then(|t| t.parse().ok()) },
];

pub fn decode_sweep(response:&str, header:&str) -> Result<SweepState> {
	let body = split_response(response, header, false, Some(CARRIER_MARKER))?;
	let pairs = body.pairs()?;
	let mut sweep = SweepState::default();
	apply_fields(&mut sweep, &pairs, SWEEP_FIELDS)?;
	sweep.raw = raw_map(&pairs);
	Ok(sweep)
}

// Modulation.  The modulation type shows up as a bare token among the pairs
// ("C1:MDWV STATE,ON,AM,MDSP,SINE,SRC,INT,FRQ,100HZ,DEPTH,100,CARR,...").

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModulationState {
	pub enabled: bool,
	pub kind: Option<ModulationKind>,
	pub source: Option<String>,
	pub frequency: Option<f64>,
	pub depth: Option<f64>,
	pub deviation: Option<f64>,
	pub raw: BTreeMap<String, String>,
}

const MODULATION_FIELDS:&[FieldSpec<ModulationState>] = &[
	FieldSpec{ key: "STATE", field: Field::Text, apply: |m, v| m.enabled = v.text().map_or(false, |t| t.eq_ignore_ascii_case("ON")) },
	FieldSpec{ key: "SRC", field: Field::Text, apply: |m, v| m.source = v.text().map(str::to_owned) },
	FieldSpec{ key: "FRQ", field: Field::Number("HZ"), apply: |m, v| m.frequency = v.number() },
	FieldSpec{ key: "KFRQ", field: Field::Number("HZ"), apply: |m, v| m.frequency = v.number() },
	FieldSpec{ key: "DEPTH", field: Field::Number(""), apply: |m, v| m.depth = v.number() },
	FieldSpec{ key: "DEVI", field: Field::Number("HZ"), apply: |m, v| m.deviation = v.number() },
];

pub fn decode_modulation(response:&str, header:&str) -> Result<ModulationState> {
	let body = split_response(response, header, false, Some(CARRIER_MARKER))?;

	let mut kind:Option<ModulationKind> = None;
	let mut tokens:Vec<&str> = Vec::with_capacity(body.tokens.len());
	let mut iter = body.tokens.iter();
	while let Some(token) = iter.next() {
		match token.parse::<ModulationKind>() {
			Ok(k) if kind.is_none() => kind = Some(k),
			_ => {
				tokens.push(*token);
				match iter.next() {
					Some(value) => tokens.push(*value),
					None => return Err(Error::decode(format!("key '{}' has no value", token))),
				}
			}
		}
	}

	let pairs = Body{ lead: None, tokens }.pairs()?;
	let mut modulation = ModulationState{ kind, ..ModulationState::default() };
	apply_fields(&mut modulation, &pairs, MODULATION_FIELDS)?;
	modulation.raw = raw_map(&pairs);
	Ok(modulation)
}

// *TST? answers 0 when every check passed
pub fn decode_self_test(response:&str) -> bool {
	response.trim() == "0"
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn wave_info_strips_units_and_skips_unknown_keys() {
		let info = decode_wave_info(
			"C1:BSWV WVTP,SINE,FRQ,1000HZ,PERI,0.001S,AMP,2V,AMPVRMS,0.707Vrms,AMPDBM,10dBm,OFST,0V,HLEV,1V,LLEV,-1V,PHSE,0,NEWKEY,42\n",
			"C1:BSWV").unwrap();
		assert_eq!(info.kind, Some(WaveformKind::Sine));
		assert_eq!(info.frequency, Some(1000.0));
		assert_eq!(info.period, Some(0.001));
		assert_eq!(info.amplitude, Some(2.0));
		assert_eq!(info.amplitude_vrms, Some(0.707));
		assert_eq!(info.amplitude_dbm, Some(10.0));
		assert_eq!(info.low_level, Some(-1.0));
		assert_eq!(info.phase, Some(0.0));
		assert_eq!(info.duty, None);
	}

	#[test]
	fn odd_token_count_is_a_decode_error() {
		assert!(matches!(decode_wave_info("C1:BSWV WVTP,SINE,FRQ", "C1:BSWV"), Err(Error::Decode(_))));
	}

	#[test]
	fn wrong_header_is_a_decode_error() {
		assert!(matches!(decode_wave_info("C2:BSWV WVTP,SINE", "C1:BSWV"), Err(Error::Decode(_))));
	}

	#[test]
	fn bad_number_is_a_decode_error() {
		assert!(matches!(decode_wave_info("C1:BSWV FRQ,fastHZ", "C1:BSWV"), Err(Error::Decode(_))));
	}

	#[test]
	fn output_state_with_leading_value() {
		let out = decode_output_state("C1:OUTP ON,LOAD,HZ,PLRT,INVT", "C1:OUTP").unwrap();
		assert!(out.enabled);
		assert_eq!(out.load, Some(Load::HighImpedance));
		assert_eq!(out.polarity, Some(Polarity::Inverted));

		let out = decode_output_state("C2:OUTP OFF,LOAD,50,PLRT,NOR,POWERON_STATE,0", "C2:OUTP").unwrap();
		assert!(!out.enabled);
		assert_eq!(out.load, Some(Load::FIFTY_OHM));
		assert_eq!(out.power_on_state, Some(0.0));

		assert!(decode_output_state("C1:OUTP", "C1:OUTP").is_err());
	}

	#[test]
	fn store_list_is_sorted_by_slot() {
		let slots = decode_store_list("STL M10,StairUp,M2,NOISE,M1,SINE,WVTP,USER").unwrap();
		assert_eq!(slots.into_iter().collect::<Vec<_>>(), vec![
			(1, "SINE".to_owned()), (2, "NOISE".to_owned()), (10, "StairUp".to_owned())]);
	}

	#[test]
	fn arb_waveform() {
		let arb = decode_arb_waveform("C1:ARWV INDEX,2,NAME,StairUp", "C1:ARWV").unwrap();
		assert_eq!(arb, ArbWaveform{ index: Some(2), name: Some("StairUp".to_owned()) });
	}

	#[test]
	fn burst_stops_at_carrier_section() {
		let burst = decode_burst(
			"C1:BTWV STATE,ON,PRD,0.01S,STPS,0,TRSR,INT,TRMD,OFF,DLAY,0S,GATE_NCYC,NCYC,TIME,5,CARR,WVTP,SINE,FRQ,1000HZ",
			"C1:BTWV").unwrap();
		assert!(burst.enabled);
		assert_eq!(burst.period, Some(0.01));
		assert_eq!(burst.cycles, Some(5));
		assert_eq!(burst.trigger_source, Some(TriggerSource::Internal));
		assert_eq!(burst.raw.get("trmd").map(String::as_str), Some("OFF"));
		assert!(!burst.raw.contains_key("wvtp"));
	}

	#[test]
	fn sweep() {
		let sweep = decode_sweep("C1:SWWV STATE,ON,TIME,1S,STOP,1500HZ,START,500HZ,TRSR,INT,SWMD,LOG,CARR,WVTP,SINE", "C1:SWWV").unwrap();
		assert!(sweep.enabled);
		assert_eq!(sweep.start, Some(500.0));
		assert_eq!(sweep.stop, Some(1500.0));
		assert_eq!(sweep.kind, Some(SweepKind::Logarithmic));
	}

	#[test]
	fn modulation_type_token_is_pulled_out() {
		let m = decode_modulation("C1:MDWV STATE,ON,AM,MDSP,SINE,SRC,INT,FRQ,100HZ,DEPTH,80,CARR,WVTP,SINE", "C1:MDWV").unwrap();
		assert!(m.enabled);
		assert_eq!(m.kind, Some(ModulationKind::Am));
		assert_eq!(m.frequency, Some(100.0));
		assert_eq!(m.depth, Some(80.0));
		assert_eq!(m.source.as_deref(), Some("INT"));

		let off = decode_modulation("C1:MDWV STATE,OFF", "C1:MDWV").unwrap();
		assert!(!off.enabled);
		assert_eq!(off.kind, None);
	}

	#[test]
	fn self_test_needs_exact_zero() {
		assert!(decode_self_test("0\n"));
		assert!(!decode_self_test("1"));
		assert!(!decode_self_test("0,no error"));
	}

	#[test]
	fn unit_suffix_is_optional() {
		assert_eq!(strip_unit("1000HZ", "HZ"), "1000");
		assert_eq!(strip_unit("1000hz", "HZ"), "1000");
		assert_eq!(strip_unit("1000", "HZ"), "1000");
		assert_eq!(parse_number("FRQ", "1e+06HZ", "HZ").unwrap(), 1e6);
	}
}
