
// Per-family capability tables and the range checks run against them before anything is sent

use serde::Serialize;

use crate::error::{Bound, Error, RangeError, Result};
use super::{Load, SweepKind, WaveformKind};
use super::family::ModelFamily;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadSupport {
	pub fixed: &'static [Load],
	// Inclusive range of resistive loads that can be dialed in
	pub variable_ohms: Option<(u32, u32)>,
}

impl LoadSupport {
	pub fn contains(&self, load:Load) -> bool {
		if self.fixed.contains(&load) { return true; }
		match (load, self.variable_ohms) {
			(Load::Ohms(r), Some((min, max))) => min <= r && r <= max,
			_ => false,
		}
	}

	pub fn is_empty(&self) -> bool { self.fixed.is_empty() && self.variable_ohms.is_none() }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityProfile {
	pub family: ModelFamily,
	pub frequency_range: (f64, f64),
	// Waveforms without an entry go up to frequency_range.1
	pub per_waveform_frequency_cap: &'static [(WaveformKind, f64)],
	pub amplitude_min: f64,
	pub amplitude_max_by_load: &'static [(Load, f64)],
	pub offset_max_by_load: &'static [(Load, f64)],
	pub supported_loads: LoadSupport,
	pub supported_waveforms: &'static [WaveformKind],
	pub supported_sweep_types: &'static [SweepKind],
	pub burst_cycle_range: (u32, u32),
	pub arb_max_points: usize,
	pub arb_bit_resolution: u8,
}

// SDG1000 data sheet DS02010-E08A
pub static SDG1000:CapabilityProfile = CapabilityProfile {
	family: ModelFamily::Sdg1000,
	frequency_range: (1e-6, 10e6),
	per_waveform_frequency_cap: &[
		(WaveformKind::Ramp, 200e3),
		(WaveformKind::Pulse, 5e6),
		(WaveformKind::Noise, 5e6),
		(WaveformKind::Arb, 5e6),
	],
	amplitude_min: 0.002,
	amplitude_max_by_load: &[(Load::FIFTY_OHM, 10.0), (Load::HighImpedance, 20.0)],
	offset_max_by_load: &[(Load::FIFTY_OHM, 5.0), (Load::HighImpedance, 10.0)],
	supported_loads: LoadSupport{ fixed: &[Load::FIFTY_OHM, Load::HighImpedance], variable_ohms: None },
	supported_waveforms: &[
		WaveformKind::Sine, WaveformKind::Square, WaveformKind::Ramp,
		WaveformKind::Pulse, WaveformKind::Noise, WaveformKind::Arb,
	],
	supported_sweep_types: &[SweepKind::Linear],
	burst_cycle_range: (1, 50_000),
	arb_max_points: 4096,
	arb_bit_resolution: 12,
};

pub static SDG2000X:CapabilityProfile = CapabilityProfile {
	family: ModelFamily::Sdg2000x,
	frequency_range: (1e-6, 40e6),
	per_waveform_frequency_cap: &[
		(WaveformKind::Ramp, 1e6),
		(WaveformKind::Pulse, 25e6),
		(WaveformKind::Arb, 20e6),
	],
	amplitude_min: 0.001,
	amplitude_max_by_load: &[(Load::FIFTY_OHM, 10.0), (Load::HighImpedance, 20.0)],
	offset_max_by_load: &[(Load::FIFTY_OHM, 5.0), (Load::HighImpedance, 10.0)],
	supported_loads: LoadSupport{ fixed: &[Load::HighImpedance], variable_ohms: Some((50, 100_000)) },
	supported_waveforms: &[
		WaveformKind::Sine, WaveformKind::Square, WaveformKind::Ramp,
		WaveformKind::Pulse, WaveformKind::Noise, WaveformKind::Arb, WaveformKind::Dc,
	],
	supported_sweep_types: &[SweepKind::Linear, SweepKind::Logarithmic],
	burst_cycle_range: (1, 65_535),
	arb_max_points: 16_384,
	arb_bit_resolution: 14,
};

// A missing profile means a family was detected that the factory should have refused
pub fn profile_for(family:ModelFamily) -> Result<&'static CapabilityProfile> {
	match family {
		ModelFamily::Sdg1000  => Ok(&SDG1000),
		ModelFamily::Sdg2000x => Ok(&SDG2000X),
		ModelFamily::Sdg6000x => Err(Error::Configuration(format!("no capability profile registered for {}", family))),
	}
}

fn lookup(table:&[(Load, f64)], load:Option<Load>) -> Option<f64> {
	let load = load?;
	table.iter().find(|(l, _)| *l == load).map(|(_, max)| *max)
}

fn strictest(table:&[(Load, f64)]) -> f64 {
	table.iter().map(|(_, max)| *max).fold(f64::INFINITY, f64::min)
}

impl CapabilityProfile {

	fn range_error<V: std::fmt::Display>(&self, parameter:impl Into<String>, value:V, bound:Bound) -> RangeError {
		RangeError::new(self.family, parameter, value, bound)
	}

	pub fn frequency_cap(&self, kind:WaveformKind) -> Option<f64> {
		self.per_waveform_frequency_cap.iter().find(|(k, _)| *k == kind).map(|(_, cap)| *cap)
	}

	// Loads without their own entry get the lowest ceiling in the table
	pub fn amplitude_max(&self, load:Option<Load>) -> f64 {
		lookup(self.amplitude_max_by_load, load).unwrap_or_else(|| strictest(self.amplitude_max_by_load))
	}

	pub fn offset_max(&self, load:Option<Load>) -> f64 {
		lookup(self.offset_max_by_load, load).unwrap_or_else(|| strictest(self.offset_max_by_load))
	}

	pub fn validate_frequency(&self, hz:f64, kind:Option<WaveformKind>) -> std::result::Result<(), RangeError> {
		let (min, max) = self.frequency_range;
		if !(min <= hz && hz <= max) {
			return Err(self.range_error("frequency", hz, Bound::Between(min, max)));
		}
		if let Some(kind) = kind {
			if let Some(cap) = self.frequency_cap(kind) {
				if hz > cap {
					return Err(self.range_error(format!("{} frequency", kind), hz, Bound::Max(cap)));
				}
			}
		}
		Ok(())
	}

	pub fn validate_amplitude(&self, vpp:f64, load:Option<Load>) -> std::result::Result<(), RangeError> {
		if !(vpp >= self.amplitude_min) {
			return Err(self.range_error("amplitude", vpp, Bound::Min(self.amplitude_min)));
		}
		let max = self.amplitude_max(load);
		if vpp > max {
			return Err(self.range_error("amplitude", vpp, Bound::Max(max)));
		}
		Ok(())
	}

	pub fn validate_load(&self, load:Load) -> std::result::Result<(), RangeError> {
		if self.supported_loads.contains(load) { Ok(()) }
		else { Err(self.range_error("load", load, Bound::OneOf)) }
	}

	pub fn validate_offset(&self, volts:f64, load:Option<Load>) -> std::result::Result<(), RangeError> {
		let max = self.offset_max(load);
		if !(volts.abs() <= max) {
			return Err(self.range_error("offset", volts, Bound::Magnitude(max)));
		}
		Ok(())
	}

	pub fn validate_waveform_kind(&self, kind:WaveformKind) -> std::result::Result<(), RangeError> {
		if self.supported_waveforms.contains(&kind) { Ok(()) }
		else { Err(self.range_error("waveform type", kind, Bound::OneOf)) }
	}

	pub fn validate_burst_cycles(&self, cycles:u32) -> std::result::Result<(), RangeError> {
		let (min, max) = self.burst_cycle_range;
		if min <= cycles && cycles <= max { Ok(()) }
		else { Err(self.range_error("burst cycles", cycles, Bound::Between(min as f64, max as f64))) }
	}

	pub fn validate_arb_points(&self, count:usize) -> std::result::Result<(), RangeError> {
		if count <= self.arb_max_points { Ok(()) }
		else { Err(self.range_error("arbitrary waveform points", count, Bound::Max(self.arb_max_points as f64))) }
	}

	pub fn validate_sweep_kind(&self, kind:SweepKind) -> std::result::Result<(), RangeError> {
		if self.supported_sweep_types.contains(&kind) { Ok(()) }
		else { Err(self.range_error("sweep type", kind, Bound::OneOf)) }
	}

	pub fn check_invariants(&self) -> std::result::Result<(), String> {
		let (fmin, fmax) = self.frequency_range;
		if !(fmin <= fmax) { return Err(format!("{}: frequency range inverted", self.family)); }
		let (bmin, bmax) = self.burst_cycle_range;
		if bmin > bmax { return Err(format!("{}: burst cycle range inverted", self.family)); }
		if let Some((rmin, rmax)) = self.supported_loads.variable_ohms {
			if rmin > rmax { return Err(format!("{}: variable load range inverted", self.family)); }
		}
		if self.supported_loads.is_empty() { return Err(format!("{}: no supported loads", self.family)); }
		if self.amplitude_max_by_load.is_empty() || self.offset_max_by_load.is_empty() {
			return Err(format!("{}: empty load limit table", self.family));
		}
		if self.amplitude_max_by_load.iter().any(|(_, max)| *max < self.amplitude_min) {
			return Err(format!("{}: amplitude ceiling below amplitude_min", self.family));
		}
		for (kind, _) in self.per_waveform_frequency_cap {
			if !self.supported_waveforms.contains(kind) {
				return Err(format!("{}: frequency cap for unsupported waveform {}", self.family, kind));
			}
		}
		Ok(())
	}

}
