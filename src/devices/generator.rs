
// A function generator of any supported family.  Setters check their arguments against the family's
// CapabilityProfile before anything is written; a value the instrument can't produce never reaches it.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::config::ContextPolicy;
use crate::error::{Bound, Error, RangeError, Result};
use crate::transport::Transport;
use super::{Channel, Load, ModulationKind, Polarity, SweepKind, TriggerSource, WaveformKind};
use super::decode::{self, ArbWaveform, BurstState, ModulationState, OutputState, SweepState, WaveInfo};
use super::family::{IdentificationRecord, ModelFamily};
use super::profile::{self, CapabilityProfile};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstSettings {
	pub enabled: bool,
	// N-cycle burst when set, otherwise the instrument keeps its current mode
	pub cycles: Option<u32>,
	pub period: Option<f64>,
	pub trigger_source: Option<TriggerSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
	pub enabled: bool,
	pub start: Option<f64>,
	pub stop: Option<f64>,
	pub time: Option<f64>,
	pub kind: Option<SweepKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulationSettings {
	pub enabled: bool,
	// Frequency, depth and deviation are only sent along with a modulation type
	pub kind: Option<ModulationKind>,
	pub frequency: Option<f64>,
	pub depth: Option<f64>,
	pub deviation: Option<f64>,
}

pub struct FunctionGenerator<T: Transport> {
	transport: T,
	profile: &'static CapabilityProfile,
	policy: ContextPolicy,
}

impl<T: Transport> FunctionGenerator<T> {

	pub fn new(transport:T, family:ModelFamily, policy:ContextPolicy) -> Result<Self> {
		let family = family.ensure_implemented()?;
		let profile = profile::profile_for(family)?;
		Ok(Self{ transport, profile, policy })
	}

	pub fn family(&self) -> ModelFamily { self.profile.family }

	pub fn profile(&self) -> &'static CapabilityProfile { self.profile }

	pub fn policy(&self) -> ContextPolicy { self.policy }

	pub fn set_policy(&mut self, policy:ContextPolicy) { self.policy = policy; }

	pub fn close(mut self) -> Result<()> { self.transport.close() }

	fn send(&mut self, command:String) -> Result<()> {
		log::debug!("{} <- {}", self.profile.family, command);
		self.transport.write(&command)
	}

	fn ask(&mut self, command:&str) -> Result<String> {
		log::debug!("{} <- {}", self.profile.family, command);
		let response = self.transport.query(command)?;
		log::trace!("{} -> {}", self.profile.family, response);
		Ok(response)
	}

	// A failed context lookup either fails the call or drops the context, depending on the policy
	fn context<V>(&self, what:&str, channel:Channel, lookup:Result<V>) -> Result<Option<V>> {
		match (lookup, self.policy) {
			(Ok(v), _) => Ok(Some(v)),
			(Err(e), ContextPolicy::Strict) => Err(e),
			(Err(e), ContextPolicy::BestEffort) => {
				log::warn!("Unable to read {} {} ({}); validating without it", channel, what, e);
				Ok(None)
			},
		}
	}

	fn current_waveform_kind(&mut self, channel:Channel) -> Result<WaveformKind> {
		self.wave_info(channel)?
			.kind
			.ok_or_else(|| Error::decode(format!("{}:BSWV? reply has no waveform type", channel)))
	}

	fn current_load(&mut self, channel:Channel) -> Result<Load> {
		self.output_state(channel)?
			.load
			.ok_or_else(|| Error::decode(format!("{}:OUTP? reply has no load", channel)))
	}

	fn waveform_context(&mut self, channel:Channel, kind:Option<WaveformKind>) -> Result<Option<WaveformKind>> {
		match kind {
			Some(kind) => Ok(Some(kind)),
			None => {
				let lookup = self.current_waveform_kind(channel);
				self.context("waveform type", channel, lookup)
			},
		}
	}

	fn load_context(&mut self, channel:Channel, load:Option<Load>) -> Result<Option<Load>> {
		match load {
			Some(load) => Ok(Some(load)),
			None => {
				let lookup = self.current_load(channel);
				self.context("load", channel, lookup)
			},
		}
	}

	// Validation only

	pub fn validate_frequency(&self, hz:f64, kind:Option<WaveformKind>) -> Result<()> { Ok(self.profile.validate_frequency(hz, kind)?) }
	pub fn validate_amplitude(&self, vpp:f64, load:Option<Load>) -> Result<()> { Ok(self.profile.validate_amplitude(vpp, load)?) }
	pub fn validate_load(&self, load:Load) -> Result<()> { Ok(self.profile.validate_load(load)?) }
	pub fn validate_offset(&self, volts:f64, load:Option<Load>) -> Result<()> { Ok(self.profile.validate_offset(volts, load)?) }
	pub fn validate_waveform_kind(&self, kind:WaveformKind) -> Result<()> { Ok(self.profile.validate_waveform_kind(kind)?) }
	pub fn validate_burst_cycles(&self, cycles:u32) -> Result<()> { Ok(self.profile.validate_burst_cycles(cycles)?) }
	pub fn validate_arb_points(&self, count:usize) -> Result<()> { Ok(self.profile.validate_arb_points(count)?) }
	pub fn validate_sweep_kind(&self, kind:SweepKind) -> Result<()> { Ok(self.profile.validate_sweep_kind(kind)?) }

	// NaN and infinities would go out as "NaN" and "inf"
	fn ensure_finite(&self, parameter:&str, value:f64) -> Result<()> {
		if value.is_finite() { Ok(()) }
		else { Err(RangeError::new(self.family(), parameter, value, Bound::Finite).into()) }
	}

	// Basic wave

	fn set_basic(&mut self, channel:Channel, key:&str, value:f64) -> Result<()> {
		self.ensure_finite(key, value)?;
		self.send(format!("{}:BSWV {},{}", channel, key, value))
	}

	pub fn set_waveform(&mut self, channel:Channel, kind:WaveformKind) -> Result<()> {
		self.profile.validate_waveform_kind(kind)?;
		self.send(format!("{}:BSWV WVTP,{}", channel, kind))
	}

	// Without a waveform type the current one is read back so its frequency cap can be applied
	pub fn set_frequency(&mut self, channel:Channel, hz:f64, kind:Option<WaveformKind>) -> Result<()> {
		let kind = self.waveform_context(channel, kind)?;
		self.profile.validate_frequency(hz, kind)?;
		self.set_basic(channel, "FRQ", hz)
	}

	pub fn set_period(&mut self, channel:Channel, seconds:f64, kind:Option<WaveformKind>) -> Result<()> {
		if !(seconds > 0.0) {
			let (fmin, fmax) = self.profile.frequency_range;
			return Err(RangeError::new(self.family(), "period", seconds, Bound::Between(1.0 / fmax, 1.0 / fmin)).into());
		}
		let kind = self.waveform_context(channel, kind)?;
		self.profile.validate_frequency(1.0 / seconds, kind)?;
		self.set_basic(channel, "PERI", seconds)
	}

	pub fn set_amplitude(&mut self, channel:Channel, vpp:f64, load:Option<Load>) -> Result<()> {
		let load = self.load_context(channel, load)?;
		self.profile.validate_amplitude(vpp, load)?;
		self.set_basic(channel, "AMP", vpp)
	}

	pub fn set_offset(&mut self, channel:Channel, volts:f64, load:Option<Load>) -> Result<()> {
		let load = self.load_context(channel, load)?;
		self.profile.validate_offset(volts, load)?;
		self.set_basic(channel, "OFST", volts)
	}

	pub fn set_phase(&mut self, channel:Channel, degrees:f64) -> Result<()> { self.set_basic(channel, "PHSE", degrees) }
	pub fn set_symmetry(&mut self, channel:Channel, percent:f64) -> Result<()> { self.set_basic(channel, "SYM", percent) }
	pub fn set_duty(&mut self, channel:Channel, percent:f64) -> Result<()> { self.set_basic(channel, "DUTY", percent) }
	pub fn set_mean(&mut self, channel:Channel, volts:f64) -> Result<()> { self.set_basic(channel, "MEAN", volts) }
	pub fn set_stdev(&mut self, channel:Channel, volts:f64) -> Result<()> { self.set_basic(channel, "STDEV", volts) }
	pub fn set_width(&mut self, channel:Channel, seconds:f64) -> Result<()> { self.set_basic(channel, "WIDTH", seconds) }
	pub fn set_rise(&mut self, channel:Channel, seconds:f64) -> Result<()> { self.set_basic(channel, "RISE", seconds) }
	pub fn set_fall(&mut self, channel:Channel, seconds:f64) -> Result<()> { self.set_basic(channel, "FALL", seconds) }
	pub fn set_delay(&mut self, channel:Channel, seconds:f64) -> Result<()> { self.set_basic(channel, "DLY", seconds) }
	pub fn set_high_level(&mut self, channel:Channel, volts:f64) -> Result<()> { self.set_basic(channel, "HLEV", volts) }
	pub fn set_low_level(&mut self, channel:Channel, volts:f64) -> Result<()> { self.set_basic(channel, "LLEV", volts) }

	// Output

	pub fn set_output_state(&mut self, channel:Channel, on:bool) -> Result<()> {
		self.send(format!("{}:OUTP {}", channel, if on {"ON"} else {"OFF"}))
	}

	pub fn set_output_load(&mut self, channel:Channel, load:Load) -> Result<()> {
		self.profile.validate_load(load)?;
		self.send(format!("{}:OUTP LOAD,{}", channel, load))
	}

	pub fn set_output_polarity(&mut self, channel:Channel, polarity:Polarity) -> Result<()> {
		self.send(format!("{}:OUTP PLRT,{}", channel, polarity))
	}

	// Arbitrary waves

	pub fn set_arb_waveform_index(&mut self, channel:Channel, index:u32) -> Result<()> {
		self.send(format!("{}:ARWV INDEX,{}", channel, index))
	}

	pub fn select_arb_waveform(&mut self, channel:Channel, name:&str) -> Result<()> {
		check_waveform_name(name)?;
		self.send(format!("{}:ARWV NAME,{}", channel, name))
	}

	pub fn delete_arb_waveform(&mut self, name:&str) -> Result<()> {
		check_waveform_name(name)?;
		self.send(format!("WVDT DL,{}", name))
	}

	// Points go over as a comma separated ASCII list
	pub fn upload_arb_waveform(&mut self, channel:Channel, name:&str, points:&[f64], sample_rate:Option<f64>) -> Result<()> {
		check_waveform_name(name)?;
		if points.is_empty() {
			return Err(RangeError::new(self.family(), "arbitrary waveform points", 0, Bound::Between(1.0, self.profile.arb_max_points as f64)).into());
		}
		self.profile.validate_arb_points(points.len())?;
		for point in points {
			self.ensure_finite("arbitrary waveform point", *point)?;
		}
		if let Some(rate) = sample_rate {
			self.ensure_finite("sample rate", rate)?;
		}

		let data:Vec<String> = points.iter().map(|p| p.to_string()).collect();
		self.send(format!("{}:WVDT WVNM,{},{}", channel, name, data.join(",")))?;
		if let Some(rate) = sample_rate {
			self.send(format!("{}:WVDT WVNM,{},SMPL_RATE,{}", channel, name, rate))?;
		}
		Ok(())
	}

	// Burst, sweep and modulation.  The whole request is checked first; sub-parameters only go out when the
	// mode is being switched on.

	pub fn set_burst(&mut self, channel:Channel, settings:&BurstSettings) -> Result<()> {
		if let Some(cycles) = settings.cycles {
			self.profile.validate_burst_cycles(cycles)?;
		}
		if let Some(period) = settings.period {
			self.ensure_finite("burst period", period)?;
		}

		let head = format!("{}:BTWV", channel);
		if !settings.enabled {
			return self.send(format!("{} STATE,OFF", head));
		}
		self.send(format!("{} STATE,ON", head))?;
		if let Some(cycles) = settings.cycles {
			self.send(format!("{} GATE_NCYC,NCYC", head))?;
			self.send(format!("{} TIME,{}", head, cycles))?;
		}
		if let Some(period) = settings.period {
			self.send(format!("{} PRD,{}", head, period))?;
		}
		if let Some(source) = settings.trigger_source {
			self.send(format!("{} TRSR,{}", head, source))?;
		}
		Ok(())
	}

	pub fn set_sweep(&mut self, channel:Channel, settings:&SweepSettings) -> Result<()> {
		if let Some(kind) = settings.kind {
			self.profile.validate_sweep_kind(kind)?;
		}
		for hz in settings.start.iter().chain(settings.stop.iter()) {
			self.profile.validate_frequency(*hz, None)?;
		}
		if let Some(time) = settings.time {
			self.ensure_finite("sweep time", time)?;
		}

		let head = format!("{}:SWWV", channel);
		if !settings.enabled {
			return self.send(format!("{} STATE,OFF", head));
		}
		self.send(format!("{} STATE,ON", head))?;
		if let Some(start) = settings.start {
			self.send(format!("{} START,{}", head, start))?;
		}
		if let Some(stop) = settings.stop {
			self.send(format!("{} STOP,{}", head, stop))?;
		}
		if let Some(time) = settings.time {
			self.send(format!("{} TIME,{}", head, time))?;
		}
		if let Some(kind) = settings.kind {
			self.send(format!("{} SWMD,{}", head, kind))?;
		}
		Ok(())
	}

	// Depth only applies to AM and deviation only to FM, PM and PWM.  Anything that can't be expressed in a
	// single MDWV command is refused rather than dropped.
	pub fn set_modulation(&mut self, channel:Channel, settings:&ModulationSettings) -> Result<()> {
		check_modulation(settings)?;
		for (parameter, value) in [("modulation frequency", settings.frequency), ("modulation depth", settings.depth), ("modulation deviation", settings.deviation)].iter() {
			if let Some(value) = value {
				self.ensure_finite(parameter, *value)?;
			}
		}

		let head = format!("{}:MDWV", channel);
		if !settings.enabled {
			return self.send(format!("{} STATE,OFF", head));
		}
		self.send(format!("{} STATE,ON", head))?;

		let kind = match settings.kind {
			Some(kind) => kind,
			None => return Ok(()),
		};
		let mut command = format!("{} {}", head, kind);
		if let Some(frequency) = settings.frequency {
			let key = match kind { ModulationKind::Ask | ModulationKind::Fsk => "KFRQ", _ => "FRQ" };
			command.push_str(&format!(",{},{}", key, frequency));
		}
		if let Some(depth) = settings.depth {
			command.push_str(&format!(",DEPTH,{}", depth));
		}
		if let Some(deviation) = settings.deviation {
			command.push_str(&format!(",DEVI,{}", deviation));
		}
		self.send(command)
	}

	// System

	pub fn reset(&mut self) -> Result<()> { self.send("*RST".to_owned()) }

	pub fn self_test(&mut self) -> Result<bool> {
		Ok(decode::decode_self_test(&self.ask("*TST?")?))
	}

	pub fn operation_complete(&mut self) -> Result<bool> {
		Ok(self.ask("*OPC?")?.trim() == "1")
	}

	// Reads

	pub fn identify(&mut self) -> Result<IdentificationRecord> {
		let idn = self.ask("*IDN?")?;
		IdentificationRecord::parse(&idn)
	}

	pub fn output_state(&mut self, channel:Channel) -> Result<OutputState> {
		let response = self.ask(&format!("{}:OUTP?", channel))?;
		decode::decode_output_state(&response, &format!("{}:OUTP", channel))
	}

	pub fn wave_info(&mut self, channel:Channel) -> Result<WaveInfo> {
		let response = self.ask(&format!("{}:BSWV?", channel))?;
		decode::decode_wave_info(&response, &format!("{}:BSWV", channel))
	}

	pub fn arb_waveform(&mut self, channel:Channel) -> Result<ArbWaveform> {
		let response = self.ask(&format!("{}:ARWV?", channel))?;
		decode::decode_arb_waveform(&response, &format!("{}:ARWV", channel))
	}

	pub fn store_list(&mut self) -> Result<BTreeMap<u32, String>> {
		decode::decode_store_list(&self.ask("STL?")?)
	}

	pub fn list_arb_waveforms(&mut self) -> Result<Vec<String>> {
		Ok(self.store_list()?.into_iter().map(|(_, name)| name).collect())
	}

	pub fn burst_settings(&mut self, channel:Channel) -> Result<BurstState> {
		let response = self.ask(&format!("{}:BTWV?", channel))?;
		decode::decode_burst(&response, &format!("{}:BTWV", channel))
	}

	pub fn sweep_settings(&mut self, channel:Channel) -> Result<SweepState> {
		let response = self.ask(&format!("{}:SWWV?", channel))?;
		decode::decode_sweep(&response, &format!("{}:SWWV", channel))
	}

	pub fn modulation_settings(&mut self, channel:Channel) -> Result<ModulationState> {
		let response = self.ask(&format!("{}:MDWV?", channel))?;
		decode::decode_modulation(&response, &format!("{}:MDWV", channel))
	}

}

impl<T: Transport> Drop for FunctionGenerator<T> {
	fn drop(&mut self) {
		if let Err(e) = self.transport.close() {
			log::warn!("Unable to close {} connection: {}", self.profile.family, e);
		}
	}
}

fn check_waveform_name(name:&str) -> Result<()> {
	if name.is_empty() || name.contains(|c:char| c == ',' || c.is_control()) {
		Err(Error::Configuration(format!("invalid waveform name '{}'", name)))
	} else {
		Ok(())
	}
}

fn check_modulation(settings:&ModulationSettings) -> Result<()> {
	let kind = match settings.kind {
		Some(kind) => kind,
		None if settings.frequency.is_some() || settings.depth.is_some() || settings.deviation.is_some() =>
			return Err(Error::Configuration("modulation frequency, depth and deviation need a modulation type".to_owned())),
		None => return Ok(()),
	};
	if settings.depth.is_some() && kind != ModulationKind::Am {
		return Err(Error::Configuration(format!("{} modulation has no depth", kind)));
	}
	if settings.deviation.is_some() && !matches!(kind, ModulationKind::Fm | ModulationKind::Pm | ModulationKind::Pwm) {
		return Err(Error::Configuration(format!("{} modulation has no deviation", kind)));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transport::MockInstrument;
	use crate::transport::mock::MockTransport;

	fn generator(family:ModelFamily, instrument:&MockInstrument) -> FunctionGenerator<MockTransport> {
		FunctionGenerator::new(instrument.transport(), family, ContextPolicy::BestEffort).unwrap()
	}

	#[test]
	fn unimplemented_family_is_refused() {
		let instrument = MockInstrument::new();
		assert!(matches!(FunctionGenerator::new(instrument.transport(), ModelFamily::Sdg6000x, ContextPolicy::default()),
			Err(Error::UnsupportedModel(_))));
	}

	#[test]
	fn passing_the_waveform_skips_the_lookup() {
		let instrument = MockInstrument::new();
		let mut g = generator(ModelFamily::Sdg1000, &instrument);
		g.set_frequency(Channel::One, 1000.0, Some(WaveformKind::Sine)).unwrap();
		assert_eq!(instrument.queries(), Vec::<String>::new());
		assert_eq!(instrument.writes(), vec!["C1:BSWV FRQ,1000"]);
	}

	#[test]
	fn looked_up_ramp_cap_is_enforced() {
		let instrument = MockInstrument::new();
		instrument.respond("C2:BSWV?", "C2:BSWV WVTP,RAMP,FRQ,100HZ,AMP,2V,OFST,0V");
		let mut g = generator(ModelFamily::Sdg1000, &instrument);
		assert!(matches!(g.set_frequency(Channel::Two, 300e3, None), Err(Error::Range(_))));
		assert!(instrument.writes().is_empty());
	}

	#[test]
	fn period_is_checked_as_a_frequency() {
		let instrument = MockInstrument::new();
		let mut g = generator(ModelFamily::Sdg1000, &instrument);
		assert!(g.set_period(Channel::One, 1e-8, Some(WaveformKind::Sine)).is_err());
		assert!(g.set_period(Channel::One, 0.0, Some(WaveformKind::Sine)).is_err());
		g.set_period(Channel::One, 0.001, Some(WaveformKind::Sine)).unwrap();
		assert_eq!(instrument.writes(), vec!["C1:BSWV PERI,0.001"]);
	}

	#[test]
	fn burst_sub_parameters_follow_state() {
		let instrument = MockInstrument::new();
		let mut g = generator(ModelFamily::Sdg2000x, &instrument);
		g.set_burst(Channel::One, &BurstSettings{ enabled: true, cycles: Some(10), period: Some(0.01), trigger_source: Some(TriggerSource::Internal) }).unwrap();
		g.set_burst(Channel::One, &BurstSettings{ enabled: false, cycles: Some(10), ..BurstSettings::default() }).unwrap();
		assert_eq!(instrument.writes(), vec![
			"C1:BTWV STATE,ON", "C1:BTWV GATE_NCYC,NCYC", "C1:BTWV TIME,10", "C1:BTWV PRD,0.01", "C1:BTWV TRSR,INT",
			"C1:BTWV STATE,OFF",
		]);
	}

	#[test]
	fn sweep_is_validated_before_the_first_write() {
		let instrument = MockInstrument::new();
		let mut g = generator(ModelFamily::Sdg1000, &instrument);
		let log_sweep = SweepSettings{ enabled: true, start: Some(100.0), stop: Some(1e3), time: Some(1.0), kind: Some(SweepKind::Logarithmic) };
		assert!(matches!(g.set_sweep(Channel::One, &log_sweep), Err(Error::Range(_))));
		assert!(instrument.writes().is_empty());

		let lin_sweep = SweepSettings{ kind: Some(SweepKind::Linear), ..log_sweep };
		g.set_sweep(Channel::One, &lin_sweep).unwrap();
		assert_eq!(instrument.writes(), vec![
			"C1:SWWV STATE,ON", "C1:SWWV START,100", "C1:SWWV STOP,1000", "C1:SWWV TIME,1", "C1:SWWV SWMD,LINE",
		]);
	}

	#[test]
	fn modulation_commands() {
		let instrument = MockInstrument::new();
		let mut g = generator(ModelFamily::Sdg2000x, &instrument);
		g.set_modulation(Channel::One, &ModulationSettings{ enabled: true, kind: Some(ModulationKind::Am), frequency: Some(100.0), depth: Some(80.0), deviation: None }).unwrap();
		g.set_modulation(Channel::Two, &ModulationSettings{ enabled: true, kind: Some(ModulationKind::Fsk), frequency: Some(500.0), ..ModulationSettings::default() }).unwrap();
		g.set_modulation(Channel::Two, &ModulationSettings{ enabled: true, kind: Some(ModulationKind::Fm), frequency: Some(10.0), deviation: Some(50.0), depth: None }).unwrap();
		g.set_modulation(Channel::One, &ModulationSettings::default()).unwrap();
		assert_eq!(instrument.writes(), vec![
			"C1:MDWV STATE,ON", "C1:MDWV AM,FRQ,100,DEPTH,80",
			"C2:MDWV STATE,ON", "C2:MDWV FSK,KFRQ,500",
			"C2:MDWV STATE,ON", "C2:MDWV FM,FRQ,10,DEVI,50",
			"C1:MDWV STATE,OFF",
		]);
	}

	#[test]
	fn arb_upload() {
		let instrument = MockInstrument::new();
		let mut g = generator(ModelFamily::Sdg1000, &instrument);
		g.upload_arb_waveform(Channel::One, "ramp3", &[0.0, 0.5, 1.0], Some(1e6)).unwrap();
		assert_eq!(instrument.writes(), vec!["C1:WVDT WVNM,ramp3,0,0.5,1", "C1:WVDT WVNM,ramp3,SMPL_RATE,1000000"]);

		instrument.clear_log();
		assert!(matches!(g.upload_arb_waveform(Channel::One, "big", &vec![0.0; 4097], None), Err(Error::Range(_))));
		assert!(g.upload_arb_waveform(Channel::One, "empty", &[], None).is_err());
		assert!(matches!(g.upload_arb_waveform(Channel::One, "a,b", &[0.0], None), Err(Error::Configuration(_))));
		assert!(instrument.writes().is_empty());
	}

	#[test]
	fn reads_decode_through_the_tables() {
		let instrument = MockInstrument::with_idn("Siglent Technologies,SDG2042X,SDG2XCAD1R1234,2.01.01.35R2");
		instrument
			.respond("STL?", "STL M2,NOISE,M1,SINE")
			.respond("*TST?", "0")
			.respond("C1:ARWV?", "C1:ARWV INDEX,2,NAME,StairUp");
		let mut g = generator(ModelFamily::Sdg2000x, &instrument);
		assert_eq!(g.identify().unwrap().model, "SDG2042X");
		assert_eq!(g.list_arb_waveforms().unwrap(), vec!["SINE", "NOISE"]);
		assert!(g.self_test().unwrap());
		assert_eq!(g.arb_waveform(Channel::One).unwrap().name.as_deref(), Some("StairUp"));
	}

	#[test]
	fn drop_closes_the_transport() {
		let instrument = MockInstrument::new();
		{
			let _g = generator(ModelFamily::Sdg1000, &instrument);
		}
		assert_eq!(instrument.live_connections(), 0);
	}

	#[test]
	fn modulation_parameters_that_cannot_be_sent_are_refused() {
		let instrument = MockInstrument::new();
		let mut g = generator(ModelFamily::Sdg2000x, &instrument);
		let fm = ModulationSettings{ enabled: true, kind: Some(ModulationKind::Fm), frequency: Some(10.0), depth: Some(1.0), deviation: None };
		assert!(matches!(g.set_modulation(Channel::One, &fm), Err(Error::Configuration(_))));

		let am = ModulationSettings{ enabled: true, kind: Some(ModulationKind::Am), frequency: None, depth: None, deviation: Some(5.0) };
		assert!(matches!(g.set_modulation(Channel::One, &am), Err(Error::Configuration(_))));

		let untyped = ModulationSettings{ enabled: true, frequency: Some(100.0), ..ModulationSettings::default() };
		assert!(matches!(g.set_modulation(Channel::One, &untyped), Err(Error::Configuration(_))));
		// Checked even when only switching off
		assert!(matches!(g.set_modulation(Channel::One, &ModulationSettings{ enabled: false, ..untyped }), Err(Error::Configuration(_))));

		assert!(instrument.writes().is_empty());

		g.set_modulation(Channel::One, &ModulationSettings{ enabled: true, ..ModulationSettings::default() }).unwrap();
		assert_eq!(instrument.writes(), vec!["C1:MDWV STATE,ON"]);
	}

	#[test]
	fn non_finite_values_are_never_written() {
		let instrument = MockInstrument::new();
		let mut g = generator(ModelFamily::Sdg1000, &instrument);
		match g.set_phase(Channel::One, f64::NAN) {
			Err(Error::Range(e)) => assert_eq!(e.bound, Bound::Finite),
			other => panic!("unexpected {:?}", other),
		}
		assert!(matches!(g.set_high_level(Channel::One, f64::INFINITY), Err(Error::Range(_))));
		assert!(matches!(g.set_delay(Channel::Two, f64::NEG_INFINITY), Err(Error::Range(_))));
		assert!(matches!(g.set_amplitude(Channel::One, f64::NAN, Some(Load::FIFTY_OHM)), Err(Error::Range(_))));
		assert!(matches!(g.upload_arb_waveform(Channel::One, "w", &[0.0, f64::INFINITY], None), Err(Error::Range(_))));
		assert!(matches!(g.upload_arb_waveform(Channel::One, "w", &[0.0], Some(f64::NAN)), Err(Error::Range(_))));
		assert!(matches!(g.set_burst(Channel::One, &BurstSettings{ enabled: true, period: Some(f64::NAN), ..BurstSettings::default() }), Err(Error::Range(_))));
		assert!(matches!(g.set_sweep(Channel::One, &SweepSettings{ enabled: true, time: Some(f64::INFINITY), ..SweepSettings::default() }), Err(Error::Range(_))));
		let am = ModulationSettings{ enabled: true, kind: Some(ModulationKind::Am), frequency: Some(f64::NAN), ..ModulationSettings::default() };
		assert!(matches!(g.set_modulation(Channel::One, &am), Err(Error::Range(_))));
		assert!(instrument.writes().is_empty());
	}

	#[test]
	fn basic_wave_parameters_use_their_own_keys() {
		let instrument = MockInstrument::new();
		let mut g = generator(ModelFamily::Sdg2000x, &instrument);
		g.set_phase(Channel::One, 90.0).unwrap();
		g.set_symmetry(Channel::One, 25.0).unwrap();
		g.set_duty(Channel::One, 40.0).unwrap();
		g.set_mean(Channel::Two, 0.5).unwrap();
		g.set_stdev(Channel::Two, 0.1).unwrap();
		g.set_width(Channel::One, 0.0002).unwrap();
		g.set_rise(Channel::One, 1e-8).unwrap();
		g.set_fall(Channel::One, 2e-8).unwrap();
		g.set_delay(Channel::One, 0.001).unwrap();
		g.set_high_level(Channel::Two, 2.5).unwrap();
		g.set_low_level(Channel::Two, -1.0).unwrap();
		assert_eq!(instrument.writes(), vec![
			"C1:BSWV PHSE,90", "C1:BSWV SYM,25", "C1:BSWV DUTY,40", "C2:BSWV MEAN,0.5", "C2:BSWV STDEV,0.1",
			"C1:BSWV WIDTH,0.0002", "C1:BSWV RISE,0.00000001", "C1:BSWV FALL,0.00000002", "C1:BSWV DLY,0.001",
			"C2:BSWV HLEV,2.5", "C2:BSWV LLEV,-1",
		]);
		assert!(instrument.queries().is_empty());
	}

	#[test]
	fn offset_follows_the_read_back_load() {
		let instrument = MockInstrument::new();
		instrument.respond("C1:OUTP?", "C1:OUTP ON,LOAD,HZ,PLRT,NOR");
		let mut g = generator(ModelFamily::Sdg1000, &instrument);
		g.set_offset(Channel::One, 9.0, None).unwrap();
		g.set_offset(Channel::One, -9.0, None).unwrap();
		assert!(matches!(g.set_offset(Channel::One, 10.5, None), Err(Error::Range(_))));
		assert_eq!(instrument.writes(), vec!["C1:BSWV OFST,9", "C1:BSWV OFST,-9"]);
		assert_eq!(instrument.queries(), vec!["C1:OUTP?", "C1:OUTP?", "C1:OUTP?"]);
	}

	#[test]
	fn offset_without_a_load_reply_uses_the_strictest_limit() {
		let instrument = MockInstrument::new();
		let mut g = generator(ModelFamily::Sdg1000, &instrument);
		match g.set_offset(Channel::One, 9.0, None) {
			Err(Error::Range(e)) => assert_eq!(e.bound, Bound::Magnitude(5.0)),
			other => panic!("unexpected {:?}", other),
		}
		g.set_offset(Channel::One, 4.0, None).unwrap();
		assert_eq!(instrument.writes(), vec!["C1:BSWV OFST,4"]);

		instrument.clear_log();
		g.set_policy(ContextPolicy::Strict);
		assert!(matches!(g.set_offset(Channel::One, 4.0, None), Err(Error::Transport(_))));
		g.set_offset(Channel::One, 9.0, Some(Load::HighImpedance)).unwrap();
		assert_eq!(instrument.writes(), vec!["C1:BSWV OFST,9"]);
	}

	#[test]
	fn output_commands() {
		let instrument = MockInstrument::new();
		let mut g = generator(ModelFamily::Sdg1000, &instrument);
		g.set_output_state(Channel::One, true).unwrap();
		g.set_output_state(Channel::Two, false).unwrap();
		g.set_output_polarity(Channel::One, Polarity::Inverted).unwrap();
		g.set_output_load(Channel::Two, Load::HighImpedance).unwrap();
		assert_eq!(instrument.writes(), vec!["C1:OUTP ON", "C2:OUTP OFF", "C1:OUTP PLRT,INVT", "C2:OUTP LOAD,HZ"]);
	}

	#[test]
	fn stored_waveforms_are_selected_and_deleted_by_name() {
		let instrument = MockInstrument::new();
		let mut g = generator(ModelFamily::Sdg2000x, &instrument);
		g.select_arb_waveform(Channel::One, "StairUp").unwrap();
		g.delete_arb_waveform("StairUp").unwrap();
		g.set_arb_waveform_index(Channel::Two, 3).unwrap();
		assert_eq!(instrument.writes(), vec!["C1:ARWV NAME,StairUp", "WVDT DL,StairUp", "C2:ARWV INDEX,3"]);

		instrument.clear_log();
		assert!(matches!(g.select_arb_waveform(Channel::One, "a,b"), Err(Error::Configuration(_))));
		assert!(matches!(g.select_arb_waveform(Channel::One, ""), Err(Error::Configuration(_))));
		assert!(matches!(g.delete_arb_waveform("x\ny"), Err(Error::Configuration(_))));
		assert!(instrument.writes().is_empty());
	}

	#[test]
	fn system_commands() {
		let instrument = MockInstrument::new();
		instrument.respond("*OPC?", "1");
		let mut g = generator(ModelFamily::Sdg1000, &instrument);
		g.reset().unwrap();
		assert!(g.operation_complete().unwrap());
		assert_eq!(instrument.writes(), vec!["*RST"]);

		instrument.respond("*OPC?", "0");
		assert!(!g.operation_complete().unwrap());
	}

	#[test]
	fn burst_and_modulation_reads() {
		let instrument = MockInstrument::new();
		instrument
			.respond("C2:BTWV?", "C2:BTWV STATE,ON,PRD,0.01S,STPS,0,TRSR,EXT,DLAY,0S,GATE_NCYC,NCYC,TIME,5,CARR,WVTP,SINE")
			.respond("C1:MDWV?", "C1:MDWV STATE,ON,FM,MDSP,SINE,SRC,INT,FRQ,10HZ,DEVI,50HZ,CARR,WVTP,SINE,FRQ,1000HZ");
		let mut g = generator(ModelFamily::Sdg2000x, &instrument);

		let burst = g.burst_settings(Channel::Two).unwrap();
		assert!(burst.enabled);
		assert_eq!(burst.cycles, Some(5));
		assert_eq!(burst.period, Some(0.01));
		assert_eq!(burst.trigger_source, Some(TriggerSource::External));

		let modulation = g.modulation_settings(Channel::One).unwrap();
		assert_eq!(modulation.kind, Some(ModulationKind::Fm));
		assert_eq!(modulation.frequency, Some(10.0));
		assert_eq!(modulation.deviation, Some(50.0));
		assert_eq!(modulation.depth, None);
		assert!(instrument.writes().is_empty());
	}
}
