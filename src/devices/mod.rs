
// Siglent SDG function generators.  The command set is shared across the series; what differs per model
// family lives in a CapabilityProfile, so a single FunctionGenerator type drives every supported family.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::error::Error;

pub mod family;
pub mod profile;
pub mod decode;
pub mod generator;
pub mod factory;

// Enums that travel over the wire as fixed SCPI tokens.  Parsing is case-insensitive and also accepts the
// listed aliases, since firmware revisions don't always agree on spelling.
macro_rules! wire_tokens {
	($name:ident, $what:expr, { $($variant:ident => $token:expr $(, $alias:expr)*;)+ }) => {
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		pub enum $name { $($variant,)+ }

		impl $name {
			pub fn token(self) -> &'static str {
				match self { $($name::$variant => $token,)+ }
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f:&mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.token()) }
		}

		impl FromStr for $name {
			type Err = Error;

			fn from_str(s:&str) -> Result<Self, Error> {
				let s = s.trim();
				$(
					if s.eq_ignore_ascii_case($token) $(|| s.eq_ignore_ascii_case($alias))* {
						return Ok($name::$variant);
					}
				)+
				Err(Error::decode(format!("unrecognized {} '{}'", $what, s)))
			}
		}
	};
}

wire_tokens!(Channel, "channel", {
	One => "C1", "CH1";
	Two => "C2", "CH2";
});

wire_tokens!(WaveformKind, "waveform type", {
	Sine   => "SINE";
	Square => "SQUARE";
	Ramp   => "RAMP";
	Pulse  => "PULSE";
	Noise  => "NOISE";
	Arb    => "ARB";
	Dc     => "DC";
});

wire_tokens!(SweepKind, "sweep type", {
	Linear      => "LINE", "LIN";
	Logarithmic => "LOG";
});

wire_tokens!(Polarity, "polarity", {
	Normal   => "NOR";
	Inverted => "INVT";
});

wire_tokens!(TriggerSource, "trigger source", {
	Internal => "INT";
	External => "EXT";
	Manual   => "MAN";
});

wire_tokens!(ModulationKind, "modulation type", {
	Am    => "AM";
	Fm    => "FM";
	Pm    => "PM";
	Fsk   => "FSK";
	Ask   => "ASK";
	Pwm   => "PWM";
	DsbAm => "DSBAM";
});

impl Channel {
	pub const ALL:[Channel; 2] = [Channel::One, Channel::Two];
}

// Output termination.  The instrument reports High-Z as "HZ".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Load {
	Ohms(u32),
	HighImpedance,
}

impl Load {
	pub const FIFTY_OHM:Load = Load::Ohms(50);
}

impl fmt::Display for Load {
	fn fmt(&self, f:&mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Load::Ohms(r)       => write!(f, "{}", r),
			Load::HighImpedance => f.write_str("HZ"),
		}
	}
}

impl FromStr for Load {
	type Err = Error;

	fn from_str(s:&str) -> Result<Self, Error> {
		let s = s.trim();
		if s.eq_ignore_ascii_case("HZ") {
			return Ok(Load::HighImpedance);
		}
		if let Ok(r) = s.parse::<u32>() {
			return Ok(Load::Ohms(r));
		}
		match s.parse::<f64>() {
			Ok(r) if r >= 0.0 && r.fract() == 0.0 && r <= u32::MAX as f64 => Ok(Load::Ohms(r as u32)),
			_ => Err(Error::decode(format!("unrecognized load '{}'", s))),
		}
	}
}
