
// Identify a Siglent SDG on the LAN and dump its identity and channel state as JSON
//
//   sdg_probe <address> [--hint SDG2000X] [--config instrument.json]

use std::env;
use std::error;
use std::process;

use serde::Serialize;

use sdg::devices::decode::{OutputState, WaveInfo};
use sdg::{Channel, IdentificationRecord, InstrumentConfig, ModelFamily, SiglentFactory};

#[derive(Serialize)]
struct ChannelReport {
	channel: Channel,
	output: OutputState,
	wave: WaveInfo,
}

#[derive(Serialize)]
struct Probe {
	address: String,
	family: ModelFamily,
	identity: IdentificationRecord,
	channels: Vec<ChannelReport>,
}

fn usage() -> ! {
	eprintln!("usage: sdg_probe <address> [--hint FAMILY] [--config FILE]");
	process::exit(2);
}

pub fn main() -> Result<(), Box<dyn error::Error>> {
	env_logger::init();

	let mut address:Option<String> = None;
	let mut hint:Option<ModelFamily> = None;
	let mut config = InstrumentConfig::default();

	let mut args = env::args().skip(1);
	while let Some(arg) = args.next() {
		match arg.as_str() {
			"--hint"   => hint = Some(args.next().unwrap_or_else(|| usage()).parse()?),
			"--config" => config = InstrumentConfig::from_json_file(args.next().unwrap_or_else(|| usage()))?,
			"-h" | "--help" => usage(),
			_ if address.is_none() => address = Some(arg),
			_ => usage(),
		}
	}
	let address = address.unwrap_or_else(|| usage());

	let mut generator = SiglentFactory::from_config(&config).create(&address, hint)?;
	let identity = generator.identify()?;

	let mut channels = Vec::with_capacity(Channel::ALL.len());
	for channel in Channel::ALL.iter().copied() {
		let output = generator.output_state(channel)?;
		let wave = generator.wave_info(channel)?;
		channels.push(ChannelReport{ channel, output, wave });
	}

	let probe = Probe{ address, family: generator.family(), identity, channels };
	println!("{}", serde_json::to_string_pretty(&probe)?);

	generator.close()?;
	Ok(())
}
