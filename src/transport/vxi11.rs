
use std::io::{Read, Write};
use std::net::TcpStream;
use std::str;
use std::thread;

use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::vxi11::CoreClient;
use super::{Connector, ResourceAddress, Transport};

// One VXI-11 link to an instrument, opened on construction and destroyed on close or drop
pub struct Vxi11Connection<S: Read + Write = TcpStream> {
	core: CoreClient<S>,
	address: String,
	config: TransportConfig,
	open: bool,
}

impl Vxi11Connection<TcpStream> {

	pub fn connect(address:&str, config:&TransportConfig) -> Result<Self> {
		config.validate()?;
		let resource = ResourceAddress::parse(address)?;
		let core = CoreClient::connect(&resource.host, config)?;
		let conn = Self::with_core(core, address, resource.device_or(&config.device_name), config)?;
		log::info!("Connected to {}", resource);
		Ok(conn)
	}

}

impl<S: Read + Write> Vxi11Connection<S> {

	pub fn with_core(mut core:CoreClient<S>, address:&str, device:&str, config:&TransportConfig) -> Result<Self> {
		core.create_link(device)?;
		Ok(Self{ core, address: address.to_owned(), config: config.clone(), open: true })
	}

	pub fn address(&self) -> &str { &self.address }

	pub fn is_open(&self) -> bool { self.open }

	fn ensure_open(&self) -> Result<()> {
		if self.open { Ok(()) }
		else { Err(Error::Configuration(format!("connection to {} is closed", self.address))) }
	}

}

impl<S: Read + Write> Transport for Vxi11Connection<S> {

	fn write(&mut self, command:&str) -> Result<()> {
		self.ensure_open()?;
		log::debug!("{} <- {}", self.address, command);
		let mut data:Vec<u8> = Vec::with_capacity(command.len() + self.config.write_termination.len());
		data.extend_from_slice(command.as_bytes());
		data.extend_from_slice(self.config.write_termination.as_bytes());
		self.core.write(&data)
	}

	fn query(&mut self, command:&str) -> Result<String> {
		self.write(command)?;
		thread::sleep(self.config.query_delay());

		let raw:Vec<u8> = self.core.read()?;
		let text:&str = str::from_utf8(&raw)
			.map_err(|_| Error::decode(format!("reply to '{}' is not valid UTF-8", command)))?;
		log::trace!("{} -> {:?}", self.address, text);

		let term:&str = &self.config.read_termination;
		let text = if term.is_empty() { text } else { text.strip_suffix(term).unwrap_or(text) };
		Ok(text.trim_end_matches('\r').to_owned())
	}

	fn close(&mut self) -> Result<()> {
		if !self.open { return Ok(()); }
		self.open = false;
		log::debug!("Closing link to {}", self.address);
		self.core.destroy_link()
	}

}

impl<S: Read + Write> Drop for Vxi11Connection<S> {
	fn drop(&mut self) {
		if let Err(e) = self.close() {
			log::warn!("Unable to close link to {}: {}", self.address, e);
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct Vxi11Connector {
	pub config: TransportConfig,
}

impl Vxi11Connector {
	pub fn new(config:TransportConfig) -> Self { Self{ config } }
}

impl Connector for Vxi11Connector {
	type Connection = Vxi11Connection;

	fn open(&self, address:&str) -> Result<Self::Connection> {
		Vxi11Connection::connect(address, &self.config)
	}
}
