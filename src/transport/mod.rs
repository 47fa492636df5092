
// Line-oriented SCPI transports.  The instrument code only ever writes a command or asks a question; how the bytes
// get there (VXI-11 on the LAN, a scripted mock in tests) is behind these two traits.

use std::fmt;

use crate::error::{Error, Result};

pub mod vxi11;
pub mod mock;

pub use self::vxi11::{Vxi11Connection, Vxi11Connector};
pub use self::mock::{MockConnector, MockInstrument, MockTransport};

pub trait Transport {
	fn write(&mut self, command:&str) -> Result<()>;

	// Response with the read terminator removed
	fn query(&mut self, command:&str) -> Result<String>;

	// Closing twice is not an error
	fn close(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
	fn write(&mut self, command:&str) -> Result<()> { (**self).write(command) }
	fn query(&mut self, command:&str) -> Result<String> { (**self).query(command) }
	fn close(&mut self) -> Result<()> { (**self).close() }
}

pub trait Connector {
	type Connection: Transport;

	fn open(&self, address:&str) -> Result<Self::Connection>;
}

impl<C: Connector + ?Sized> Connector for &C {
	type Connection = C::Connection;

	fn open(&self, address:&str) -> Result<Self::Connection> { (**self).open(address) }
}

// A parsed VISA resource string.  Only LAN instruments are reachable: TCPIP[board]::host[::device][::INSTR], or
// just a host name or IP address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAddress {
	pub board: Option<u8>,
	pub host: String,
	pub device_name: Option<String>,
}

const UNSUPPORTED_INTERFACES:&[&str] = &["USB", "GPIB", "ASRL", "VXI", "GPIB-VXI", "PXI"];

impl ResourceAddress {

	pub fn parse(resource:&str) -> Result<Self> {
		let resource = resource.trim();
		if resource.is_empty() {
			return Err(Error::Configuration("empty resource address".to_owned()));
		}

		if !resource.contains("::") {
			return Ok(Self{ board: None, host: resource.to_owned(), device_name: None });
		}

		let mut toks:Vec<&str> = resource.split("::").map(str::trim).collect();
		let interface = toks.remove(0).to_ascii_uppercase();

		let board:Option<u8> = match interface.strip_prefix("TCPIP") {
			Some("") => None,
			Some(n)  => Some(n.parse::<u8>().map_err(|_| Error::Configuration(format!("invalid TCPIP board number in '{}'", resource)))?),
			None => {
				let kind = interface.trim_end_matches(|c:char| c.is_ascii_digit());
				return Err(if UNSUPPORTED_INTERFACES.contains(&kind) {
					Error::Configuration(format!("{} resources are not supported: '{}'", kind, resource))
				} else {
					Error::Configuration(format!("unrecognized resource address '{}'", resource))
				});
			},
		};

		match toks.last() {
			Some(last) if last.eq_ignore_ascii_case("INSTR") => { toks.pop(); },
			Some(last) if last.eq_ignore_ascii_case("SOCKET") => {
				return Err(Error::Configuration(format!("raw socket resources are not supported: '{}'", resource)));
			},
			_ => {},
		}

		match toks.as_slice() {
			[host] if !host.is_empty() => Ok(Self{ board, host: host.to_string(), device_name: None }),
			[host, device] if !host.is_empty() && !device.is_empty() => Ok(Self{
				board,
				host: host.to_string(),
				device_name: Some(device.to_string()),
			}),
			_ => Err(Error::Configuration(format!("malformed TCPIP resource '{}'", resource))),
		}
	}

	pub fn device_or<'a>(&'a self, default:&'a str) -> &'a str {
		self.device_name.as_deref().unwrap_or(default)
	}

}

impl fmt::Display for ResourceAddress {
	fn fmt(&self, f:&mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("TCPIP")?;
		if let Some(board) = self.board { write!(f, "{}", board)?; }
		write!(f, "::{}", self.host)?;
		if let Some(device) = &self.device_name { write!(f, "::{}", device)?; }
		f.write_str("::INSTR")
	}
}
