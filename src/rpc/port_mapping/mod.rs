
pub const PMAP_PROG:u32 = 100000;
pub const PMAP_VERS:u32 = 2;
pub const PMAP_PORT:u16 = 111;

pub const PMAPPROC_NULL:u32    = 0;     // (void) -> void
pub const PMAPPROC_GETPORT:u32 = 3;     // (mapping) -> unsigned int

use std::io::{Read, Write};
use std::time::Duration;

use crate::error::{Error, Result};

use super::{IPPROTO_TCP, IPPROTO_UDP};
use super::xdr_pack;
use super::tcp_clients::{RpcClient, TcpClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
	TCP,
	UDP,
}

impl Protocol {
	pub fn to_u32(self) -> u32 { match self {
		Protocol::TCP => IPPROTO_TCP,
		Protocol::UDP => IPPROTO_UDP,
	}}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
	pub program: u32,
	pub version: u32,
	pub protocol: Protocol,
	pub port: u32,
}

pub struct PortMapperClient<S> {
	pub host: String,
	client: RpcClient<S>,
}

pub type TcpPortMapperClient = PortMapperClient<std::net::TcpStream>;

impl TcpPortMapperClient {

	pub fn new(host:&str, timeout:Duration) -> Result<Self> {
		let client = TcpClient::connect((host, PMAP_PORT), PMAP_PROG, PMAP_VERS, timeout)?;
		Ok(Self{ host: host.to_owned(), client })
	}

}

impl<S: Read + Write> PortMapperClient<S> {

	pub fn with_client(host:&str, client:RpcClient<S>) -> Self {
		Self{ host: host.to_owned(), client }
	}

	pub fn get_port(&mut self, m:&Mapping) -> Result<u16> {
		self.client.start_call(PMAPPROC_GETPORT)?;
		xdr_pack::pack_mapping(&mut self.client.packer, m.program, m.version, m.protocol.to_u32(), m.port)?;
		self.client.do_call()?;

		let port:u32 = self.client.unpacker.unpack_u32()?;
		if !self.client.unpacker.all_data_consumed() {
			return Err(Error::rpc("Data unexpectedly left over in unpacker after unpacking port"));
		}

		// The portmapper answers zero for programs it doesn't know
		match port {
			0 => Err(Error::rpc(format!("{} has no mapping for program {:#x} v{}", self.host, m.program, m.version))),
			p if p > u16::MAX as u32 => Err(Error::rpc(format!("Port {} from {} is out of range", p, self.host))),
			p => Ok(p as u16),
		}
	}

}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Cursor;
	use crate::rpc::tcp_clients::tests::{Duplex, reply_record};

	fn mapper(reply_body:&[u8]) -> PortMapperClient<Duplex> {
		let stream = Duplex{ input: Cursor::new(reply_record(1, reply_body)), output: vec![] };
		PortMapperClient::with_client("10.0.0.2", RpcClient::new(stream, PMAP_PROG, PMAP_VERS))
	}

	fn core_mapping() -> Mapping {
		Mapping{ program: 0x0607af, version: 1, protocol: Protocol::TCP, port: 0 }
	}

	#[test]
	fn getport_returns_mapped_port() {
		let mut pm = mapper(&[0, 0, 0x03, 0xc1]);
		assert_eq!(pm.get_port(&core_mapping()).unwrap(), 961);
	}

	#[test]
	fn unmapped_program_is_an_error() {
		let mut pm = mapper(&[0, 0, 0, 0]);
		assert!(matches!(pm.get_port(&core_mapping()), Err(Error::Rpc(_))));
	}
}
