
// Device core
pub const DEVICE_CORE_PROG:u32  = 0x0607af;
pub const DEVICE_CORE_VERS:u32  = 1;
pub const CREATE_LINK:u32       = 10;
pub const DEVICE_WRITE:u32      = 11;
pub const DEVICE_READ:u32       = 12;
pub const DESTROY_LINK:u32      = 23;

pub const CLIENT_ID:i32 = 3333;

pub const OPERATION_FLAGS_END_ONLY:i32 = 8;

// Reason bits of a device_read reply
pub const REASON_REQCNT:i32 = 1;
pub const REASON_CHR:i32    = 2;
pub const REASON_END:i32    = 4;

use std::io::{self, Read, Write, ErrorKind};
use std::net::TcpStream;

use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::rpc::port_mapping::{TcpPortMapperClient, Mapping, Protocol};
use crate::rpc::tcp_clients::{RpcClient, TcpClient};

pub mod xdr_pack;

fn device_error(code:i32) -> Error {
	let msg = match code {
		1  => "Syntax error",
		3  => "Device not accessible",
		4  => "Invalid link identifier",
		5  => "Parameter error",
		6  => "Channel not established",
		8  => "Operation not supported",
		9  => "Out of resources",
		11 => "Device locked by another link",
		12 => "No lock held by this link",
		15 => return Error::Transport(io::Error::new(ErrorKind::TimedOut, "VXI-11 I/O timeout")),
		17 => "I/O error",
		21 => "Invalid address",
		23 => "Abort",
		29 => "Channel already established",
		_  => return Error::rpc(format!("Unknown VXI-11 device error {}", code)),
	};
	Error::rpc(msg)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
	pub link_id: i32,
	pub abort_port: u16,
	pub max_recv_size: u32,
}

// Core channel of a VXI-11 instrument: one RPC connection, at most one link
pub struct CoreClient<S> {
	client: RpcClient<S>,
	opt_link: Option<Link>,
	io_timeout_ms: u32,
	lock_timeout_ms: u32,
}

impl CoreClient<TcpStream> {

	pub fn connect(host:&str, config:&TransportConfig) -> Result<Self> {
		config.validate()?;

		// Find the port to use for the core program
		let mut pmap_client = TcpPortMapperClient::new(host, config.io_timeout())?;
		let mapping = Mapping {
			program: DEVICE_CORE_PROG,
			version: DEVICE_CORE_VERS,
			protocol: Protocol::TCP,
			port: 0,
		};
		let port:u16 = pmap_client.get_port(&mapping)?;
		log::debug!("{} maps the VXI-11 core channel to port {}", host, port);

		let client = TcpClient::connect((host, port), DEVICE_CORE_PROG, DEVICE_CORE_VERS, config.io_timeout())?;
		Ok(Self::new(client, config))
	}

}

impl<S: Read + Write> CoreClient<S> {

	// Timeouts were bounds-checked by TransportConfig::validate
	pub fn new(client:RpcClient<S>, config:&TransportConfig) -> Self {
		Self {
			client,
			opt_link: None,
			io_timeout_ms: config.io_timeout_ms.min(u32::MAX as u64) as u32,
			lock_timeout_ms: config.lock_timeout_ms.min(u32::MAX as u64) as u32,
		}
	}

	pub fn link(&self) -> Option<Link> { self.opt_link }

	fn link_id(&self) -> Result<i32> {
		match self.opt_link {
			Some(Link{ link_id, .. }) => Ok(link_id),
			None => Err(Error::rpc("No link")),
		}
	}

	pub fn create_link(&mut self, device:&str) -> Result<Link> {
		if self.opt_link.is_some() {
			return Err(Error::rpc("Already connected to a link"));
		}

		self.client.start_call(CREATE_LINK)?;
		xdr_pack::pack_create_link_parms(&mut self.client.packer, CLIENT_ID, false, self.lock_timeout_ms, device)?;
		self.client.do_call()?;

		let error:i32         = self.client.unpacker.unpack_i32()?;
		let link_id:i32       = self.client.unpacker.unpack_i32()?;
		let abort_port:u32    = self.client.unpacker.unpack_u32()?;
		let max_recv_size:u32 = self.client.unpacker.unpack_u32()?;

		if error != 0 {
			return Err(device_error(error));
		}

		let link = Link{ link_id, abort_port: abort_port as u16, max_recv_size };
		log::debug!("Created VXI-11 link {} to {}", link_id, device);
		self.opt_link = Some(link);
		Ok(link)
	}

	// Sent in pieces of at most max_recv_size bytes; only the piece that reaches the end of the data carries END
	pub fn write(&mut self, data:&[u8]) -> Result<()> {
		let link:Link = self.opt_link.ok_or_else(|| Error::rpc("No link"))?;
		let max_chunk:usize = if link.max_recv_size == 0 { data.len().max(1) } else { link.max_recv_size as usize };

		let mut offset:usize = 0;
		loop {
			let end:usize = (offset + max_chunk).min(data.len());
			let flags:i32 = if end == data.len() { OPERATION_FLAGS_END_ONLY } else { 0 };

			self.client.start_call(DEVICE_WRITE)?;
			xdr_pack::pack_device_write_parms(&mut self.client.packer, link.link_id, self.io_timeout_ms, self.lock_timeout_ms, flags, &data[offset..end])?;
			self.client.do_call()?;

			let error:i32 = self.client.unpacker.unpack_i32()?;
			let size:usize = self.client.unpacker.unpack_u32()? as usize;

			if error != 0 {
				return Err(device_error(error));
			}
			if size > end - offset || (size == 0 && end > offset) {
				return Err(Error::rpc(format!("Device accepted {} of {} bytes at offset {}", size, end - offset, offset)));
			}

			offset += size;
			if offset == data.len() {
				return Ok(());
			}
		}
	}

	// Read until the device flags END or a termination character
	pub fn read(&mut self) -> Result<Vec<u8>> {
		let link_id:i32 = self.link_id()?;
		let mut ans:Vec<u8> = vec![];

		loop {
			self.client.start_call(DEVICE_READ)?;
			xdr_pack::pack_device_read_parms(&mut self.client.packer, link_id, u32::MAX, self.io_timeout_ms, self.lock_timeout_ms, 0, 0)?;
			self.client.do_call()?;

			let error:i32    = self.client.unpacker.unpack_i32()?;
			let reason:i32   = self.client.unpacker.unpack_i32()?;
			let data:Vec<u8> = self.client.unpacker.unpack_variable_len_opaque()?;

			if error != 0 {
				return Err(device_error(error));
			}
			ans.extend_from_slice(&data);

			if reason & (REASON_END | REASON_CHR) != 0 {
				return Ok(ans);
			} else if reason & REASON_REQCNT == 0 {
				return Err(Error::rpc(format!("Unexpected device_read reason bits {:#x}", reason)));
			}
		}
	}

	pub fn ask(&mut self, data:&[u8]) -> Result<Vec<u8>> {
		self.write(data)?;
		self.read()
	}

	pub fn destroy_link(&mut self) -> Result<()> {
		let link_id:i32 = self.link_id()?;

		self.client.start_call(DESTROY_LINK)?;
		xdr_pack::pack_device_link(&mut self.client.packer, link_id)?;
		self.client.do_call()?;

		// The link is gone from our side whatever the device says
		self.opt_link = None;
		match self.client.unpacker.unpack_i32()? {
			0    => Ok(()),
			code => Err(device_error(code)),
		}
	}

}
