
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use byteorder::{BigEndian, WriteBytesExt, ReadBytesExt};

use crate::error::{Error, Result};
use crate::xdr::{Packer, Unpacker};
use super::{xdr_pack, xdr_unpack, LAST_FRAGMENT, MAX_RECORD_SIZE};

// ONC-RPC client over a record-marked byte stream.  Generic over the stream so the framing can be exercised
// without a socket.
pub struct RpcClient<S> {
	stream: S,
	pub prog: u32,
	pub vers: u32,
	pub lastxid: u32,
	pub packer: Packer,
	pub unpacker: Unpacker,
}

pub type TcpClient = RpcClient<TcpStream>;

impl TcpClient {

	pub fn connect<A: ToSocketAddrs>(addr:A, prog:u32, vers:u32, timeout:Duration) -> Result<Self> {
		let sock_addr = addr.to_socket_addrs()?
			.next()
			.ok_or_else(|| Error::Configuration("Address did not resolve".to_owned()))?;

		let stream = TcpStream::connect_timeout(&sock_addr, timeout)?;
		stream.set_read_timeout(Some(timeout))?;
		stream.set_write_timeout(Some(timeout))?;
		stream.set_nodelay(true)?;

		log::debug!("Connected to {} for RPC program {:#x} v{}", sock_addr, prog, vers);
		Ok(Self::new(stream, prog, vers))
	}

}

impl<S: Read + Write> RpcClient<S> {

	pub fn new(stream:S, prog:u32, vers:u32) -> Self {
		Self{ stream, prog, vers, lastxid: 0, packer: Packer::new(), unpacker: Unpacker::new() }
	}

	// Bump the XID and write a fresh call header; the caller packs its arguments after this
	pub fn start_call(&mut self, prc:u32) -> Result<()> {
		self.lastxid = self.lastxid.wrapping_add(1);
		self.packer.reset();
		xdr_pack::pack_callheader_no_auth(&mut self.packer, self.lastxid, self.prog, self.vers, prc)?;
		Ok(())
	}

	// Send the packed call and leave the reply body in the unpacker, header already consumed
	pub fn do_call(&mut self) -> Result<()> {
		let call:&[u8] = self.packer.as_bytes();
		if !call.is_empty() {
			let mut send_bytes:Vec<u8> = Vec::with_capacity(call.len() + 4);
			send_bytes.write_u32::<BigEndian>(call.len() as u32 | LAST_FRAGMENT)?;
			send_bytes.extend_from_slice(call);
			self.stream.write_all(&send_bytes)?;
			self.stream.flush()?;
		}

		loop {
			let reply:Vec<u8> = self.read_record()?;
			self.unpacker.reset(&reply);

			let (xid, _) = xdr_unpack::unpack_replyheader(&mut self.unpacker)?;
			if xid == self.lastxid {
				return Ok(());
			} else if xid < self.lastxid {
				// Reply to a call we already gave up on
				log::trace!("Skipping stale RPC reply xid={} (expecting {})", xid, self.lastxid);
				continue;
			} else {
				return Err(Error::rpc(format!("Reply xid {} is ahead of the last call {}", xid, self.lastxid)));
			}
		}
	}

	fn read_record(&mut self) -> Result<Vec<u8>> {
		let mut reply:Vec<u8> = vec![];

		let mut last:bool = false;
		while !last {
			let x:u32 = self.stream.read_u32::<BigEndian>()?;
			last = (x & LAST_FRAGMENT) != 0;
			let n:usize = (x & !LAST_FRAGMENT) as usize;

			let start = reply.len();
			if start + n > MAX_RECORD_SIZE {
				return Err(Error::rpc(format!("RPC record of {} bytes exceeds the {} byte limit", start + n, MAX_RECORD_SIZE)));
			}
			reply.resize(start + n, 0);
			self.stream.read_exact(&mut reply[start..])?;
		}

		Ok(reply)
	}

	pub fn into_inner(self) -> S { self.stream }

}
