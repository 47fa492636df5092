
use crate::error::{Error, Result};
use crate::xdr::Unpacker;
use crate::rpc::{REPLY, MSG_DENIED, RPC_MISMATCH, AUTH_ERROR, MSG_ACCEPTED, PROG_UNAVAIL, PROG_MISMATCH, PROC_UNAVAIL, GARBAGE_ARGS, SUCCESS};

#[derive(Debug, Clone, PartialEq)]
pub struct Auth {
	pub flavor: i32,
	pub body: Vec<u8>,
}

pub fn unpack_auth(unpacker:&mut Unpacker) -> Result<Auth> {
	let flavor:i32  = unpacker.unpack_enum()?;
	let body:Vec<u8> = unpacker.unpack_variable_len_opaque()?;
	Ok(Auth{ flavor, body })
}

pub fn unpack_replyheader(unpacker:&mut Unpacker) -> Result<(u32, Auth)> {
	let xid:u32 = unpacker.unpack_u32()?;

	if unpacker.unpack_enum()? != REPLY { return Err(Error::rpc("Expected REPLY message type")); }

	match unpacker.unpack_enum()? {
		MSG_DENIED => {
			return match unpacker.unpack_enum()? {
				RPC_MISMATCH => {
					let low:u32  = unpacker.unpack_u32()?;
					let high:u32 = unpacker.unpack_u32()?;
					Err(Error::rpc(format!("Message denied, server supports RPC versions {} to {}", low, high)))
				},
				AUTH_ERROR => {
					let stat:u32 = unpacker.unpack_u32()?;
					Err(Error::rpc(format!("Message denied due to AUTH_ERROR (status {})", stat)))
				},
				_ => Err(Error::rpc("Message denied for an unknown reason")),
			};
		},
		MSG_ACCEPTED => { },
		_ => return Err(Error::rpc("Neither MSG_DENIED nor MSG_ACCEPTED in reply")),
	}

	let verf = unpack_auth(unpacker)?;

	match unpacker.unpack_enum()? {
		SUCCESS       => Ok((xid, verf)),
		PROG_UNAVAIL  => Err(Error::rpc("Program unavailable")),
		PROG_MISMATCH => {
			let low:u32  = unpacker.unpack_u32()?;
			let high:u32 = unpacker.unpack_u32()?;
			Err(Error::rpc(format!("Program mismatch, server supports versions {} to {}", low, high)))
		},
		PROC_UNAVAIL  => Err(Error::rpc("Procedure unavailable")),
		GARBAGE_ARGS  => Err(Error::rpc("Server could not decode the call arguments")),
		_             => Err(Error::rpc("Call failed for an unknown reason")),
	}
}
