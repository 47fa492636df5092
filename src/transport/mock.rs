
// Scripted stand-in for an instrument.  Replies are keyed by the exact query text; every write and query is
// logged so tests can check what reached the wire (and what didn't).

use std::collections::HashMap;
use std::io::{self, ErrorKind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use super::{Connector, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
	Write(String),
	Query(String),
}

#[derive(Debug, Default)]
struct MockState {
	replies: HashMap<String, String>,
	log: Vec<Exchange>,
	opened: Vec<String>,
	closed: usize,
}

// Shared handle; clones see the same state
#[derive(Debug, Clone, Default)]
pub struct MockInstrument(Arc<Mutex<MockState>>);

impl MockInstrument {

	pub fn new() -> Self { Self::default() }

	pub fn with_idn(idn:&str) -> Self {
		let instrument = Self::new();
		instrument.respond("*IDN?", idn);
		instrument
	}

	fn state(&self) -> MutexGuard<'_, MockState> {
		self.0.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn respond(&self, query:&str, reply:&str) -> &Self {
		self.state().replies.insert(query.to_owned(), reply.to_owned());
		self
	}

	// Make a query go unanswered
	pub fn forget(&self, query:&str) -> &Self {
		self.state().replies.remove(query);
		self
	}

	pub fn exchanges(&self) -> Vec<Exchange> { self.state().log.clone() }

	pub fn writes(&self) -> Vec<String> {
		self.state().log.iter()
			.filter_map(|x| match x { Exchange::Write(c) => Some(c.clone()), _ => None })
			.collect()
	}

	pub fn queries(&self) -> Vec<String> {
		self.state().log.iter()
			.filter_map(|x| match x { Exchange::Query(c) => Some(c.clone()), _ => None })
			.collect()
	}

	pub fn clear_log(&self) { self.state().log.clear(); }

	pub fn opened(&self) -> Vec<String> { self.state().opened.clone() }

	pub fn closed(&self) -> usize { self.state().closed }

	pub fn live_connections(&self) -> usize {
		let state = self.state();
		state.opened.len() - state.closed
	}

	pub fn transport(&self) -> MockTransport {
		self.state().opened.push("mock".to_owned());
		MockTransport{ instrument: self.clone(), open: true }
	}

}

pub struct MockTransport {
	instrument: MockInstrument,
	open: bool,
}

impl MockTransport {
	pub fn instrument(&self) -> &MockInstrument { &self.instrument }

	fn ensure_open(&self) -> Result<()> {
		if self.open { Ok(()) }
		else { Err(Error::Configuration("mock connection is closed".to_owned())) }
	}
}

impl Transport for MockTransport {

	fn write(&mut self, command:&str) -> Result<()> {
		self.ensure_open()?;
		self.instrument.state().log.push(Exchange::Write(command.to_owned()));
		Ok(())
	}

	fn query(&mut self, command:&str) -> Result<String> {
		self.ensure_open()?;
		let mut state = self.instrument.state();
		state.log.push(Exchange::Query(command.to_owned()));
		match state.replies.get(command) {
			Some(reply) => Ok(reply.clone()),
			None => Err(Error::Transport(io::Error::new(ErrorKind::TimedOut, format!("no reply to '{}'", command)))),
		}
	}

	fn close(&mut self) -> Result<()> {
		if self.open {
			self.open = false;
			self.instrument.state().closed += 1;
		}
		Ok(())
	}

}

impl Drop for MockTransport {
	fn drop(&mut self) {
		let _ = self.close();
	}
}

#[derive(Debug, Clone, Default)]
pub struct MockConnector {
	pub instrument: MockInstrument,
	// Refuse every open with ConnectionRefused
	pub fail_open: bool,
}

impl MockConnector {
	pub fn new(instrument:MockInstrument) -> Self { Self{ instrument, fail_open: false } }

	pub fn refusing() -> Self { Self{ instrument: MockInstrument::new(), fail_open: true } }
}

impl Connector for MockConnector {
	type Connection = MockTransport;

	fn open(&self, address:&str) -> Result<MockTransport> {
		if self.fail_open {
			return Err(Error::Transport(io::Error::new(ErrorKind::ConnectionRefused, format!("{} refused the connection", address))));
		}
		self.instrument.state().opened.push(address.to_owned());
		Ok(MockTransport{ instrument: self.instrument.clone(), open: true })
	}
}
