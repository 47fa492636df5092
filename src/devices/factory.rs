
// Opens a FunctionGenerator for an address, identifying the instrument first unless told what it is.  The
// identification connection is separate and always closed before the working connection is opened.

use crate::config::{ContextPolicy, InstrumentConfig};
use crate::error::{Error, Result};
use crate::transport::{Connector, Transport, Vxi11Connection, Vxi11Connector};
use super::family::{self, IdentificationRecord, ModelFamily};
use super::generator::FunctionGenerator;

pub struct SiglentFactory<C: Connector> {
	connector: C,
	policy: ContextPolicy,
}

impl SiglentFactory<Vxi11Connector> {

	pub fn from_config(config:&InstrumentConfig) -> Self {
		SiglentFactory::new(Vxi11Connector::new(config.transport.clone())).with_policy(config.context_policy)
	}

}

impl<C: Connector> SiglentFactory<C> {

	pub fn new(connector:C) -> Self { Self{ connector, policy: ContextPolicy::default() } }

	pub fn with_policy(mut self, policy:ContextPolicy) -> Self {
		self.policy = policy;
		self
	}

	pub fn connector(&self) -> &C { &self.connector }

	// With a hint no identification query is made
	pub fn create(&self, address:&str, hint:Option<ModelFamily>) -> Result<FunctionGenerator<C::Connection>> {
		let family = match hint {
			Some(family) => family,
			None => self.detect_only(address)?,
		}.ensure_implemented()?;

		let connection = self.connector.open(address)?;
		log::info!("Opened {} at {}", family, address);
		FunctionGenerator::new(connection, family, self.policy)
	}

	pub fn detect_only(&self, address:&str) -> Result<ModelFamily> {
		self.with_transient(address, |conn| family::detect(&conn.query("*IDN?")?))
			.map_err(|e| match e {
				Error::UnsupportedModel(_) => e,
				other => Error::UnsupportedModel(format!("Unable to identify {}: {}", address, other)),
			})
	}

	pub fn identify_only(&self, address:&str) -> Result<IdentificationRecord> {
		self.with_transient(address, |conn| IdentificationRecord::parse(&conn.query("*IDN?")?))
	}

	fn with_transient<R, F>(&self, address:&str, f:F) -> Result<R>
	where F: FnOnce(&mut C::Connection) -> Result<R> {
		let mut conn = self.connector.open(address)?;
		let result = f(&mut conn);
		if let Err(e) = conn.close() {
			log::warn!("Unable to close identification connection to {}: {}", address, e);
		}
		result
	}

}

// LAN instrument with default transport settings
pub fn connect(address:&str, hint:Option<ModelFamily>) -> Result<FunctionGenerator<Vxi11Connection>> {
	SiglentFactory::new(Vxi11Connector::default()).create(address, hint)
}

pub fn detect_only(address:&str) -> Result<ModelFamily> {
	SiglentFactory::new(Vxi11Connector::default()).detect_only(address)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transport::{MockConnector, MockInstrument};

	#[test]
	fn hint_skips_identification() {
		let connector = MockConnector::new(MockInstrument::new());
		let g = SiglentFactory::new(&connector).create("TCPIP::sdg::INSTR", Some(ModelFamily::Sdg2000x)).unwrap();
		assert_eq!(g.family(), ModelFamily::Sdg2000x);
		assert!(connector.instrument.queries().is_empty());
		assert_eq!(connector.instrument.opened().len(), 1);
	}

	#[test]
	fn detection_uses_its_own_connection() {
		let connector = MockConnector::new(MockInstrument::with_idn("Siglent Technologies,SDG1025,S,F"));
		let g = SiglentFactory::new(&connector).create("sdg", None).unwrap();
		assert_eq!(g.family(), ModelFamily::Sdg1000);
		assert_eq!(connector.instrument.opened().len(), 2);
		assert_eq!(connector.instrument.closed(), 1);
		assert_eq!(connector.instrument.queries(), vec!["*IDN?"]);
	}

	#[test]
	fn unimplemented_family_is_reported_after_closing() {
		let connector = MockConnector::new(MockInstrument::with_idn("Siglent,SDG6032X,S,F"));
		let factory = SiglentFactory::new(&connector);
		assert_eq!(factory.detect_only("sdg").unwrap(), ModelFamily::Sdg6000x);
		assert!(matches!(factory.create("sdg", None), Err(Error::UnsupportedModel(_))));
		assert!(matches!(factory.create("sdg", Some(ModelFamily::Sdg6000x)), Err(Error::UnsupportedModel(_))));
		assert_eq!(connector.instrument.live_connections(), 0);
	}

	#[test]
	fn transport_failures_while_identifying_become_unsupported_model() {
		let silent = MockConnector::new(MockInstrument::new());
		assert!(matches!(SiglentFactory::new(&silent).detect_only("sdg"), Err(Error::UnsupportedModel(_))));
		assert_eq!(silent.instrument.live_connections(), 0);

		let refusing = MockConnector::refusing();
		assert!(matches!(SiglentFactory::new(&refusing).create("sdg", None), Err(Error::UnsupportedModel(_))));
		// Outside detection the open error comes through as is
		assert!(matches!(SiglentFactory::new(&refusing).create("sdg", Some(ModelFamily::Sdg1000)), Err(Error::Transport(_))));
	}
}
