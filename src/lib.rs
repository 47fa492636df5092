
// External data representation, a protocol for serializing data to be sent over the network
pub mod xdr;

// Remote procedure call, a protocol build on top of XDR to provide something like C-style function calls over the network
pub mod rpc;

// A protocol using RPC that's meant to communicate with instruments like oscilloscopes, power supplies, waveform generators, etc
pub mod vxi11;

// Crate-wide error type
pub mod error;

// Transport and instrument settings, loadable from JSON
pub mod config;

// Command/response transports: VXI-11 over the LAN, and a scripted mock
pub mod transport;

// Siglent SDG function generators: model detection, capability profiles, the validating facade
pub mod devices;

pub use crate::config::{ContextPolicy, InstrumentConfig, TransportConfig};
pub use crate::devices::{Channel, Load, ModulationKind, Polarity, SweepKind, TriggerSource, WaveformKind};
pub use crate::devices::factory::SiglentFactory;
pub use crate::devices::family::{detect, validate_name, IdentificationRecord, ModelFamily};
pub use crate::devices::generator::{BurstSettings, FunctionGenerator, ModulationSettings, SweepSettings};
pub use crate::devices::profile::{profile_for, CapabilityProfile};
pub use crate::error::{Bound, Error, RangeError, Result};
pub use crate::transport::{Connector, Transport};
