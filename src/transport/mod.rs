//! Transport layer for talking to external model processes
//!
//! Only the subprocess transport exists today; HTTP backends live with their
//! providers.

pub mod subprocess;

pub use subprocess::{CommandBuilder, JsonLineCodec, PhaseCell, ProcessSession, ProviderPhase};
