//! Adapters behind the ports

pub mod synthetic_flux;

pub use synthetic_flux::{RetrievalLimits, SyntheticFluxSource};
