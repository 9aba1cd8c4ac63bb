//! Domain types and business logic for SAA analysis
//!
//! Validated value objects for geometry and flux, the anomaly entity and the
//! domain events it records.

pub mod anomaly;
pub mod coordinates;
pub mod errors;
pub mod events;
pub mod flux;
pub mod identifiers;

pub use anomaly::SaaAnomaly;
pub use coordinates::*;
pub use errors::ValidationError;
pub use events::{DomainEvent, HealthStatus, Severity};
pub use flux::*;
pub use identifiers::*;
