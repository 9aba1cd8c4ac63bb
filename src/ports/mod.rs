//! Capability ports consumed by the analysis core
//!
//! Adapters are constructed by the caller and injected as `Arc<dyn ...>`.

pub mod coordinate_transform;
pub mod event_publisher;
pub mod flux_data;

pub use coordinate_transform::{CoordinateTransformPort, MagneticField, ModelInfo, TransformError};
pub use event_publisher::{EventPublisher, PublishError};
pub use flux_data::{
    DataAvailability, FluxDataError, FluxDataPort, SourceDescription, TemporalResolution,
    TimeRange,
};
