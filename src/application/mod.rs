//! Application services
//!
//! The orchestrator coordinates domain logic with the injected ports; the
//! event bus is the in-process event sink.

pub mod analysis;
pub mod event_bus;

pub use analysis::{
    AnalysisError, AnalysisMetadata, AnalysisOrchestrator, AnalysisRequest, AnalysisResult,
};
pub use event_bus::{EventHandler, HandlerError, InMemoryEventBus};
