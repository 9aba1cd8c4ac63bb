//! Event sink port

use crate::domain::events::DomainEvent;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PublishError {
    #[error("Event sink unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to encode event: {0}")]
    Encoding(String),
}

/// Destination for domain events
///
/// Publication is best effort from the caller's point of view; callers log
/// failures rather than abort.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError>;
}
