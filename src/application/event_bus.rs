//! In-process event bus keyed by event type tag

use crate::domain::events::DomainEvent;
use crate::ports::event_publisher::{EventPublisher, PublishError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Event handler failed: {0}")]
pub struct HandlerError(pub String);

/// Subscriber to published domain events
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError>;
}

/// Dispatches each published event to the handlers registered for its type
///
/// A failing handler is logged and the remaining handlers still run.
#[derive(Default)]
pub struct InMemoryEventBus {
    subscribers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        self.subscribers
            .write()
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
        debug!(event_type, "Event handler subscribed");
    }

    /// Remove `handler` from `event_type`; returns whether it was registered
    pub fn unsubscribe(&self, event_type: &str, handler: &Arc<dyn EventHandler>) -> bool {
        let mut subscribers = self.subscribers.write();
        let Some(handlers) = subscribers.get_mut(event_type) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|h| !Arc::ptr_eq(h, handler));
        let removed = handlers.len() < before;
        if handlers.is_empty() {
            subscribers.remove(event_type);
        }
        removed
    }

    pub fn subscription_count(&self, event_type: &str) -> usize {
        self.subscribers
            .read()
            .get(event_type)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        let event_type = event.event_type();
        let handlers = self
            .subscribers
            .read()
            .get(event_type)
            .cloned()
            .unwrap_or_default();

        debug!(event_type, handler_count = handlers.len(), "Publishing event");
        for handler in handlers {
            if let Err(e) = handler.handle(event).await {
                warn!(event_type, event_id = %event.event_id(), error = %e, "Event handler failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::event_types;
    use crate::domain::identifiers::AnalysisId;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
            self.seen.lock().push(event.event_type().to_string());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl EventHandler for Failing {
        async fn handle(&self, _event: &DomainEvent) -> Result<(), HandlerError> {
            Err(HandlerError("boom".to_string()))
        }
    }

    fn completed() -> DomainEvent {
        DomainEvent::analysis_completed(AnalysisId::generate(), "-90,-50:0,0".to_string(), 1, 0.5)
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers_of_type() {
        let bus = InMemoryEventBus::new();
        let recorder = Arc::new(Recorder::default());
        let other = Arc::new(Recorder::default());
        bus.subscribe(event_types::ANALYSIS_COMPLETED, recorder.clone());
        bus.subscribe(event_types::DATA_QUALITY_ALERT, other.clone());

        bus.publish(&completed()).await.unwrap();

        assert_eq!(*recorder.seen.lock(), vec!["analysis_completed".to_string()]);
        assert!(other.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_block_others() {
        let bus = InMemoryEventBus::new();
        let recorder = Arc::new(Recorder::default());
        bus.subscribe(event_types::ANALYSIS_COMPLETED, Arc::new(Failing));
        bus.subscribe(event_types::ANALYSIS_COMPLETED, recorder.clone());

        assert!(bus.publish(&completed()).await.is_ok());
        assert_eq!(recorder.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let bus = InMemoryEventBus::new();
        let handler: Arc<dyn EventHandler> = Arc::new(Recorder::default());
        bus.subscribe(event_types::ANALYSIS_COMPLETED, handler.clone());
        assert_eq!(bus.subscription_count(event_types::ANALYSIS_COMPLETED), 1);

        assert!(bus.unsubscribe(event_types::ANALYSIS_COMPLETED, &handler));
        assert!(!bus.unsubscribe(event_types::ANALYSIS_COMPLETED, &handler));
        assert_eq!(bus.subscription_count(event_types::ANALYSIS_COMPLETED), 0);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_succeeds() {
        let bus = InMemoryEventBus::new();
        assert!(bus.publish(&completed()).await.is_ok());
    }
}
