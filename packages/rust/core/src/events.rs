//! Lifecycle notifications published on the parent entity.
//!
//! The pipeline's only externally observable signals are the three events
//! here. Listeners (mapper UI, counters) live outside the core; the
//! orchestrator is handed a [`NotificationSink`] by its caller.

use docmap_shared::{CreationFailure, Document, ParentRef};
use serde::Serialize;

/// A typed notification payload dispatched on the parent entity.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MappingEvent {
    /// Fired once before the new-document branch starts persisting.
    BeforeDocumentCreate { count: usize },
    /// Fired when any save in the creation batch fails, before the branch
    /// rejects with the aggregate error.
    DocumentCreateFailed { failures: Vec<CreationFailure> },
    /// The single success signal of a run: the full merged document set,
    /// possibly empty.
    ObjectsMapped { documents: Vec<Document> },
}

/// Fire-and-forget event dispatch. Implementations must not block; the
/// pipeline never awaits a dispatch.
pub trait NotificationSink: Send + Sync {
    fn dispatch(&self, parent: &ParentRef, event: MappingEvent);
}

/// Sink that forwards events to `tracing` (headless usage).
pub struct LogSink;

impl NotificationSink for LogSink {
    fn dispatch(&self, parent: &ParentRef, event: MappingEvent) {
        match &event {
            MappingEvent::BeforeDocumentCreate { count } => {
                tracing::info!(parent = %parent, count, "creating documents");
            }
            MappingEvent::DocumentCreateFailed { failures } => {
                tracing::warn!(parent = %parent, failed = failures.len(), "document creation failed");
            }
            MappingEvent::ObjectsMapped { documents } => {
                tracing::info!(parent = %parent, mapped = documents.len(), "objects mapped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmap_shared::FileDescriptor;

    #[test]
    fn event_payload_serialization() {
        let event = MappingEvent::BeforeDocumentCreate { count: 3 };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["event"], "before_document_create");
        assert_eq!(json["count"], 3);

        let doc = Document::draft(&FileDescriptor::new("gdoc-1", "Evidence.pdf"));
        let event = MappingEvent::ObjectsMapped {
            documents: vec![doc],
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["event"], "objects_mapped");
        assert_eq!(json["documents"][0]["title"], "Evidence.pdf");
    }
}
