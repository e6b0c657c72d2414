//! New-document branch: construct and persist records for unmatched files.

use std::sync::Arc;

use tracing::{debug, warn};

use docmap_shared::{CreationFailure, DocMapError, Document, FileDescriptor, ParentRef, Result};

use crate::events::{MappingEvent, NotificationSink};
use crate::services::PersistenceService;

/// Create one document per unmatched file and persist all of them
/// concurrently.
///
/// - Empty input resolves immediately with no lifecycle events.
/// - A before-create notification fires once, before any save starts; it is
///   not awaited and does not block creation.
/// - The whole batch settles before the outcome is decided: any save
///   failure dispatches a create-failed notification and rejects the branch
///   with the aggregate error. Already-saved documents are neither rolled
///   back nor separately reported.
/// - On full success the saved documents come back in selection order.
pub async fn create_new(
    files: &[FileDescriptor],
    parent: &ParentRef,
    persistence: &Arc<dyn PersistenceService>,
    sink: &dyn NotificationSink,
) -> Result<Vec<Document>> {
    if files.is_empty() {
        return Ok(Vec::new());
    }

    sink.dispatch(
        parent,
        MappingEvent::BeforeDocumentCreate { count: files.len() },
    );

    let mut handles = Vec::with_capacity(files.len());
    for file in files {
        let draft = Document::draft(file);
        debug!(external_id = %file.external_id, id = %draft.id, "persisting new document");
        let persistence = Arc::clone(persistence);
        let external_id = file.external_id.clone();
        handles.push((
            external_id,
            tokio::spawn(async move { persistence.save(draft).await }),
        ));
    }

    let mut saved = Vec::with_capacity(files.len());
    let mut failures = Vec::new();
    for (external_id, handle) in handles {
        match handle.await {
            Ok(Ok(document)) => saved.push(document),
            Ok(Err(e)) => {
                warn!(%external_id, error = %e, "document save failed");
                failures.push(CreationFailure {
                    external_id,
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                warn!(%external_id, error = %e, "save task failed");
                failures.push(CreationFailure {
                    external_id,
                    reason: format!("save task failed: {e}"),
                });
            }
        }
    }

    if !failures.is_empty() {
        sink.dispatch(
            parent,
            MappingEvent::DocumentCreateFailed {
                failures: failures.clone(),
            },
        );
        return Err(DocMapError::Creation { failures });
    }

    Ok(saved)
}
