//! End-to-end mapping pipeline: pick → resolve → reconcile/create → finalize.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use docmap_shared::{DocMapError, Document, FileDescriptor, ParentRef, Result};

use crate::create;
use crate::events::{MappingEvent, NotificationSink};
use crate::reconcile;
use crate::resolve::{self, Partition};
use crate::services::{
    AdminGrantService, ConfirmationService, ExistenceService, PermissionCache,
    PersistenceService, PickOutcome, PickerGateway,
};

/// The collaborator set a [`DocumentMapper`] is wired with.
pub struct Collaborators {
    pub existence: Arc<dyn ExistenceService>,
    pub confirmation: Arc<dyn ConfirmationService>,
    pub grants: Arc<dyn AdminGrantService>,
    pub persistence: Arc<dyn PersistenceService>,
    pub permissions: Arc<dyn PermissionCache>,
    pub sink: Arc<dyn NotificationSink>,
}

/// Summary of a completed mapping run.
#[derive(Debug)]
pub struct RunReport {
    /// The full merged document set, existing documents first.
    pub documents: Vec<Document>,
    /// How many documents were admitted through reconciliation.
    pub existing_admitted: usize,
    /// How many documents were freshly created.
    pub created: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Outcome of a picker-driven invocation.
#[derive(Debug)]
pub enum MapOutcome {
    /// The picker was closed without a selection; nothing ran.
    Cancelled,
    /// The pipeline ran to completion.
    Completed(RunReport),
}

/// Orchestrates one fixed pipeline shape for a single parent entity.
///
/// Each run is an independent fork/join: the existing-document and
/// new-document branches progress concurrently and both settle before the
/// run proceeds. There is no cross-run locking or deduplication.
pub struct DocumentMapper {
    parent: ParentRef,
    existence: Arc<dyn ExistenceService>,
    confirmation: Arc<dyn ConfirmationService>,
    grants: Arc<dyn AdminGrantService>,
    persistence: Arc<dyn PersistenceService>,
    permissions: Arc<dyn PermissionCache>,
    sink: Arc<dyn NotificationSink>,
}

impl DocumentMapper {
    /// Create a mapper for `parent` wired with the given collaborators.
    pub fn new(parent: ParentRef, collaborators: Collaborators) -> Self {
        Self {
            parent,
            existence: collaborators.existence,
            confirmation: collaborators.confirmation,
            grants: collaborators.grants,
            persistence: collaborators.persistence,
            permissions: collaborators.permissions,
            sink: collaborators.sink,
        }
    }

    /// Drive a full interaction starting at the picker.
    ///
    /// Picker cancellation short-circuits with zero side effects: no
    /// existence check, no prompt, no creation, no notification.
    pub async fn run_from_picker(&self, picker: &dyn PickerGateway) -> Result<MapOutcome> {
        match picker.pick().await? {
            PickOutcome::Cancelled => {
                info!(parent = %self.parent, "picker closed without a selection");
                Ok(MapOutcome::Cancelled)
            }
            PickOutcome::Picked(files) => Ok(MapOutcome::Completed(self.run(files).await?)),
        }
    }

    /// Run the pipeline for an already-picked selection.
    ///
    /// 1. Resolve existence (sequential prerequisite)
    /// 2. Partition into existing matches and new files
    /// 3. Reconcile and create concurrently; wait for both to settle
    /// 4. Merge, existing documents first
    /// 5. Finalize: permission refresh, then the mapping notification
    ///
    /// Either branch failing fails the run with no finalize call; whatever
    /// the surviving branch persisted stays persisted.
    #[instrument(skip_all, fields(parent = %self.parent, files = files.len()))]
    pub async fn run(&self, files: Vec<FileDescriptor>) -> Result<RunReport> {
        let start = Instant::now();

        // Zero input never reaches the existence service: finalize straight
        // away so listeners still see the (empty) mapping notification.
        if files.is_empty() {
            self.finalize(Vec::new()).await?;
            return Ok(RunReport {
                documents: Vec::new(),
                existing_admitted: 0,
                created: 0,
                elapsed: start.elapsed(),
            });
        }

        let statuses = resolve::resolve_existence(&files, self.existence.as_ref()).await?;
        let Partition {
            existing,
            new_files,
        } = resolve::partition(&files, statuses);

        info!(
            existing = existing.len(),
            new = new_files.len(),
            "selection partitioned"
        );

        let (existing_result, created_result) = tokio::join!(
            reconcile::reconcile_existing(
                existing,
                &self.parent,
                self.confirmation.as_ref(),
                self.grants.as_ref(),
            ),
            create::create_new(
                &new_files,
                &self.parent,
                &self.persistence,
                self.sink.as_ref(),
            ),
        );

        // Both branches have settled. On a dual failure the reconciliation
        // error is reported; the creation branch already surfaced its own
        // failure through the create-failed notification.
        let admitted = existing_result?;
        let created_docs = created_result?;

        let existing_admitted = admitted.len();
        let created = created_docs.len();

        let mut documents = admitted;
        documents.extend(created_docs);

        self.finalize(documents.clone()).await?;

        let report = RunReport {
            documents,
            existing_admitted,
            created,
            elapsed: start.elapsed(),
        };

        info!(
            mapped = report.documents.len(),
            admitted = report.existing_admitted,
            created = report.created,
            elapsed_ms = report.elapsed.as_millis(),
            "mapping run complete"
        );

        Ok(report)
    }

    /// Refresh the permission cache (skipped for an empty set), then
    /// publish the single objects-mapped notification.
    async fn finalize(&self, documents: Vec<Document>) -> Result<()> {
        if !documents.is_empty() {
            self.permissions.refresh().await.map_err(|e| match e {
                refresh @ DocMapError::PermissionRefresh(_) => refresh,
                other => DocMapError::PermissionRefresh(other.to_string()),
            })?;
        }

        self.sink
            .dispatch(&self.parent, MappingEvent::ObjectsMapped { documents });
        Ok(())
    }
}
