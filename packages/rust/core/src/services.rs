//! Collaborator contracts consumed by the mapping pipeline.
//!
//! Every external dependency of the pipeline — picker, existence lookup,
//! user confirmation, admin grants, persistence, permission cache — is an
//! async trait injected by the caller. The core never talks to a concrete
//! transport; `docmap-storage` and the CLI provide the default
//! implementations.

use async_trait::async_trait;
use docmap_shared::{Document, ExistenceStatus, FileDescriptor, Result};

// ---------------------------------------------------------------------------
// Picker gateway
// ---------------------------------------------------------------------------

/// Outcome of a picker interaction. Closing the picker without selecting
/// anything is a valid terminal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    /// The user selected one or more files.
    Picked(Vec<FileDescriptor>),
    /// The user closed the picker before selecting.
    Cancelled,
}

/// External file picker producing the selection that seeds a run.
#[async_trait]
pub trait PickerGateway: Send + Sync {
    async fn pick(&self) -> Result<PickOutcome>;
}

// ---------------------------------------------------------------------------
// Existence service
// ---------------------------------------------------------------------------

/// Batched lookup of tracked documents by external id.
///
/// Implementations return one status per requested id, in any order.
/// A transport failure fails the whole pipeline run; there is no
/// partial-result fallback.
#[async_trait]
pub trait ExistenceService: Send + Sync {
    async fn lookup(&self, external_ids: &[String]) -> Result<Vec<ExistenceStatus>>;
}

// ---------------------------------------------------------------------------
// Confirmation service
// ---------------------------------------------------------------------------

/// A templated confirmation request: message text plus button labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub message: String,
    pub proceed_label: String,
    pub cancel_label: String,
}

impl ConfirmPrompt {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            proceed_label: "Proceed".into(),
            cancel_label: "Cancel".into(),
        }
    }
}

/// The user's answer. Declining is a value, never an error; exactly one
/// decision is produced per prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmDecision {
    Proceed,
    Decline,
}

/// User-facing yes/no gate shown before reconciling existing documents.
#[async_trait]
pub trait ConfirmationService: Send + Sync {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> Result<ConfirmDecision>;
}

// ---------------------------------------------------------------------------
// Admin grant service
// ---------------------------------------------------------------------------

/// Elevates the current user to administrator on each matched document.
/// The batch succeeds or fails as a unit.
#[async_trait]
pub trait AdminGrantService: Send + Sync {
    async fn grant_admin(&self, external_ids: &[String]) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Persistence service
// ---------------------------------------------------------------------------

/// Persists newly constructed document records, one call per document.
#[async_trait]
pub trait PersistenceService: Send + Sync {
    async fn save(&self, document: Document) -> Result<Document>;
}

// ---------------------------------------------------------------------------
// Permission cache
// ---------------------------------------------------------------------------

/// Global permission cache refreshed before the mapping notification is
/// published. Internals are the collaborator's concern.
#[async_trait]
pub trait PermissionCache: Send + Sync {
    async fn refresh(&self) -> Result<()>;
}
