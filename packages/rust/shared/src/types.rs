//! Core domain types for the document mapping pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// DocumentId / ContextId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for document identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    /// Generate a new time-sortable document identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier of a document's evidence context. Every freshly created
/// document gets its own empty context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(pub Uuid);

impl ContextId {
    /// Mint a fresh empty context.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ContextId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// FileDescriptor
// ---------------------------------------------------------------------------

/// A file selected through the picker gateway.
///
/// Immutable; lives only for the duration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Identifier assigned by the file-picker source, used to correlate
    /// picked files with already-tracked documents.
    pub external_id: String,
    /// Display title of the file.
    pub title: String,
}

impl FileDescriptor {
    pub fn new(external_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            title: title.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ObjectRef / ExistenceStatus
// ---------------------------------------------------------------------------

/// Opaque reference to an already-tracked document record, as returned by
/// the existence service. Only the reconciliation step unwraps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: DocumentId,
    pub title: String,
    pub source_external_id: String,
    pub context_id: ContextId,
    pub created_at: DateTime<Utc>,
}

/// Per-file answer from the existence service.
///
/// Order relative to the input batch is not guaranteed; consumers match
/// by `external_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistenceStatus {
    pub external_id: String,
    pub exists: bool,
    pub object_ref: Option<ObjectRef>,
}

impl ExistenceStatus {
    /// Status for a file that already has a tracked document.
    pub fn found(external_id: impl Into<String>, object_ref: ObjectRef) -> Self {
        Self {
            external_id: external_id.into(),
            exists: true,
            object_ref: Some(object_ref),
        }
    }

    /// Status for a file with no matching document.
    pub fn missing(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            exists: false,
            object_ref: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A tracked document. Owned by the persistence layer once saved; the
/// pipeline holds only a transient copy for the duration of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    /// External id of the picked file this document was created from.
    pub source_external_id: String,
    pub context_id: ContextId,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Wrap an existing tracked record admitted through reconciliation.
    pub fn from_existing(object_ref: ObjectRef) -> Self {
        Self {
            id: object_ref.id,
            title: object_ref.title,
            source_external_id: object_ref.source_external_id,
            context_id: object_ref.context_id,
            created_at: object_ref.created_at,
        }
    }

    /// Construct a new, not-yet-persisted document from a picked file,
    /// with a fresh empty context.
    pub fn draft(file: &FileDescriptor) -> Self {
        Self {
            id: DocumentId::new(),
            title: file.title.clone(),
            source_external_id: file.external_id.clone(),
            context_id: ContextId::new(),
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// ParentRef
// ---------------------------------------------------------------------------

/// The entity that resulting documents are mapped to. Externally owned;
/// read-only from the pipeline's perspective except as the target of
/// event dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    /// Entity kind, e.g. "assessment" (used in prompt text).
    pub kind: String,
    /// Display title (used in prompt text).
    pub title: String,
    /// Stable identifier of the parent entity.
    pub id: String,
}

impl ParentRef {
    pub fn new(
        kind: impl Into<String>,
        title: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            title: title.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for ParentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} \"{}\"", self.kind, self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_roundtrip() {
        let id = DocumentId::new();
        let s = id.to_string();
        let parsed: DocumentId = s.parse().expect("parse DocumentId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn draft_document_gets_fresh_context() {
        let file = FileDescriptor::new("gdoc-42", "Evidence.pdf");
        let a = Document::draft(&file);
        let b = Document::draft(&file);
        assert_eq!(a.title, "Evidence.pdf");
        assert_eq!(a.source_external_id, "gdoc-42");
        assert_ne!(a.id, b.id);
        assert_ne!(a.context_id, b.context_id);
    }

    #[test]
    fn from_existing_preserves_record_identity() {
        let object_ref = ObjectRef {
            id: DocumentId::new(),
            title: "Policy.pdf".into(),
            source_external_id: "gdoc-7".into(),
            context_id: ContextId::new(),
            created_at: Utc::now(),
        };
        let doc = Document::from_existing(object_ref.clone());
        assert_eq!(doc.id, object_ref.id);
        assert_eq!(doc.context_id, object_ref.context_id);
    }

    #[test]
    fn existence_status_constructors_stay_consistent() {
        let missing = ExistenceStatus::missing("gdoc-1");
        assert!(!missing.exists);
        assert!(missing.object_ref.is_none());

        let object_ref = ObjectRef {
            id: DocumentId::new(),
            title: "x".into(),
            source_external_id: "gdoc-1".into(),
            context_id: ContextId::new(),
            created_at: Utc::now(),
        };
        let found = ExistenceStatus::found("gdoc-1", object_ref);
        assert!(found.exists);
        assert!(found.object_ref.is_some());
    }

    #[test]
    fn document_serialization_roundtrip() {
        let doc = Document::draft(&FileDescriptor::new("gdoc-9", "Report.xlsx"));
        let json = serde_json::to_string(&doc).expect("serialize");
        let parsed: Document = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, doc);
    }
}
