//! Existence resolution and partitioning of a picked selection.

use std::collections::HashSet;

use tracing::debug;

use docmap_shared::{DocMapError, ExistenceStatus, FileDescriptor, Result};

use crate::services::ExistenceService;

/// Issue one batched existence query for the whole selection.
///
/// The result must contain exactly one status per input file; anything else
/// is treated as a service failure. Callers match statuses to files by
/// external id, not by position.
pub async fn resolve_existence(
    files: &[FileDescriptor],
    service: &dyn ExistenceService,
) -> Result<Vec<ExistenceStatus>> {
    let ids: Vec<String> = files.iter().map(|f| f.external_id.clone()).collect();
    let statuses = service.lookup(&ids).await?;

    if statuses.len() != files.len() {
        return Err(DocMapError::ExistenceQuery(format!(
            "existence service returned {} statuses for {} files",
            statuses.len(),
            files.len()
        )));
    }

    debug!(
        files = files.len(),
        existing = statuses.iter().filter(|s| s.exists).count(),
        "existence resolved"
    );
    Ok(statuses)
}

/// Result of splitting a selection into its two pipeline branches.
#[derive(Debug)]
pub struct Partition {
    /// Statuses of files that already have a tracked document.
    pub existing: Vec<ExistenceStatus>,
    /// Files with no matching document, in original selection order.
    pub new_files: Vec<FileDescriptor>,
}

/// Pure classification step: no side effects, no I/O.
pub fn partition(files: &[FileDescriptor], statuses: Vec<ExistenceStatus>) -> Partition {
    let mut existing = Vec::new();
    let mut matched_ids: HashSet<String> = HashSet::new();

    for status in statuses {
        if status.exists {
            matched_ids.insert(status.external_id.clone());
            existing.push(status);
        }
    }

    let new_files = files
        .iter()
        .filter(|f| !matched_ids.contains(&f.external_id))
        .cloned()
        .collect();

    Partition {
        existing,
        new_files,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docmap_shared::{ContextId, DocumentId, ObjectRef};

    fn object_ref(external_id: &str) -> ObjectRef {
        ObjectRef {
            id: DocumentId::new(),
            title: format!("{external_id}.pdf"),
            source_external_id: external_id.into(),
            context_id: ContextId::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn partition_splits_by_existence() {
        let files = vec![
            FileDescriptor::new("A", "a.pdf"),
            FileDescriptor::new("B", "b.pdf"),
            FileDescriptor::new("C", "c.pdf"),
        ];
        let statuses = vec![
            ExistenceStatus::missing("B"),
            ExistenceStatus::found("A", object_ref("A")),
            ExistenceStatus::missing("C"),
        ];

        let partition = partition(&files, statuses);
        assert_eq!(partition.existing.len(), 1);
        assert_eq!(partition.existing[0].external_id, "A");
        let new_ids: Vec<_> = partition
            .new_files
            .iter()
            .map(|f| f.external_id.as_str())
            .collect();
        assert_eq!(new_ids, ["B", "C"]);
    }

    #[test]
    fn partition_matches_by_id_not_position() {
        // Statuses arrive in reverse order relative to the selection.
        let files = vec![
            FileDescriptor::new("A", "a.pdf"),
            FileDescriptor::new("B", "b.pdf"),
        ];
        let statuses = vec![
            ExistenceStatus::found("B", object_ref("B")),
            ExistenceStatus::missing("A"),
        ];

        let partition = partition(&files, statuses);
        assert_eq!(partition.existing[0].external_id, "B");
        assert_eq!(partition.new_files[0].external_id, "A");
    }

    #[test]
    fn partition_of_empty_selection_is_empty() {
        let partition = partition(&[], vec![]);
        assert!(partition.existing.is_empty());
        assert!(partition.new_files.is_empty());
    }

    #[test]
    fn partition_all_existing_leaves_no_new_files() {
        let files = vec![FileDescriptor::new("A", "a.pdf")];
        let statuses = vec![ExistenceStatus::found("A", object_ref("A"))];
        let partition = partition(&files, statuses);
        assert_eq!(partition.existing.len(), 1);
        assert!(partition.new_files.is_empty());
    }
}
