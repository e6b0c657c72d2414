//! Existing-document branch: confirmation gate plus admin grant.

use tracing::{debug, info};

use docmap_shared::{DocMapError, Document, ExistenceStatus, ParentRef, Result};

use crate::services::{AdminGrantService, ConfirmDecision, ConfirmPrompt, ConfirmationService};

/// Build the count-sensitive reconciliation prompt for a set of matches.
pub(crate) fn reconcile_prompt(matches: &[ExistenceStatus], parent: &ParentRef) -> ConfirmPrompt {
    let message = if matches.len() == 1 {
        format!(
            "1 file is already mapped to {parent}. Proceeding will grant you \
             admin access to the existing document."
        )
    } else {
        format!(
            "{} files are already mapped to {parent}. Proceeding will grant you \
             admin access to the existing documents.",
            matches.len()
        )
    };
    ConfirmPrompt::new(message)
}

/// Reconcile files that already have tracked documents.
///
/// - Empty input resolves immediately with no prompt.
/// - Decline resolves with an empty list; it is a valid terminal outcome,
///   not an error.
/// - Proceed issues a single batched admin grant for all matched external
///   ids, then wraps each underlying record into a [`Document`]. A grant
///   failure rejects the whole branch.
pub async fn reconcile_existing(
    matches: Vec<ExistenceStatus>,
    parent: &ParentRef,
    confirmation: &dyn ConfirmationService,
    grants: &dyn AdminGrantService,
) -> Result<Vec<Document>> {
    if matches.is_empty() {
        return Ok(Vec::new());
    }

    let prompt = reconcile_prompt(&matches, parent);
    match confirmation.confirm(&prompt).await? {
        ConfirmDecision::Decline => {
            debug!(matches = matches.len(), "reconciliation declined");
            Ok(Vec::new())
        }
        ConfirmDecision::Proceed => {
            let ids: Vec<String> = matches.iter().map(|m| m.external_id.clone()).collect();
            grants.grant_admin(&ids).await?;
            info!(granted = ids.len(), "admin access granted on existing documents");

            matches
                .into_iter()
                .map(|status| {
                    let external_id = status.external_id;
                    status
                        .object_ref
                        .map(Document::from_existing)
                        .ok_or_else(|| {
                            DocMapError::validation(format!(
                                "existence status for {external_id} reports a match \
                                 but carries no object reference"
                            ))
                        })
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_uses_singular_for_one_match() {
        let parent = ParentRef::new("assessment", "Q1 Security Review", "asmt-1");
        let matches = vec![ExistenceStatus::missing("A")];
        let prompt = reconcile_prompt(&matches, &parent);
        assert!(
            prompt
                .message
                .starts_with("1 file is already mapped to assessment \"Q1 Security Review\"")
        );
        assert_eq!(prompt.proceed_label, "Proceed");
    }

    #[test]
    fn prompt_uses_plural_for_many_matches() {
        let parent = ParentRef::new("audit", "FY26 Audit", "audit-9");
        let matches = vec![
            ExistenceStatus::missing("A"),
            ExistenceStatus::missing("B"),
            ExistenceStatus::missing("C"),
        ];
        let prompt = reconcile_prompt(&matches, &parent);
        assert!(prompt.message.starts_with("3 files are already mapped"));
        assert!(prompt.message.contains("audit \"FY26 Audit\""));
    }
}
