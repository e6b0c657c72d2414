//! libSQL document store (offline mode).
//!
//! The [`Storage`] struct wraps a libSQL database holding tracked documents,
//! admin grants, and permission-refresh history, and provides the default
//! implementations of the pipeline's existence, persistence, admin-grant,
//! and permission-cache contracts.

mod migrations;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, Value, params};

use docmap_core::services::{
    AdminGrantService, ExistenceService, PermissionCache, PersistenceService,
};
use docmap_shared::{
    ContextId, DocMapError, Document, DocumentId, ExistenceStatus, ObjectRef, Result,
};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
    /// Actor recorded on admin grants.
    actor: String,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DocMapError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DocMapError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DocMapError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
            actor: "local".into(),
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DocMapError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DocMapError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
            actor: "local".into(),
        })
    }

    /// Set the actor recorded on subsequent admin grants.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    DocMapError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(DocMapError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Document operations
    // -----------------------------------------------------------------------

    /// Insert a new document record.
    pub async fn insert_document(&self, document: &Document) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO documents (id, title, source_external_id, context_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    document.id.to_string(),
                    document.title.as_str(),
                    document.source_external_id.as_str(),
                    document.context_id.to_string(),
                    document.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DocMapError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Batched existence lookup: one status per requested external id, in
    /// request order.
    pub async fn find_by_external_ids(
        &self,
        external_ids: &[String],
    ) -> Result<Vec<ExistenceStatus>> {
        if external_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (1..=external_ids.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT id, title, source_external_id, context_id, created_at
             FROM documents WHERE source_external_id IN ({placeholders})"
        );
        let args: Vec<Value> = external_ids
            .iter()
            .map(|id| Value::Text(id.clone()))
            .collect();

        let mut rows = self
            .conn
            .query(&sql, args)
            .await
            .map_err(|e| DocMapError::Storage(e.to_string()))?;

        let mut found: Vec<ObjectRef> = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DocMapError::Storage(e.to_string()))?
        {
            found.push(object_ref_from_row(&row)?);
        }

        Ok(external_ids
            .iter()
            .map(|id| {
                match found.iter().find(|r| &r.source_external_id == id) {
                    Some(object_ref) => ExistenceStatus::found(id.clone(), object_ref.clone()),
                    None => ExistenceStatus::missing(id.clone()),
                }
            })
            .collect())
    }

    /// List all tracked documents, oldest first.
    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, title, source_external_id, context_id, created_at
                 FROM documents ORDER BY created_at ASC",
                params![],
            )
            .await
            .map_err(|e| DocMapError::Storage(e.to_string()))?;

        let mut documents = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DocMapError::Storage(e.to_string()))?
        {
            let object_ref = object_ref_from_row(&row)?;
            documents.push(Document::from_existing(object_ref));
        }
        Ok(documents)
    }

    // -----------------------------------------------------------------------
    // Admin grant operations
    // -----------------------------------------------------------------------

    /// Grant the configured actor admin access on every document matched by
    /// `external_ids`. The batch succeeds or fails as a unit; re-granting
    /// is a no-op.
    pub async fn grant_admin_for(&self, external_ids: &[String]) -> Result<()> {
        self.check_writable()?;

        let statuses = self.find_by_external_ids(external_ids).await?;
        let mut document_ids = Vec::with_capacity(statuses.len());
        for status in statuses {
            match status.object_ref {
                Some(object_ref) => document_ids.push(object_ref.id),
                None => {
                    return Err(DocMapError::AdminGrant(format!(
                        "no tracked document for external id {}",
                        status.external_id
                    )));
                }
            }
        }

        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| DocMapError::Storage(e.to_string()))?;

        let now = Utc::now().to_rfc3339();
        for document_id in &document_ids {
            tx.execute(
                "INSERT INTO document_admins (document_id, actor, granted_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(document_id, actor) DO NOTHING",
                params![document_id.to_string(), self.actor.as_str(), now.as_str()],
            )
            .await
            .map_err(|e| DocMapError::Storage(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| DocMapError::Storage(e.to_string()))?;

        tracing::debug!(
            granted = document_ids.len(),
            actor = %self.actor,
            "admin grants recorded"
        );
        Ok(())
    }

    /// List actors holding admin access on the document matched by
    /// `external_id`.
    pub async fn list_admins(&self, external_id: &str) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT a.actor FROM document_admins a
                 JOIN documents d ON d.id = a.document_id
                 WHERE d.source_external_id = ?1
                 ORDER BY a.actor ASC",
                params![external_id],
            )
            .await
            .map_err(|e| DocMapError::Storage(e.to_string()))?;

        let mut actors = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DocMapError::Storage(e.to_string()))?
        {
            actors.push(
                row.get::<String>(0)
                    .map_err(|e| DocMapError::Storage(e.to_string()))?,
            );
        }
        Ok(actors)
    }

    // -----------------------------------------------------------------------
    // Permission cache operations
    // -----------------------------------------------------------------------

    /// Append a permission refresh snapshot.
    pub async fn record_permission_refresh(&self) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO permission_snapshots (refreshed_at, document_count)
                 VALUES (?1, (SELECT COUNT(*) FROM documents))",
                params![Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| DocMapError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Number of recorded permission refreshes.
    pub async fn permission_refresh_count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM permission_snapshots", params![])
            .await
            .map_err(|e| DocMapError::Storage(e.to_string()))?;

        match rows
            .next()
            .await
            .map_err(|e| DocMapError::Storage(e.to_string()))?
        {
            Some(row) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| DocMapError::Storage(e.to_string()))?;
                Ok(count.max(0) as u64)
            }
            None => Ok(0),
        }
    }
}

/// Parse a document row in (id, title, source_external_id, context_id,
/// created_at) column order.
fn object_ref_from_row(row: &libsql::Row) -> Result<ObjectRef> {
    let id: String = row
        .get(0)
        .map_err(|e| DocMapError::Storage(e.to_string()))?;
    let title: String = row
        .get(1)
        .map_err(|e| DocMapError::Storage(e.to_string()))?;
    let source_external_id: String = row
        .get(2)
        .map_err(|e| DocMapError::Storage(e.to_string()))?;
    let context_id: String = row
        .get(3)
        .map_err(|e| DocMapError::Storage(e.to_string()))?;
    let created_at: String = row
        .get(4)
        .map_err(|e| DocMapError::Storage(e.to_string()))?;

    Ok(ObjectRef {
        id: id
            .parse::<DocumentId>()
            .map_err(|e| DocMapError::Storage(format!("bad document id {id}: {e}")))?,
        title,
        source_external_id,
        context_id: context_id
            .parse::<ContextId>()
            .map_err(|e| DocMapError::Storage(format!("bad context id {context_id}: {e}")))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| DocMapError::Storage(format!("bad timestamp {created_at}: {e}")))?
            .with_timezone(&Utc),
    })
}

// ---------------------------------------------------------------------------
// Pipeline collaborator implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl ExistenceService for Storage {
    async fn lookup(&self, external_ids: &[String]) -> Result<Vec<ExistenceStatus>> {
        self.find_by_external_ids(external_ids)
            .await
            .map_err(|e| DocMapError::ExistenceQuery(e.to_string()))
    }
}

#[async_trait]
impl PersistenceService for Storage {
    async fn save(&self, document: Document) -> Result<Document> {
        self.insert_document(&document).await?;
        Ok(document)
    }
}

#[async_trait]
impl AdminGrantService for Storage {
    async fn grant_admin(&self, external_ids: &[String]) -> Result<()> {
        self.grant_admin_for(external_ids).await.map_err(|e| match e {
            grant @ DocMapError::AdminGrant(_) => grant,
            other => DocMapError::AdminGrant(other.to_string()),
        })
    }
}

#[async_trait]
impl PermissionCache for Storage {
    async fn refresh(&self) -> Result<()> {
        self.record_permission_refresh()
            .await
            .map_err(|e| DocMapError::PermissionRefresh(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmap_shared::FileDescriptor;
    use uuid::Uuid;

    fn temp_db() -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("docmap-storage-test-{}", Uuid::now_v7()))
            .join("test.db")
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[tokio::test]
    async fn insert_and_lookup_by_external_id() {
        let path = temp_db();
        let storage = Storage::open(&path).await.unwrap();

        let doc = Document::draft(&FileDescriptor::new("gdoc-1", "Evidence.pdf"));
        storage.insert_document(&doc).await.unwrap();

        let statuses = storage
            .find_by_external_ids(&["gdoc-1".into(), "gdoc-2".into()])
            .await
            .unwrap();
        assert_eq!(statuses.len(), 2);
        assert!(statuses[0].exists);
        assert_eq!(
            statuses[0].object_ref.as_ref().unwrap().id,
            doc.id
        );
        assert!(!statuses[1].exists);

        let all = storage.list_documents().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Evidence.pdf");

        cleanup(&path);
    }

    #[tokio::test]
    async fn grant_admin_is_idempotent() {
        let path = temp_db();
        let storage = Storage::open(&path).await.unwrap().with_actor("auditor");

        let doc = Document::draft(&FileDescriptor::new("gdoc-7", "Policy.pdf"));
        storage.insert_document(&doc).await.unwrap();

        let ids = vec!["gdoc-7".to_string()];
        storage.grant_admin_for(&ids).await.unwrap();
        storage.grant_admin_for(&ids).await.unwrap();

        let admins = storage.list_admins("gdoc-7").await.unwrap();
        assert_eq!(admins, ["auditor"]);

        cleanup(&path);
    }

    #[tokio::test]
    async fn grant_for_unknown_external_id_fails_as_a_unit() {
        let path = temp_db();
        let storage = Storage::open(&path).await.unwrap();

        let doc = Document::draft(&FileDescriptor::new("gdoc-1", "a.pdf"));
        storage.insert_document(&doc).await.unwrap();

        let err = storage
            .grant_admin_for(&["gdoc-1".into(), "gdoc-404".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, DocMapError::AdminGrant(_)));

        // Nothing was granted for the known id either.
        let admins = storage.list_admins("gdoc-1").await.unwrap();
        assert!(admins.is_empty());

        cleanup(&path);
    }

    #[tokio::test]
    async fn readonly_handle_rejects_writes() {
        let path = temp_db();
        {
            let storage = Storage::open(&path).await.unwrap();
            let doc = Document::draft(&FileDescriptor::new("gdoc-1", "a.pdf"));
            storage.insert_document(&doc).await.unwrap();
        }

        let readonly = Storage::open_readonly(&path).await.unwrap();
        let doc = Document::draft(&FileDescriptor::new("gdoc-2", "b.pdf"));
        let err = readonly.insert_document(&doc).await.unwrap_err();
        assert!(err.to_string().contains("read-only"));

        // Reads still work.
        let all = readonly.list_documents().await.unwrap();
        assert_eq!(all.len(), 1);

        cleanup(&path);
    }

    #[tokio::test]
    async fn permission_refresh_appends_snapshots() {
        let path = temp_db();
        let storage = Storage::open(&path).await.unwrap();

        assert_eq!(storage.permission_refresh_count().await.unwrap(), 0);
        storage.record_permission_refresh().await.unwrap();
        storage.record_permission_refresh().await.unwrap();
        assert_eq!(storage.permission_refresh_count().await.unwrap(), 2);

        cleanup(&path);
    }
}
