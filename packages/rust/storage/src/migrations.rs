//! SQL migration definitions for the docmap database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed within a transaction.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: documents, document_admins, permission_snapshots",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Tracked documents, keyed by the picker source's external id
CREATE TABLE IF NOT EXISTS documents (
    id                 TEXT PRIMARY KEY,
    title              TEXT NOT NULL,
    source_external_id TEXT NOT NULL UNIQUE,
    context_id         TEXT NOT NULL,
    created_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_external_id ON documents(source_external_id);

-- Admin access grants produced by reconciliation
CREATE TABLE IF NOT EXISTS document_admins (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    actor       TEXT NOT NULL,
    granted_at  TEXT NOT NULL,
    UNIQUE(document_id, actor)
);

CREATE INDEX IF NOT EXISTS idx_document_admins_doc ON document_admins(document_id);

-- Permission cache refresh history
CREATE TABLE IF NOT EXISTS permission_snapshots (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    refreshed_at   TEXT NOT NULL,
    document_count INTEGER NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
