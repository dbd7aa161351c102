//! Tenant-scoped SQLite store for any subset of collections.
//!
//! A domain service owns a handful of collections (its bounded context); the
//! single-store deployment owns all of them. Either way the store can
//!
//! - export every row of one tenant as records, and
//! - replace one tenant's rows with a given record set: a wipe in reverse
//!   dependency order followed by a recreate in forward order, all inside one
//!   transaction.
//!
//! # Record isolation
//!
//! Rows are inserted in batches. Every batch runs in its own savepoint; when a
//! batch fails it is rolled back and replayed record by record, each record in
//! its own savepoint, so one bad record (a dangling reference, a duplicate id)
//! is counted as skipped without aborting its neighbours or the transaction.
//!
//! Foreign keys are enforced only between collections the store owns; a
//! reference into another service's collection is kept as plain data.

use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Connection, QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::schema::Collection;
use crate::types::{
    CollectionCounts, CollectionData, OperatorIdentity, Record, RestoreCounts,
};

/// Rows per multi-row insert.
pub const INSERT_BATCH_SIZE: usize = 200;

/// User field carrying the binding to the external identity provider.
pub const EXTERNAL_ID_FIELD: &str = "externalId";

const EMAIL_FIELD: &str = "email";
const TENANT_FIELD: &str = "tenantId";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt {collection} record '{id}': {reason}")]
    Corrupt {
        collection: Collection,
        id: String,
        reason: String,
    },
}

/// The restoring operator's current identity binding, captured before a wipe.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorBinding {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub external_id: Value,
}

impl OperatorBinding {
    fn matches(&self, id: &str, record: &Record) -> bool {
        if self.user_id.as_deref() == Some(id) {
            return true;
        }
        match (&self.email, record.str_field(EMAIL_FIELD)) {
            (Some(ours), Some(theirs)) => ours.eq_ignore_ascii_case(&theirs),
            _ => false,
        }
    }
}

/// A record ready to be written: references extracted, body serialized.
#[derive(Debug, Clone)]
struct PreparedRecord {
    id: String,
    /// Aligned with `Collection::foreign_keys()`.
    references: Vec<Option<String>>,
    parent: Option<String>,
    links: Vec<String>,
    body: String,
}

pub struct TenantStore {
    pool: SqlitePool,
    collections: Vec<Collection>,
}

impl TenantStore {
    /// Open (creating if needed) a file-backed store owning `collections`.
    pub async fn open(database_path: &str, collections: &[Collection]) -> Result<Self, StoreError> {
        info!("Opening tenant store at {}", database_path);

        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::with_pool(pool, collections).await
    }

    /// Private in-memory store, used by tests and ephemeral deployments.
    pub async fn in_memory(collections: &[Collection]) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // One connection that never expires, otherwise the database goes with it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool, collections).await
    }

    async fn with_pool(pool: SqlitePool, collections: &[Collection]) -> Result<Self, StoreError> {
        let mut collections = collections.to_vec();
        collections.sort();
        collections.dedup();

        let store = Self { pool, collections };
        store.initialize_tables().await?;
        info!(
            "Tenant store ready with {} collections: {}",
            store.collections.len(),
            store
                .collections
                .iter()
                .map(|c| c.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Owned collections in restore order.
    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn owns(&self, collection: Collection) -> bool {
        self.collections.binary_search(&collection).is_ok()
    }

    async fn initialize_tables(&self) -> Result<(), StoreError> {
        for collection in &self.collections {
            let ddl = self.table_ddl(*collection);
            debug!("Creating table: {}", ddl);
            sqlx::query(&ddl).execute(&self.pool).await?;

            if let Some(ddl) = self.link_table_ddl(*collection) {
                sqlx::query(&ddl).execute(&self.pool).await?;
            }
        }
        Ok(())
    }

    fn table_ddl(&self, collection: Collection) -> String {
        let mut columns = vec!["tenant_id TEXT NOT NULL".to_string(), "id TEXT NOT NULL".to_string()];
        let mut constraints = vec!["PRIMARY KEY (tenant_id, id)".to_string()];

        for fk in collection.foreign_keys() {
            columns.push(format!("{} TEXT", fk.column));
            if self.owns(fk.parent) {
                constraints.push(format!(
                    "FOREIGN KEY (tenant_id, {}) REFERENCES {}(tenant_id, id)",
                    fk.column,
                    fk.parent.table()
                ));
            }
        }
        columns.push("body TEXT NOT NULL".to_string());
        columns.extend(constraints);

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            collection.table(),
            columns.join(", ")
        )
    }

    fn link_table_ddl(&self, collection: Collection) -> Option<String> {
        let link = collection.link_table()?;
        let mut target_fk = String::new();
        if self.owns(link.target) {
            target_fk = format!(
                ", FOREIGN KEY (tenant_id, {}) REFERENCES {}(tenant_id, id)",
                link.target_column,
                link.target.table()
            );
        }

        Some(format!(
            "CREATE TABLE IF NOT EXISTS {table} (tenant_id TEXT NOT NULL, {owner} TEXT NOT NULL, {target} TEXT NOT NULL, \
             PRIMARY KEY (tenant_id, {owner}, {target}), \
             FOREIGN KEY (tenant_id, {owner}) REFERENCES {owner_table}(tenant_id, id){target_fk})",
            table = link.table,
            owner = link.owner_column,
            target = link.target_column,
            owner_table = collection.table(),
            target_fk = target_fk,
        ))
    }

    /// Read-only dump of one tenant's rows, taken inside a single transaction.
    pub async fn export(&self, tenant_id: &str) -> Result<CollectionData, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut data = CollectionData::new();

        for collection in &self.collections {
            let sql = format!(
                "SELECT id, body FROM {} WHERE tenant_id = ? ORDER BY rowid",
                collection.table()
            );
            let rows = sqlx::query(&sql).bind(tenant_id).fetch_all(&mut *tx).await?;

            let mut records = Vec::with_capacity(rows.len());
            for row in rows {
                let id: String = row.try_get("id")?;
                let body: String = row.try_get("body")?;
                let record = serde_json::from_str::<Record>(&body).map_err(|e| StoreError::Corrupt {
                    collection: *collection,
                    id,
                    reason: e.to_string(),
                })?;
                records.push(record);
            }
            data.insert(*collection, records);
        }

        tx.commit().await?;
        debug!("Exported {} collections for tenant {}", data.len(), tenant_id);
        Ok(data)
    }

    /// Replace every owned collection of `tenant_id` with `data`.
    ///
    /// Collections missing from `data` end up empty. Records of collections the
    /// store does not own are ignored. When `operator` is given, the matching
    /// restored user keeps the operator's current external identity.
    pub async fn restore(
        &self,
        tenant_id: &str,
        data: &CollectionData,
        operator: Option<&OperatorIdentity>,
    ) -> Result<RestoreCounts, StoreError> {
        for (collection, records) in data {
            if !self.owns(*collection) && !records.is_empty() {
                warn!(
                    "Ignoring {} {} records: collection not owned by this store",
                    records.len(),
                    collection
                );
            }
        }

        let binding = match operator {
            Some(operator) => self.capture_operator_binding(tenant_id, operator).await?,
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        let wiped = wipe(&mut tx, tenant_id, &self.collections).await?;
        info!("Wiped {} rows for tenant {}", wiped, tenant_id);

        let mut counts = RestoreCounts::new();
        for collection in self.collections.iter().copied() {
            let records = data.get(&collection).map(Vec::as_slice).unwrap_or_default();
            let prepared = prepare_records(collection, records, tenant_id, binding.as_ref())?;
            let tally = recreate(&mut tx, tenant_id, collection, &prepared).await?;

            if tally.skipped > 0 {
                warn!(
                    "Restored {} {} for tenant {}, skipped {}",
                    tally.restored, collection, tenant_id, tally.skipped
                );
            } else {
                debug!("Restored {} {} for tenant {}", tally.restored, collection, tenant_id);
            }
            counts.insert(collection, tally);
        }

        tx.commit().await?;

        let restored: u64 = counts.values().map(|c| c.restored).sum();
        let skipped: u64 = counts.values().map(|c| c.skipped).sum();
        info!(
            "Restore committed for tenant {}: {} records restored, {} skipped",
            tenant_id, restored, skipped
        );
        Ok(counts)
    }

    /// Look up the operator's current user row and remember its external identity.
    pub async fn capture_operator_binding(
        &self,
        tenant_id: &str,
        operator: &OperatorIdentity,
    ) -> Result<Option<OperatorBinding>, StoreError> {
        if operator.is_empty() || !self.owns(Collection::Users) {
            return Ok(None);
        }

        let row = sqlx::query(
            "SELECT id, body FROM users \
             WHERE tenant_id = ? AND (id = ? OR lower(json_extract(body, '$.email')) = lower(?)) \
             ORDER BY (id = ?) DESC LIMIT 1",
        )
        .bind(tenant_id)
        .bind(operator.user_id.as_deref())
        .bind(operator.email.as_deref())
        .bind(operator.user_id.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            warn!(
                "Operator {:?} has no user row in tenant {}, identity continuity skipped",
                operator, tenant_id
            );
            return Ok(None);
        };

        let id: String = row.try_get("id")?;
        let body: String = row.try_get("body")?;
        let user = serde_json::from_str::<Record>(&body).map_err(|e| StoreError::Corrupt {
            collection: Collection::Users,
            id: id.clone(),
            reason: e.to_string(),
        })?;

        match user.get(EXTERNAL_ID_FIELD) {
            Some(external_id) if !external_id.is_null() => {
                info!("Captured identity binding of operator {} before restore", id);
                Ok(Some(OperatorBinding {
                    user_id: Some(id),
                    email: operator.email.clone().or_else(|| user.str_field(EMAIL_FIELD)),
                    external_id: external_id.clone(),
                }))
            }
            _ => {
                warn!("Operator {} has no external identity binding to carry over", id);
                Ok(None)
            }
        }
    }

    pub async fn count(&self, tenant_id: &str, collection: Collection) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE tenant_id = ?", collection.table());
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    pub async fn find(
        &self,
        tenant_id: &str,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Record>, StoreError> {
        let sql = format!(
            "SELECT body FROM {} WHERE tenant_id = ? AND id = ?",
            collection.table()
        );
        let body: Option<String> = sqlx::query_scalar(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        body.map(|body| {
            serde_json::from_str::<Record>(&body).map_err(|e| StoreError::Corrupt {
                collection,
                id: id.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
    }

    /// Ids linked to `owner_id` through the collection's link table.
    pub async fn linked_ids(
        &self,
        tenant_id: &str,
        collection: Collection,
        owner_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        let Some(link) = collection.link_table() else {
            return Ok(Vec::new());
        };
        let sql = format!(
            "SELECT {} FROM {} WHERE tenant_id = ? AND {} = ? ORDER BY 1",
            link.target_column, link.table, link.owner_column
        );
        let ids: Vec<String> = sqlx::query_scalar(&sql)
            .bind(tenant_id)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}

/// Delete the tenant's rows of the owned collections, children first.
/// Tables of other stores sharing the file are left alone; owned tables that
/// do not exist yet are skipped.
async fn wipe(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    owned: &[Collection],
) -> Result<u64, sqlx::Error> {
    let mut removed = 0;
    for collection in Collection::wipe_order().filter(|c| owned.contains(c)) {
        if let Some(link) = collection.link_table() {
            removed += delete_tenant_rows(conn, link.table, tenant_id).await?;
        }
        removed += delete_tenant_rows(conn, collection.table(), tenant_id).await?;
    }
    Ok(removed)
}

async fn delete_tenant_rows(
    conn: &mut SqliteConnection,
    table: &str,
    tenant_id: &str,
) -> Result<u64, sqlx::Error> {
    if !table_exists(conn, table).await? {
        debug!("Table {} not present, nothing to wipe", table);
        return Ok(0);
    }

    let sql = format!("DELETE FROM {} WHERE tenant_id = ?", table);
    let result = sqlx::query(&sql).bind(tenant_id).execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

async fn table_exists(conn: &mut SqliteConnection, table: &str) -> Result<bool, sqlx::Error> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(found.is_some())
}

fn prepare_records(
    collection: Collection,
    records: &[Record],
    tenant_id: &str,
    binding: Option<&OperatorBinding>,
) -> Result<Vec<PreparedRecord>, StoreError> {
    let self_reference = collection.self_reference();
    let mut binding = binding.filter(|_| collection == Collection::Users);
    let mut prepared = Vec::with_capacity(records.len());

    for record in records {
        let mut record = record.clone();

        let id = match record.id() {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                record.set("id", Value::String(id.clone()));
                id
            }
        };

        if record.contains(TENANT_FIELD) {
            record.set(TENANT_FIELD, Value::String(tenant_id.to_string()));
        }

        if let Some(operator) = binding {
            if operator.matches(&id, &record) {
                info!("Carrying operator identity over to restored user {}", id);
                record.set(EXTERNAL_ID_FIELD, operator.external_id.clone());
                binding = None;
            }
        }

        let references = collection
            .foreign_keys()
            .iter()
            .map(|fk| record.str_field(fk.field))
            .collect();
        let links = collection
            .link_table()
            .map(|link| record.id_list(link.field))
            .unwrap_or_default();
        let parent = self_reference.and_then(|field| record.str_field(field));

        let body = serde_json::to_string(&record).map_err(|e| StoreError::Corrupt {
            collection,
            id: id.clone(),
            reason: e.to_string(),
        })?;

        prepared.push(PreparedRecord {
            id,
            references,
            parent,
            links,
            body,
        });
    }

    if self_reference.is_some() {
        prepared = order_parents_first(prepared);
    }
    Ok(prepared)
}

/// Stable reorder so a record referencing a sibling comes after it.
/// Records in a reference cycle keep their relative order at the end.
fn order_parents_first(records: Vec<PreparedRecord>) -> Vec<PreparedRecord> {
    let ids: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();
    let mut placed: HashSet<String> = HashSet::with_capacity(records.len());
    let mut ordered = Vec::with_capacity(records.len());
    let mut pending = records;

    loop {
        let before = pending.len();
        let mut waiting = Vec::new();

        for record in pending {
            match &record.parent {
                Some(parent) if ids.contains(parent) && !placed.contains(parent) => {
                    waiting.push(record)
                }
                _ => {
                    placed.insert(record.id.clone());
                    ordered.push(record);
                }
            }
        }

        if waiting.is_empty() {
            break;
        }
        if waiting.len() == before {
            ordered.extend(waiting);
            break;
        }
        pending = waiting;
    }

    ordered
}

async fn recreate(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    collection: Collection,
    records: &[PreparedRecord],
) -> Result<CollectionCounts, sqlx::Error> {
    let mut counts = CollectionCounts::default();

    for chunk in records.chunks(INSERT_BATCH_SIZE) {
        match write_in_savepoint(conn, tenant_id, collection, chunk).await? {
            Ok(()) => {
                counts.restored += chunk.len() as u64;
                continue;
            }
            Err(e) => debug!(
                "Batch insert of {} {} failed ({}), retrying record by record",
                chunk.len(),
                collection,
                e
            ),
        }

        for record in chunk {
            match write_in_savepoint(conn, tenant_id, collection, std::slice::from_ref(record)).await? {
                Ok(()) => counts.restored += 1,
                Err(e) => {
                    warn!("Skipping {} record {}: {}", collection, record.id, e);
                    counts.skipped += 1;
                }
            }
        }
    }

    Ok(counts)
}

/// Outer error: the connection or transaction is broken. Inner error: the rows
/// were rejected and their savepoint rolled back.
async fn write_in_savepoint(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    collection: Collection,
    rows: &[PreparedRecord],
) -> Result<Result<(), sqlx::Error>, sqlx::Error> {
    let mut savepoint = conn.begin().await?;
    match insert_rows(&mut savepoint, tenant_id, collection, rows).await {
        Ok(()) => {
            savepoint.commit().await?;
            Ok(Ok(()))
        }
        Err(e) => {
            savepoint.rollback().await?;
            Ok(Err(e))
        }
    }
}

async fn insert_rows(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    collection: Collection,
    rows: &[PreparedRecord],
) -> Result<(), sqlx::Error> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut columns = vec!["tenant_id", "id"];
    columns.extend(collection.foreign_keys().iter().map(|fk| fk.column));
    columns.push("body");

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) ",
        collection.table(),
        columns.join(", ")
    ));
    builder.push_values(rows, |mut row, record| {
        row.push_bind(tenant_id.to_string())
            .push_bind(record.id.clone());
        for reference in &record.references {
            row.push_bind(reference.clone());
        }
        row.push_bind(record.body.clone());
    });
    builder.build().execute(&mut *conn).await?;

    if let Some(link) = collection.link_table() {
        let pairs: Vec<(String, String)> = rows
            .iter()
            .flat_map(|record| {
                record
                    .links
                    .iter()
                    .map(move |target| (record.id.clone(), target.clone()))
            })
            .collect();

        if !pairs.is_empty() {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                "INSERT INTO {} (tenant_id, {}, {}) ",
                link.table, link.owner_column, link.target_column
            ));
            builder.push_values(pairs, |mut row, (owner, target)| {
                row.push_bind(tenant_id.to_string())
                    .push_bind(owner)
                    .push_bind(target);
            });
            builder.build().execute(&mut *conn).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(id: &str, parent: Option<&str>) -> PreparedRecord {
        PreparedRecord {
            id: id.to_string(),
            references: Vec::new(),
            parent: parent.map(str::to_string),
            links: Vec::new(),
            body: "{}".to_string(),
        }
    }

    fn ids(records: &[PreparedRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn replies_are_ordered_after_their_parents() {
        let records = vec![
            prepared("reply-2", Some("reply-1")),
            prepared("reply-1", Some("root")),
            prepared("root", None),
            prepared("orphan", Some("missing")),
        ];
        let ordered = order_parents_first(records);
        assert_eq!(ids(&ordered), vec!["root", "orphan", "reply-1", "reply-2"]);
    }

    #[test]
    fn reference_cycles_do_not_loop_forever() {
        let records = vec![prepared("a", Some("b")), prepared("b", Some("a")), prepared("c", None)];
        let ordered = order_parents_first(records);
        assert_eq!(ids(&ordered), vec!["c", "a", "b"]);
    }

    #[test]
    fn missing_ids_are_generated_and_tenant_is_rewritten() {
        let record: Record = serde_json::from_value(serde_json::json!({
            "tenantId": "other",
            "path": "/about"
        }))
        .unwrap();
        let prepared = prepare_records(Collection::PageViews, &[record], "t1", None).unwrap();
        assert_eq!(prepared.len(), 1);
        assert!(Uuid::parse_str(&prepared[0].id).is_ok());

        let body: Value = serde_json::from_str(&prepared[0].body).unwrap();
        assert_eq!(body["tenantId"], "t1");
        assert_eq!(body["id"], prepared[0].id.as_str());
    }

    #[test]
    fn operator_binding_applies_to_one_user_only() {
        let users: Vec<Record> = vec![
            serde_json::from_value(serde_json::json!({"id": "u1", "email": "Admin@Example.com", "externalId": "old"})).unwrap(),
            serde_json::from_value(serde_json::json!({"id": "u2", "email": "admin@example.com", "externalId": "other"})).unwrap(),
        ];
        let binding = OperatorBinding {
            user_id: None,
            email: Some("admin@example.com".into()),
            external_id: Value::String("current".into()),
        };

        let prepared = prepare_records(Collection::Users, &users, "t1", Some(&binding)).unwrap();
        let first: Value = serde_json::from_str(&prepared[0].body).unwrap();
        let second: Value = serde_json::from_str(&prepared[1].body).unwrap();
        assert_eq!(first["externalId"], "current");
        assert_eq!(second["externalId"], "other");
    }
}
