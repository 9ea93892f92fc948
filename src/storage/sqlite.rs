//! SQLite-backed organization store.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::{ToSql, Value};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params, params_from_iter};

use crate::error::{AppError, Result};
use crate::models::{
    FieldChange, HistoryEntry, OrgStatus, Organization, OrganizationSnapshot, StorageConfig,
    TrackedField,
};
use crate::storage::{StoreStats, schema};

const SNAPSHOT_COLUMNS: &str = "symbol, name, member_count, language, recruitment, archetype, \
     commitment, role_play, url_image, url, status, first_seen, last_seen";

const MAIN_SCHEMA: &str = "main";
const HISTORY_SCHEMA: &str = "history";

/// Handle on the snapshot and history tables.
///
/// Owns the single connection used for a run; dropping the store closes it.
pub struct OrgStore {
    conn: Connection,
    history: &'static str,
}

impl OrgStore {
    /// Open the store described by the configuration.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let history = config
            .history_database
            .as_deref()
            .filter(|p| !p.trim().is_empty() && *p != config.database);
        Self::open_paths(Path::new(&config.database), history.map(Path::new))
    }

    /// Open (or create) the database files, creating parent directories.
    ///
    /// Any failure here is a setup error: the run cannot proceed without
    /// its store.
    pub fn open_paths(database: &Path, history: Option<&Path>) -> Result<Self> {
        for path in std::iter::once(database).chain(history) {
            ensure_parent(path)?;
        }

        let conn = Connection::open(database).map_err(|e| {
            AppError::setup(format!("cannot open store {}: {e}", database.display()))
        })?;

        let schema = match history {
            Some(path) => {
                conn.execute(
                    "ATTACH DATABASE ?1 AS history",
                    [path.to_string_lossy().as_ref()],
                )
                .map_err(|e| {
                    AppError::setup(format!("cannot attach history {}: {e}", path.display()))
                })?;
                HISTORY_SCHEMA
            }
            None => MAIN_SCHEMA,
        };

        Self::init(conn, schema)
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(AppError::setup)?;
        Self::init(conn, MAIN_SCHEMA)
    }

    fn init(conn: Connection, history: &'static str) -> Result<Self> {
        schema::apply(&conn, history)
            .map_err(|e| AppError::setup(format!("cannot create tables: {e}")))?;
        Ok(Self { conn, history })
    }

    /// Begin a transaction; it rolls back unless committed.
    pub fn transaction(&mut self) -> Result<StoreTx<'_>> {
        Ok(StoreTx {
            tx: self.conn.transaction()?,
            history: self.history,
        })
    }

    /// Current snapshot of one organization.
    pub fn snapshot(&self, symbol: &str) -> Result<Option<OrganizationSnapshot>> {
        query_snapshot(&self.conn, symbol)
    }

    /// Symbols of active organizations, oldest observation first.
    ///
    /// With `seen_before`, only organizations last seen at or before that
    /// instant are returned.
    pub fn tracked_symbols(&self, seen_before: Option<DateTime<Utc>>) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT symbol FROM organizations
             WHERE status = 'active' AND (?1 IS NULL OR last_seen <= ?1)
             ORDER BY last_seen ASC, symbol ASC",
        )?;
        let rows = stmt.query_map([seen_before], |row| row.get::<_, String>(0))?;

        let mut symbols = Vec::new();
        for row in rows {
            symbols.push(row?);
        }
        Ok(symbols)
    }

    /// Mark an organization as gone from the source. Returns false when the
    /// store has never seen it.
    pub fn mark_inactive(&mut self, symbol: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE organizations SET status = ?1 WHERE symbol = ?2",
            params![OrgStatus::Inactive.as_str(), symbol],
        )?;
        Ok(changed > 0)
    }

    /// History of one organization, newest first.
    pub fn history(&self, symbol: &str, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, symbol, field, old_value, new_value, observed_at
             FROM {}.organization_history
             WHERE symbol = ?1
             ORDER BY id DESC
             LIMIT ?2",
            self.history
        ))?;
        let rows = stmt.query_map(params![symbol, limit], history_from_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// True until the first organization is stored.
    pub fn is_empty(&self) -> Result<bool> {
        let stats = self.stats()?;
        Ok(stats.active + stats.inactive == 0)
    }

    /// Row counts for reporting.
    pub fn stats(&self) -> Result<StoreStats> {
        let (active, inactive): (i64, i64) = self.conn.query_row(
            "SELECT
               COALESCE(SUM(status = 'active'), 0),
               COALESCE(SUM(status = 'inactive'), 0)
             FROM organizations",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        let history: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}.organization_history", self.history),
            [],
            |r| r.get(0),
        )?;

        Ok(StoreStats {
            active: count(active),
            inactive: count(inactive),
            history_entries: count(history),
        })
    }
}

/// Writes for one organization, committed together or not at all.
pub struct StoreTx<'a> {
    tx: Transaction<'a>,
    history: &'static str,
}

impl StoreTx<'_> {
    /// Current snapshot, read inside the transaction.
    pub fn snapshot(&self, symbol: &str) -> Result<Option<OrganizationSnapshot>> {
        query_snapshot(&self.tx, symbol)
    }

    /// Insert a first observation.
    pub fn insert_snapshot(&self, org: &Organization, observed_at: DateTime<Utc>) -> Result<()> {
        self.tx.execute(
            &format!(
                "INSERT INTO organizations ({SNAPSHOT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)"
            ),
            params![
                org.symbol,
                org.name,
                org.member_count.map(i64::from),
                org.language,
                org.recruitment,
                org.archetype,
                org.commitment,
                org.role_play,
                org.url_image,
                org.url,
                OrgStatus::Active.as_str(),
                observed_at,
            ],
        )?;
        Ok(())
    }

    /// Overwrite the changed columns only, refresh `last_seen` and mark the
    /// organization active.
    pub fn update_fields(
        &self,
        symbol: &str,
        org: &Organization,
        changes: &[FieldChange],
        observed_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut assignments = vec!["last_seen = ?1".to_string(), "status = ?2".to_string()];
        let mut values: Vec<Box<dyn ToSql>> = vec![
            Box::new(observed_at),
            Box::new(OrgStatus::Active.as_str()),
        ];
        for change in changes {
            values.push(Box::new(column_value(org, change.field)));
            assignments.push(format!("{} = ?{}", change.field.as_str(), values.len()));
        }
        values.push(Box::new(symbol.to_string()));

        let sql = format!(
            "UPDATE organizations SET {} WHERE symbol = ?{}",
            assignments.join(", "),
            values.len()
        );
        self.tx.execute(&sql, params_from_iter(values.iter()))?;
        Ok(())
    }

    /// Refresh `last_seen` (and status) without touching tracked fields.
    pub fn touch(&self, symbol: &str, observed_at: DateTime<Utc>) -> Result<()> {
        self.update_fields(symbol, &Organization::default(), &[], observed_at)
    }

    /// Append one history row and return its id.
    pub fn append_history(&self, entry: &HistoryEntry) -> Result<i64> {
        self.tx.execute(
            &format!(
                "INSERT INTO {}.organization_history
                 (symbol, field, old_value, new_value, observed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                self.history
            ),
            params![
                entry.symbol,
                entry.field,
                entry.old_value,
                entry.new_value,
                entry.observed_at,
            ],
        )?;
        Ok(self.tx.last_insert_rowid())
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::setup(format!("cannot create directory {}: {e}", parent.display()))
        })?;
    }
    Ok(())
}

fn query_snapshot(conn: &Connection, symbol: &str) -> Result<Option<OrganizationSnapshot>> {
    let snapshot = conn
        .query_row(
            &format!("SELECT {SNAPSHOT_COLUMNS} FROM organizations WHERE symbol = ?1"),
            [symbol],
            snapshot_from_row,
        )
        .optional()?;
    Ok(snapshot)
}

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<OrganizationSnapshot> {
    let member_count: Option<i64> = row.get(2)?;
    let status: String = row.get(10)?;
    Ok(OrganizationSnapshot {
        org: Organization {
            symbol: row.get(0)?,
            name: row.get(1)?,
            member_count: member_count.and_then(|n| u32::try_from(n).ok()),
            language: row.get(3)?,
            recruitment: row.get(4)?,
            archetype: row.get(5)?,
            commitment: row.get(6)?,
            role_play: row.get(7)?,
            url_image: row.get(8)?,
            url: row.get(9)?,
        },
        status: OrgStatus::parse(&status),
        first_seen: row.get(11)?,
        last_seen: row.get(12)?,
    })
}

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
    Ok(HistoryEntry {
        id: row.get(0)?,
        symbol: row.get(1)?,
        field: row.get(2)?,
        old_value: row.get(3)?,
        new_value: row.get(4)?,
        observed_at: row.get(5)?,
    })
}

/// SQL value of a tracked field, keeping `member_count` an integer.
fn column_value(org: &Organization, field: TrackedField) -> Value {
    match field {
        TrackedField::MemberCount => org
            .member_count
            .map_or(Value::Null, |n| Value::Integer(i64::from(n))),
        other => org.field_value(other).map_or(Value::Null, Value::Text),
    }
}

fn count(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

#[cfg(test)]
impl OrgStore {
    /// Raw connection, for tests that need to make writes fail.
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}
