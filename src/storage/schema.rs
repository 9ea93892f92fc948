//! Table definitions.

use rusqlite::Connection;

use crate::error::Result;

/// Snapshot table: one mutable row per organization.
const SNAPSHOT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS main.organizations (
  symbol       TEXT PRIMARY KEY NOT NULL COLLATE NOCASE,
  name         TEXT NOT NULL,
  member_count INTEGER,
  language     TEXT,
  recruitment  TEXT,
  archetype    TEXT,
  commitment   TEXT,
  role_play    TEXT,
  url_image    TEXT,
  url          TEXT,
  status       TEXT NOT NULL DEFAULT 'active',
  first_seen   TEXT NOT NULL,
  last_seen    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS main.idx_org_status_seen ON organizations(status, last_seen);
"#;

/// Create both tables if missing. `history_schema` is `main` or the name the
/// history file is attached under.
pub fn apply(conn: &Connection, history_schema: &str) -> Result<()> {
    let history_table = format!(
        r#"
CREATE TABLE IF NOT EXISTS {h}.organization_history (
  id          INTEGER PRIMARY KEY AUTOINCREMENT,
  symbol      TEXT NOT NULL COLLATE NOCASE,
  field       TEXT NOT NULL,
  old_value   TEXT,
  new_value   TEXT,
  observed_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS {h}.idx_history_symbol ON organization_history(symbol, id);
"#,
        h = history_schema
    );

    conn.execute_batch(&format!("BEGIN;\n{SNAPSHOT_TABLE}\n{history_table}\nCOMMIT;"))?;
    Ok(())
}
