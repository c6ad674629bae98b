//! Local store initialization and table definitions
//!
//! This module handles the setup and configuration of the embedded redb
//! database backing the offline fallback store and session restoration.
//! Every table maps string keys to JSON-serialized records.

use redb::{Database, TableDefinition};
use std::sync::Arc;

/// Session table holding the currently logged-in user
///
/// Key: the fixed key [`crate::session::SESSION_KEY`]
/// Value: JSON-serialized User as string
pub const TABLE_SESSION: TableDefinition<&str, &str> = TableDefinition::new("session_v1");

/// Fallback identity store
///
/// Key: username
/// Value: JSON-serialized User as string
///
/// Example:
/// - Key: "alice"
/// - Value: '{"id":"user_1755912345678_k3j9x2m1q","username":"alice",...}'
///
/// Keying by username is what enforces one account per username: a second
/// account under the same name has nowhere to go.
pub const TABLE_USERS: TableDefinition<&str, &str> = TableDefinition::new("users_v1");

/// Main table for link records
///
/// Key: link id
/// Value: JSON-serialized Link as string
///
/// Example:
/// - Key: "link_1755912345678_p8d2w9f4n"
/// - Value: '{"id":"link_...","userId":"user_...","status":"active",...}'
pub const TABLE_LINKS: TableDefinition<&str, &str> = TableDefinition::new("links_v1");

/// Per-user chronological index over the link table
///
/// Key: Composite key in format "{user_id}:{timestamp_micros}"
/// Value: JSON-serialized Link as string
///
/// Example:
/// - Key: "user_1755912345678_k3j9x2m1q:1755912345678901"
/// - Value: '{"id":"link_...","userId":"user_...",...}'
///
/// The timestamp in the key keeps one user's records in creation order, so
/// the last entry of a range scan is the newest record. Every write to
/// [`TABLE_LINKS`] is mirrored here.
pub const TABLE_LINKS_BY_USER: TableDefinition<&str, &str> =
    TableDefinition::new("links_by_user_v1");

/// Thread-safe handle to the embedded database
///
/// Cloned into every component that touches local persistence (the fallback
/// backend and the session store).
pub type SharedDb = Arc<Database>;

/// Builds the composite index key for a link record.
pub fn link_index_key(user_id: &str, created_at_micros: i64) -> String {
    format!("{}:{}", user_id, created_at_micros)
}

/// Initializes the embedded database and creates required tables
///
/// Opens (or creates) the database file at the given path and touches every
/// table inside one write transaction. A read transaction cannot open a
/// table that has never been created, so each one is created here first.
///
/// # Arguments
///
/// * `db_path` - File path where the database should be stored (e.g., "refdash.db")
///
/// # Returns
///
/// * `Ok(Database)` - Successfully initialized database instance
/// * `Err(redb::Error)` - Database initialization error
///
/// # Example
///
/// ```no_run
/// # use refdash::database::init_db;
/// let db = init_db("refdash.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    // Create or open the database file
    let db = Database::create(db_path)?;

    // Begin a write transaction to create tables
    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_SESSION)?;
        write_txn.open_table(TABLE_USERS)?;
        write_txn.open_table(TABLE_LINKS)?;
        write_txn.open_table(TABLE_LINKS_BY_USER)?;
    }

    // Commit the transaction to persist the table structures
    write_txn.commit()?;

    Ok(db)
}
