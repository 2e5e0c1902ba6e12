//! Local SQLite database layer for Broadway Mall Books.
//!
//! Uses rusqlite with WAL mode. Provides schema migrations and the managed
//! connection state shared across Tauri commands. One connection behind a
//! mutex keeps all writes serialized, which is also what gives the floor
//! ledger its per-unit write ordering.

use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Tauri managed state holding the database connection.
pub struct DbState {
    pub conn: Mutex<Connection>,
    pub db_path: PathBuf,
}

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 3;

/// Initialize the database at `{app_data_dir}/mall-books.db`.
///
/// Creates the directory if needed, opens the connection, sets pragmas,
/// and runs any pending migrations. On corruption or open failure,
/// deletes the file and retries once.
pub fn init(app_data_dir: &Path) -> Result<DbState, String> {
    fs::create_dir_all(app_data_dir).map_err(|e| format!("Failed to create data dir: {e}"))?;

    let db_path = app_data_dir.join("mall-books.db");
    info!("Opening database at {}", db_path.display());

    let conn = match open_and_configure(&db_path) {
        Ok(c) => c,
        Err(first_err) => {
            warn!(
                "Database open failed ({}), deleting and retrying once",
                first_err
            );
            if db_path.exists() {
                let _ = fs::remove_file(&db_path);
                // Also remove WAL/SHM files if present
                let wal = db_path.with_extension("db-wal");
                let shm = db_path.with_extension("db-shm");
                let _ = fs::remove_file(&wal);
                let _ = fs::remove_file(&shm);
            }
            open_and_configure(&db_path)
                .map_err(|e| format!("Database open failed after retry: {e}"))?
        }
    };

    run_migrations(&conn)?;

    info!("Database initialized (schema v{CURRENT_SCHEMA_VERSION})");

    Ok(DbState {
        conn: Mutex::new(conn),
        db_path,
    })
}

/// Open the database file and apply pragmas.
fn open_and_configure(path: &Path) -> Result<Connection, String> {
    let conn = Connection::open(path).map_err(|e| format!("sqlite open: {e}"))?;

    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(|e| format!("pragma setup: {e}"))?;

    Ok(conn)
}

/// Run all pending migrations up to `CURRENT_SCHEMA_VERSION`.
fn run_migrations(conn: &Connection) -> Result<(), String> {
    // Ensure schema_version table exists first
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| format!("create schema_version: {e}"))?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        info!("Database schema up to date (v{current})");
        return Ok(());
    }

    info!("Migrating database from v{current} to v{CURRENT_SCHEMA_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }
    if current < 2 {
        migrate_v2(conn)?;
    }
    if current < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

/// Migration v1: floor ledger tables.
///
/// `unit_records` carries `floor_key` even though the legacy app keyed
/// history by unit number alone; two floors could otherwise collide on
/// the same number string.
fn migrate_v1(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        -- floor_units (one row per rentable unit, per floor)
        CREATE TABLE IF NOT EXISTS floor_units (
            id TEXT PRIMARY KEY,
            floor_key TEXT NOT NULL,
            unit_no TEXT NOT NULL,
            area REAL NOT NULL DEFAULT 0,
            date TEXT NOT NULL DEFAULT '',
            down_payment REAL NOT NULL DEFAULT 0,
            total REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- unit_records (committed payment history, append-only)
        CREATE TABLE IF NOT EXISTS unit_records (
            id TEXT PRIMARY KEY,
            floor_key TEXT NOT NULL,
            unit_no TEXT NOT NULL,
            date TEXT NOT NULL,
            area REAL NOT NULL DEFAULT 0,
            down_payment REAL NOT NULL DEFAULT 0,
            total REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        -- Indexes
        CREATE INDEX IF NOT EXISTS idx_floor_units_floor ON floor_units(floor_key);
        CREATE INDEX IF NOT EXISTS idx_unit_records_lookup
            ON unit_records(floor_key, unit_no, date);

        -- Record migration
        INSERT INTO schema_version (version) VALUES (1);
        ",
    )
    .map_err(|e| {
        error!("Migration v1 failed: {e}");
        format!("migration v1: {e}")
    })?;

    info!("Applied migration v1");
    Ok(())
}

/// Migration v2: staff payroll and supplier tables.
fn migrate_v2(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        -- staff
        CREATE TABLE IF NOT EXISTS staff (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            role TEXT,
            phone TEXT,
            salary REAL NOT NULL DEFAULT 0,
            join_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- staff_payments
        CREATE TABLE IF NOT EXISTS staff_payments (
            id TEXT PRIMARY KEY,
            staff_id TEXT NOT NULL REFERENCES staff(id) ON DELETE CASCADE,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            remarks TEXT,
            created_at TEXT NOT NULL
        );

        -- suppliers
        CREATE TABLE IF NOT EXISTS suppliers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            contact TEXT,
            created_at TEXT NOT NULL
        );

        -- supplier_bills
        CREATE TABLE IF NOT EXISTS supplier_bills (
            id TEXT PRIMARY KEY,
            bill_no TEXT,
            supplier_id TEXT NOT NULL REFERENCES suppliers(id) ON DELETE CASCADE,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            due_date TEXT,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'PENDING' CHECK (status IN ('PENDING', 'PAID')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- supplier_payments
        CREATE TABLE IF NOT EXISTS supplier_payments (
            id TEXT PRIMARY KEY,
            supplier_id TEXT NOT NULL REFERENCES suppliers(id) ON DELETE CASCADE,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            remarks TEXT,
            created_at TEXT NOT NULL
        );

        -- supplier_receipts
        CREATE TABLE IF NOT EXISTS supplier_receipts (
            id TEXT PRIMARY KEY,
            supplier_id TEXT NOT NULL REFERENCES suppliers(id) ON DELETE CASCADE,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            remarks TEXT,
            receipt_no TEXT,
            created_at TEXT NOT NULL
        );

        -- Indexes
        CREATE INDEX IF NOT EXISTS idx_staff_payments_staff ON staff_payments(staff_id);
        CREATE INDEX IF NOT EXISTS idx_supplier_bills_supplier ON supplier_bills(supplier_id);
        CREATE INDEX IF NOT EXISTS idx_supplier_bills_status ON supplier_bills(status);
        CREATE INDEX IF NOT EXISTS idx_supplier_payments_supplier ON supplier_payments(supplier_id);
        CREATE INDEX IF NOT EXISTS idx_supplier_receipts_supplier ON supplier_receipts(supplier_id);

        -- Record migration
        INSERT INTO schema_version (version) VALUES (2);
        ",
    )
    .map_err(|e| {
        error!("Migration v2 failed: {e}");
        format!("migration v2: {e}")
    })?;

    info!("Applied migration v2");
    Ok(())
}

/// Migration v3: stock movements and general expenses.
fn migrate_v3(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        -- stock_items (each row is one IN or OUT movement)
        CREATE TABLE IF NOT EXISTS stock_items (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            sku TEXT,
            category TEXT,
            unit_price REAL NOT NULL DEFAULT 0,
            quantity REAL NOT NULL,
            description TEXT,
            movement TEXT NOT NULL DEFAULT 'IN' CHECK (movement IN ('IN', 'OUT')),
            created_at TEXT NOT NULL
        );

        -- expenses
        CREATE TABLE IF NOT EXISTS expenses (
            id TEXT PRIMARY KEY,
            category TEXT NOT NULL,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            payee TEXT,
            remarks TEXT,
            created_at TEXT NOT NULL
        );

        -- Indexes
        CREATE INDEX IF NOT EXISTS idx_stock_items_sku ON stock_items(sku);
        CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date);

        -- Record migration
        INSERT INTO schema_version (version) VALUES (3);
        ",
    )
    .map_err(|e| {
        error!("Migration v3 failed: {e}");
        format!("migration v3: {e}")
    })?;

    info!("Applied migration v3");
    Ok(())
}

/// Run all migrations on the given connection (test helper, not public API).
#[cfg(test)]
pub fn run_migrations_for_test(conn: &Connection) {
    run_migrations(conn).expect("run_migrations should succeed in test");
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    /// Open an in-memory database and apply pragmas (mirrors open_and_configure).
    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;",
        )
        .expect("pragma setup");
        conn
    }

    #[test]
    fn migrations_reach_current_version() {
        let conn = test_db();
        run_migrations(&conn).expect("migrations should succeed");

        let version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = test_db();
        run_migrations(&conn).expect("first run");
        run_migrations(&conn).expect("second run should be a no-op");

        let rows: i32 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn core_tables_exist_after_migration() {
        let conn = test_db();
        run_migrations(&conn).expect("migrations");

        for table in [
            "floor_units",
            "unit_records",
            "staff",
            "staff_payments",
            "suppliers",
            "supplier_bills",
            "supplier_payments",
            "supplier_receipts",
            "stock_items",
            "expenses",
        ] {
            let count: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "table {table} should exist");
        }
    }

    #[test]
    fn bill_status_is_constrained() {
        let conn = test_db();
        run_migrations(&conn).expect("migrations");

        conn.execute(
            "INSERT INTO suppliers (id, name, created_at) VALUES ('sup-1', 'Acme', datetime('now'))",
            [],
        )
        .unwrap();

        let err = conn.execute(
            "INSERT INTO supplier_bills (id, supplier_id, amount, date, status, created_at, updated_at)
             VALUES ('bill-1', 'sup-1', 100.0, '2024-01-01', 'BOGUS', datetime('now'), datetime('now'))",
            [],
        );
        assert!(err.is_err(), "invalid bill status should be rejected");
    }
}
