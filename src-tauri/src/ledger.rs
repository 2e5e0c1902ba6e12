//! Floor unit ledger for Broadway Mall Books.
//!
//! One generic implementation of the per-floor rent ledger the legacy app
//! duplicated across every floor screen: a floor owns a set of rental
//! units, each unit can stage one pending payment entry (date + down
//! payment), and committing that entry appends an immutable history record
//! and clears the staged fields.
//!
//! Invariant maintained everywhere:
//! `total = if down_payment > 0 { area + down_payment } else { 0 }`.
//! The total is persisted for cheap reads but never trusted on load; it is
//! recomputed from area and down payment every time a floor is loaded.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DbState;
use crate::floors::{self, FloorConfig};

/// Typed failures surfaced to the command layer. The ledger never retries
/// on its own; the presenter owns user-facing messaging and retry.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("commit failed: {0}")]
    CommitFailed(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<LedgerError> for String {
    fn from(err: LedgerError) -> Self {
        err.to_string()
    }
}

/// One rentable unit. Serialized field names match the legacy screens
/// (`unitNo`, `downPayment`), which the frontend still binds to.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: String,
    pub floor_key: String,
    pub unit_no: String,
    pub area: f64,
    /// Pending payment date (ISO `YYYY-MM-DD`), empty when nothing is staged.
    pub date: String,
    pub down_payment: f64,
    pub total: f64,
}

/// One committed payment record. Snapshots of area/down/total are taken at
/// commit time and never recomputed; history is keyed by unit number (a
/// legacy quirk) but always scoped by floor.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnitRecord {
    pub id: String,
    pub floor_key: String,
    pub unit_no: String,
    pub date: String,
    pub area: f64,
    pub down_payment: f64,
    pub total: f64,
    pub created_at: String,
}

/// Editable unit fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnitField {
    Area,
    Date,
    DownPayment,
}

impl UnitField {
    /// Accepts the legacy camelCase keys the screens send, plus snake_case.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "area" => Some(UnitField::Area),
            "date" => Some(UnitField::Date),
            "downPayment" | "down_payment" => Some(UnitField::DownPayment),
            _ => None,
        }
    }
}

fn derived_total(area: f64, down_payment: f64) -> f64 {
    if down_payment > 0.0 {
        area + down_payment
    } else {
        0.0
    }
}

/// Permissive numeric parse matching the legacy free-text inputs: numbers
/// pass through, numeric strings parse, anything else (including negative
/// input) becomes 0. Intentional tolerance, not a bug.
pub fn parse_amount(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if parsed.is_finite() && parsed > 0.0 {
        parsed
    } else {
        0.0
    }
}

fn lock_conn(db: &DbState) -> Result<std::sync::MutexGuard<'_, Connection>, LedgerError> {
    db.conn
        .lock()
        .map_err(|e| LedgerError::StorageUnavailable(format!("connection lock: {e}")))
}

fn config_for(floor_key: &str) -> Result<&'static FloorConfig, LedgerError> {
    floors::floor_config(floor_key)
        .ok_or_else(|| LedgerError::NotFound(format!("unknown floor: {floor_key}")))
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

/// Load all units for a floor, seeding the floor's default units first if
/// the stored set is empty.
///
/// Stored totals are recomputed on every load; a value left stale by a
/// partial write is overwritten in place. A storage failure is reported as
/// `StorageUnavailable` so the presenter can tell "load failed" apart from
/// "floor has no units".
pub fn load_units(db: &DbState, floor_key: &str) -> Result<Vec<Unit>, LedgerError> {
    let cfg = config_for(floor_key)?;
    let conn = lock_conn(db)?;

    let mut units = select_units(&conn, floor_key)?;

    if units.is_empty() && !cfg.seed.is_empty() {
        seed_floor(&conn, cfg)?;
        // Re-run the load path once the last seed insert has completed.
        units = select_units(&conn, floor_key)?;
        info!(floor_key = %floor_key, count = units.len(), "Seeded floor with default units");
        return Ok(units);
    }

    let now = Utc::now().to_rfc3339();
    for unit in units.iter_mut() {
        let fresh = derived_total(unit.area, unit.down_payment);
        if fresh != unit.total {
            warn!(
                unit_no = %unit.unit_no,
                stored = unit.total,
                recomputed = fresh,
                "Stale stored total, overwriting"
            );
            conn.execute(
                "UPDATE floor_units SET total = ?1, updated_at = ?2 WHERE id = ?3",
                params![fresh, now, unit.id],
            )
            .map_err(|e| LedgerError::StorageUnavailable(format!("rewrite total: {e}")))?;
            unit.total = fresh;
        }
    }

    Ok(units)
}

fn select_units(conn: &Connection, floor_key: &str) -> Result<Vec<Unit>, LedgerError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, floor_key, unit_no, area, date, down_payment, total
             FROM floor_units
             WHERE floor_key = ?1
             ORDER BY rowid",
        )
        .map_err(|e| LedgerError::StorageUnavailable(format!("prepare unit query: {e}")))?;

    let rows = stmt
        .query_map(params![floor_key], |row| {
            Ok(Unit {
                id: row.get(0)?,
                floor_key: row.get(1)?,
                unit_no: row.get(2)?,
                area: row.get(3)?,
                date: row.get(4)?,
                down_payment: row.get(5)?,
                total: row.get(6)?,
            })
        })
        .map_err(|e| LedgerError::StorageUnavailable(format!("query units: {e}")))?;

    let mut units = Vec::new();
    for row in rows {
        units.push(row.map_err(|e| LedgerError::StorageUnavailable(format!("unit row: {e}")))?);
    }
    Ok(units)
}

/// Insert a floor's seed units in seed order, one at a time. Each insert
/// must complete before the next is issued; the reload only happens after
/// the whole loop finishes, never keyed off a particular list index.
fn seed_floor(conn: &Connection, cfg: &FloorConfig) -> Result<(), LedgerError> {
    let now = Utc::now().to_rfc3339();
    for (unit_no, area) in cfg.seed {
        conn.execute(
            "INSERT INTO floor_units (id, floor_key, unit_no, area, date, down_payment, total,
                                      created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, '', 0, 0, ?5, ?5)",
            params![Uuid::new_v4().to_string(), cfg.floor_key, unit_no, area, now],
        )
        .map_err(|e| LedgerError::StorageUnavailable(format!("seed unit {unit_no}: {e}")))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Field updates
// ---------------------------------------------------------------------------

/// Update one editable field on a unit and recompute the derived total.
///
/// The total uses the new value for the changed operand and the stored
/// value for the other. Same-unit updates apply strictly in call order
/// (last write wins) because every write goes through the single
/// connection mutex.
pub fn update_unit_field(
    db: &DbState,
    floor_key: &str,
    unit_id: &str,
    field: UnitField,
    value: &Value,
) -> Result<Unit, LedgerError> {
    let conn = lock_conn(db)?;

    let mut unit = select_unit(&conn, floor_key, unit_id)?;

    match field {
        UnitField::Area => unit.area = parse_amount(value),
        UnitField::DownPayment => unit.down_payment = parse_amount(value),
        UnitField::Date => {
            let date = value
                .as_str()
                .ok_or_else(|| LedgerError::Validation("date must be a string".into()))?;
            unit.date = date.trim().to_string();
        }
    }
    unit.total = derived_total(unit.area, unit.down_payment);

    let now = Utc::now().to_rfc3339();
    let changed = conn
        .execute(
            "UPDATE floor_units
             SET area = ?1, date = ?2, down_payment = ?3, total = ?4, updated_at = ?5
             WHERE id = ?6 AND floor_key = ?7",
            params![
                unit.area,
                unit.date,
                unit.down_payment,
                unit.total,
                now,
                unit_id,
                floor_key
            ],
        )
        .map_err(|e| LedgerError::StorageUnavailable(format!("update unit: {e}")))?;

    if changed == 0 {
        return Err(LedgerError::NotFound(format!("unit {unit_id}")));
    }

    Ok(unit)
}

fn select_unit(conn: &Connection, floor_key: &str, unit_id: &str) -> Result<Unit, LedgerError> {
    conn.query_row(
        "SELECT id, floor_key, unit_no, area, date, down_payment, total
         FROM floor_units
         WHERE id = ?1 AND floor_key = ?2",
        params![unit_id, floor_key],
        |row| {
            Ok(Unit {
                id: row.get(0)?,
                floor_key: row.get(1)?,
                unit_no: row.get(2)?,
                area: row.get(3)?,
                date: row.get(4)?,
                down_payment: row.get(5)?,
                total: row.get(6)?,
            })
        },
    )
    .optional()
    .map_err(|e| LedgerError::StorageUnavailable(format!("load unit: {e}")))?
    .ok_or_else(|| LedgerError::NotFound(format!("unit {unit_id}")))
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// Turn a unit's pending entry into a permanent history record and clear
/// the pending fields, as one transaction.
///
/// The record snapshots area, down payment, and `total = area + down` at
/// the moment of commit; later edits to the unit never touch it. If record
/// creation fails the pending fields are left intact so the operator can
/// retry without re-entering data.
pub fn commit_unit_record(
    db: &DbState,
    floor_key: &str,
    unit_id: &str,
) -> Result<UnitRecord, LedgerError> {
    let conn = lock_conn(db)?;

    let unit = select_unit(&conn, floor_key, unit_id)?;
    if unit.date.is_empty() {
        return Err(LedgerError::Validation("date required".into()));
    }

    let record = UnitRecord {
        id: Uuid::new_v4().to_string(),
        floor_key: unit.floor_key.clone(),
        unit_no: unit.unit_no.clone(),
        date: unit.date.clone(),
        area: unit.area,
        down_payment: unit.down_payment,
        total: unit.area + unit.down_payment,
        created_at: Utc::now().to_rfc3339(),
    };

    conn.execute_batch("BEGIN IMMEDIATE")
        .map_err(|e| LedgerError::CommitFailed(format!("begin transaction: {e}")))?;

    let result = (|| -> Result<(), LedgerError> {
        conn.execute(
            "INSERT INTO unit_records (id, floor_key, unit_no, date, area, down_payment, total,
                                       created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id,
                record.floor_key,
                record.unit_no,
                record.date,
                record.area,
                record.down_payment,
                record.total,
                record.created_at
            ],
        )
        .map_err(|e| LedgerError::CommitFailed(format!("insert record: {e}")))?;

        conn.execute(
            "UPDATE floor_units
             SET date = '', down_payment = 0, total = 0, updated_at = ?1
             WHERE id = ?2 AND floor_key = ?3",
            params![record.created_at, unit_id, floor_key],
        )
        .map_err(|e| LedgerError::CommitFailed(format!("reset pending fields: {e}")))?;

        Ok(())
    })();

    match result {
        Ok(()) => {
            conn.execute_batch("COMMIT")
                .map_err(|e| LedgerError::CommitFailed(format!("commit: {e}")))?;
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            return Err(e);
        }
    }

    info!(
        floor_key = %floor_key,
        unit_no = %record.unit_no,
        date = %record.date,
        total = record.total,
        "Unit payment committed"
    );

    Ok(record)
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// All committed records for `(floor, unit number, date)`, in insertion
/// order. An empty result is a normal outcome, not an error.
pub fn get_unit_records(
    db: &DbState,
    floor_key: &str,
    unit_no: &str,
    date: &str,
) -> Result<Vec<UnitRecord>, LedgerError> {
    let conn = lock_conn(db)?;

    let mut stmt = conn
        .prepare(
            "SELECT id, floor_key, unit_no, date, area, down_payment, total, created_at
             FROM unit_records
             WHERE floor_key = ?1 AND unit_no = ?2 AND date = ?3
             ORDER BY rowid",
        )
        .map_err(|e| LedgerError::StorageUnavailable(format!("prepare record query: {e}")))?;

    let rows = stmt
        .query_map(params![floor_key, unit_no, date], |row| {
            Ok(UnitRecord {
                id: row.get(0)?,
                floor_key: row.get(1)?,
                unit_no: row.get(2)?,
                date: row.get(3)?,
                area: row.get(4)?,
                down_payment: row.get(5)?,
                total: row.get(6)?,
                created_at: row.get(7)?,
            })
        })
        .map_err(|e| LedgerError::StorageUnavailable(format!("query records: {e}")))?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row.map_err(|e| LedgerError::StorageUnavailable(format!("record row: {e}")))?);
    }
    Ok(records)
}

/// Delete one history record by id. The owning unit's pending state and
/// total are unaffected.
pub fn delete_unit_record(db: &DbState, record_id: &str) -> Result<(), LedgerError> {
    let conn = lock_conn(db)?;

    let changed = conn
        .execute(
            "DELETE FROM unit_records WHERE id = ?1",
            params![record_id],
        )
        .map_err(|e| LedgerError::StorageUnavailable(format!("delete record: {e}")))?;

    if changed == 0 {
        return Err(LedgerError::NotFound(format!("record {record_id}")));
    }

    info!(record_id = %record_id, "Unit payment record deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit add / delete
// ---------------------------------------------------------------------------

/// Create a new unit with the next number in the floor's scheme.
///
/// The number derives from the numerically highest existing unit number
/// (see [`floors::NumberingScheme::next_unit_no`]). The unit is only
/// returned once the insert has succeeded and an id exists; every later
/// operation on the unit needs that id.
pub fn add_unit(db: &DbState, floor_key: &str) -> Result<Unit, LedgerError> {
    let cfg = config_for(floor_key)?;
    let conn = lock_conn(db)?;

    let existing = select_units(&conn, floor_key)?;
    let unit_no = cfg
        .numbering
        .next_unit_no(existing.iter().map(|u| u.unit_no.as_str()));

    let now = Utc::now().to_rfc3339();
    let unit = Unit {
        id: Uuid::new_v4().to_string(),
        floor_key: floor_key.to_string(),
        unit_no,
        area: 0.0,
        date: String::new(),
        down_payment: 0.0,
        total: 0.0,
    };

    conn.execute(
        "INSERT INTO floor_units (id, floor_key, unit_no, area, date, down_payment, total,
                                  created_at, updated_at)
         VALUES (?1, ?2, ?3, 0, '', 0, 0, ?4, ?4)",
        params![unit.id, unit.floor_key, unit.unit_no, now],
    )
    .map_err(|e| LedgerError::StorageUnavailable(format!("insert unit: {e}")))?;

    info!(floor_key = %floor_key, unit_no = %unit.unit_no, "Unit added");
    Ok(unit)
}

/// Delete a unit. Its history records are kept on purpose: records are
/// keyed by unit number, not unit id, and outlive the unit.
pub fn delete_unit(db: &DbState, floor_key: &str, unit_id: &str) -> Result<(), LedgerError> {
    let conn = lock_conn(db)?;

    let changed = conn
        .execute(
            "DELETE FROM floor_units WHERE id = ?1 AND floor_key = ?2",
            params![unit_id, floor_key],
        )
        .map_err(|e| LedgerError::StorageUnavailable(format!("delete unit: {e}")))?;

    if changed == 0 {
        return Err(LedgerError::NotFound(format!("unit {unit_id}")));
    }

    info!(floor_key = %floor_key, unit_id = %unit_id, "Unit deleted");
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================
