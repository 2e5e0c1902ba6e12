//! Staff registry and payroll payments.
//!
//! Staff rows carry a monthly salary; payroll payments are recorded
//! against a staff member and summarized per month against that salary.

use chrono::Utc;
use rusqlite::params;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DbState;

// ---------------------------------------------------------------------------
// Staff
// ---------------------------------------------------------------------------

/// Add a staff member. Name is required; salary defaults to 0.
pub fn add_staff(db: &DbState, payload: &Value) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let name = str_field(payload, "name")
        .filter(|n| !n.trim().is_empty())
        .ok_or("Missing name")?;
    let role = str_field(payload, "role");
    let phone = str_field(payload, "phone");
    let salary = num_field(payload, "salary").unwrap_or(0.0);
    if salary < 0.0 {
        return Err("Salary must not be negative".into());
    }
    let join_date = str_field(payload, "joinDate").or_else(|| str_field(payload, "join_date"));

    let staff_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO staff (id, name, role, phone, salary, join_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![staff_id, name.trim(), role, phone, salary, join_date, now],
    )
    .map_err(|e| format!("insert staff: {e}"))?;

    info!(staff_id = %staff_id, name = %name.trim(), "Staff member added");

    Ok(serde_json::json!({ "success": true, "staffId": staff_id }))
}

/// List all staff members in insertion order.
pub fn get_staff(db: &DbState) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let mut stmt = conn
        .prepare(
            "SELECT id, name, role, phone, salary, join_date, created_at
             FROM staff
             ORDER BY rowid",
        )
        .map_err(|e| e.to_string())?;

    let rows = stmt
        .query_map([], |row| {
            Ok(serde_json::json!({
                "id": row.get::<_, String>(0)?,
                "name": row.get::<_, String>(1)?,
                "role": row.get::<_, Option<String>>(2)?,
                "phone": row.get::<_, Option<String>>(3)?,
                "salary": row.get::<_, f64>(4)?,
                "joinDate": row.get::<_, Option<String>>(5)?,
                "createdAt": row.get::<_, String>(6)?,
            }))
        })
        .map_err(|e| e.to_string())?;

    let mut staff = Vec::new();
    for row in rows {
        match row {
            Ok(member) => staff.push(member),
            Err(e) => warn!("skipping malformed staff row: {e}"),
        }
    }

    Ok(serde_json::json!(staff))
}

/// Delete a staff member; their payments go with them (FK cascade).
pub fn delete_staff(db: &DbState, staff_id: &str) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let changed = conn
        .execute("DELETE FROM staff WHERE id = ?1", params![staff_id])
        .map_err(|e| format!("delete staff: {e}"))?;
    if changed == 0 {
        return Err(format!("Staff not found: {staff_id}"));
    }

    info!(staff_id = %staff_id, "Staff member deleted");
    Ok(serde_json::json!({ "success": true }))
}

// ---------------------------------------------------------------------------
// Payroll payments
// ---------------------------------------------------------------------------

/// Record a payroll payment for a staff member.
pub fn record_staff_payment(db: &DbState, payload: &Value) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let staff_id = str_field(payload, "staffId")
        .or_else(|| str_field(payload, "staff_id"))
        .ok_or("Missing staffId")?;
    let amount = num_field(payload, "amount").ok_or("Missing amount")?;
    if amount <= 0.0 {
        return Err("Amount must be positive".into());
    }
    let date = str_field(payload, "date")
        .filter(|d| !d.trim().is_empty())
        .ok_or("Missing date")?;
    let remarks = str_field(payload, "remarks");

    // Verify staff exists before recording against them
    let exists: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM staff WHERE id = ?1",
            params![staff_id],
            |row| row.get(0),
        )
        .map_err(|e| format!("staff lookup: {e}"))?;
    if exists == 0 {
        return Err(format!("Staff not found: {staff_id}"));
    }

    let payment_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO staff_payments (id, staff_id, amount, date, remarks, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![payment_id, staff_id, amount, date.trim(), remarks, now],
    )
    .map_err(|e| format!("insert staff payment: {e}"))?;

    info!(payment_id = %payment_id, staff_id = %staff_id, amount = %amount, "Staff payment recorded");

    Ok(serde_json::json!({ "success": true, "paymentId": payment_id }))
}

/// All payments for one staff member, newest first.
pub fn get_staff_payments(db: &DbState, staff_id: &str) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let mut stmt = conn
        .prepare(
            "SELECT id, staff_id, amount, date, remarks, created_at
             FROM staff_payments
             WHERE staff_id = ?1
             ORDER BY created_at DESC",
        )
        .map_err(|e| e.to_string())?;

    let rows = stmt
        .query_map(params![staff_id], |row| {
            Ok(serde_json::json!({
                "id": row.get::<_, String>(0)?,
                "staffId": row.get::<_, String>(1)?,
                "amount": row.get::<_, f64>(2)?,
                "date": row.get::<_, String>(3)?,
                "remarks": row.get::<_, Option<String>>(4)?,
                "createdAt": row.get::<_, String>(5)?,
            }))
        })
        .map_err(|e| e.to_string())?;

    let mut payments = Vec::new();
    for row in rows {
        match row {
            Ok(payment) => payments.push(payment),
            Err(e) => warn!("skipping malformed staff payment row: {e}"),
        }
    }

    Ok(serde_json::json!(payments))
}

/// Delete one payroll payment by id.
pub fn delete_staff_payment(db: &DbState, payment_id: &str) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let changed = conn
        .execute(
            "DELETE FROM staff_payments WHERE id = ?1",
            params![payment_id],
        )
        .map_err(|e| format!("delete staff payment: {e}"))?;
    if changed == 0 {
        return Err(format!("Payment not found: {payment_id}"));
    }

    Ok(serde_json::json!({ "success": true }))
}

/// Per-staff payroll summary for one `YYYY-MM` month: salary, total paid
/// in that month, and the remaining balance (negative when overpaid).
pub fn get_payroll_summary(db: &DbState, month: &str) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let mut stmt = conn
        .prepare(
            "SELECT s.id, s.name, s.salary,
                    COALESCE((SELECT SUM(p.amount) FROM staff_payments p
                              WHERE p.staff_id = s.id AND substr(p.date, 1, 7) = ?1), 0)
             FROM staff s
             ORDER BY s.rowid",
        )
        .map_err(|e| e.to_string())?;

    let rows = stmt
        .query_map(params![month], |row| {
            let salary: f64 = row.get(2)?;
            let paid: f64 = row.get(3)?;
            Ok(serde_json::json!({
                "staffId": row.get::<_, String>(0)?,
                "name": row.get::<_, String>(1)?,
                "salary": salary,
                "paid": paid,
                "remaining": salary - paid,
            }))
        })
        .map_err(|e| e.to_string())?;

    let mut summary = Vec::new();
    for row in rows {
        match row {
            Ok(entry) => summary.push(entry),
            Err(e) => warn!("skipping malformed payroll row: {e}"),
        }
    }

    Ok(serde_json::json!({ "month": month, "staff": summary }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(String::from)
}

fn num_field(v: &Value, key: &str) -> Option<f64> {
    v.get(key).and_then(Value::as_f64)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use rusqlite::Connection;

    fn test_db() -> DbState {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;",
        )
        .expect("pragma setup");
        db::run_migrations_for_test(&conn);
        DbState {
            conn: std::sync::Mutex::new(conn),
            db_path: std::path::PathBuf::from(":memory:"),
        }
    }

    fn add_test_staff(db: &DbState, name: &str, salary: f64) -> String {
        let result = add_staff(
            db,
            &serde_json::json!({ "name": name, "role": "guard", "salary": salary }),
        )
        .unwrap();
        result["staffId"].as_str().unwrap().to_string()
    }

    #[test]
    fn add_staff_requires_name() {
        let db = test_db();
        let err = add_staff(&db, &serde_json::json!({ "salary": 100 })).unwrap_err();
        assert!(err.contains("Missing name"));
    }

    #[test]
    fn payments_require_existing_staff() {
        let db = test_db();
        let err = record_staff_payment(
            &db,
            &serde_json::json!({ "staffId": "ghost", "amount": 50, "date": "2024-06-01" }),
        )
        .unwrap_err();
        assert!(err.contains("Staff not found"));
    }

    #[test]
    fn payment_amount_must_be_positive() {
        let db = test_db();
        let staff_id = add_test_staff(&db, "Amir", 30000.0);
        let err = record_staff_payment(
            &db,
            &serde_json::json!({ "staffId": staff_id, "amount": 0, "date": "2024-06-01" }),
        )
        .unwrap_err();
        assert!(err.contains("positive"));
    }

    #[test]
    fn payroll_summary_sums_only_the_given_month() {
        let db = test_db();
        let staff_id = add_test_staff(&db, "Sana", 30000.0);

        for (amount, date) in [(10000.0, "2024-06-05"), (5000.0, "2024-06-20"), (7000.0, "2024-07-01")]
        {
            record_staff_payment(
                &db,
                &serde_json::json!({ "staffId": staff_id, "amount": amount, "date": date }),
            )
            .unwrap();
        }

        let summary = get_payroll_summary(&db, "2024-06").unwrap();
        let entry = &summary["staff"][0];
        assert_eq!(entry["paid"], 15000.0);
        assert_eq!(entry["remaining"], 15000.0);
    }

    #[test]
    fn deleting_staff_cascades_to_payments() {
        let db = test_db();
        let staff_id = add_test_staff(&db, "Bilal", 20000.0);
        record_staff_payment(
            &db,
            &serde_json::json!({ "staffId": staff_id, "amount": 500, "date": "2024-06-01" }),
        )
        .unwrap();

        delete_staff(&db, &staff_id).unwrap();

        let remaining: i64 = db
            .conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM staff_payments", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
