//! General mall expenses (utilities, maintenance, one-off purchases).

use chrono::Utc;
use rusqlite::params;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DbState;

/// Record an expense. Category, amount, and date are required.
pub fn add_expense(db: &DbState, payload: &Value) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let category = str_field(payload, "category")
        .filter(|c| !c.trim().is_empty())
        .ok_or("Missing category")?;
    let amount = num_field(payload, "amount").ok_or("Missing amount")?;
    if amount <= 0.0 {
        return Err("Amount must be positive".into());
    }
    let date = str_field(payload, "date")
        .filter(|d| !d.trim().is_empty())
        .ok_or("Missing date")?;
    let payee = str_field(payload, "payee");
    let remarks = str_field(payload, "remarks");

    let expense_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO expenses (id, category, amount, date, payee, remarks, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            expense_id,
            category.trim(),
            amount,
            date.trim(),
            payee,
            remarks,
            now
        ],
    )
    .map_err(|e| format!("insert expense: {e}"))?;

    info!(expense_id = %expense_id, category = %category.trim(), amount = %amount, "Expense recorded");

    Ok(serde_json::json!({ "success": true, "expenseId": expense_id }))
}

/// List expenses, newest first. `filter` is either `ALL` or a `YYYY-MM`
/// month prefix applied to the expense date.
pub fn get_expenses(db: &DbState, filter: &str) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let month = match filter {
        "ALL" | "" => None,
        m => Some(m),
    };

    let mut stmt = conn
        .prepare(
            "SELECT id, category, amount, date, payee, remarks, created_at
             FROM expenses
             WHERE (?1 IS NULL OR substr(date, 1, 7) = ?1)
             ORDER BY date DESC, created_at DESC",
        )
        .map_err(|e| e.to_string())?;

    let rows = stmt
        .query_map(params![month], |row| {
            Ok(serde_json::json!({
                "id": row.get::<_, String>(0)?,
                "category": row.get::<_, String>(1)?,
                "amount": row.get::<_, f64>(2)?,
                "date": row.get::<_, String>(3)?,
                "payee": row.get::<_, Option<String>>(4)?,
                "remarks": row.get::<_, Option<String>>(5)?,
                "createdAt": row.get::<_, String>(6)?,
            }))
        })
        .map_err(|e| e.to_string())?;

    let mut expenses = Vec::new();
    for row in rows {
        match row {
            Ok(expense) => expenses.push(expense),
            Err(e) => warn!("skipping malformed expense row: {e}"),
        }
    }

    Ok(serde_json::json!(expenses))
}

/// Delete one expense by id.
pub fn delete_expense(db: &DbState, expense_id: &str) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let changed = conn
        .execute("DELETE FROM expenses WHERE id = ?1", params![expense_id])
        .map_err(|e| format!("delete expense: {e}"))?;
    if changed == 0 {
        return Err(format!("Expense not found: {expense_id}"));
    }

    Ok(serde_json::json!({ "success": true }))
}

/// Total spent in a `YYYY-MM` month.
pub fn get_monthly_total(db: &DbState, month: &str) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let total: f64 = conn
        .query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM expenses WHERE substr(date, 1, 7) = ?1",
            params![month],
            |row| row.get(0),
        )
        .map_err(|e| format!("monthly total: {e}"))?;

    Ok(serde_json::json!({ "month": month, "total": total }))
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

    #[test]
    fn month_filter_limits_results() {
        let db = test_db();
        for (amount, date) in [(100.0, "2024-06-01"), (40.0, "2024-06-15"), (75.0, "2024-07-02")] {
            add_expense(
                &db,
                &serde_json::json!({ "category": "utilities", "amount": amount, "date": date }),
            )
            .unwrap();
        }

        let june = get_expenses(&db, "2024-06").unwrap();
        assert_eq!(june.as_array().unwrap().len(), 2);

        let all = get_expenses(&db, "ALL").unwrap();
        assert_eq!(all.as_array().unwrap().len(), 3);

        let total = get_monthly_total(&db, "2024-06").unwrap();
        assert_eq!(total["total"], 140.0);
    }

    #[test]
    fn expense_requires_category_amount_date() {
        let db = test_db();
        assert!(add_expense(&db, &serde_json::json!({ "amount": 10, "date": "2024-06-01" }))
            .is_err());
        assert!(add_expense(
            &db,
            &serde_json::json!({ "category": "misc", "date": "2024-06-01" })
        )
        .is_err());
        assert!(
            add_expense(&db, &serde_json::json!({ "category": "misc", "amount": 10 })).is_err()
        );
    }
}
