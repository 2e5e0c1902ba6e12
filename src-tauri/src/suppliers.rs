//! Suppliers: bills payable, payments made, and receipts issued.
//!
//! A supplier's balance is total billed minus total paid; receipts are
//! kept as a separate paper trail and do not change the balance.

use chrono::Utc;
use rusqlite::params;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DbState;

// ---------------------------------------------------------------------------
// Suppliers
// ---------------------------------------------------------------------------

/// Add a supplier. Names are unique; a duplicate is reported as such.
pub fn add_supplier(db: &DbState, payload: &Value) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let name = str_field(payload, "name")
        .filter(|n| !n.trim().is_empty())
        .ok_or("Missing name")?;
    let contact = str_field(payload, "contact");

    let supplier_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO suppliers (id, name, contact, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![supplier_id, name.trim(), contact, now],
    )
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            format!("Supplier already exists: {}", name.trim())
        } else {
            format!("insert supplier: {e}")
        }
    })?;

    info!(supplier_id = %supplier_id, name = %name.trim(), "Supplier added");

    Ok(serde_json::json!({ "success": true, "supplierId": supplier_id }))
}

/// List all suppliers in insertion order.
pub fn get_suppliers(db: &DbState) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let mut stmt = conn
        .prepare("SELECT id, name, contact, created_at FROM suppliers ORDER BY rowid")
        .map_err(|e| e.to_string())?;

    let rows = stmt
        .query_map([], |row| {
            Ok(serde_json::json!({
                "id": row.get::<_, String>(0)?,
                "name": row.get::<_, String>(1)?,
                "contact": row.get::<_, Option<String>>(2)?,
                "createdAt": row.get::<_, String>(3)?,
            }))
        })
        .map_err(|e| e.to_string())?;

    let mut suppliers = Vec::new();
    for row in rows {
        match row {
            Ok(supplier) => suppliers.push(supplier),
            Err(e) => warn!("skipping malformed supplier row: {e}"),
        }
    }

    Ok(serde_json::json!(suppliers))
}

/// Delete a supplier; bills, payments, and receipts cascade.
pub fn delete_supplier(db: &DbState, supplier_id: &str) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let changed = conn
        .execute("DELETE FROM suppliers WHERE id = ?1", params![supplier_id])
        .map_err(|e| format!("delete supplier: {e}"))?;
    if changed == 0 {
        return Err(format!("Supplier not found: {supplier_id}"));
    }

    info!(supplier_id = %supplier_id, "Supplier deleted");
    Ok(serde_json::json!({ "success": true }))
}

// ---------------------------------------------------------------------------
// Bills
// ---------------------------------------------------------------------------

/// Record a new bill for a supplier; status starts as PENDING.
pub fn add_bill(db: &DbState, payload: &Value) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let supplier_id = str_field(payload, "supplierId")
        .or_else(|| str_field(payload, "supplier_id"))
        .ok_or("Missing supplierId")?;
    let amount = num_field(payload, "amount").ok_or("Missing amount")?;
    if amount <= 0.0 {
        return Err("Amount must be positive".into());
    }
    let date = str_field(payload, "date")
        .filter(|d| !d.trim().is_empty())
        .ok_or("Missing date")?;
    let bill_no = str_field(payload, "billNo").or_else(|| str_field(payload, "bill_no"));
    let due_date = str_field(payload, "dueDate").or_else(|| str_field(payload, "due_date"));
    let description = str_field(payload, "description");

    let exists: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM suppliers WHERE id = ?1",
            params![supplier_id],
            |row| row.get(0),
        )
        .map_err(|e| format!("supplier lookup: {e}"))?;
    if exists == 0 {
        return Err(format!("Supplier not found: {supplier_id}"));
    }

    let bill_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO supplier_bills (id, bill_no, supplier_id, amount, date, due_date,
                                     description, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'PENDING', ?8, ?8)",
        params![
            bill_id,
            bill_no,
            supplier_id,
            amount,
            date.trim(),
            due_date,
            description,
            now
        ],
    )
    .map_err(|e| format!("insert bill: {e}"))?;

    info!(bill_id = %bill_id, supplier_id = %supplier_id, amount = %amount, "Bill recorded");

    Ok(serde_json::json!({ "success": true, "billId": bill_id }))
}

/// List bills, optionally filtered by status (`ALL`, `PENDING`, `PAID`).
pub fn get_bills(db: &DbState, filter: &str) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let status = match filter {
        "ALL" | "" => None,
        "PENDING" | "PAID" => Some(filter),
        other => return Err(format!("Invalid bill filter: {other}")),
    };

    let sql = "SELECT b.id, b.bill_no, b.supplier_id, s.name, b.amount, b.date, b.due_date,
                      b.description, b.status, b.created_at
               FROM supplier_bills b
               JOIN suppliers s ON s.id = b.supplier_id
               WHERE (?1 IS NULL OR b.status = ?1)
               ORDER BY b.created_at DESC";

    let mut stmt = conn.prepare(sql).map_err(|e| e.to_string())?;

    let rows = stmt
        .query_map(params![status], |row| {
            Ok(serde_json::json!({
                "id": row.get::<_, String>(0)?,
                "billNo": row.get::<_, Option<String>>(1)?,
                "supplierId": row.get::<_, String>(2)?,
                "supplierName": row.get::<_, String>(3)?,
                "amount": row.get::<_, f64>(4)?,
                "date": row.get::<_, String>(5)?,
                "dueDate": row.get::<_, Option<String>>(6)?,
                "description": row.get::<_, Option<String>>(7)?,
                "status": row.get::<_, String>(8)?,
                "createdAt": row.get::<_, String>(9)?,
            }))
        })
        .map_err(|e| e.to_string())?;

    let mut bills = Vec::new();
    for row in rows {
        match row {
            Ok(bill) => bills.push(bill),
            Err(e) => warn!("skipping malformed bill row: {e}"),
        }
    }

    Ok(serde_json::json!(bills))
}

/// Mark a bill as paid.
pub fn mark_bill_paid(db: &DbState, bill_id: &str) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let changed = conn
        .execute(
            "UPDATE supplier_bills SET status = 'PAID', updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), bill_id],
        )
        .map_err(|e| format!("mark bill paid: {e}"))?;
    if changed == 0 {
        return Err(format!("Bill not found: {bill_id}"));
    }

    info!(bill_id = %bill_id, "Bill marked paid");
    Ok(serde_json::json!({ "success": true }))
}

/// Delete one bill by id.
pub fn delete_bill(db: &DbState, bill_id: &str) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let changed = conn
        .execute("DELETE FROM supplier_bills WHERE id = ?1", params![bill_id])
        .map_err(|e| format!("delete bill: {e}"))?;
    if changed == 0 {
        return Err(format!("Bill not found: {bill_id}"));
    }

    Ok(serde_json::json!({ "success": true }))
}

// ---------------------------------------------------------------------------
// Payments and receipts
// ---------------------------------------------------------------------------

/// Record a payment made to a supplier.
pub fn add_supplier_payment(db: &DbState, payload: &Value) -> Result<Value, String> {
    insert_money_row(
        db,
        payload,
        "supplier_payments",
        "INSERT INTO supplier_payments (id, supplier_id, amount, date, remarks, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
}

/// List payments for one supplier, newest first.
pub fn get_supplier_payments(db: &DbState, supplier_id: &str) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let mut stmt = conn
        .prepare(
            "SELECT id, supplier_id, amount, date, remarks, created_at
             FROM supplier_payments
             WHERE supplier_id = ?1
             ORDER BY created_at DESC",
        )
        .map_err(|e| e.to_string())?;

    let rows = stmt
        .query_map(params![supplier_id], |row| {
            Ok(serde_json::json!({
                "id": row.get::<_, String>(0)?,
                "supplierId": row.get::<_, String>(1)?,
                "amount": row.get::<_, f64>(2)?,
                "date": row.get::<_, String>(3)?,
                "remarks": row.get::<_, Option<String>>(4)?,
                "createdAt": row.get::<_, String>(5)?,
            }))
        })
        .map_err(|e| e.to_string())?;

    collect_rows(rows)
}

/// Delete one supplier payment by id.
pub fn delete_supplier_payment(db: &DbState, payment_id: &str) -> Result<Value, String> {
    delete_by_id(db, "supplier_payments", "Payment", payment_id)
}

/// Record a receipt issued by a supplier.
pub fn add_supplier_receipt(db: &DbState, payload: &Value) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let supplier_id = str_field(payload, "supplierId")
        .or_else(|| str_field(payload, "supplier_id"))
        .ok_or("Missing supplierId")?;
    let amount = num_field(payload, "amount").ok_or("Missing amount")?;
    if amount <= 0.0 {
        return Err("Amount must be positive".into());
    }
    let date = str_field(payload, "date")
        .filter(|d| !d.trim().is_empty())
        .ok_or("Missing date")?;
    let remarks = str_field(payload, "remarks");
    let receipt_no = str_field(payload, "receiptNo").or_else(|| str_field(payload, "receipt_no"));

    let exists: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM suppliers WHERE id = ?1",
            params![supplier_id],
            |row| row.get(0),
        )
        .map_err(|e| format!("supplier lookup: {e}"))?;
    if exists == 0 {
        return Err(format!("Supplier not found: {supplier_id}"));
    }

    let receipt_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO supplier_receipts (id, supplier_id, amount, date, remarks, receipt_no,
                                        created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            receipt_id,
            supplier_id,
            amount,
            date.trim(),
            remarks,
            receipt_no,
            now
        ],
    )
    .map_err(|e| format!("insert receipt: {e}"))?;

    info!(receipt_id = %receipt_id, supplier_id = %supplier_id, "Supplier receipt recorded");

    Ok(serde_json::json!({ "success": true, "receiptId": receipt_id }))
}

/// List receipts for one supplier, newest first.
pub fn get_supplier_receipts(db: &DbState, supplier_id: &str) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let mut stmt = conn
        .prepare(
            "SELECT id, supplier_id, amount, date, remarks, receipt_no, created_at
             FROM supplier_receipts
             WHERE supplier_id = ?1
             ORDER BY created_at DESC",
        )
        .map_err(|e| e.to_string())?;

    let rows = stmt
        .query_map(params![supplier_id], |row| {
            Ok(serde_json::json!({
                "id": row.get::<_, String>(0)?,
                "supplierId": row.get::<_, String>(1)?,
                "amount": row.get::<_, f64>(2)?,
                "date": row.get::<_, String>(3)?,
                "remarks": row.get::<_, Option<String>>(4)?,
                "receiptNo": row.get::<_, Option<String>>(5)?,
                "createdAt": row.get::<_, String>(6)?,
            }))
        })
        .map_err(|e| e.to_string())?;

    collect_rows(rows)
}

/// Delete one supplier receipt by id.
pub fn delete_supplier_receipt(db: &DbState, receipt_id: &str) -> Result<Value, String> {
    delete_by_id(db, "supplier_receipts", "Receipt", receipt_id)
}

// ---------------------------------------------------------------------------
// Balances
// ---------------------------------------------------------------------------

/// Per-supplier balance: total billed, total paid, and the difference.
pub fn get_supplier_balances(db: &DbState) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let mut stmt = conn
        .prepare(
            "SELECT s.id, s.name,
                    COALESCE((SELECT SUM(b.amount) FROM supplier_bills b
                              WHERE b.supplier_id = s.id), 0) AS billed,
                    COALESCE((SELECT SUM(p.amount) FROM supplier_payments p
                              WHERE p.supplier_id = s.id), 0) AS paid
             FROM suppliers s
             ORDER BY s.rowid",
        )
        .map_err(|e| e.to_string())?;

    let rows = stmt
        .query_map([], |row| {
            let billed: f64 = row.get(2)?;
            let paid: f64 = row.get(3)?;
            Ok(serde_json::json!({
                "supplierId": row.get::<_, String>(0)?,
                "name": row.get::<_, String>(1)?,
                "totalBilled": billed,
                "totalPaid": paid,
                "balance": billed - paid,
            }))
        })
        .map_err(|e| e.to_string())?;

    collect_rows(rows)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn insert_money_row(
    db: &DbState,
    payload: &Value,
    table: &str,
    insert_sql: &str,
) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let supplier_id = str_field(payload, "supplierId")
        .or_else(|| str_field(payload, "supplier_id"))
        .ok_or("Missing supplierId")?;
    let amount = num_field(payload, "amount").ok_or("Missing amount")?;
    if amount <= 0.0 {
        return Err("Amount must be positive".into());
    }
    let date = str_field(payload, "date")
        .filter(|d| !d.trim().is_empty())
        .ok_or("Missing date")?;
    let remarks = str_field(payload, "remarks");

    let exists: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM suppliers WHERE id = ?1",
            params![supplier_id],
            |row| row.get(0),
        )
        .map_err(|e| format!("supplier lookup: {e}"))?;
    if exists == 0 {
        return Err(format!("Supplier not found: {supplier_id}"));
    }

    let row_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        insert_sql,
        params![row_id, supplier_id, amount, date.trim(), remarks, now],
    )
    .map_err(|e| format!("insert into {table}: {e}"))?;

    info!(id = %row_id, supplier_id = %supplier_id, amount = %amount, table = %table, "Supplier entry recorded");

    Ok(serde_json::json!({ "success": true, "id": row_id }))
}

fn delete_by_id(db: &DbState, table: &str, label: &str, id: &str) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let changed = conn
        .execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])
        .map_err(|e| format!("delete from {table}: {e}"))?;
    if changed == 0 {
        return Err(format!("{label} not found: {id}"));
    }

    Ok(serde_json::json!({ "success": true }))
}

fn collect_rows(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<Value>>,
) -> Result<Value, String> {
    let mut out = Vec::new();
    for row in rows {
        match row {
            Ok(value) => out.push(value),
            Err(e) => warn!("skipping malformed row: {e}"),
        }
    }
    Ok(serde_json::json!(out))
}

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

    fn add_test_supplier(db: &DbState, name: &str) -> String {
        let result = add_supplier(db, &serde_json::json!({ "name": name })).unwrap();
        result["supplierId"].as_str().unwrap().to_string()
    }

    #[test]
    fn duplicate_supplier_names_are_rejected() {
        let db = test_db();
        add_test_supplier(&db, "Metro Traders");
        let err = add_supplier(&db, &serde_json::json!({ "name": "Metro Traders" })).unwrap_err();
        assert!(err.contains("already exists"));
    }

    #[test]
    fn bill_filter_selects_by_status() {
        let db = test_db();
        let supplier_id = add_test_supplier(&db, "Metro Traders");

        let bill = add_bill(
            &db,
            &serde_json::json!({
                "supplierId": supplier_id, "amount": 1200.0,
                "date": "2024-06-01", "billNo": "B-100"
            }),
        )
        .unwrap();
        add_bill(
            &db,
            &serde_json::json!({
                "supplierId": supplier_id, "amount": 800.0, "date": "2024-06-02"
            }),
        )
        .unwrap();

        mark_bill_paid(&db, bill["billId"].as_str().unwrap()).unwrap();

        let pending = get_bills(&db, "PENDING").unwrap();
        assert_eq!(pending.as_array().unwrap().len(), 1);
        assert_eq!(pending[0]["amount"], 800.0);

        let paid = get_bills(&db, "PAID").unwrap();
        assert_eq!(paid.as_array().unwrap().len(), 1);
        assert_eq!(paid[0]["billNo"], "B-100");

        let all = get_bills(&db, "ALL").unwrap();
        assert_eq!(all.as_array().unwrap().len(), 2);

        assert!(get_bills(&db, "OVERDUE").is_err());
    }

    #[test]
    fn balance_is_billed_minus_paid() {
        let db = test_db();
        let supplier_id = add_test_supplier(&db, "Lahore Lumber");

        add_bill(
            &db,
            &serde_json::json!({ "supplierId": supplier_id, "amount": 5000.0, "date": "2024-06-01" }),
        )
        .unwrap();
        add_supplier_payment(
            &db,
            &serde_json::json!({ "supplierId": supplier_id, "amount": 1500.0, "date": "2024-06-10" }),
        )
        .unwrap();

        let balances = get_supplier_balances(&db).unwrap();
        assert_eq!(balances[0]["totalBilled"], 5000.0);
        assert_eq!(balances[0]["totalPaid"], 1500.0);
        assert_eq!(balances[0]["balance"], 3500.0);
    }

    #[test]
    fn receipts_do_not_affect_balance() {
        let db = test_db();
        let supplier_id = add_test_supplier(&db, "City Glass");

        add_supplier_receipt(
            &db,
            &serde_json::json!({
                "supplierId": supplier_id, "amount": 999.0,
                "date": "2024-06-03", "receiptNo": "R-7"
            }),
        )
        .unwrap();

        let balances = get_supplier_balances(&db).unwrap();
        assert_eq!(balances[0]["balance"], 0.0);

        let receipts = get_supplier_receipts(&db, &supplier_id).unwrap();
        assert_eq!(receipts.as_array().unwrap().len(), 1);
        assert_eq!(receipts[0]["receiptNo"], "R-7");
    }

    #[test]
    fn deleting_supplier_cascades() {
        let db = test_db();
        let supplier_id = add_test_supplier(&db, "Gone Goods");
        add_bill(
            &db,
            &serde_json::json!({ "supplierId": supplier_id, "amount": 10.0, "date": "2024-06-01" }),
        )
        .unwrap();

        delete_supplier(&db, &supplier_id).unwrap();

        let bills: i64 = db
            .conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM supplier_bills", [], |row| row.get(0))
            .unwrap();
        assert_eq!(bills, 0);
    }
}
