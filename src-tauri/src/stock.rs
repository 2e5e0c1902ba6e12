//! Stock movements. Each row is a single IN or OUT event; on-hand levels
//! are derived per SKU, never stored.

use chrono::Utc;
use rusqlite::params;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DbState;

/// Record a stock movement. `movement` defaults to IN.
pub fn add_stock_item(db: &DbState, payload: &Value) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let name = str_field(payload, "name")
        .filter(|n| !n.trim().is_empty())
        .ok_or("Missing name")?;
    let quantity = num_field(payload, "quantity").ok_or("Missing quantity")?;
    if quantity <= 0.0 {
        return Err("Quantity must be positive".into());
    }
    let unit_price = num_field(payload, "unitPrice")
        .or_else(|| num_field(payload, "unit_price"))
        .unwrap_or(0.0);
    if unit_price < 0.0 {
        return Err("Unit price must not be negative".into());
    }
    let movement = str_field(payload, "movement")
        .or_else(|| str_field(payload, "type"))
        .unwrap_or_else(|| "IN".to_string());
    if movement != "IN" && movement != "OUT" {
        return Err(format!("Invalid movement: {movement}. Must be IN or OUT"));
    }
    let sku = str_field(payload, "sku");
    let category = str_field(payload, "category");
    let description = str_field(payload, "description");

    let item_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO stock_items (id, name, sku, category, unit_price, quantity, description,
                                  movement, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            item_id,
            name.trim(),
            sku,
            category,
            unit_price,
            quantity,
            description,
            movement,
            now
        ],
    )
    .map_err(|e| format!("insert stock item: {e}"))?;

    info!(item_id = %item_id, name = %name.trim(), movement = %movement, quantity = %quantity, "Stock movement recorded");

    Ok(serde_json::json!({ "success": true, "itemId": item_id }))
}

/// List all stock movements, newest first.
pub fn get_stock_items(db: &DbState) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let mut stmt = conn
        .prepare(
            "SELECT id, name, sku, category, unit_price, quantity, description, movement,
                    created_at
             FROM stock_items
             ORDER BY created_at DESC",
        )
        .map_err(|e| e.to_string())?;

    let rows = stmt
        .query_map([], |row| {
            Ok(serde_json::json!({
                "id": row.get::<_, String>(0)?,
                "name": row.get::<_, String>(1)?,
                "sku": row.get::<_, Option<String>>(2)?,
                "category": row.get::<_, Option<String>>(3)?,
                "unitPrice": row.get::<_, f64>(4)?,
                "quantity": row.get::<_, f64>(5)?,
                "description": row.get::<_, Option<String>>(6)?,
                "movement": row.get::<_, String>(7)?,
                "createdAt": row.get::<_, String>(8)?,
            }))
        })
        .map_err(|e| e.to_string())?;

    let mut items = Vec::new();
    for row in rows {
        match row {
            Ok(item) => items.push(item),
            Err(e) => warn!("skipping malformed stock row: {e}"),
        }
    }

    Ok(serde_json::json!(items))
}

/// Delete one stock movement by id.
pub fn delete_stock_item(db: &DbState, item_id: &str) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let changed = conn
        .execute("DELETE FROM stock_items WHERE id = ?1", params![item_id])
        .map_err(|e| format!("delete stock item: {e}"))?;
    if changed == 0 {
        return Err(format!("Stock item not found: {item_id}"));
    }

    Ok(serde_json::json!({ "success": true }))
}

/// On-hand quantity per SKU: `sum(IN) - sum(OUT)`. Rows without a SKU are
/// not aggregated (nothing to key them on).
pub fn get_stock_levels(db: &DbState) -> Result<Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    let mut stmt = conn
        .prepare(
            "SELECT sku,
                    MAX(name),
                    SUM(CASE WHEN movement = 'IN' THEN quantity ELSE -quantity END)
             FROM stock_items
             WHERE sku IS NOT NULL AND sku != ''
             GROUP BY sku
             ORDER BY sku",
        )
        .map_err(|e| e.to_string())?;

    let rows = stmt
        .query_map([], |row| {
            Ok(serde_json::json!({
                "sku": row.get::<_, String>(0)?,
                "name": row.get::<_, String>(1)?,
                "onHand": row.get::<_, f64>(2)?,
            }))
        })
        .map_err(|e| e.to_string())?;

    let mut levels = Vec::new();
    for row in rows {
        match row {
            Ok(level) => levels.push(level),
            Err(e) => warn!("skipping malformed stock level row: {e}"),
        }
    }

    Ok(serde_json::json!(levels))
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
    fn movement_must_be_in_or_out() {
        let db = test_db();
        let err = add_stock_item(
            &db,
            &serde_json::json!({ "name": "Bulbs", "quantity": 5, "movement": "LOST" }),
        )
        .unwrap_err();
        assert!(err.contains("Invalid movement"));
    }

    #[test]
    fn stock_levels_net_in_against_out() {
        let db = test_db();
        for (qty, movement) in [(20.0, "IN"), (5.0, "OUT"), (3.0, "OUT")] {
            add_stock_item(
                &db,
                &serde_json::json!({
                    "name": "Tube Light", "sku": "TL-40",
                    "quantity": qty, "movement": movement
                }),
            )
            .unwrap();
        }
        // A row without a SKU is ignored by the level summary
        add_stock_item(&db, &serde_json::json!({ "name": "Misc", "quantity": 9 })).unwrap();

        let levels = get_stock_levels(&db).unwrap();
        let levels = levels.as_array().unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0]["sku"], "TL-40");
        assert_eq!(levels[0]["onHand"], 12.0);
    }

    #[test]
    fn delete_missing_item_errors() {
        let db = test_db();
        let err = delete_stock_item(&db, "nope").unwrap_err();
        assert!(err.contains("not found"));
    }
}
