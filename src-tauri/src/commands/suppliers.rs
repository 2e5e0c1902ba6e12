use serde_json::Value;

use crate::{db, payload_arg0_as_string, suppliers, value_str};

fn parse_supplier_id_payload(arg0: Option<Value>) -> Result<String, String> {
    payload_arg0_as_string(arg0, &["supplierId", "supplier_id", "id"])
        .ok_or("Missing supplierId".into())
}

fn parse_bill_id_payload(arg0: Option<Value>) -> Result<String, String> {
    payload_arg0_as_string(arg0, &["billId", "bill_id", "id"]).ok_or("Missing billId".into())
}

fn parse_payment_id_payload(arg0: Option<Value>) -> Result<String, String> {
    payload_arg0_as_string(arg0, &["paymentId", "payment_id", "id"])
        .ok_or("Missing paymentId".into())
}

fn parse_receipt_id_payload(arg0: Option<Value>) -> Result<String, String> {
    payload_arg0_as_string(arg0, &["receiptId", "receipt_id", "id"])
        .ok_or("Missing receiptId".into())
}

fn parse_bill_filter_payload(arg0: Option<Value>) -> String {
    match arg0 {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_uppercase(),
        Some(ref payload @ Value::Object(_)) => value_str(payload, &["filter", "status"])
            .map(|s| s.to_uppercase())
            .unwrap_or_else(|| "ALL".to_string()),
        _ => "ALL".to_string(),
    }
}

#[tauri::command]
pub async fn supplier_add(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let payload = arg0.ok_or("Missing supplier payload")?;
    suppliers::add_supplier(&db, &payload)
}

#[tauri::command]
pub async fn supplier_get_all(db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    suppliers::get_suppliers(&db)
}

#[tauri::command]
pub async fn supplier_delete(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let supplier_id = parse_supplier_id_payload(arg0)?;
    suppliers::delete_supplier(&db, &supplier_id)
}

#[tauri::command]
pub async fn supplier_add_bill(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let payload = arg0.ok_or("Missing bill payload")?;
    suppliers::add_bill(&db, &payload)
}

#[tauri::command]
pub async fn supplier_get_bills(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let filter = parse_bill_filter_payload(arg0);
    suppliers::get_bills(&db, &filter)
}

#[tauri::command]
pub async fn supplier_mark_bill_paid(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let bill_id = parse_bill_id_payload(arg0)?;
    suppliers::mark_bill_paid(&db, &bill_id)
}

#[tauri::command]
pub async fn supplier_delete_bill(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let bill_id = parse_bill_id_payload(arg0)?;
    suppliers::delete_bill(&db, &bill_id)
}

#[tauri::command]
pub async fn supplier_add_payment(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let payload = arg0.ok_or("Missing payment payload")?;
    suppliers::add_supplier_payment(&db, &payload)
}

#[tauri::command]
pub async fn supplier_get_payments(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let supplier_id = parse_supplier_id_payload(arg0)?;
    suppliers::get_supplier_payments(&db, &supplier_id)
}

#[tauri::command]
pub async fn supplier_delete_payment(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let payment_id = parse_payment_id_payload(arg0)?;
    suppliers::delete_supplier_payment(&db, &payment_id)
}

#[tauri::command]
pub async fn supplier_add_receipt(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let payload = arg0.ok_or("Missing receipt payload")?;
    suppliers::add_supplier_receipt(&db, &payload)
}

#[tauri::command]
pub async fn supplier_get_receipts(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let supplier_id = parse_supplier_id_payload(arg0)?;
    suppliers::get_supplier_receipts(&db, &supplier_id)
}

#[tauri::command]
pub async fn supplier_delete_receipt(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let receipt_id = parse_receipt_id_payload(arg0)?;
    suppliers::delete_supplier_receipt(&db, &receipt_id)
}

#[tauri::command]
pub async fn supplier_get_balances(db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    suppliers::get_supplier_balances(&db)
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn parse_bill_filter_defaults_to_all() {
        assert_eq!(parse_bill_filter_payload(None), "ALL");
        assert_eq!(parse_bill_filter_payload(Some(serde_json::json!({}))), "ALL");
        assert_eq!(parse_bill_filter_payload(Some(serde_json::json!(""))), "ALL");
    }

    #[test]
    fn parse_bill_filter_normalizes_case() {
        assert_eq!(
            parse_bill_filter_payload(Some(serde_json::json!("pending"))),
            "PENDING"
        );
        assert_eq!(
            parse_bill_filter_payload(Some(serde_json::json!({ "filter": "paid" }))),
            "PAID"
        );
        assert_eq!(
            parse_bill_filter_payload(Some(serde_json::json!({ "status": "PENDING" }))),
            "PENDING"
        );
    }

    #[test]
    fn parse_supplier_id_supports_aliases() {
        let parsed =
            parse_supplier_id_payload(Some(serde_json::json!({ "supplier_id": "sup-1" })))
                .expect("alias should parse");
        assert_eq!(parsed, "sup-1");
    }
}
