use serde_json::Value;

use crate::{db, payload_arg0_as_string, staff};

fn parse_staff_id_payload(arg0: Option<Value>) -> Result<String, String> {
    payload_arg0_as_string(arg0, &["staffId", "staff_id", "id"]).ok_or("Missing staffId".into())
}

fn parse_payment_id_payload(arg0: Option<Value>) -> Result<String, String> {
    payload_arg0_as_string(arg0, &["paymentId", "payment_id", "id"])
        .ok_or("Missing paymentId".into())
}

fn parse_month_payload(arg0: Option<Value>) -> Result<String, String> {
    payload_arg0_as_string(arg0, &["month"]).ok_or("Missing month".into())
}

#[tauri::command]
pub async fn staff_add(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let payload = arg0.ok_or("Missing staff payload")?;
    staff::add_staff(&db, &payload)
}

#[tauri::command]
pub async fn staff_get_all(db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    staff::get_staff(&db)
}

#[tauri::command]
pub async fn staff_delete(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let staff_id = parse_staff_id_payload(arg0)?;
    staff::delete_staff(&db, &staff_id)
}

#[tauri::command]
pub async fn staff_record_payment(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let payload = arg0.ok_or("Missing payment payload")?;
    staff::record_staff_payment(&db, &payload)
}

#[tauri::command]
pub async fn staff_get_payments(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let staff_id = parse_staff_id_payload(arg0)?;
    staff::get_staff_payments(&db, &staff_id)
}

#[tauri::command]
pub async fn staff_delete_payment(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let payment_id = parse_payment_id_payload(arg0)?;
    staff::delete_staff_payment(&db, &payment_id)
}

#[tauri::command]
pub async fn staff_get_payroll_summary(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let month = parse_month_payload(arg0)?;
    staff::get_payroll_summary(&db, &month)
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn parse_staff_id_supports_object_and_string() {
        let from_obj = parse_staff_id_payload(Some(serde_json::json!({ "staffId": "staff-1" })))
            .expect("object staff id should parse");
        let from_str = parse_staff_id_payload(Some(serde_json::json!("staff-2")))
            .expect("string staff id should parse");
        assert_eq!(from_obj, "staff-1");
        assert_eq!(from_str, "staff-2");
    }

    #[test]
    fn parse_month_rejects_missing() {
        let err = parse_month_payload(Some(serde_json::json!({}))).expect_err("should fail");
        assert!(err.contains("Missing month"));
    }
}
