use serde_json::Value;

use crate::{db, expenses, payload_arg0_as_string, value_str};

fn parse_expense_id_payload(arg0: Option<Value>) -> Result<String, String> {
    payload_arg0_as_string(arg0, &["expenseId", "expense_id", "id"])
        .ok_or("Missing expenseId".into())
}

fn parse_filter_payload(arg0: Option<Value>) -> String {
    match arg0 {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(ref payload @ Value::Object(_)) => value_str(payload, &["filter", "month"])
            .unwrap_or_else(|| "ALL".to_string()),
        _ => "ALL".to_string(),
    }
}

fn parse_month_payload(arg0: Option<Value>) -> Result<String, String> {
    payload_arg0_as_string(arg0, &["month"]).ok_or("Missing month".into())
}

#[tauri::command]
pub async fn expense_add(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let payload = arg0.ok_or("Missing expense payload")?;
    expenses::add_expense(&db, &payload)
}

#[tauri::command]
pub async fn expense_get_all(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let filter = parse_filter_payload(arg0);
    expenses::get_expenses(&db, &filter)
}

#[tauri::command]
pub async fn expense_delete(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let expense_id = parse_expense_id_payload(arg0)?;
    expenses::delete_expense(&db, &expense_id)
}

#[tauri::command]
pub async fn expense_get_monthly_total(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let month = parse_month_payload(arg0)?;
    expenses::get_monthly_total(&db, &month)
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn parse_filter_defaults_to_all() {
        assert_eq!(parse_filter_payload(None), "ALL");
        assert_eq!(parse_filter_payload(Some(serde_json::json!({}))), "ALL");
    }

    #[test]
    fn parse_filter_accepts_month_string() {
        assert_eq!(
            parse_filter_payload(Some(serde_json::json!("2024-06"))),
            "2024-06"
        );
        assert_eq!(
            parse_filter_payload(Some(serde_json::json!({ "month": "2024-07" }))),
            "2024-07"
        );
    }
}
