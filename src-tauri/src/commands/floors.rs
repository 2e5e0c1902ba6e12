use serde::Deserialize;
use serde_json::Value;

use crate::{db, ledger, payload_arg0_as_string, value_str};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnitUpdatePayload {
    #[serde(alias = "floor_key")]
    floor_key: String,
    #[serde(alias = "unit_id")]
    unit_id: String,
    field: String,
    value: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnitRefPayload {
    #[serde(alias = "floor_key")]
    floor_key: String,
    #[serde(alias = "unit_id")]
    unit_id: String,
}

#[derive(Debug)]
struct RecordQueryPayload {
    floor_key: String,
    unit_no: String,
    date: String,
}

fn parse_floor_key_payload(arg0: Option<Value>) -> Result<String, String> {
    payload_arg0_as_string(arg0, &["floorKey", "floor_key", "floor"]).ok_or("Missing floorKey".into())
}

fn parse_unit_update_payload(arg0: Option<Value>) -> Result<UnitUpdatePayload, String> {
    let mut parsed: UnitUpdatePayload =
        serde_json::from_value(arg0.ok_or("Missing unit update payload")?)
            .map_err(|e| format!("Invalid unit update payload: {e}"))?;

    parsed.floor_key = parsed.floor_key.trim().to_string();
    parsed.unit_id = parsed.unit_id.trim().to_string();
    if parsed.floor_key.is_empty() {
        return Err("Missing floorKey".into());
    }
    if parsed.unit_id.is_empty() {
        return Err("Missing unitId".into());
    }
    Ok(parsed)
}

fn parse_unit_ref_payload(arg0: Option<Value>) -> Result<UnitRefPayload, String> {
    let mut parsed: UnitRefPayload = serde_json::from_value(arg0.ok_or("Missing unit payload")?)
        .map_err(|e| format!("Invalid unit payload: {e}"))?;

    parsed.floor_key = parsed.floor_key.trim().to_string();
    parsed.unit_id = parsed.unit_id.trim().to_string();
    if parsed.floor_key.is_empty() {
        return Err("Missing floorKey".into());
    }
    if parsed.unit_id.is_empty() {
        return Err("Missing unitId".into());
    }
    Ok(parsed)
}

fn parse_record_query_payload(arg0: Option<Value>) -> Result<RecordQueryPayload, String> {
    let payload = arg0.ok_or("Missing record query payload")?;
    let floor_key =
        value_str(&payload, &["floorKey", "floor_key", "floor"]).ok_or("Missing floorKey")?;
    let unit_no =
        value_str(&payload, &["unitNo", "unit_no", "unitNumber"]).ok_or("Missing unitNo")?;
    let date = value_str(&payload, &["date"]).ok_or("Missing date")?;
    Ok(RecordQueryPayload {
        floor_key,
        unit_no,
        date,
    })
}

fn parse_record_id_payload(arg0: Option<Value>) -> Result<String, String> {
    payload_arg0_as_string(arg0, &["recordId", "record_id", "id"])
        .ok_or("Missing recordId".into())
}

fn list_floors_value() -> Value {
    let floors: Vec<Value> = crate::floors::FLOORS
        .iter()
        .map(|cfg| {
            serde_json::json!({
                "floorKey": cfg.floor_key,
                "title": cfg.title,
            })
        })
        .collect();
    serde_json::json!(floors)
}

/// Floor directory for the navigation screen: key and display title only.
#[tauri::command]
pub async fn floor_list_floors() -> Result<Value, String> {
    Ok(list_floors_value())
}

#[tauri::command]
pub async fn floor_load_units(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let floor_key = parse_floor_key_payload(arg0)?;
    let units = ledger::load_units(&db, &floor_key).map_err(String::from)?;
    serde_json::to_value(units).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn floor_update_unit(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let payload = parse_unit_update_payload(arg0)?;
    let field = ledger::UnitField::from_key(&payload.field)
        .ok_or_else(|| format!("Unknown field: {}", payload.field))?;
    let unit = ledger::update_unit_field(
        &db,
        &payload.floor_key,
        &payload.unit_id,
        field,
        &payload.value,
    )
    .map_err(String::from)?;
    serde_json::to_value(unit).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn floor_commit_record(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let payload = parse_unit_ref_payload(arg0)?;
    let record = ledger::commit_unit_record(&db, &payload.floor_key, &payload.unit_id)
        .map_err(String::from)?;
    serde_json::to_value(record).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn floor_get_records(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let payload = parse_record_query_payload(arg0)?;
    let records = ledger::get_unit_records(&db, &payload.floor_key, &payload.unit_no, &payload.date)
        .map_err(String::from)?;
    serde_json::to_value(records).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn floor_delete_record(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let record_id = parse_record_id_payload(arg0)?;
    ledger::delete_unit_record(&db, &record_id).map_err(String::from)?;
    Ok(serde_json::json!({ "success": true }))
}

#[tauri::command]
pub async fn floor_add_unit(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let floor_key = parse_floor_key_payload(arg0)?;
    let unit = ledger::add_unit(&db, &floor_key).map_err(String::from)?;
    serde_json::to_value(unit).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn floor_delete_unit(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let payload = parse_unit_ref_payload(arg0)?;
    ledger::delete_unit(&db, &payload.floor_key, &payload.unit_id).map_err(String::from)?;
    Ok(serde_json::json!({ "success": true }))
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn parse_floor_key_supports_object_and_string() {
        let from_obj = parse_floor_key_payload(Some(serde_json::json!({
            "floorKey": "EighthFloor"
        })))
        .expect("object floor key should parse");
        let from_str = parse_floor_key_payload(Some(serde_json::json!("FifthFloor")))
            .expect("string floor key should parse");
        assert_eq!(from_obj, "EighthFloor");
        assert_eq!(from_str, "FifthFloor");
    }

    #[test]
    fn parse_floor_key_supports_snake_case_alias() {
        let parsed = parse_floor_key_payload(Some(serde_json::json!({
            "floor_key": "lower_ground_floor"
        })))
        .expect("snake_case alias should parse");
        assert_eq!(parsed, "lower_ground_floor");
    }

    #[test]
    fn parse_unit_update_requires_ids() {
        let err = parse_unit_update_payload(Some(serde_json::json!({
            "floorKey": "EighthFloor",
            "field": "area",
            "value": 10
        })))
        .expect_err("missing unitId should fail");
        assert!(err.contains("Invalid unit update payload") || err.contains("Missing unitId"));
    }

    #[test]
    fn parse_unit_update_keeps_raw_value() {
        let parsed = parse_unit_update_payload(Some(serde_json::json!({
            "floor_key": "EighthFloor",
            "unit_id": "unit-1",
            "field": "downPayment",
            "value": "5000"
        })))
        .expect("alias payload should parse");
        assert_eq!(parsed.floor_key, "EighthFloor");
        assert_eq!(parsed.unit_id, "unit-1");
        assert_eq!(parsed.value, serde_json::json!("5000"));
    }

    #[test]
    fn parse_record_query_requires_all_keys() {
        let parsed = parse_record_query_payload(Some(serde_json::json!({
            "floorKey": "FifthFloor",
            "unitNo": "505",
            "date": "2024-06-01"
        })))
        .expect("full payload should parse");
        assert_eq!(parsed.unit_no, "505");

        let err = parse_record_query_payload(Some(serde_json::json!({
            "floorKey": "FifthFloor",
            "unitNo": "505"
        })))
        .expect_err("missing date should fail");
        assert!(err.contains("Missing date"));
    }

    #[test]
    fn list_floors_includes_legacy_keys() {
        let floors = list_floors_value();
        let keys: Vec<&str> = floors
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["floorKey"].as_str().unwrap())
            .collect();
        assert!(keys.contains(&"EighthFloor"));
        assert!(keys.contains(&"FifthFloor"));
        assert!(keys.contains(&"lower_ground_floor"));
    }
}
