use serde_json::Value;

use crate::{db, payload_arg0_as_string, stock};

fn parse_item_id_payload(arg0: Option<Value>) -> Result<String, String> {
    payload_arg0_as_string(arg0, &["itemId", "item_id", "id"]).ok_or("Missing itemId".into())
}

#[tauri::command]
pub async fn stock_add_item(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let payload = arg0.ok_or("Missing stock payload")?;
    stock::add_stock_item(&db, &payload)
}

#[tauri::command]
pub async fn stock_get_items(db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    stock::get_stock_items(&db)
}

#[tauri::command]
pub async fn stock_delete_item(
    arg0: Option<Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let item_id = parse_item_id_payload(arg0)?;
    stock::delete_stock_item(&db, &item_id)
}

#[tauri::command]
pub async fn stock_get_levels(db: tauri::State<'_, db::DbState>) -> Result<Value, String> {
    stock::get_stock_levels(&db)
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn parse_item_id_supports_object_and_string() {
        let from_obj = parse_item_id_payload(Some(serde_json::json!({ "itemId": "item-1" })))
            .expect("object item id should parse");
        let from_str = parse_item_id_payload(Some(serde_json::json!("item-2")))
            .expect("string item id should parse");
        assert_eq!(from_obj, "item-1");
        assert_eq!(from_str, "item-2");
    }
}
