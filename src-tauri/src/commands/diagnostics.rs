use serde_json::Value;

use crate::{db, diagnostics};

#[tauri::command]
pub async fn diagnostics_get_about_info() -> Result<Value, String> {
    Ok(diagnostics::get_about_info())
}

#[tauri::command]
pub async fn diagnostics_get_database_health(
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    diagnostics::get_database_health(&db)
}

#[tauri::command]
pub async fn diagnostics_get_database_stats(
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    diagnostics::get_database_stats(&db)
}

#[tauri::command]
pub async fn diagnostics_get_log_dir() -> Result<String, String> {
    Ok(diagnostics::get_log_dir().to_string_lossy().to_string())
}
