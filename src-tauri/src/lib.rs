//! Broadway Mall Books — desktop bookkeeping app for the Broadway Mall
//! management office.
//!
//! The core is the per-floor unit ledger (`ledger`), which replaces the
//! copy-pasted per-floor screens the legacy app carried. Around it sit the
//! smaller books: staff payroll, supplier accounts, stock movements, and
//! general expenses. Everything persists to a local SQLite database.

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod db;
mod diagnostics;
mod expenses;
mod floors;
mod ledger;
mod staff;
mod stock;
mod suppliers;

pub(crate) fn value_str(v: &serde_json::Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = v.get(*key).and_then(|x| x.as_str()) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Accepts either a bare string argument or an object payload carrying the
/// value under one of `keys`.
pub(crate) fn payload_arg0_as_string(
    arg0: Option<serde_json::Value>,
    keys: &[&str],
) -> Option<String> {
    match arg0 {
        Some(serde_json::Value::String(s)) => {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        }
        Some(serde_json::Value::Object(obj)) => {
            let payload = serde_json::Value::Object(obj);
            value_str(&payload, keys)
        }
        _ => None,
    }
}

// ============================================================================
// App entry point
// ============================================================================

pub fn run() {
    // Initialize structured logging (console + rolling file)
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,broadway_mall_books_lib=debug"));

    // Prune old log files before setting up the appender
    diagnostics::prune_old_logs();

    // Rolling file appender: creates daily log files in the logs directory
    let log_dir = diagnostics::get_log_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&log_dir, "books");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // Keep the guard alive for the lifetime of the app — dropping it flushes logs.
    // We leak it intentionally since the app runs until process exit.
    std::mem::forget(_guard);

    info!("Starting Broadway Mall Books v{}", env!("CARGO_PKG_VERSION"));

    tauri::Builder::default()
        .setup(|app| {
            use tauri::Manager;

            let app_data_dir = app
                .path()
                .app_data_dir()
                .expect("Failed to get app data dir");

            let db_state = db::init(&app_data_dir).expect("Failed to initialize database");
            app.manage(db_state);

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Floor ledger
            commands::floors::floor_list_floors,
            commands::floors::floor_load_units,
            commands::floors::floor_update_unit,
            commands::floors::floor_commit_record,
            commands::floors::floor_get_records,
            commands::floors::floor_delete_record,
            commands::floors::floor_add_unit,
            commands::floors::floor_delete_unit,
            // Staff & payroll
            commands::staff::staff_add,
            commands::staff::staff_get_all,
            commands::staff::staff_delete,
            commands::staff::staff_record_payment,
            commands::staff::staff_get_payments,
            commands::staff::staff_delete_payment,
            commands::staff::staff_get_payroll_summary,
            // Suppliers
            commands::suppliers::supplier_add,
            commands::suppliers::supplier_get_all,
            commands::suppliers::supplier_delete,
            commands::suppliers::supplier_add_bill,
            commands::suppliers::supplier_get_bills,
            commands::suppliers::supplier_mark_bill_paid,
            commands::suppliers::supplier_delete_bill,
            commands::suppliers::supplier_add_payment,
            commands::suppliers::supplier_get_payments,
            commands::suppliers::supplier_delete_payment,
            commands::suppliers::supplier_add_receipt,
            commands::suppliers::supplier_get_receipts,
            commands::suppliers::supplier_delete_receipt,
            commands::suppliers::supplier_get_balances,
            // Stock
            commands::stock::stock_add_item,
            commands::stock::stock_get_items,
            commands::stock::stock_delete_item,
            commands::stock::stock_get_levels,
            // Expenses
            commands::expenses::expense_add,
            commands::expenses::expense_get_all,
            commands::expenses::expense_delete,
            commands::expenses::expense_get_monthly_total,
            // Diagnostics
            commands::diagnostics::diagnostics_get_about_info,
            commands::diagnostics::diagnostics_get_database_health,
            commands::diagnostics::diagnostics_get_database_stats,
            commands::diagnostics::diagnostics_get_log_dir,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_str_trims_and_skips_empty() {
        let v = serde_json::json!({ "a": "  hello  ", "b": "   " });
        assert_eq!(value_str(&v, &["a"]).as_deref(), Some("hello"));
        assert_eq!(value_str(&v, &["b"]), None);
        assert_eq!(value_str(&v, &["b", "a"]).as_deref(), Some("hello"));
    }

    #[test]
    fn payload_arg0_handles_string_and_object() {
        assert_eq!(
            payload_arg0_as_string(Some(serde_json::json!("x-1")), &["id"]).as_deref(),
            Some("x-1")
        );
        assert_eq!(
            payload_arg0_as_string(Some(serde_json::json!({ "id": "x-2" })), &["id"]).as_deref(),
            Some("x-2")
        );
        assert_eq!(payload_arg0_as_string(None, &["id"]), None);
        assert_eq!(
            payload_arg0_as_string(Some(serde_json::json!(42)), &["id"]),
            None
        );
    }
}
