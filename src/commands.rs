use crate::dashboard::DashboardCore;
use crate::init_tracing;
use crate::models::{
    AppSettings, BooleanResponse, DashboardGrid, ExportResponse, MetricDefinition, SetScorePayload,
    SyncResponse,
};
use std::sync::Arc;
use tauri::Manager;

#[derive(Clone)]
struct AppState {
    dashboard: Arc<DashboardCore>,
}

#[tauri::command]
fn list_metrics(state: tauri::State<'_, AppState>) -> Vec<MetricDefinition> {
    state.dashboard.list_metrics()
}

#[tauri::command]
fn get_grid(state: tauri::State<'_, AppState>) -> Result<DashboardGrid, String> {
    state.dashboard.grid().map_err(to_client_error)
}

#[tauri::command]
fn add_period(state: tauri::State<'_, AppState>, label: String) -> Result<Vec<String>, String> {
    state.dashboard.add_period(&label).map_err(to_client_error)
}

#[tauri::command]
fn set_score(state: tauri::State<'_, AppState>, payload: SetScorePayload) -> Result<BooleanResponse, String> {
    state
        .dashboard
        .set_score(&payload.key(), &payload.value)
        .map(|_| BooleanResponse { success: true })
        .map_err(to_client_error)
}

#[tauri::command]
fn get_score(
    state: tauri::State<'_, AppState>,
    metric_id: u32,
    category: Option<String>,
    period: String,
) -> Result<String, String> {
    let payload = SetScorePayload {
        metric_id,
        category,
        period,
        value: String::new(),
    };
    state.dashboard.get_score(&payload.key()).map_err(to_client_error)
}

#[tauri::command]
fn export_json(state: tauri::State<'_, AppState>) -> Result<String, String> {
    state.dashboard.export_json().map_err(to_client_error)
}

#[tauri::command]
fn export_csv(state: tauri::State<'_, AppState>) -> Result<String, String> {
    state.dashboard.export_csv().map_err(to_client_error)
}

#[tauri::command]
fn export_to_file(state: tauri::State<'_, AppState>, format: String) -> Result<ExportResponse, String> {
    state.dashboard.export_to_file(&format).map_err(to_client_error)
}

#[tauri::command]
fn import_json(state: tauri::State<'_, AppState>, content: String) -> Result<BooleanResponse, String> {
    state.dashboard.import_json(&content).map_err(to_client_error)
}

#[tauri::command]
fn reset_dashboard(state: tauri::State<'_, AppState>) -> Result<BooleanResponse, String> {
    state.dashboard.reset().map_err(to_client_error)
}

#[tauri::command]
fn get_settings(state: tauri::State<'_, AppState>) -> Result<AppSettings, String> {
    state.dashboard.settings().map_err(to_client_error)
}

#[tauri::command]
fn update_settings(state: tauri::State<'_, AppState>, update: serde_json::Value) -> Result<AppSettings, String> {
    state.dashboard.update_settings(update).map_err(to_client_error)
}

#[tauri::command]
fn sync_save(state: tauri::State<'_, AppState>, reference: Option<String>) -> Result<SyncResponse, String> {
    state
        .dashboard
        .sync_save(reference.as_deref())
        .map_err(to_client_error)
}

#[tauri::command]
fn sync_load(state: tauri::State<'_, AppState>, reference: Option<String>) -> Result<SyncResponse, String> {
    state
        .dashboard
        .sync_load(reference.as_deref())
        .map_err(to_client_error)
}

pub fn run() {
    tauri::Builder::default()
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir().map_err(|error| error.to_string())?;
            std::fs::create_dir_all(&app_data_dir).map_err(|error| error.to_string())?;
            init_tracing(&app_data_dir).map_err(|error| error.to_string())?;

            let dashboard = DashboardCore::new(app_data_dir).map_err(|error| error.to_string())?;
            app.manage(AppState { dashboard });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            list_metrics,
            get_grid,
            add_period,
            set_score,
            get_score,
            export_json,
            export_csv,
            export_to_file,
            import_json,
            reset_dashboard,
            get_settings,
            update_settings,
            sync_save,
            sync_load
        ])
        .run(tauri::generate_context!())
        .expect("failed to run tauri app");
}

fn to_client_error(error: impl std::fmt::Display) -> String {
    error.to_string()
}
