#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    kpi_dashboard_lib::run();
}
