use crate::catalog::MetricCatalog;
use crate::errors::{AppError, AppResult};
use crate::models::{ExportDocument, ScoreKey, ScoringMode};
use crate::periods::PeriodWindow;
use crate::store::ScoreStore;
use chrono::{DateTime, Utc};
use serde_json::Value;

pub fn export_document(window: &PeriodWindow, store: &ScoreStore, now: DateTime<Utc>) -> ExportDocument {
    ExportDocument {
        quarters: window.periods().to_vec(),
        data: store.serialize(),
        export_date: now,
    }
}

pub fn render_json_export(document: &ExportDocument) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Parses an import payload. `quarters` and `data` may each be missing;
/// anything else that does not match the export shape is rejected so the
/// caller can leave its state untouched.
pub fn parse_json_import(raw: &str) -> AppResult<(PeriodWindow, ScoreStore)> {
    let payload: Value = serde_json::from_str(raw)
        .map_err(|error| AppError::ImportFormat(format!("Payload is not valid JSON: {}", error)))?;
    let Some(object) = payload.as_object() else {
        return Err(AppError::ImportFormat("Payload must be a JSON object".to_string()));
    };

    let window = match object.get("quarters") {
        None | Some(Value::Null) => PeriodWindow::new(),
        Some(Value::Array(items)) => {
            let mut labels = Vec::with_capacity(items.len());
            for item in items {
                let Some(label) = item.as_str() else {
                    return Err(AppError::ImportFormat(
                        "quarters must contain only strings".to_string(),
                    ));
                };
                labels.push(label);
            }
            PeriodWindow::from_labels(labels)
        }
        Some(_) => {
            return Err(AppError::ImportFormat("quarters must be an array".to_string()));
        }
    };

    let store = match object.get("data") {
        None | Some(Value::Null) => ScoreStore::new(),
        Some(data @ Value::Object(_)) => ScoreStore::deserialize(data),
        Some(_) => {
            return Err(AppError::ImportFormat("data must be an object".to_string()));
        }
    };

    if let Some(exported_at) = object.get("exportDate").and_then(Value::as_str) {
        tracing::debug!(exported_at, "import payload carries export date");
    }

    Ok((window, store))
}

/// Spreadsheet export: one row per metric (or per metric/category pair when
/// scoring per category), raw values without unit suffix, thresholds last.
pub fn render_csv_export(
    catalog: &MetricCatalog,
    window: &PeriodWindow,
    store: &ScoreStore,
    mode: ScoringMode,
) -> AppResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = Vec::with_capacity(window.len() + 2);
    header.push("Metric".to_string());
    header.extend(window.periods().iter().cloned());
    header.push("Min/Target/Stretch".to_string());
    writer.write_record(&header)?;

    for metric in catalog.metrics() {
        let row_keys: Vec<(String, Vec<ScoreKey>)> = match mode {
            ScoringMode::PerCategory if !metric.categories.is_empty() => metric
                .categories
                .iter()
                .map(|category| {
                    let keys = window
                        .periods()
                        .iter()
                        .map(|period| ScoreKey::category(metric.id, category.clone(), period.clone()))
                        .collect();
                    (format!("{} - {}", metric.name, category), keys)
                })
                .collect(),
            _ => {
                let keys = window
                    .periods()
                    .iter()
                    .map(|period| ScoreKey::metric(metric.id, period.clone()))
                    .collect();
                vec![(metric.name.clone(), keys)]
            }
        };

        for (label, keys) in row_keys {
            let mut record = Vec::with_capacity(keys.len() + 2);
            record.push(label);
            record.extend(keys.iter().map(|key| store.get(key).to_string()));
            record.push(metric.threshold_label());
            writer.write_record(&record)?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| AppError::Internal(format!("csv flush failed: {}", error)))?;
    String::from_utf8(bytes).map_err(|error| AppError::Internal(error.to_string()))
}
