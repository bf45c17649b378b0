use crate::catalog::MetricCatalog;
use crate::classifier::{classify_for, display_value};
use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{
    AppSettings, BooleanResponse, DashboardGrid, DashboardSnapshot, ExportResponse, GridCell, GridRow,
    GridValue, MetricDefinition, ScoreKey, ScoringMode, SyncResponse,
};
use crate::periods::PeriodWindow;
use crate::remote::{LocalMirrorStore, RemoteStore};
use crate::store::ScoreStore;
use crate::transfer::{export_document, parse_json_import, render_csv_export, render_json_export};
use chrono::{Local, NaiveDate, Utc};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct DashboardState {
    window: PeriodWindow,
    scores: ScoreStore,
}

impl DashboardState {
    fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            quarters: self.window.periods().to_vec(),
            data: self.scores.serialize(),
        }
    }
}

pub struct DashboardCore {
    db: Arc<Database>,
    catalog: MetricCatalog,
    state: Mutex<DashboardState>,
    remote: Arc<dyn RemoteStore>,
    app_data_dir: PathBuf,
}

impl DashboardCore {
    pub fn new(app_data_dir: PathBuf) -> AppResult<Arc<Self>> {
        let remote = Arc::new(LocalMirrorStore::new(app_data_dir.join("sync"))?);
        Self::open(
            app_data_dir,
            MetricCatalog::standard(),
            remote,
            Local::now().date_naive(),
        )
    }

    /// Opens the state database and restores the last snapshot. Missing
    /// halves of the snapshot fall back to the fiscal default window for
    /// `today` and an empty score table.
    pub fn open(
        app_data_dir: PathBuf,
        catalog: MetricCatalog,
        remote: Arc<dyn RemoteStore>,
        today: NaiveDate,
    ) -> AppResult<Arc<Self>> {
        let db_path = app_data_dir.join("state.sqlite");
        let db = Arc::new(Database::new(&db_path)?);
        let settings = db.get_settings()?;

        let loaded = match db.load_snapshot() {
            Ok(loaded) => loaded,
            Err(error) => {
                tracing::warn!(error = %error, "snapshot load failed; starting from defaults");
                Default::default()
            }
        };

        let state = if loaded.is_empty() {
            if settings.seed_sample_data {
                tracing::info!("no saved snapshot; seeding sample scores");
                sample_state(&catalog, settings.scoring_mode)
            } else {
                tracing::info!(%today, "no saved snapshot; deriving default quarters");
                DashboardState {
                    window: PeriodWindow::derive_default(today),
                    scores: ScoreStore::new(),
                }
            }
        } else {
            DashboardState {
                window: loaded
                    .quarters
                    .unwrap_or_else(|| PeriodWindow::derive_default(today)),
                scores: loaded.scores.unwrap_or_default(),
            }
        };

        let this = Arc::new(Self {
            db,
            catalog,
            state: Mutex::new(state),
            remote,
            app_data_dir,
        });

        {
            let state = this.lock_state()?;
            tracing::info!(
                quarters = ?state.window.periods(),
                scores = state.scores.len(),
                "dashboard state restored"
            );
            this.persist(&state);
        }

        Ok(this)
    }

    pub fn list_metrics(&self) -> Vec<MetricDefinition> {
        self.catalog.metrics().to_vec()
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    pub fn periods(&self) -> AppResult<Vec<String>> {
        Ok(self.lock_state()?.window.periods().to_vec())
    }

    pub fn add_period(&self, label: &str) -> AppResult<Vec<String>> {
        let mut state = self.lock_state()?;
        let updated = state.window.add_period(label)?.to_vec();
        tracing::info!(label = label.trim(), quarters = ?updated, "quarter added");
        self.persist(&state);
        Ok(updated)
    }

    pub fn set_score(&self, key: &ScoreKey, value: &str) -> AppResult<()> {
        let metric = self
            .catalog
            .get(key.metric_id())
            .ok_or_else(|| AppError::NotFound(format!("Metric {} not found", key.metric_id())))?;
        if let Some(category) = key.category_label() {
            if !metric.categories.iter().any(|known| known == category) {
                return Err(AppError::NotFound(format!(
                    "Category {} not defined for metric {}",
                    category, metric.id
                )));
            }
        }

        let mut state = self.lock_state()?;
        state.scores.set(key, value);
        tracing::info!(key = %key.composite(), "score updated");
        self.persist(&state);
        Ok(())
    }

    pub fn get_score(&self, key: &ScoreKey) -> AppResult<String> {
        Ok(self.lock_state()?.scores.get(key).to_string())
    }

    /// Derived table view: every catalog metric against every visible
    /// quarter, each cell classified against the metric's thresholds.
    pub fn grid(&self) -> AppResult<DashboardGrid> {
        let mode = self.db.get_settings()?.scoring_mode;
        let state = self.lock_state()?;
        let quarters = state.window.periods().to_vec();

        let rows = self
            .catalog
            .metrics()
            .iter()
            .map(|metric| {
                let categories: Vec<Option<String>> = match mode {
                    ScoringMode::PerCategory if !metric.categories.is_empty() => {
                        metric.categories.iter().cloned().map(Some).collect()
                    }
                    _ => vec![None],
                };

                let cells = categories
                    .into_iter()
                    .map(|category| {
                        let values = quarters
                            .iter()
                            .map(|period| {
                                let key = match &category {
                                    Some(category) => ScoreKey::category(metric.id, category.clone(), period.clone()),
                                    None => ScoreKey::metric(metric.id, period.clone()),
                                };
                                let raw = state.scores.get(&key).to_string();
                                let classification = classify_for(&raw, metric);
                                GridValue {
                                    period: period.clone(),
                                    display: display_value(&raw, metric),
                                    color: classification.color().map(ToString::to_string),
                                    classification,
                                    raw,
                                }
                            })
                            .collect();
                        GridCell { category, values }
                    })
                    .collect();

                GridRow {
                    metric_id: metric.id,
                    name: metric.name.clone(),
                    categories: metric.categories.clone(),
                    threshold_label: metric.threshold_label(),
                    slide_refs: metric.slide_refs.clone(),
                    cells,
                }
            })
            .collect();

        Ok(DashboardGrid {
            quarters,
            scoring_mode: mode,
            rows,
        })
    }

    pub fn export_json(&self) -> AppResult<String> {
        let state = self.lock_state()?;
        render_json_export(&export_document(&state.window, &state.scores, Utc::now()))
    }

    pub fn export_csv(&self) -> AppResult<String> {
        let mode = self.db.get_settings()?.scoring_mode;
        let state = self.lock_state()?;
        render_csv_export(&self.catalog, &state.window, &state.scores, mode)
    }

    /// Writes an export into `<app data>/exports` and returns its path.
    pub fn export_to_file(&self, format: &str) -> AppResult<ExportResponse> {
        let contents = match format {
            "json" => self.export_json()?,
            "csv" => self.export_csv()?,
            _ => return Err(AppError::InvalidInput(format!("Unsupported export format {}", format))),
        };

        let export_dir = self.app_data_dir.join("exports");
        std::fs::create_dir_all(&export_dir).map_err(|error| AppError::Io(error.to_string()))?;
        let output_path = export_dir.join(format!("kpi-data.{}", format));
        std::fs::write(&output_path, contents).map_err(|error| AppError::Io(error.to_string()))?;

        tracing::info!(path = %output_path.display(), "dashboard exported");
        Ok(ExportResponse {
            path: output_path.to_string_lossy().to_string(),
        })
    }

    /// Replaces window and scores with an exported document. A malformed
    /// payload is rejected before any state changes.
    pub fn import_json(&self, raw: &str) -> AppResult<BooleanResponse> {
        let (window, scores) = parse_json_import(raw)?;
        let dangling = scores
            .table()
            .keys()
            .filter(|key| !self.key_has_known_metric(key))
            .count();
        if dangling > 0 {
            tracing::warn!(dangling, "imported scores reference unknown metrics");
        }

        let mut state = self.lock_state()?;
        state.window = window;
        state.scores = scores;
        tracing::info!(
            quarters = ?state.window.periods(),
            scores = state.scores.len(),
            "dashboard data imported"
        );
        self.persist(&state);
        Ok(BooleanResponse { success: true })
    }

    /// Wipes the window, the score table and the persisted snapshot.
    pub fn reset(&self) -> AppResult<BooleanResponse> {
        let mut state = self.lock_state()?;
        state.window.clear();
        state.scores.clear();
        self.db.clear_snapshot()?;
        tracing::info!("dashboard data cleared");
        Ok(BooleanResponse { success: true })
    }

    pub fn settings(&self) -> AppResult<AppSettings> {
        self.db.get_settings()
    }

    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<AppSettings> {
        self.db.update_settings(update)
    }

    pub fn sync_save(&self, reference: Option<&str>) -> AppResult<SyncResponse> {
        let reference = self.resolve_reference(reference)?;
        let content = self.export_json()?;
        self.remote.save(&reference, &content)?;
        Ok(SyncResponse {
            success: true,
            reference,
            timestamp: Utc::now(),
        })
    }

    /// Pulls the remote copy and imports it. Reports `success: false` and
    /// leaves state alone when nothing has been saved remotely yet.
    pub fn sync_load(&self, reference: Option<&str>) -> AppResult<SyncResponse> {
        let reference = self.resolve_reference(reference)?;
        let Some(content) = self.remote.load(&reference)? else {
            tracing::info!(reference = %reference, "no remote copy to load");
            return Ok(SyncResponse {
                success: false,
                reference,
                timestamp: Utc::now(),
            });
        };
        self.import_json(&content)?;
        Ok(SyncResponse {
            success: true,
            reference,
            timestamp: Utc::now(),
        })
    }

    fn resolve_reference(&self, reference: Option<&str>) -> AppResult<String> {
        match reference.map(str::trim).filter(|value| !value.is_empty()) {
            Some(reference) => Ok(reference.to_string()),
            None => Ok(self.db.get_settings()?.remote_reference),
        }
    }

    fn key_has_known_metric(&self, composite: &str) -> bool {
        composite
            .split_once('-')
            .and_then(|(id, _)| id.parse::<u32>().ok())
            .map(|id| self.catalog.contains(id))
            .unwrap_or(false)
    }

    fn lock_state(&self) -> AppResult<MutexGuard<'_, DashboardState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("dashboard state mutex poisoned".to_string()))
    }

    fn persist(&self, state: &DashboardState) {
        if let Err(error) = self.db.save_snapshot(&state.snapshot()) {
            tracing::warn!(error = %error, "failed to persist dashboard snapshot");
        }
    }
}

/// Demo scores for the first five metrics over three quarters. In
/// per-category mode every category of a metric gets the same value.
fn sample_state(catalog: &MetricCatalog, mode: ScoringMode) -> DashboardState {
    const QUARTERS: [&str; 4] = ["Q4FY25", "Q1FY26", "Q2FY26", "Q3FY26"];
    const SAMPLES: [(u32, [&str; 3]); 5] = [
        (1, ["99.52", "99.16", "99.38"]),
        (2, ["100", "100", "100"]),
        (3, ["3.8", "3.85", "3.92"]),
        (4, ["5", "4.5", "5"]),
        (5, ["4.8", "4.8", "4.5"]),
    ];

    let mut scores = ScoreStore::new();
    for (metric_id, values) in SAMPLES {
        let Some(metric) = catalog.get(metric_id) else {
            continue;
        };
        for (period, value) in QUARTERS.iter().zip(values) {
            for key in MetricCatalog::score_keys(metric, period, mode) {
                scores.set(&key, value);
            }
        }
    }

    DashboardState {
        window: PeriodWindow::from_labels(QUARTERS),
        scores,
    }
}

#[cfg(test)]
mod tests {
    use super::DashboardCore;
    use crate::catalog::MetricCatalog;
    use crate::errors::AppError;
    use crate::models::{Classification, ScoreKey, ScoringMode};
    use crate::remote::LocalMirrorStore;
    use chrono::NaiveDate;
    use std::path::Path;
    use std::sync::Arc;

    fn open_at(dir: &Path) -> Arc<DashboardCore> {
        let remote = Arc::new(LocalMirrorStore::new(dir.join("sync")).expect("remote"));
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).expect("date");
        DashboardCore::open(dir.to_path_buf(), MetricCatalog::standard(), remote, today).expect("core")
    }

    #[test]
    fn fresh_dashboard_starts_with_fiscal_default_window() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = open_at(dir.path());
        assert_eq!(core.periods().expect("periods"), ["Q4FY25", "Q1FY26", "Q2FY26", "Q3FY26"]);
        assert_eq!(core.get_score(&ScoreKey::metric(1, "Q1FY26")).expect("score"), "");
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let core = open_at(dir.path());
            core.add_period("Q4FY26").expect("add");
            core.set_score(&ScoreKey::category(1, "Flex", "Q4FY26"), "99.4")
                .expect("set");
        }

        let reopened = open_at(dir.path());
        assert_eq!(
            reopened.periods().expect("periods"),
            ["Q1FY26", "Q2FY26", "Q3FY26", "Q4FY26"]
        );
        assert_eq!(
            reopened
                .get_score(&ScoreKey::category(1, "Flex", "Q4FY26"))
                .expect("score"),
            "99.4"
        );
    }

    #[test]
    fn duplicate_quarter_leaves_window_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = open_at(dir.path());
        let before = core.periods().expect("periods");
        let error = core.add_period("Q2FY26").expect_err("duplicate");
        assert!(matches!(error, AppError::DuplicatePeriod(_)));
        assert_eq!(core.periods().expect("periods"), before);
    }

    #[test]
    fn unknown_metric_or_category_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = open_at(dir.path());
        assert!(matches!(
            core.set_score(&ScoreKey::metric(99, "Q1FY26"), "1"),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            core.set_score(&ScoreKey::category(1, "Foxconn", "Q1FY26"), "1"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn grid_classifies_each_cell() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = open_at(dir.path());
        core.set_score(&ScoreKey::category(1, "Flex", "Q1FY26"), "99").expect("set");
        core.set_score(&ScoreKey::category(1, "Jabil", "Q1FY26"), "100").expect("set");
        core.set_score(&ScoreKey::category(1, "Fabrinet", "Q1FY26"), "97.9").expect("set");

        let grid = core.grid().expect("grid");
        assert_eq!(grid.scoring_mode, ScoringMode::PerCategory);
        assert_eq!(grid.rows.len(), 9);

        let otd = &grid.rows[0];
        assert_eq!(otd.threshold_label, "98/100/100");
        assert_eq!(otd.cells.len(), 3);
        let q1 = grid.quarters.iter().position(|q| q == "Q1FY26").expect("Q1FY26");

        let flex = &otd.cells[0].values[q1];
        assert_eq!(flex.classification, Classification::BelowTarget);
        assert_eq!(flex.display, "99%");
        assert_eq!(flex.color.as_deref(), Some("yellow"));
        assert_eq!(otd.cells[1].values[q1].classification, Classification::AtOrAboveTarget);
        assert_eq!(otd.cells[2].values[q1].classification, Classification::BelowMin);

        let untouched = &otd.cells[0].values[0];
        assert_eq!(untouched.classification, Classification::Empty);
        assert_eq!(untouched.display, "-");
        assert!(untouched.color.is_none());
    }

    #[test]
    fn per_metric_mode_collapses_categories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = open_at(dir.path());
        core.update_settings(serde_json::json!({ "scoringMode": "per-metric" }))
            .expect("settings");
        core.set_score(&ScoreKey::metric(3, "Q3FY26"), "4").expect("set");

        let grid = core.grid().expect("grid");
        let rsod = grid.rows.iter().find(|row| row.metric_id == 3).expect("row");
        assert_eq!(rsod.cells.len(), 1);
        assert!(rsod.cells[0].category.is_none());
        assert_eq!(rsod.cells[0].values[3].classification, Classification::BelowTarget);
        assert_eq!(rsod.cells[0].values[3].display, "4");
    }

    #[test]
    fn malformed_import_keeps_existing_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = open_at(dir.path());
        core.set_score(&ScoreKey::metric(2, "Q1FY26"), "100").expect("set");

        let error = core.import_json("{\"quarters\": 7}").expect_err("bad import");
        assert!(matches!(error, AppError::ImportFormat(_)));
        assert_eq!(core.get_score(&ScoreKey::metric(2, "Q1FY26")).expect("score"), "100");
        assert_eq!(core.periods().expect("periods").len(), 4);
    }

    #[test]
    fn reset_clears_everything_until_next_launch() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let core = open_at(dir.path());
            core.set_score(&ScoreKey::metric(2, "Q1FY26"), "100").expect("set");
            core.reset().expect("reset");
            assert!(core.periods().expect("periods").is_empty());
            assert_eq!(core.get_score(&ScoreKey::metric(2, "Q1FY26")).expect("score"), "");
        }

        let reopened = open_at(dir.path());
        assert_eq!(reopened.periods().expect("periods").len(), 4);
        assert_eq!(reopened.get_score(&ScoreKey::metric(2, "Q1FY26")).expect("score"), "");
    }

    #[test]
    fn sample_data_seeds_when_enabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let core = open_at(dir.path());
            core.update_settings(serde_json::json!({ "seedSampleData": true }))
                .expect("settings");
            core.reset().expect("reset");
        }

        let core = open_at(dir.path());
        assert_eq!(core.periods().expect("periods"), ["Q4FY25", "Q1FY26", "Q2FY26", "Q3FY26"]);
        assert_eq!(
            core.get_score(&ScoreKey::category(1, "Jabil", "Q4FY25")).expect("score"),
            "99.52"
        );
        assert_eq!(core.get_score(&ScoreKey::category(1, "Jabil", "Q3FY26")).expect("score"), "");
    }

    #[test]
    fn exports_are_written_under_app_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = open_at(dir.path());
        let json = core.export_to_file("json").expect("json export");
        let csv = core.export_to_file("csv").expect("csv export");
        assert!(Path::new(&json.path).is_file());
        let csv_text = std::fs::read_to_string(&csv.path).expect("csv");
        assert!(csv_text.starts_with("Metric,Q4FY25,Q1FY26,Q2FY26,Q3FY26,Min/Target/Stretch"));
        assert!(matches!(core.export_to_file("xlsx"), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn sync_round_trip_through_remote_copy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = open_at(dir.path());

        let missing = core.sync_load(Some("team-kpis")).expect("load");
        assert!(!missing.success);

        core.set_score(&ScoreKey::category(9, "Jabil", "Q3FY26"), "100").expect("set");
        let saved = core.sync_save(Some("team-kpis")).expect("save");
        assert!(saved.success);

        core.reset().expect("reset");
        let loaded = core.sync_load(Some("team-kpis")).expect("load");
        assert!(loaded.success);
        assert_eq!(
            core.get_score(&ScoreKey::category(9, "Jabil", "Q3FY26")).expect("score"),
            "100"
        );
        assert_eq!(core.periods().expect("periods").len(), 4);
    }
}
