use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Composite score key string to raw entered value.
pub type ScoreTable = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricType {
    Percentage,
    Count,
}

impl MetricType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Count => "count",
        }
    }

    pub fn unit_suffix(self) -> &'static str {
        match self {
            Self::Percentage => "%",
            Self::Count => "",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricDefinition {
    pub id: u32,
    pub name: String,
    pub categories: Vec<String>,
    pub min: f64,
    pub target: f64,
    pub stretch: f64,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub slide_refs: Vec<String>,
}

impl MetricDefinition {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            min: self.min,
            target: self.target,
            stretch: self.stretch,
        }
    }

    pub fn threshold_label(&self) -> String {
        format!("{}/{}/{}", self.min, self.target, self.stretch)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    pub min: f64,
    pub target: f64,
    pub stretch: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    Empty,
    BelowMin,
    BelowTarget,
    AtOrAboveTarget,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::BelowMin => "below-min",
            Self::BelowTarget => "below-target",
            Self::AtOrAboveTarget => "at-or-above-target",
        }
    }

    /// Color token rendered by the table. Empty cells carry no color.
    pub fn color(self) -> Option<&'static str> {
        match self {
            Self::Empty => None,
            Self::BelowMin => Some("red"),
            Self::BelowTarget => Some("yellow"),
            Self::AtOrAboveTarget => Some("green"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringMode {
    PerMetric,
    PerCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ScoreKey {
    #[serde(rename_all = "camelCase")]
    Metric { metric_id: u32, period: String },
    #[serde(rename_all = "camelCase")]
    Category {
        metric_id: u32,
        category: String,
        period: String,
    },
}

impl ScoreKey {
    pub fn metric(metric_id: u32, period: impl Into<String>) -> Self {
        Self::Metric {
            metric_id,
            period: period.into(),
        }
    }

    pub fn category(metric_id: u32, category: impl Into<String>, period: impl Into<String>) -> Self {
        Self::Category {
            metric_id,
            category: category.into(),
            period: period.into(),
        }
    }

    pub fn metric_id(&self) -> u32 {
        match self {
            Self::Metric { metric_id, .. } | Self::Category { metric_id, .. } => *metric_id,
        }
    }

    pub fn period(&self) -> &str {
        match self {
            Self::Metric { period, .. } | Self::Category { period, .. } => period,
        }
    }

    pub fn category_label(&self) -> Option<&str> {
        match self {
            Self::Metric { .. } => None,
            Self::Category { category, .. } => Some(category),
        }
    }

    /// Flat string form used in persisted and exported score tables.
    pub fn composite(&self) -> String {
        match self {
            Self::Metric { metric_id, period } => format!("{}-{}", metric_id, period),
            Self::Category {
                metric_id,
                category,
                period,
            } => format!("{}-{}-{}", metric_id, category, period),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub scoring_mode: ScoringMode,
    pub seed_sample_data: bool,
    pub remote_reference: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            scoring_mode: ScoringMode::PerCategory,
            seed_sample_data: false,
            remote_reference: "kpi-data".to_string(),
        }
    }
}

/// Everything that survives a reload: the visible window and the score table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub quarters: Vec<String>,
    pub data: ScoreTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub quarters: Vec<String>,
    pub data: ScoreTable,
    pub export_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridValue {
    pub period: String,
    pub raw: String,
    pub display: String,
    pub classification: Classification,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub category: Option<String>,
    pub values: Vec<GridValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRow {
    pub metric_id: u32,
    pub name: String,
    pub categories: Vec<String>,
    pub threshold_label: String,
    pub slide_refs: Vec<String>,
    pub cells: Vec<GridCell>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardGrid {
    pub quarters: Vec<String>,
    pub scoring_mode: ScoringMode,
    pub rows: Vec<GridRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetScorePayload {
    pub metric_id: u32,
    pub category: Option<String>,
    pub period: String,
    pub value: String,
}

impl SetScorePayload {
    pub fn key(&self) -> ScoreKey {
        match &self.category {
            Some(category) => ScoreKey::category(self.metric_id, category.clone(), self.period.clone()),
            None => ScoreKey::metric(self.metric_id, self.period.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub reference: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_keys_match_both_scoring_shapes() {
        assert_eq!(ScoreKey::metric(3, "Q1FY26").composite(), "3-Q1FY26");
        assert_eq!(
            ScoreKey::category(1, "Flex", "Q4FY25").composite(),
            "1-Flex-Q4FY25"
        );
    }

    #[test]
    fn settings_fill_missing_fields_with_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"seedSampleData": true}"#).expect("settings");
        assert!(settings.seed_sample_data);
        assert_eq!(settings.scoring_mode, ScoringMode::PerCategory);
        assert_eq!(settings.remote_reference, "kpi-data");
    }

    #[test]
    fn metric_type_serializes_under_type_field() {
        let metric = MetricDefinition {
            id: 1,
            name: "OTD".to_string(),
            categories: vec![],
            min: 98.0,
            target: 100.0,
            stretch: 100.0,
            metric_type: MetricType::Percentage,
            slide_refs: vec![],
        };
        let value = serde_json::to_value(&metric).expect("serialize");
        assert_eq!(value["type"], "percentage");
        assert_eq!(value["slideRefs"], serde_json::json!([]));
        assert_eq!(metric.threshold_label(), "98/100/100");
    }
}
