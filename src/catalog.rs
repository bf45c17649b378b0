use crate::models::{MetricDefinition, MetricType, ScoreKey, ScoringMode};

/// Immutable registry of KPI definitions, fixed at startup.
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    metrics: Vec<MetricDefinition>,
}

impl MetricCatalog {
    pub fn new(metrics: Vec<MetricDefinition>) -> Self {
        Self { metrics }
    }

    /// The supplier scorecard shipped with the dashboard.
    pub fn standard() -> Self {
        let direct = ["Flex", "Jabil", "Fabrinet"];
        let product_lines = [
            "Flex Boards, Flex SYS+SW",
            "Jabil Boards, Jabil SYS+SW",
            "Fabrinet Interconnect",
        ];

        Self::new(vec![
            metric(
                1,
                "% of On Time Delivery MP",
                &direct,
                (98.0, 100.0, 100.0),
                MetricType::Percentage,
                &["OTD MP- Flex", "OTD MP- Jabil", "OTD MP-Fabrinet"],
            ),
            metric(
                2,
                "% of On Time Delivery - STD RW",
                &direct,
                (98.0, 100.0, 100.0),
                MetricType::Percentage,
                &[
                    "OTD STD rework-Flex",
                    "OTD STD rework -Jabil",
                    "OTD STD rework-Fabrinet",
                ],
            ),
            metric(
                3,
                "% of Reschedule (Push out) performance in MP",
                &product_lines,
                (3.0, 5.0, 5.0),
                MetricType::Count,
                &["RSOD- Flex", "RSOD-Jabil", "RSOD-Fabrinet"],
            ),
            metric(
                4,
                "Inventory/E&O Reporting and Liability Mitigation",
                &product_lines,
                (4.0, 5.0, 5.0),
                MetricType::Count,
                &[
                    "Inventory/E&O & Liability-Flex",
                    "Inventory/E&O & Liability-Jabil",
                    "Inventory/E&O & Liability-Fabrinet",
                ],
            ),
            metric(
                5,
                "Procurement Analytics",
                &product_lines,
                (4.0, 5.0, 5.0),
                MetricType::Count,
                &["Proc Analytics-Flex", "Proc Analytics- Jabil", "Proc Analytics-Fabrinet"],
            ),
            metric(
                6,
                "Materials Escalation & LT Alignment",
                &product_lines,
                (4.0, 5.0, 5.0),
                MetricType::Count,
                &["ME & LT-Flex", "ME & LT- Jabil", "ME & LT-Fabrinet"],
            ),
            metric(
                7,
                "Component PO TAT/Commit Performance",
                &product_lines,
                (4.0, 5.0, 5.0),
                MetricType::Count,
                &["Comp. PO Perf.-Flex", "Comp. PO Perf.-Jabil", "Comp. PO Perf.-Fabrinet"],
            ),
            metric(
                8,
                "New Product Launch Readiness",
                &product_lines,
                (4.0, 5.0, 5.0),
                MetricType::Count,
                &["NPL Readiness- Flex", "NPL Readiness-Jabil", "NPL Readiness-Fabrinet"],
            ),
            metric(
                9,
                "CM Material Audit",
                &["Flex", "Jabil", "Fabrinet Interconnect"],
                (98.0, 100.0, 100.0),
                MetricType::Percentage,
                &["Material audit-Flex", "Material audit-Jabil", "Material audit-Fabrinet"],
            ),
        ])
    }

    pub fn metrics(&self) -> &[MetricDefinition] {
        &self.metrics
    }

    pub fn get(&self, id: u32) -> Option<&MetricDefinition> {
        self.metrics.iter().find(|metric| metric.id == id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    /// Keys a metric is scored under for one period. Metrics without
    /// categories always fall back to a single per-metric key.
    pub fn score_keys(metric: &MetricDefinition, period: &str, mode: ScoringMode) -> Vec<ScoreKey> {
        match mode {
            ScoringMode::PerCategory if !metric.categories.is_empty() => metric
                .categories
                .iter()
                .map(|category| ScoreKey::category(metric.id, category.clone(), period))
                .collect(),
            _ => vec![ScoreKey::metric(metric.id, period)],
        }
    }
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn metric(
    id: u32,
    name: &str,
    categories: &[&str],
    (min, target, stretch): (f64, f64, f64),
    metric_type: MetricType,
    slide_refs: &[&str],
) -> MetricDefinition {
    MetricDefinition {
        id,
        name: name.to_string(),
        categories: categories.iter().map(ToString::to_string).collect(),
        min,
        target,
        stretch,
        metric_type,
        slide_refs: slide_refs.iter().map(ToString::to_string).collect(),
    }
}
