use crate::models::{Classification, MetricDefinition, Thresholds};
use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid regex")
});

/// Reads the numeric prefix of an entered score, so `"99.5%"` is `99.5`.
/// Returns `None` for blank input or text without a leading number.
pub fn parse_score(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_start();
    let matched = LEADING_NUMBER.find(trimmed)?;
    matched
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Three-tier decision against `min` and `target`. `stretch` does not
/// participate; ties resolve to the higher tier.
pub fn classify(raw: &str, thresholds: &Thresholds) -> Classification {
    let Some(value) = parse_score(raw) else {
        return Classification::Empty;
    };

    if value < thresholds.min {
        Classification::BelowMin
    } else if value < thresholds.target {
        Classification::BelowTarget
    } else {
        Classification::AtOrAboveTarget
    }
}

pub fn classify_for(raw: &str, metric: &MetricDefinition) -> Classification {
    classify(raw, &metric.thresholds())
}

/// Cell text: a dash for nothing entered, otherwise the raw entry with the
/// metric's unit suffix.
pub fn display_value(raw: &str, metric: &MetricDefinition) -> String {
    if raw.is_empty() {
        return "-".to_string();
    }
    format!("{}{}", raw, metric.metric_type.unit_suffix())
}
