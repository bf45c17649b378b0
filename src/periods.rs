use crate::errors::{AppError, AppResult};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MAX_PERIODS: usize = 4;

static QUARTER_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Q([1-4])FY(\d{2})$").expect("valid regex"));

/// A quarter of the February-start fiscal calendar.
///
/// Q1 = Feb-Apr, Q2 = May-Jul, Q3 = Aug-Oct, Q4 = Nov-Jan. The fiscal year is
/// the calendar year, except that January still belongs to the Q4 that opened
/// in the previous November.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiscalQuarter {
    pub quarter: u8,
    pub fiscal_year: i32,
}

impl FiscalQuarter {
    pub fn containing(date: NaiveDate) -> Self {
        let month = date.month0();
        let fiscal_year = if month < 1 { date.year() - 1 } else { date.year() };
        let quarter = match month {
            1..=3 => 1,
            4..=6 => 2,
            7..=9 => 3,
            _ => 4,
        };
        Self {
            quarter,
            fiscal_year,
        }
    }

    pub fn previous(self) -> Self {
        if self.quarter <= 1 {
            Self {
                quarter: 4,
                fiscal_year: self.fiscal_year - 1,
            }
        } else {
            Self {
                quarter: self.quarter - 1,
                fiscal_year: self.fiscal_year,
            }
        }
    }

    pub fn label(self) -> String {
        format!("Q{}FY{:02}", self.quarter, self.fiscal_year.rem_euclid(100))
    }

    /// Recognizes `Q{1-4}FY{yy}` labels. Two-digit years are read as 20yy.
    pub fn parse(label: &str) -> Option<Self> {
        let captures = QUARTER_LABEL.captures(label.trim())?;
        let quarter = captures.get(1)?.as_str().parse::<u8>().ok()?;
        let short_year = captures.get(2)?.as_str().parse::<i32>().ok()?;
        Some(Self {
            quarter,
            fiscal_year: 2000 + short_year,
        })
    }
}

/// Visible reporting periods, oldest first, never longer than [`MAX_PERIODS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodWindow {
    periods: Vec<String>,
}

impl PeriodWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a window from stored or imported labels: blanks and repeats are
    /// dropped, then only the newest entries are kept.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut periods: Vec<String> = Vec::new();
        for label in labels {
            let label = label.as_ref().trim();
            if label.is_empty() || periods.iter().any(|existing| existing == label) {
                continue;
            }
            periods.push(label.to_string());
        }
        let mut window = Self { periods };
        window.truncate_to_cap();
        window
    }

    /// Four consecutive fiscal quarters ending at the one containing `today`.
    pub fn derive_default(today: NaiveDate) -> Self {
        let mut quarter = FiscalQuarter::containing(today);
        let mut labels = Vec::with_capacity(MAX_PERIODS);
        labels.push(quarter.label());
        for _ in 1..MAX_PERIODS {
            quarter = quarter.previous();
            labels.push(quarter.label());
        }
        labels.reverse();
        Self { periods: labels }
    }

    pub fn add_period(&mut self, label: &str) -> AppResult<&[String]> {
        let label = label.trim();
        if label.is_empty() {
            return Err(AppError::InvalidInput("Quarter label cannot be empty".to_string()));
        }
        if self.contains(label) {
            return Err(AppError::DuplicatePeriod(format!(
                "Quarter {} already exists",
                label
            )));
        }

        if FiscalQuarter::parse(label).is_none() {
            tracing::debug!(label, "period label is not a fiscal quarter");
        }

        self.periods.push(label.to_string());
        if let Some(evicted) = self.truncate_to_cap().first() {
            tracing::info!(evicted = %evicted, added = label, "period window rotated");
        }
        Ok(&self.periods)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.periods.iter().any(|existing| existing == label)
    }

    pub fn periods(&self) -> &[String] {
        &self.periods
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn clear(&mut self) {
        self.periods.clear();
    }

    pub fn into_vec(self) -> Vec<String> {
        self.periods
    }

    fn truncate_to_cap(&mut self) -> Vec<String> {
        if self.periods.len() <= MAX_PERIODS {
            return Vec::new();
        }
        let excess = self.periods.len() - MAX_PERIODS;
        self.periods.drain(..excess).collect()
    }
}
