//! Adherence history browsing and statistics.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Local, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ValidationError};
use crate::medication::{AdherenceRecord, DoseStatus};
use crate::storage::{HistoryConfig, PersistenceGateway};

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryPeriod {
    Today,
    /// The last seven days.
    Week,
    /// Since the same day last month.
    Month,
    /// The last `n` days, from `history.days_shown`.
    LastDays(u32),
    #[default]
    All,
}

impl HistoryPeriod {
    /// The window `history list` opens on when no period is given.
    pub fn from_config(config: &HistoryConfig) -> Self {
        if config.show_full_history {
            Self::All
        } else {
            Self::LastDays(config.days_shown.max(1))
        }
    }

    /// Earliest `scheduled_at` inside the period, or `None` for no bound.
    pub fn start(self, now: DateTime<Local>) -> Option<DateTime<Utc>> {
        let start = match self {
            Self::All => return None,
            Self::Today => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
                .unwrap_or(now - Duration::days(1)),
            Self::Week => now - Duration::days(7),
            Self::LastDays(days) => now - Duration::days(i64::from(days)),
            Self::Month => now
                .checked_sub_months(Months::new(1))
                .unwrap_or(now - Duration::days(30)),
        };
        Some(start.with_timezone(&Utc))
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Week => "Week",
            Self::Month => "Month",
            Self::LastDays(_) => "Recent",
            Self::All => "All",
        }
    }
}

impl fmt::Display for HistoryPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastDays(days) => write!(f, "Last {days} days"),
            other => f.write_str(other.label()),
        }
    }
}

impl FromStr for HistoryPeriod {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "all" => Ok(Self::All),
            other => other
                .strip_suffix('d')
                .and_then(|n| n.parse::<u32>().ok())
                .filter(|&n| n > 0)
                .map(Self::LastDays)
                .ok_or_else(|| ValidationError::InvalidValue {
                    field: "period".into(),
                    message: format!(
                        "unknown period '{other}' (today, week, month, all or <days>d)"
                    ),
                }),
        }
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub period: HistoryPeriod,
    pub medication_id: Option<Uuid>,
}

/// Records matching `filter`, newest first.
pub fn filter_records(
    records: Vec<AdherenceRecord>,
    filter: &HistoryFilter,
    now: DateTime<Local>,
) -> Vec<AdherenceRecord> {
    let start = filter.period.start(now);
    let mut out: Vec<AdherenceRecord> = records
        .into_iter()
        .filter(|r| start.map_or(true, |s| r.scheduled_at >= s))
        .filter(|r| filter.medication_id.map_or(true, |id| r.medication_id == id))
        .collect();
    out.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));
    out
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AdherenceStats {
    pub total: usize,
    pub taken: usize,
    pub ignored: usize,
    /// Pending records created by a postpone.
    pub postponed: usize,
    /// `taken / total * 100`, 0 for an empty history.
    pub adherence_pct: f64,
}

impl AdherenceStats {
    pub fn from_records(records: &[AdherenceRecord]) -> Self {
        let total = records.len();
        let taken = records
            .iter()
            .filter(|r| r.status == DoseStatus::Taken)
            .count();
        let ignored = records
            .iter()
            .filter(|r| r.status == DoseStatus::Ignored)
            .count();
        let postponed = records
            .iter()
            .filter(|r| r.status == DoseStatus::Pending && r.postponed)
            .count();
        let adherence_pct = if total == 0 {
            0.0
        } else {
            taken as f64 / total as f64 * 100.0
        };
        Self {
            total,
            taken,
            ignored,
            postponed,
            adherence_pct,
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct HistoryService {
    gateway: PersistenceGateway,
}

impl HistoryService {
    pub fn new(gateway: PersistenceGateway) -> Self {
        Self { gateway }
    }

    pub fn list(&self, filter: &HistoryFilter) -> Vec<AdherenceRecord> {
        filter_records(self.gateway.load_history(), filter, Local::now())
    }

    pub fn stats(&self, filter: &HistoryFilter) -> AdherenceStats {
        AdherenceStats::from_records(&self.list(filter))
    }

    pub fn remove(&self, record_id: Uuid) -> Result<bool> {
        let removed = self.gateway.remove_record(record_id)?;
        if removed {
            tracing::info!(%record_id, "history record removed");
        }
        Ok(removed)
    }
}
