use std::fmt;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// How a dose repeats.
///
/// Kind-specific parameters live on the variant they belong to, so a weekday
/// list can only exist on `Weekdays` and an interval only on `Interval`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recurrence {
    Daily,
    /// Weekday numbers, 1 = Sunday through 7 = Saturday, in stored order.
    Weekdays { days: Vec<u8> },
    Interval { every_days: u32 },
    /// Active-days/rest-days cycle (e.g. 21 on, 7 off).
    Cycle { active_days: u32, rest_days: u32 },
    AdHoc,
}

impl Recurrence {
    /// Short machine name, also accepted by the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekdays { .. } => "weekdays",
            Self::Interval { .. } => "interval",
            Self::Cycle { .. } => "cycle",
            Self::AdHoc => "ad_hoc",
        }
    }

    /// Human-readable description of the rule.
    pub fn label(&self) -> String {
        match self {
            Self::Daily => "Every day".to_string(),
            Self::Weekdays { days } if days.is_empty() => "Specific days".to_string(),
            Self::Weekdays { days } => days
                .iter()
                .map(|&d| match weekday_from_number(d) {
                    Some(w) => short_weekday_name(w).to_string(),
                    None => format!("?{d}"),
                })
                .collect::<Vec<_>>()
                .join(", "),
            Self::Interval { every_days: 1 } => "Every day".to_string(),
            Self::Interval { every_days } => format!("Every {every_days} days"),
            Self::Cycle {
                active_days,
                rest_days,
            } => format!("{active_days} day(s) on, {rest_days} day(s) off"),
            Self::AdHoc => "As needed".to_string(),
        }
    }

    /// Check that the parameters make sense for the kind.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Weekdays { days } => {
                if let Some(&bad) = days.iter().find(|&&d| weekday_from_number(d).is_none()) {
                    return Err(ValidationError::InvalidWeekday(bad));
                }
                Ok(())
            }
            Self::Interval { every_days: 0 } => Err(ValidationError::ZeroInterval),
            Self::Cycle { active_days: 0, .. } => Err(ValidationError::EmptyCycle),
            Self::Daily | Self::Interval { .. } | Self::Cycle { .. } | Self::AdHoc => Ok(()),
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// One configured dosing time of a medication.
///
/// The entry id doubles as the reminder registration id, so editing an
/// entry in place must cancel the old registration before re-registering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: Uuid,
    pub time: NaiveTime,
    pub recurrence: Recurrence,
}

impl ScheduleEntry {
    pub fn new(time: NaiveTime, recurrence: Recurrence) -> Self {
        Self {
            id: Uuid::new_v4(),
            time,
            recurrence,
        }
    }

    pub fn daily(time: NaiveTime) -> Self {
        Self::new(time, Recurrence::Daily)
    }

    /// Identifier used when registering this entry with the notification center.
    pub fn reminder_id(&self) -> String {
        self.id.to_string()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.recurrence.validate()
    }
}

/// Weekday for a stored weekday number (1 = Sunday).
pub fn weekday_from_number(n: u8) -> Option<Weekday> {
    match n {
        1 => Some(Weekday::Sun),
        2 => Some(Weekday::Mon),
        3 => Some(Weekday::Tue),
        4 => Some(Weekday::Wed),
        5 => Some(Weekday::Thu),
        6 => Some(Weekday::Fri),
        7 => Some(Weekday::Sat),
        _ => None,
    }
}

/// Stored weekday number for a weekday (Sunday = 1).
pub fn weekday_number(weekday: Weekday) -> u8 {
    weekday.number_from_sunday() as u8
}

fn short_weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "Sun",
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn weekday_numbers_start_on_sunday() {
        assert_eq!(weekday_from_number(1), Some(Weekday::Sun));
        assert_eq!(weekday_from_number(7), Some(Weekday::Sat));
        assert_eq!(weekday_from_number(0), None);
        assert_eq!(weekday_from_number(8), None);
        for n in 1..=7 {
            assert_eq!(weekday_number(weekday_from_number(n).unwrap()), n);
        }
    }

    #[test]
    fn labels() {
        assert_eq!(Recurrence::Daily.label(), "Every day");
        assert_eq!(Recurrence::Weekdays { days: vec![1, 4] }.label(), "Sun, Wed");
        assert_eq!(Recurrence::Interval { every_days: 3 }.label(), "Every 3 days");
        assert_eq!(
            Recurrence::Cycle {
                active_days: 21,
                rest_days: 7
            }
            .label(),
            "21 day(s) on, 7 day(s) off"
        );
        assert_eq!(Recurrence::AdHoc.label(), "As needed");
    }

    #[test]
    fn validate_rejects_bad_parameters() {
        assert_eq!(
            Recurrence::Weekdays { days: vec![2, 9] }.validate(),
            Err(ValidationError::InvalidWeekday(9))
        );
        assert_eq!(
            Recurrence::Interval { every_days: 0 }.validate(),
            Err(ValidationError::ZeroInterval)
        );
        assert_eq!(
            Recurrence::Cycle {
                active_days: 0,
                rest_days: 3
            }
            .validate(),
            Err(ValidationError::EmptyCycle)
        );
        assert!(Recurrence::Weekdays { days: vec![] }.validate().is_ok());
        assert!(ScheduleEntry::daily(at(8, 0)).validate().is_ok());
    }

    #[test]
    fn serde_tags_the_kind() {
        let entry = ScheduleEntry::new(at(20, 30), Recurrence::Interval { every_days: 2 });
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["recurrence"]["kind"], "interval");
        assert_eq!(json["recurrence"]["every_days"], 2);

        let back: ScheduleEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn reminder_id_is_entry_id() {
        let entry = ScheduleEntry::daily(at(8, 0));
        assert_eq!(entry.reminder_id(), entry.id.to_string());
    }
}
