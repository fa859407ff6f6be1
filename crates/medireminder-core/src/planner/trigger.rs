use std::fmt;

use chrono::{Datelike, Days, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::medication::{weekday_from_number, Recurrence, ScheduleEntry};

/// Concrete rule handed to the notification center.
///
/// Times are local wall-clock values; the OS matches them against its own
/// calendar, so no time zone is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Repeats every day at `time`.
    Daily { time: NaiveTime },
    /// Repeats every week on `weekday` at `time`.
    Weekly { weekday: Weekday, time: NaiveTime },
    /// Fires once at `at`.
    Once { at: NaiveDateTime },
}

impl Trigger {
    pub fn repeats(&self) -> bool {
        !matches!(self, Self::Once { .. })
    }

    /// Absolute date of a one-shot trigger. Calendar rules have none.
    pub fn fixed_date(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Once { at } => Some(*at),
            Self::Daily { .. } | Self::Weekly { .. } => None,
        }
    }

    /// First firing strictly after `after`, or `None` if a one-shot already passed.
    pub fn next_fire_after(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        match *self {
            Self::Daily { time } => {
                let today = after.date().and_time(time);
                if today > after {
                    Some(today)
                } else {
                    after
                        .date()
                        .checked_add_days(Days::new(1))
                        .map(|d| d.and_time(time))
                }
            }
            Self::Weekly { weekday, time } => (0..=7u64)
                .filter_map(|offset| after.date().checked_add_days(Days::new(offset)))
                .filter(|date| date.weekday() == weekday)
                .map(|date| date.and_time(time))
                .find(|candidate| *candidate > after),
            Self::Once { at } => (at > after).then_some(at),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily { time } => write!(f, "daily at {}", time.format("%H:%M")),
            Self::Weekly { weekday, time } => {
                write!(f, "every {weekday} at {}", time.format("%H:%M"))
            }
            Self::Once { at } => write!(f, "once at {}", at.format("%Y-%m-%d %H:%M")),
        }
    }
}

/// Map a schedule entry to the rule registered with the notification center.
///
/// - weekday rules honor only the first stored weekday; an empty set falls
///   back to daily repetition
/// - interval rules fire once, `every_days` after `now`, and are not re-armed
/// - cycle and ad-hoc rules repeat daily
pub fn plan(entry: &ScheduleEntry, now: NaiveDateTime) -> Trigger {
    let time = entry.time;
    match &entry.recurrence {
        Recurrence::Daily => Trigger::Daily { time },
        Recurrence::Weekdays { days } => match days.iter().find_map(|&d| weekday_from_number(d)) {
            Some(weekday) => Trigger::Weekly { weekday, time },
            None => Trigger::Daily { time },
        },
        Recurrence::Interval { every_days } => {
            let days = u64::from((*every_days).max(1));
            let date = now
                .date()
                .checked_add_days(Days::new(days))
                .unwrap_or(now.date());
            Trigger::Once {
                at: date.and_time(time),
            }
        }
        Recurrence::Cycle { .. } | Recurrence::AdHoc => Trigger::Daily { time },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    // Wednesday
    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 14)
            .unwrap()
            .and_hms_opt(10, 15, 0)
            .unwrap()
    }

    #[test]
    fn daily_plans_daily() {
        let entry = ScheduleEntry::daily(t(8, 0));
        assert_eq!(plan(&entry, now()), Trigger::Daily { time: t(8, 0) });
    }

    #[test]
    fn weekdays_use_first_stored_day() {
        let entry = ScheduleEntry::new(t(21, 0), Recurrence::Weekdays { days: vec![6, 2, 4] });
        assert_eq!(
            plan(&entry, now()),
            Trigger::Weekly {
                weekday: Weekday::Fri,
                time: t(21, 0)
            }
        );
    }

    #[test]
    fn empty_weekdays_fall_back_to_daily() {
        let entry = ScheduleEntry::new(t(7, 30), Recurrence::Weekdays { days: vec![] });
        assert_eq!(plan(&entry, now()), Trigger::Daily { time: t(7, 30) });
    }

    #[test]
    fn invalid_weekday_numbers_are_skipped() {
        let entry = ScheduleEntry::new(t(7, 30), Recurrence::Weekdays { days: vec![0, 9] });
        assert_eq!(plan(&entry, now()), Trigger::Daily { time: t(7, 30) });

        let entry = ScheduleEntry::new(t(7, 30), Recurrence::Weekdays { days: vec![0, 2] });
        assert_eq!(
            plan(&entry, now()),
            Trigger::Weekly {
                weekday: Weekday::Mon,
                time: t(7, 30)
            }
        );
    }

    #[test]
    fn interval_fires_once_n_days_out() {
        let entry = ScheduleEntry::new(t(9, 0), Recurrence::Interval { every_days: 3 });
        let trigger = plan(&entry, now());
        assert_eq!(
            trigger,
            Trigger::Once {
                at: NaiveDate::from_ymd_opt(2026, 10, 17)
                    .unwrap()
                    .and_hms_opt(9, 0, 0)
                    .unwrap()
            }
        );
        assert!(!trigger.repeats());
    }

    #[test]
    fn zero_interval_is_treated_as_one_day() {
        let entry = ScheduleEntry::new(t(9, 0), Recurrence::Interval { every_days: 0 });
        assert_eq!(
            plan(&entry, now()).fixed_date().unwrap().date(),
            NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
        );
    }

    #[test]
    fn cycle_and_ad_hoc_degrade_to_daily() {
        let cycle = ScheduleEntry::new(
            t(12, 0),
            Recurrence::Cycle {
                active_days: 21,
                rest_days: 7,
            },
        );
        let ad_hoc = ScheduleEntry::new(t(12, 0), Recurrence::AdHoc);
        assert_eq!(plan(&cycle, now()), Trigger::Daily { time: t(12, 0) });
        assert_eq!(plan(&ad_hoc, now()), Trigger::Daily { time: t(12, 0) });
    }

    #[test]
    fn next_fire_daily() {
        let later_today = Trigger::Daily { time: t(20, 0) };
        assert_eq!(
            later_today.next_fire_after(now()),
            Some(now().date().and_time(t(20, 0)))
        );
        let earlier = Trigger::Daily { time: t(8, 0) };
        assert_eq!(
            earlier.next_fire_after(now()),
            Some(NaiveDate::from_ymd_opt(2026, 10, 15).unwrap().and_time(t(8, 0)))
        );
    }

    #[test]
    fn next_fire_weekly() {
        let wed_early = Trigger::Weekly {
            weekday: Weekday::Wed,
            time: t(8, 0),
        };
        assert_eq!(
            wed_early.next_fire_after(now()),
            Some(NaiveDate::from_ymd_opt(2026, 10, 21).unwrap().and_time(t(8, 0)))
        );
        let fri = Trigger::Weekly {
            weekday: Weekday::Fri,
            time: t(8, 0),
        };
        assert_eq!(
            fri.next_fire_after(now()),
            Some(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap().and_time(t(8, 0)))
        );
    }

    #[test]
    fn next_fire_once() {
        let past = Trigger::Once {
            at: now() - chrono::Duration::minutes(1),
        };
        assert_eq!(past.next_fire_after(now()), None);
        let future = Trigger::Once {
            at: now() + chrono::Duration::minutes(1),
        };
        assert_eq!(future.next_fire_after(now()), future.fixed_date());
    }

    #[test]
    fn display() {
        assert_eq!(Trigger::Daily { time: t(8, 5) }.to_string(), "daily at 08:05");
        assert_eq!(
            Trigger::Weekly {
                weekday: Weekday::Mon,
                time: t(8, 5)
            }
            .to_string(),
            "every Mon at 08:05"
        );
    }

    proptest! {
        #[test]
        fn weekday_sets_pick_first_day(
            h in 0u32..24,
            m in 0u32..60,
            days in proptest::collection::vec(1u8..=7, 1..7),
        ) {
            let first = weekday_from_number(days[0]).unwrap();
            let entry = ScheduleEntry::new(t(h, m), Recurrence::Weekdays { days });
            let trigger = plan(&entry, now());
            prop_assert_eq!(trigger, Trigger::Weekly { weekday: first, time: t(h, m) });
            prop_assert!(trigger.repeats());
        }

        #[test]
        fn empty_weekday_set_matches_daily(h in 0u32..24, m in 0u32..60) {
            let weekdays = ScheduleEntry::new(t(h, m), Recurrence::Weekdays { days: vec![] });
            let daily = ScheduleEntry::daily(t(h, m));
            prop_assert_eq!(plan(&weekdays, now()), plan(&daily, now()));
        }

        #[test]
        fn interval_is_exactly_n_days_ahead(
            h in 0u32..24,
            m in 0u32..60,
            n in 1u32..400,
            offset_min in 0i64..(60 * 24 * 30),
        ) {
            let invoked = now() + chrono::Duration::minutes(offset_min);
            let entry = ScheduleEntry::new(t(h, m), Recurrence::Interval { every_days: n });
            let trigger = plan(&entry, invoked);
            let at = trigger.fixed_date().unwrap();
            prop_assert!(!trigger.repeats());
            prop_assert_eq!(at.time(), t(h, m));
            prop_assert_eq!((at.date() - invoked.date()).num_days(), i64::from(n));
        }

        #[test]
        fn next_fire_is_strictly_later(
            h in 0u32..24,
            m in 0u32..60,
            offset_min in 0i64..(60 * 24 * 14),
        ) {
            let after = now() + chrono::Duration::minutes(offset_min);
            for trigger in [
                Trigger::Daily { time: t(h, m) },
                Trigger::Weekly { weekday: Weekday::Sun, time: t(h, m) },
            ] {
                let next = trigger.next_fire_after(after).unwrap();
                prop_assert!(next > after);
                prop_assert!(next - after <= chrono::Duration::days(7));
                prop_assert_eq!(next.time(), t(h, m));
            }
        }
    }
}
