/// Calendar helpers: local day identifiers and week/month ranges.
use chrono::{DateTime, Datelike, Days, Local, NaiveDate};

use crate::types::day_prefix;

/// Source of wall-clock time, swapped out in tests.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;

    fn today(&self) -> String {
        today_id(&self.now())
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

pub fn day_id(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// The local calendar day of `now`, not its UTC day.
pub fn today_id(now: &DateTime<Local>) -> String {
    day_id(now.date_naive())
}

/// Local midnight at the start of `date`. `None` when midnight falls in a DST gap.
pub fn start_of_day(date: NaiveDate) -> Option<DateTime<Local>> {
    date.and_hms_opt(0, 0, 0)?
        .and_local_timezone(Local)
        .earliest()
}

/// Inclusive range of calendar days.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            return Self {
                start: end,
                end: start,
            };
        }
        Self { start, end }
    }

    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start_id(&self) -> String {
        day_id(self.start)
    }

    pub fn end_id(&self) -> String {
        day_id(self.end)
    }

    pub fn len_days(&self) -> u64 {
        (self.end - self.start).num_days() as u64 + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let start = self.start;
        (0..self.len_days()).filter_map(move |offset| start.checked_add_days(Days::new(offset)))
    }

    /// Matches the day part of a session id against the range bounds, so
    /// `{day}_{suffix}` ids fall inside the range of their day.
    pub fn contains_session(&self, session_id: &str) -> bool {
        let day = day_prefix(session_id);
        day >= self.start_id().as_str() && day <= self.end_id().as_str()
    }

    /// The range of the same length ending the day before this one starts.
    pub fn preceding(&self) -> Self {
        let len = self.len_days();
        let end = self.start.pred_opt().unwrap_or(self.start);
        let start = end
            .checked_sub_days(Days::new(len - 1))
            .unwrap_or(end);
        Self { start, end }
    }

    pub fn label(&self) -> String {
        if self.start == self.end {
            return self.start_id();
        }
        format!("{}..{}", self.start_id(), self.end_id())
    }
}

/// Monday through Sunday of the week containing `reference`.
pub fn week_range(reference: NaiveDate) -> DateRange {
    let offset = reference.weekday().num_days_from_monday() as u64;
    let start = reference
        .checked_sub_days(Days::new(offset))
        .unwrap_or(reference);
    let end = start.checked_add_days(Days::new(6)).unwrap_or(start);
    DateRange { start, end }
}

/// First through last day of `month` (1-based) in `year`.
pub fn month_range(year: i32, month: u32) -> Option<DateRange> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let end = next.pred_opt()?;
    Some(DateRange { start, end })
}

#[cfg(test)]
pub struct FixedClock(pub std::cell::Cell<DateTime<Local>>);

#[cfg(test)]
impl FixedClock {
    pub fn at(now: DateTime<Local>) -> Self {
        Self(std::cell::Cell::new(now))
    }

    pub fn advance_millis(&self, millis: i64) {
        self.0.set(self.0.get() + chrono::Duration::milliseconds(millis));
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0.get()
    }
}

#[cfg(test)]
impl<C: Clock> Clock for std::rc::Rc<C> {
    fn now(&self) -> DateTime<Local> {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn today_uses_local_calendar_day() {
        let late = Local.with_ymd_and_hms(2024, 3, 4, 23, 59, 59).unwrap();
        assert_eq!(today_id(&late), "2024-03-04");
        let early = Local.with_ymd_and_hms(2024, 3, 5, 0, 0, 1).unwrap();
        assert_eq!(today_id(&early), "2024-03-05");
    }

    #[test]
    fn week_starts_on_monday() {
        // 2024-03-06 is a Wednesday.
        let week = week_range(date(2024, 3, 6));
        assert_eq!(week.start, date(2024, 3, 4));
        assert_eq!(week.end, date(2024, 3, 10));
    }

    #[test]
    fn sunday_belongs_to_preceding_monday() {
        let week = week_range(date(2024, 3, 10));
        assert_eq!(week.start, date(2024, 3, 4));
        assert_eq!(week.days().count(), 7);
    }

    #[test]
    fn month_range_uses_real_month_length() {
        assert_eq!(month_range(2024, 2).unwrap().end, date(2024, 2, 29));
        assert_eq!(month_range(2023, 2).unwrap().len_days(), 28);
        assert_eq!(month_range(2024, 12).unwrap().end, date(2024, 12, 31));
        assert!(month_range(2024, 13).is_none());
    }

    #[test]
    fn composite_session_ids_match_their_day() {
        let week = week_range(date(2024, 3, 6));
        assert!(week.contains_session("2024-03-04"));
        assert!(week.contains_session("2024-03-10_1710000000000"));
        assert!(!week.contains_session("2024-03-11"));
        assert!(!week.contains_session("2024-03-03_99"));
    }

    #[test]
    fn preceding_range_has_same_length() {
        let week = week_range(date(2024, 3, 6));
        let previous = week.preceding();
        assert_eq!(previous.start, date(2024, 2, 26));
        assert_eq!(previous.end, date(2024, 3, 3));

        let march = month_range(2024, 3).unwrap();
        let before = march.preceding();
        assert_eq!(before.len_days(), 31);
        assert_eq!(before.end, date(2024, 2, 29));
    }
}
