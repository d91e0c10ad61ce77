use chrono::{Datelike, Days, NaiveDate};

use crate::clock::{DateRange, month_range, week_range};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeriodKind {
    Day,
    Week,
    Month,
}

impl PeriodKind {
    /// Denominator of the per-day average. Months always count as 30 days.
    pub fn days_denominator(self) -> u64 {
        match self {
            PeriodKind::Day => 1,
            PeriodKind::Week => 7,
            PeriodKind::Month => 30,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PeriodKind::Day => "Day",
            PeriodKind::Week => "Week",
            PeriodKind::Month => "Month",
        }
    }
}

/// Navigation state of the statistics view: a month, a week within it, and a
/// day for the daily view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeriodCursor {
    pub kind: PeriodKind,
    pub year: i32,
    pub month: u32,
    pub week_index: usize,
    pub day: NaiveDate,
}

impl PeriodCursor {
    pub fn new(kind: PeriodKind, today: NaiveDate) -> Self {
        Self {
            kind,
            year: today.year(),
            month: today.month(),
            week_index: week_index_of(today),
            day: today,
        }
    }

    pub fn range(&self) -> DateRange {
        match self.kind {
            PeriodKind::Day => DateRange::single(self.day),
            PeriodKind::Week => {
                let first = first_of_month(self.year, self.month);
                let reference = first
                    .checked_add_days(Days::new(7 * self.week_index as u64))
                    .unwrap_or(first);
                week_range(reference)
            }
            PeriodKind::Month => month_range(self.year, self.month)
                .unwrap_or_else(|| DateRange::single(self.day)),
        }
    }

    pub fn set_kind(&mut self, kind: PeriodKind) {
        self.kind = kind;
    }

    /// Moves by `delta` units of the current kind.
    pub fn shift(&mut self, delta: i32, today: NaiveDate) {
        match self.kind {
            PeriodKind::Day => self.shift_day(delta),
            PeriodKind::Week => self.shift_week(delta),
            PeriodKind::Month => self.shift_month(delta, today),
        }
    }

    /// Moves to another month. The week index lands on the week containing
    /// `today` when that month is the current one, else on the first week.
    pub fn shift_month(&mut self, delta: i32, today: NaiveDate) {
        let index = self.year * 12 + self.month as i32 - 1 + delta;
        self.year = index.div_euclid(12);
        self.month = index.rem_euclid(12) as u32 + 1;
        if self.year == today.year() && self.month == today.month() {
            self.week_index = week_index_of(today);
        } else {
            self.week_index = 0;
        }
    }

    /// Moves one week at a time, spilling into the neighbouring month.
    pub fn shift_week(&mut self, delta: i32) {
        let mut remaining = delta;
        while remaining > 0 {
            if self.week_index + 1 < weeks_in_month(self.year, self.month) {
                self.week_index += 1;
            } else {
                self.move_month(1);
                // The next month's first week overlaps the one just shown
                // unless the month ended on a Sunday.
                self.week_index = if self.overlaps_previous_month() { 1 } else { 0 };
            }
            remaining -= 1;
        }
        while remaining < 0 {
            if self.week_index > 0 {
                self.week_index -= 1;
            } else {
                let was_overlapping = self.overlaps_previous_month();
                self.move_month(-1);
                let last = weeks_in_month(self.year, self.month) - 1;
                self.week_index = if was_overlapping { last.saturating_sub(1) } else { last };
            }
            remaining += 1;
        }
    }

    pub fn shift_day(&mut self, delta: i32) {
        let moved = if delta >= 0 {
            self.day.checked_add_days(Days::new(delta as u64))
        } else {
            self.day.checked_sub_days(Days::new(delta.unsigned_abs() as u64))
        };
        if let Some(day) = moved {
            self.day = day;
            self.year = day.year();
            self.month = day.month();
            self.week_index = week_index_of(day);
        }
    }

    fn move_month(&mut self, delta: i32) {
        let index = self.year * 12 + self.month as i32 - 1 + delta;
        self.year = index.div_euclid(12);
        self.month = index.rem_euclid(12) as u32 + 1;
    }

    fn overlaps_previous_month(&self) -> bool {
        let first = first_of_month(self.year, self.month);
        week_range(first).start < first
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default()
}

/// Number of Monday-starting weeks that overlap the month.
pub fn weeks_in_month(year: i32, month: u32) -> usize {
    let Some(range) = month_range(year, month) else {
        return 1;
    };
    let first_week = week_range(range.start).start;
    ((range.end - first_week).num_days() / 7 + 1) as usize
}

/// Index, within its month, of the week containing `day`.
pub fn week_index_of(day: NaiveDate) -> usize {
    let first = first_of_month(day.year(), day.month());
    let first_week = week_range(first).start;
    ((week_range(day).start - first_week).num_days() / 7) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_index_detects_week_of_today() {
        // March 2024 starts on a Friday.
        assert_eq!(week_index_of(date(2024, 3, 1)), 0);
        assert_eq!(week_index_of(date(2024, 3, 4)), 1);
        assert_eq!(week_index_of(date(2024, 3, 31)), 4);
        assert_eq!(weeks_in_month(2024, 3), 5);
        // February 2021 starts on a Monday and has exactly four weeks.
        assert_eq!(weeks_in_month(2021, 2), 4);
    }

    #[test]
    fn cursor_resolves_week_of_today() {
        let today = date(2024, 3, 13);
        let cursor = PeriodCursor::new(PeriodKind::Week, today);
        let range = cursor.range();
        assert_eq!(range.start, date(2024, 3, 11));
        assert_eq!(range.end, date(2024, 3, 17));
    }

    #[test]
    fn shifting_month_resets_week_index() {
        let today = date(2024, 3, 13);
        let mut cursor = PeriodCursor::new(PeriodKind::Week, today);
        cursor.shift_month(-1, today);
        assert_eq!((cursor.year, cursor.month, cursor.week_index), (2024, 2, 0));
        cursor.shift_month(1, today);
        assert_eq!(cursor.week_index, 2);
        cursor.shift_month(-3, today);
        assert_eq!((cursor.year, cursor.month), (2023, 12));
    }

    #[test]
    fn shifting_weeks_never_repeats_a_week() {
        let today = date(2024, 3, 31);
        let mut cursor = PeriodCursor::new(PeriodKind::Week, today);
        let before = cursor.range();
        cursor.shift_week(1);
        let after = cursor.range();
        assert_eq!(after.start, date(2024, 4, 1));
        assert_eq!(before.end.succ_opt(), Some(after.start));

        let mut back = PeriodCursor::new(PeriodKind::Week, date(2024, 3, 1));
        back.shift_week(-1);
        assert_eq!(back.range().start, date(2024, 2, 19));
    }

    #[test]
    fn month_cursor_uses_calendar_month() {
        let mut cursor = PeriodCursor::new(PeriodKind::Month, date(2024, 2, 10));
        assert_eq!(cursor.range().len_days(), 29);
        cursor.shift(1, date(2024, 2, 10));
        assert_eq!(cursor.range().start, date(2024, 3, 1));
        assert_eq!(PeriodKind::Month.days_denominator(), 30);
    }

    #[test]
    fn day_cursor_moves_by_days() {
        let mut cursor = PeriodCursor::new(PeriodKind::Day, date(2024, 3, 1));
        cursor.shift(-1, date(2024, 3, 1));
        assert_eq!(cursor.range(), DateRange::single(date(2024, 2, 29)));
        assert_eq!((cursor.year, cursor.month), (2024, 2));
    }
}
