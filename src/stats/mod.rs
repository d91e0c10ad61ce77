/// Period statistics: totals, averages, rankings and trends.
mod aggregate;
mod period;
mod trend;

use std::collections::HashMap;

pub use aggregate::{PeriodTotals, SeriesPoint, aggregate, daily_series};
pub use period::{PeriodCursor, PeriodKind};
pub use trend::{Averages, Trend, TrendFlags};

use crate::clock::DateRange;
use crate::types::{Session, Student, StudentId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankedStudent {
    pub student_id: StudentId,
    pub label: String,
    pub seconds: u64,
    pub interventions: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeriodReport {
    pub kind: PeriodKind,
    pub range: DateRange,
    pub previous_range: DateRange,
    pub totals: PeriodTotals,
    pub previous: PeriodTotals,
    pub averages: Averages,
    pub previous_averages: Averages,
    pub ranking: Vec<RankedStudent>,
    pub series: Vec<SeriesPoint>,
    pub trends: TrendFlags,
}

pub fn build_report(
    kind: PeriodKind,
    range: DateRange,
    sessions: &[Session],
    roster: &[Student],
) -> PeriodReport {
    let previous_range = range.preceding();
    let totals = aggregate(&range, sessions);
    let previous = aggregate(&previous_range, sessions);
    let days = kind.days_denominator();
    let averages = Averages::of(&totals, days);
    let previous_averages = Averages::of(&previous, days);
    let trends = TrendFlags::between((&totals, &averages), (&previous, &previous_averages));

    let names: HashMap<&str, &str> = roster
        .iter()
        .map(|student| (student.id.as_str(), student.name.as_str()))
        .collect();
    let ranking = totals
        .ranking()
        .into_iter()
        .map(|entry| RankedStudent {
            label: names
                .get(entry.student_id.as_str())
                .map(|name| name.to_string())
                .unwrap_or_else(|| entry.student_id.clone()),
            student_id: entry.student_id,
            seconds: entry.seconds,
            interventions: entry.interventions,
        })
        .collect();

    PeriodReport {
        kind,
        range,
        previous_range,
        series: daily_series(&range, sessions),
        totals,
        previous,
        averages,
        previous_averages,
        ranking,
        trends,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{month_range, week_range};
    use crate::types::SessionResult;
    use chrono::{Local, NaiveDate};

    fn session(id: &str, results: &[(&str, u64)]) -> Session {
        let mut session = Session::new(id, Local::now());
        for (student, total) in results {
            session.results.insert(student, SessionResult::with_total(*total));
        }
        session
    }

    fn student(id: &str, name: &str) -> Student {
        Student {
            id: id.to_string(),
            name: name.to_string(),
            created_at: Local::now(),
        }
    }

    #[test]
    fn monthly_daily_average_always_divides_by_thirty() {
        // February 2024 has 29 days; the average still uses 30.
        let sessions = vec![session("2024-02-10", &[("a", 3000)])];
        let range = month_range(2024, 2).unwrap();
        let report = build_report(PeriodKind::Month, range, &sessions, &[]);
        assert_eq!(report.averages.per_day, 100);
        assert_eq!(report.series.len(), 29);
    }

    #[test]
    fn report_compares_with_preceding_week() {
        let sessions = vec![
            session("2024-02-27", &[("a", 900)]),
            session("2024-03-05", &[("a", 300), ("b", 300)]),
        ];
        let range = week_range(NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
        let roster = vec![student("a", "Ada"), student("b", "Bo")];
        let report = build_report(PeriodKind::Week, range, &sessions, &roster);
        assert_eq!(report.previous.total_time, 900);
        assert_eq!(report.totals.total_time, 600);
        assert_eq!(report.trends.total_time, Trend::Better);
        assert_eq!(report.trends.active_students, Trend::Better);
        assert_eq!(report.averages.per_day, 85);
    }

    #[test]
    fn ranking_labels_fall_back_for_removed_students() {
        let sessions = vec![session("2024-03-05", &[("gone", 50), ("a", 20)])];
        let range = week_range(NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
        let report = build_report(PeriodKind::Week, range, &sessions, &[student("a", "Ada")]);
        let labels: Vec<_> = report.ranking.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["gone", "Ada"]);
        assert_eq!(report.ranking[0].student_id, "gone");
    }
}
