use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::clock::{DateRange, day_id};
use crate::types::{Session, StudentId};

/// Summed time of one student over a period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StudentTime {
    pub student_id: StudentId,
    pub seconds: u64,
    /// Number of sessions in which the student spoke.
    pub interventions: usize,
}

/// Raw totals of a period. Results with a zero total are ignored everywhere.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeriodTotals {
    pub total_time: u64,
    /// Count of (session, student) pairs with time, not of sessions.
    pub sessions_count: usize,
    pub active_students: HashSet<StudentId>,
    /// In first-encounter order.
    pub student_times: Vec<StudentTime>,
}

impl PeriodTotals {
    #[cfg(test)]
    pub fn time_for(&self, student_id: &str) -> Option<u64> {
        self.student_times
            .iter()
            .find(|entry| entry.student_id == student_id)
            .map(|entry| entry.seconds)
    }

    pub fn average_per_active_student(&self) -> u64 {
        match self.active_students.len() {
            0 => 0,
            count => self.total_time / count as u64,
        }
    }

    pub fn average_per_intervention(&self) -> u64 {
        match self.sessions_count {
            0 => 0,
            count => self.total_time / count as u64,
        }
    }

    pub fn average_per_day(&self, days_in_period: u64) -> u64 {
        if days_in_period == 0 {
            return 0;
        }
        self.total_time / days_in_period
    }

    /// Active students by descending time. Equal times keep encounter order.
    pub fn ranking(&self) -> Vec<StudentTime> {
        let mut ranking = self.student_times.clone();
        ranking.sort_by(|a, b| b.seconds.cmp(&a.seconds));
        ranking
    }
}

pub fn aggregate<'a>(
    range: &DateRange,
    sessions: impl IntoIterator<Item = &'a Session>,
) -> PeriodTotals {
    let mut totals = PeriodTotals::default();
    let mut index: HashMap<StudentId, usize> = HashMap::new();

    for session in sessions {
        if !range.contains_session(&session.id) {
            continue;
        }
        for (student_id, result) in session.results.iter() {
            if !result.is_active() {
                continue;
            }
            totals.total_time += result.total;
            totals.sessions_count += 1;
            totals.active_students.insert(student_id.clone());
            match index.get(student_id) {
                Some(&position) => {
                    let entry = &mut totals.student_times[position];
                    entry.seconds += result.total;
                    entry.interventions += 1;
                }
                None => {
                    index.insert(student_id.clone(), totals.student_times.len());
                    totals.student_times.push(StudentTime {
                        student_id: student_id.clone(),
                        seconds: result.total,
                        interventions: 1,
                    });
                }
            }
        }
    }
    totals
}

/// One bar of the chart series.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeriesPoint {
    pub day: NaiveDate,
    /// Whole minutes, rounded down.
    pub minutes: u64,
}

/// One point per calendar day of `range`, each the summed time of that day.
pub fn daily_series<'a>(
    range: &DateRange,
    sessions: impl IntoIterator<Item = &'a Session>,
) -> Vec<SeriesPoint> {
    let mut per_day: HashMap<&str, u64> = HashMap::new();
    for session in sessions {
        if !range.contains_session(&session.id) {
            continue;
        }
        let seconds: u64 = session
            .results
            .iter()
            .filter(|(_, result)| result.is_active())
            .map(|(_, result)| result.total)
            .sum();
        *per_day.entry(session.day_id()).or_default() += seconds;
    }
    range
        .days()
        .map(|day| {
            let seconds = per_day.get(day_id(day).as_str()).copied().unwrap_or(0);
            SeriesPoint {
                day,
                minutes: seconds / 60,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{month_range, week_range};
    use crate::types::SessionResult;
    use chrono::Local;

    fn session(id: &str, results: &[(&str, u64)]) -> Session {
        let mut session = Session::new(id, Local::now());
        for (student, total) in results {
            session.results.insert(student, SessionResult::with_total(*total));
        }
        session
    }

    fn march(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn week_totals_count_interventions() {
        let sessions = vec![
            session("2024-03-04", &[("A", 600)]),
            session("2024-03-06", &[("A", 300), ("B", 900)]),
        ];
        let totals = aggregate(&week_range(march(4)), &sessions);
        assert_eq!(totals.total_time, 1800);
        assert_eq!(totals.sessions_count, 3);
        assert_eq!(
            totals.active_students,
            HashSet::from(["A".to_string(), "B".to_string()])
        );
        assert_eq!(totals.time_for("A"), Some(900));
        assert_eq!(totals.time_for("B"), Some(900));
    }

    #[test]
    fn zero_totals_are_ignored() {
        let mut touched = session("2024-03-05", &[("A", 60)]);
        touched.results.insert("C", SessionResult::default());
        let totals = aggregate(&week_range(march(4)), [&touched]);
        assert!(!totals.active_students.contains("C"));
        assert_eq!(totals.time_for("C"), None);
        assert_eq!(totals.sessions_count, 1);
    }

    #[test]
    fn sessions_outside_range_are_skipped() {
        let sessions = vec![
            session("2024-03-03", &[("A", 100)]),
            session("2024-03-10_1710000000000", &[("A", 50)]),
            session("2024-03-11", &[("A", 100)]),
        ];
        let totals = aggregate(&week_range(march(6)), &sessions);
        assert_eq!(totals.total_time, 50);
    }

    #[test]
    fn ranking_ties_keep_encounter_order() {
        let sessions = vec![
            session("2024-03-04", &[("A", 600)]),
            session("2024-03-06", &[("A", 300), ("B", 900), ("C", 1000)]),
        ];
        let totals = aggregate(&week_range(march(4)), &sessions);
        let order: Vec<_> = totals
            .ranking()
            .into_iter()
            .map(|entry| (entry.student_id, entry.interventions))
            .collect();
        assert_eq!(
            order,
            vec![
                ("C".to_string(), 1),
                ("A".to_string(), 2),
                ("B".to_string(), 1)
            ]
        );
    }

    #[test]
    fn averages_divide_by_their_own_denominators() {
        let sessions = vec![
            session("2024-03-04", &[("A", 600)]),
            session("2024-03-06", &[("A", 300), ("B", 900)]),
        ];
        let totals = aggregate(&week_range(march(4)), &sessions);
        assert_eq!(totals.average_per_active_student(), 900);
        assert_eq!(totals.average_per_intervention(), 600);
        assert_eq!(totals.average_per_day(7), 257);
        assert_eq!(PeriodTotals::default().average_per_active_student(), 0);
        assert_eq!(PeriodTotals::default().average_per_intervention(), 0);
    }

    #[test]
    fn week_series_has_seven_points_in_minutes() {
        let sessions = vec![
            session("2024-03-04", &[("A", 600), ("B", 59)]),
            session("2024-03-04_1709560000000", &[("A", 61)]),
            session("2024-03-06", &[("B", 900)]),
        ];
        let series = daily_series(&week_range(march(6)), &sessions);
        let minutes: Vec<_> = series.iter().map(|point| point.minutes).collect();
        assert_eq!(minutes, vec![12, 0, 15, 0, 0, 0, 0]);
        assert_eq!(series[0].day, march(4));
    }

    #[test]
    fn month_series_follows_month_length() {
        let february = month_range(2024, 2).unwrap();
        assert_eq!(daily_series(&february, std::iter::empty()).len(), 29);
        let april = month_range(2024, 4).unwrap();
        assert_eq!(daily_series(&april, std::iter::empty()).len(), 30);
    }
}
