use super::aggregate::PeriodTotals;

/// Which direction counts as an improvement for a metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Polarity {
    /// Durations: less time (a more even spread of speaking) is better.
    LowerIsBetter,
    /// Counts: more active students or interventions is better.
    HigherIsBetter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trend {
    Better,
    Worse,
    Unchanged,
}

pub fn compare(current: u64, previous: u64, polarity: Polarity) -> Trend {
    if current == previous {
        return Trend::Unchanged;
    }
    let lower = current < previous;
    match (polarity, lower) {
        (Polarity::LowerIsBetter, true) | (Polarity::HigherIsBetter, false) => Trend::Better,
        _ => Trend::Worse,
    }
}

/// Averages derived from a period's totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Averages {
    pub per_active_student: u64,
    pub per_intervention: u64,
    pub per_day: u64,
}

impl Averages {
    pub fn of(totals: &PeriodTotals, days_in_period: u64) -> Self {
        Self {
            per_active_student: totals.average_per_active_student(),
            per_intervention: totals.average_per_intervention(),
            per_day: totals.average_per_day(days_in_period),
        }
    }
}

/// Trend of every headline metric against the preceding period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrendFlags {
    pub total_time: Trend,
    pub active_students: Trend,
    pub sessions_count: Trend,
    pub average_per_student: Trend,
    pub average_per_intervention: Trend,
    pub average_per_day: Trend,
}

impl TrendFlags {
    pub fn between(
        current: (&PeriodTotals, &Averages),
        previous: (&PeriodTotals, &Averages),
    ) -> Self {
        let (totals, averages) = current;
        let (prev_totals, prev_averages) = previous;
        Self {
            total_time: compare(totals.total_time, prev_totals.total_time, Polarity::LowerIsBetter),
            active_students: compare(
                totals.active_students.len() as u64,
                prev_totals.active_students.len() as u64,
                Polarity::HigherIsBetter,
            ),
            sessions_count: compare(
                totals.sessions_count as u64,
                prev_totals.sessions_count as u64,
                Polarity::HigherIsBetter,
            ),
            average_per_student: compare(
                averages.per_active_student,
                prev_averages.per_active_student,
                Polarity::LowerIsBetter,
            ),
            average_per_intervention: compare(
                averages.per_intervention,
                prev_averages.per_intervention,
                Polarity::LowerIsBetter,
            ),
            average_per_day: compare(averages.per_day, prev_averages.per_day, Polarity::LowerIsBetter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_improve_when_lower() {
        assert_eq!(compare(100, 200, Polarity::LowerIsBetter), Trend::Better);
        assert_eq!(compare(300, 200, Polarity::LowerIsBetter), Trend::Worse);
    }

    #[test]
    fn counts_improve_when_higher() {
        assert_eq!(compare(5, 3, Polarity::HigherIsBetter), Trend::Better);
        assert_eq!(compare(2, 3, Polarity::HigherIsBetter), Trend::Worse);
        assert_eq!(compare(3, 3, Polarity::HigherIsBetter), Trend::Unchanged);
    }

    #[test]
    fn flags_apply_polarity_per_metric() {
        let current = PeriodTotals {
            total_time: 600,
            sessions_count: 4,
            active_students: ["a", "b", "c"].iter().map(|s| s.to_string()).collect(),
            student_times: Vec::new(),
        };
        let previous = PeriodTotals {
            total_time: 900,
            sessions_count: 2,
            active_students: ["a"].iter().map(|s| s.to_string()).collect(),
            student_times: Vec::new(),
        };
        let flags = TrendFlags::between(
            (&current, &Averages::of(&current, 7)),
            (&previous, &Averages::of(&previous, 7)),
        );
        assert_eq!(flags.total_time, Trend::Better);
        assert_eq!(flags.active_students, Trend::Better);
        assert_eq!(flags.sessions_count, Trend::Better);
        assert_eq!(flags.average_per_student, Trend::Better);
        assert_eq!(flags.average_per_intervention, Trend::Better);
    }
}
