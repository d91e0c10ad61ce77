use chrono::{DateTime, Local};
use rand::RngExt;
use serde::{Deserialize, Serialize};

pub type StudentId = String;
pub type SessionId = String;

/// A member of the class roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub created_at: DateTime<Local>,
}

impl Student {
    pub fn new(name: &str, now: DateTime<Local>) -> Self {
        Self {
            id: new_student_id(now),
            name: name.trim().to_string(),
            created_at: now,
        }
    }
}

fn new_student_id(now: DateTime<Local>) -> StudentId {
    let mut rng = rand::rng();
    let salt: u32 = rng.random_range(0..0x1_0000);
    format!("st_{}{salt:04x}", now.timestamp_millis())
}

/// Roster order: case-insensitive by name, then by raw name so the order is total.
pub fn sort_roster(students: &mut [Student]) {
    students.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Accrued speaking time of one student within one session.
///
/// `total` is kept alongside `passages` rather than derived from it: manual
/// adjustments clamp both independently, so the two may disagree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionResult {
    pub total: u64,
    pub passages: Vec<u64>,
}

impl SessionResult {
    /// Result of a student whose timer has just been started for the first time.
    pub fn started() -> Self {
        Self {
            total: 0,
            passages: vec![0],
        }
    }

    /// Result holding a single passage of `total` seconds.
    pub fn with_total(total: u64) -> Self {
        let passages = if total > 0 { vec![total] } else { Vec::new() };
        Self { total, passages }
    }

    /// Normalizes a persisted record: negative numbers clamp to zero and a
    /// total-only record gets `[total]` as its single passage.
    pub fn from_stored(total: i64, passages: Option<Vec<i64>>) -> Self {
        let total = total.max(0) as u64;
        let mut passages: Vec<u64> = passages
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.max(0) as u64)
            .collect();
        if passages.is_empty() && total > 0 {
            passages.push(total);
        }
        Self { total, passages }
    }

    /// A zero total means the student was touched but never spoke.
    pub fn is_active(&self) -> bool {
        self.total > 0
    }

    pub fn passage_count(&self) -> usize {
        self.passages.len()
    }

    pub fn current_passage(&self) -> u64 {
        self.passages.last().copied().unwrap_or(0)
    }

    pub fn previous_passage(&self) -> Option<u64> {
        let len = self.passages.len();
        if len < 2 {
            return None;
        }
        self.passages.get(len - 2).copied()
    }

    /// True when `total` matches the sum of the passages.
    pub fn is_consistent(&self) -> bool {
        if self.passages.is_empty() {
            return self.total == 0;
        }
        self.total == self.passages.iter().sum::<u64>()
    }

    /// Makes sure there is a last passage to accrue into.
    pub(crate) fn open_passage(&mut self) {
        if self.passages.is_empty() {
            self.passages.push(self.total);
        }
    }

    pub(crate) fn accrue(&mut self, seconds: u64) {
        self.open_passage();
        self.total += seconds;
        if let Some(last) = self.passages.last_mut() {
            *last += seconds;
        }
    }

    pub(crate) fn step(&mut self) {
        if self.passages.is_empty() && self.total > 0 {
            self.passages.push(self.total);
        }
        self.passages.push(0);
    }

    /// Applies a signed delta to `total` and to the last passage, clamping each
    /// at zero on its own.
    pub(crate) fn adjust(&mut self, delta: i64) {
        self.open_passage();
        self.total = apply_delta(self.total, delta);
        if let Some(last) = self.passages.last_mut() {
            *last = apply_delta(*last, delta);
        }
    }

    pub(crate) fn remove_passage(&mut self, index: usize) -> Option<u64> {
        if index >= self.passages.len() {
            return None;
        }
        let removed = self.passages.remove(index);
        self.total = self.total.saturating_sub(removed);
        Some(removed)
    }
}

fn apply_delta(value: u64, delta: i64) -> u64 {
    if delta >= 0 {
        value.saturating_add(delta as u64)
    } else {
        value.saturating_sub(delta.unsigned_abs())
    }
}

/// Per-student results of a session, kept in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionResults {
    entries: Vec<(StudentId, SessionResult)>,
}

impl SessionResults {
    pub fn get(&self, student_id: &str) -> Option<&SessionResult> {
        self.entries
            .iter()
            .find(|(id, _)| id == student_id)
            .map(|(_, result)| result)
    }

    pub fn get_mut(&mut self, student_id: &str) -> Option<&mut SessionResult> {
        self.entries
            .iter_mut()
            .find(|(id, _)| id == student_id)
            .map(|(_, result)| result)
    }

    pub fn get_or_insert_with(
        &mut self,
        student_id: &str,
        make: impl FnOnce() -> SessionResult,
    ) -> &mut SessionResult {
        let index = match self.entries.iter().position(|(id, _)| id == student_id) {
            Some(index) => index,
            None => {
                self.entries.push((student_id.to_string(), make()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    /// Replaces an existing entry in place, or appends a new one.
    pub fn insert(&mut self, student_id: &str, result: SessionResult) {
        match self.get_mut(student_id) {
            Some(existing) => *existing = result,
            None => self.entries.push((student_id.to_string(), result)),
        }
    }

    pub fn remove(&mut self, student_id: &str) -> Option<SessionResult> {
        let index = self.entries.iter().position(|(id, _)| id == student_id)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains(&self, student_id: &str) -> bool {
        self.get(student_id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StudentId, &SessionResult)> {
        self.entries.iter().map(|(id, result)| (id, result))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(StudentId, SessionResult)> for SessionResults {
    fn from_iter<I: IntoIterator<Item = (StudentId, SessionResult)>>(iter: I) -> Self {
        let mut results = SessionResults::default();
        for (id, result) in iter {
            results.insert(&id, result);
        }
        results
    }
}

/// One coaching block. The id is the day (`YYYY-MM-DD`) for the main session of
/// that day, or `{day}_{suffix}` for supplementary ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub date: DateTime<Local>,
    pub results: SessionResults,
}

impl Session {
    pub fn new(id: &str, date: DateTime<Local>) -> Self {
        Self {
            id: id.to_string(),
            date,
            results: SessionResults::default(),
        }
    }

    /// The `YYYY-MM-DD` part of the id.
    pub fn day_id(&self) -> &str {
        day_prefix(&self.id)
    }

    pub fn is_supplementary(&self) -> bool {
        self.id.contains('_')
    }

    /// Sum of every result total, zero totals included.
    pub fn recorded_seconds(&self) -> u64 {
        self.results.iter().map(|(_, result)| result.total).sum()
    }

    pub fn has_recorded_time(&self) -> bool {
        self.results.iter().any(|(_, result)| result.total > 0)
    }
}

pub fn day_prefix(session_id: &str) -> &str {
    session_id.split('_').next().unwrap_or(session_id)
}
