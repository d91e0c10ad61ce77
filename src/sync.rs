/// Remote copy of the roster and sessions, kept as a JSON snapshot file.
///
/// Writes publish whole collections. Incoming changes arrive as whole-collection
/// replace events and are reconciled by the pure merge functions below.
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::{Session, SessionResult, SessionResults, Student, sort_roster};

/// Health of persistence as shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    /// No remote configured; only local storage.
    Local,
    Online,
    /// The last write (local or remote) failed.
    Unsynced,
}

impl SyncStatus {
    pub fn label(self) -> &'static str {
        match self {
            SyncStatus::Local => "local",
            SyncStatus::Online => "online",
            SyncStatus::Unsynced => "unsynced",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChangeEvent {
    Students(Vec<Student>),
    Sessions(Vec<Session>),
}

/// Source of changes made elsewhere.
pub trait ChangeObserver {
    /// Returns the collections that changed since the previous poll.
    fn poll_changes(&mut self) -> Result<Vec<ChangeEvent>>;
}

pub trait RemoteSink {
    fn publish(&mut self, students: &[Student], sessions: &[Session]) -> Result<()>;
}

pub trait Remote: ChangeObserver + RemoteSink {}

impl<T: ChangeObserver + RemoteSink> Remote for T {}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    students: Vec<Student>,
    #[serde(default)]
    sessions: Vec<SnapshotSession>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotSession {
    id: String,
    date: DateTime<Local>,
    #[serde(default)]
    results: Vec<SnapshotResult>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotResult {
    student_id: String,
    #[serde(default)]
    total: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    passages: Option<Vec<i64>>,
}

impl From<&Session> for SnapshotSession {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.clone(),
            date: session.date,
            results: session
                .results
                .iter()
                .map(|(student_id, result)| SnapshotResult {
                    student_id: student_id.clone(),
                    total: result.total as i64,
                    passages: Some(result.passages.iter().map(|p| *p as i64).collect()),
                })
                .collect(),
        }
    }
}

impl From<SnapshotSession> for Session {
    fn from(stored: SnapshotSession) -> Self {
        let results: SessionResults = stored
            .results
            .into_iter()
            .map(|r| (r.student_id, SessionResult::from_stored(r.total, r.passages)))
            .collect();
        Session {
            id: stored.id,
            date: stored.date,
            results,
        }
    }
}

/// A snapshot file shared with other instances, polled by modification time.
pub struct SnapshotFile {
    path: PathBuf,
    last_seen: Option<SystemTime>,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_seen: None,
        }
    }

    fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|meta| meta.modified()).ok()
    }
}

impl ChangeObserver for SnapshotFile {
    fn poll_changes(&mut self) -> Result<Vec<ChangeEvent>> {
        let Some(modified) = self.modified() else {
            return Ok(Vec::new());
        };
        if self.last_seen == Some(modified) {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&self.path)
            .with_context(|| format!("reading snapshot {}", self.path.display()))?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing snapshot {}", self.path.display()))?;
        self.last_seen = Some(modified);
        debug!(path = %self.path.display(), "snapshot changed");
        Ok(vec![
            ChangeEvent::Students(snapshot.students),
            ChangeEvent::Sessions(snapshot.sessions.into_iter().map(Session::from).collect()),
        ])
    }
}

impl RemoteSink for SnapshotFile {
    fn publish(&mut self, students: &[Student], sessions: &[Session]) -> Result<()> {
        let snapshot = Snapshot {
            students: students.to_vec(),
            sessions: sessions.iter().map(SnapshotSession::from).collect(),
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&snapshot)?)?;
        fs::rename(&tmp, &self.path)?;
        self.last_seen = self.modified();
        Ok(())
    }
}

/// Which copy of the current day's session to keep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Local,
    Remote,
}

/// Prefers whichever side has recorded time for today; local wins otherwise.
pub fn merge_current_session(local: Option<&Session>, remote: Option<&Session>) -> Side {
    let local_has_time = local.is_some_and(Session::has_recorded_time);
    let remote_has_time = remote.is_some_and(Session::has_recorded_time);
    if remote_has_time && !local_has_time {
        Side::Remote
    } else {
        Side::Local
    }
}

/// Keeps the first student of each name.
pub fn dedupe_roster(students: Vec<Student>) -> Vec<Student> {
    let mut seen = HashSet::new();
    students
        .into_iter()
        .filter(|student| seen.insert(student.name.clone()))
        .collect()
}

/// Returns the remote roster when it is the larger of the two.
pub fn merge_roster(local: &[Student], remote: Vec<Student>) -> Option<Vec<Student>> {
    let mut remote = dedupe_roster(remote);
    if remote.len() <= local.len() {
        return None;
    }
    sort_roster(&mut remote);
    Some(remote)
}

/// Merges a remote session collection into the local one.
///
/// Today's session follows [`merge_current_session`]. Other sessions present
/// on both sides keep the copy with more recorded time, local on ties.
/// Sessions known to only one side are kept.
pub fn merge_sessions(local: &[Session], remote: Vec<Session>, today: &str) -> Vec<Session> {
    let mut merged: Vec<Session> = local.to_vec();
    let mut adopted = 0;
    for incoming in remote {
        let position = merged.iter().position(|s| s.id == incoming.id);
        let existing = position.map(|index| &merged[index]);
        let take_remote = match existing {
            None => true,
            Some(existing) if incoming.id == today => {
                merge_current_session(Some(existing), Some(&incoming)) == Side::Remote
            }
            Some(existing) => incoming.recorded_seconds() > existing.recorded_seconds(),
        };
        if !take_remote {
            continue;
        }
        adopted += 1;
        match position {
            Some(index) => merged[index] = incoming,
            None => merged.push(incoming),
        }
    }
    if adopted > 0 {
        info!(adopted, "remote sessions merged");
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn session(id: &str, results: &[(&str, u64)]) -> Session {
        let mut session = Session::new(id, Local.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap());
        for (student, total) in results {
            session.results.insert(student, SessionResult::with_total(*total));
        }
        session
    }

    fn student(id: &str, name: &str) -> Student {
        Student {
            id: id.to_string(),
            name: name.to_string(),
            created_at: Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn current_session_prefers_side_with_time() {
        let empty = session("2024-03-04", &[("a", 0)]);
        let busy = session("2024-03-04", &[("a", 12)]);
        assert_eq!(merge_current_session(Some(&empty), Some(&busy)), Side::Remote);
        assert_eq!(merge_current_session(None, Some(&busy)), Side::Remote);
        assert_eq!(merge_current_session(Some(&busy), Some(&busy)), Side::Local);
        assert_eq!(merge_current_session(Some(&empty), Some(&empty)), Side::Local);
        assert_eq!(merge_current_session(Some(&busy), None), Side::Local);
    }

    #[test]
    fn larger_roster_wins_after_dedupe() {
        let local = vec![student("1", "Ada"), student("2", "Bo")];
        let remote = vec![
            student("1", "Ada"),
            student("9", "Ada"),
            student("2", "Bo"),
        ];
        assert_eq!(merge_roster(&local, remote), None);

        let remote = vec![student("3", "cy"), student("1", "Ada"), student("2", "Bo")];
        let merged = merge_roster(&local, remote).unwrap();
        let names: Vec<_> = merged.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Bo", "cy"]);
    }

    #[test]
    fn sessions_merge_per_rule() {
        let local = vec![
            session("2024-03-01", &[("a", 100)]),
            session("2024-03-02", &[("a", 100)]),
            session("2024-03-04", &[("a", 5)]),
            session("2024-03-03", &[("a", 1)]),
        ];
        let remote = vec![
            session("2024-03-01", &[("a", 50)]),
            session("2024-03-02", &[("a", 150)]),
            session("2024-03-04", &[("a", 500)]),
            session("2024-02-28", &[("b", 7)]),
        ];
        let merged = merge_sessions(&local, remote, "2024-03-04");
        let total = |id: &str| merged.iter().find(|s| s.id == id).map(Session::recorded_seconds);
        assert_eq!(total("2024-03-01"), Some(100));
        assert_eq!(total("2024-03-02"), Some(150));
        // Local already has time today, so it is kept.
        assert_eq!(total("2024-03-04"), Some(5));
        assert_eq!(total("2024-03-03"), Some(1));
        assert_eq!(total("2024-02-28"), Some(7));
    }

    #[test]
    fn snapshot_round_trips_through_file() {
        let dir = tempdir().unwrap();
        let mut writer = SnapshotFile::new(dir.path().join("remote").join("snapshot.json"));
        let mut reader = SnapshotFile::new(dir.path().join("remote").join("snapshot.json"));
        assert!(reader.poll_changes().unwrap().is_empty());

        let mut stored = session("2024-03-04", &[("a", 30)]);
        stored.results.get_mut("a").unwrap().passages = vec![10, 20];
        writer.publish(&[student("1", "Ada")], &[stored.clone()]).unwrap();
        // The writer does not see its own publish.
        assert!(writer.poll_changes().unwrap().is_empty());

        let events = reader.poll_changes().unwrap();
        assert_eq!(
            events,
            vec![
                ChangeEvent::Students(vec![student("1", "Ada")]),
                ChangeEvent::Sessions(vec![stored]),
            ]
        );
        assert!(reader.poll_changes().unwrap().is_empty());
    }

    #[test]
    fn legacy_snapshot_results_are_normalized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        fs::write(
            &path,
            r#"{"sessions":[{"id":"2024-03-04","date":"2024-03-04T08:00:00+00:00",
                "results":[{"student_id":"a","total":42},{"student_id":"b","total":-3}]}]}"#,
        )
        .unwrap();
        let events = SnapshotFile::new(&path).poll_changes().unwrap();
        let ChangeEvent::Sessions(sessions) = &events[1] else {
            panic!("expected sessions event");
        };
        let results = &sessions[0].results;
        assert_eq!(results.get("a").unwrap().passages, vec![42]);
        assert_eq!(results.get("b"), Some(&SessionResult::default()));
        assert_eq!(events[0], ChangeEvent::Students(Vec::new()));
    }
}
