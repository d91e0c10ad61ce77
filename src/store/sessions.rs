/// Session and result queries.
use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::clock::start_of_day;
use crate::types::{Session, SessionResult, SessionResults, day_prefix};

pub fn query_sessions(conn: &Connection) -> Result<Vec<Session>> {
    let mut stmt = conn.prepare("SELECT id, date FROM sessions ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut sessions = Vec::new();
    for row in rows {
        let (id, date) = row?;
        sessions.push(build_session(id, &date, conn)?);
    }
    Ok(sessions)
}

pub fn query_session_by_id(id: &str, conn: &Connection) -> Result<Option<Session>> {
    let date: Option<String> = conn
        .query_row("SELECT date FROM sessions WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    match date {
        Some(date) => Ok(Some(build_session(id.to_string(), &date, conn)?)),
        None => Ok(None),
    }
}

pub fn query_sessions_by_prefix(prefix: &str, conn: &Connection) -> Result<Vec<Session>> {
    let mut stmt = conn.prepare(
        "SELECT id, date FROM sessions WHERE substr(id, 1, length(?1)) = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map([prefix], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut sessions = Vec::new();
    for row in rows {
        let (id, date) = row?;
        sessions.push(build_session(id, &date, conn)?);
    }
    Ok(sessions)
}

/// Replaces the stored copy of `session`, results included.
pub fn save_session(session: &Session, conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO sessions (id, date) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET date = excluded.date",
        (&session.id, session.date.to_rfc3339()),
    )?;
    tx.execute("DELETE FROM session_results WHERE session_id = ?1", [&session.id])?;
    for (position, (student_id, result)) in session.results.iter().enumerate() {
        tx.execute(
            "INSERT INTO session_results (session_id, student_id, position, total, passages)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            (
                &session.id,
                student_id,
                position as i64,
                result.total as i64,
                serde_json::to_string(&result.passages)?,
            ),
        )?;
    }
    tx.commit()?;
    debug!(session = %session.id, results = session.results.len(), "session saved");
    Ok(())
}

fn build_session(id: String, date: &str, conn: &Connection) -> Result<Session> {
    let date = parse_session_date(&id, date);
    let results = query_results(&id, conn)?;
    Ok(Session { id, date, results })
}

fn query_results(session_id: &str, conn: &Connection) -> Result<SessionResults> {
    let mut stmt = conn.prepare(
        "SELECT student_id, total, passages FROM session_results
         WHERE session_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map([session_id], |row| {
        let student_id: String = row.get(0)?;
        let total: i64 = row.get(1)?;
        let passages: Option<String> = row.get(2)?;
        Ok((student_id, total, passages))
    })?;
    let mut results = SessionResults::default();
    for row in rows {
        let (student_id, total, passages) = row?;
        let passages = passages.and_then(|text| serde_json::from_str::<Vec<i64>>(&text).ok());
        results.insert(&student_id, SessionResult::from_stored(total, passages));
    }
    Ok(results)
}

/// Unparsable dates fall back to midnight of the day in the id.
fn parse_session_date(id: &str, raw: &str) -> DateTime<Local> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return date.with_timezone(&Local);
    }
    NaiveDate::parse_from_str(day_prefix(id), "%Y-%m-%d")
        .ok()
        .and_then(start_of_day)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::migrations::run_migrations;
    use chrono::TimeZone;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn session(id: &str, results: &[(&str, SessionResult)]) -> Session {
        let mut session = Session::new(id, Local.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap());
        for (student, result) in results {
            session.results.insert(student, result.clone());
        }
        session
    }

    #[test]
    fn saved_session_reads_back_in_result_order() {
        let mut conn = conn();
        let stored = session(
            "2024-03-04",
            &[
                ("zed", SessionResult { total: 70, passages: vec![30, 40] }),
                ("amy", SessionResult::default()),
            ],
        );
        save_session(&stored, &mut conn).unwrap();
        let loaded = query_session_by_id("2024-03-04", &conn).unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert!(query_session_by_id("2024-03-05", &conn).unwrap().is_none());
    }

    #[test]
    fn saving_again_replaces_results() {
        let mut conn = conn();
        let mut stored = session("2024-03-04", &[("a", SessionResult::with_total(5))]);
        save_session(&stored, &mut conn).unwrap();
        stored.results.remove("a");
        stored.results.insert("b", SessionResult::with_total(9));
        save_session(&stored, &mut conn).unwrap();
        let loaded = query_session_by_id("2024-03-04", &conn).unwrap().unwrap();
        assert!(!loaded.results.contains("a"));
        assert_eq!(loaded.results.get("b").map(|r| r.total), Some(9));
    }

    #[test]
    fn prefix_query_orders_day_before_supplements() {
        let mut conn = conn();
        for id in ["2024-03-04_1709560000002", "2024-03-05", "2024-03-04", "2024-03-04_1709560000001"] {
            save_session(&session(id, &[]), &mut conn).unwrap();
        }
        let ids: Vec<_> = query_sessions_by_prefix("2024-03-04", &conn)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(
            ids,
            vec!["2024-03-04", "2024-03-04_1709560000001", "2024-03-04_1709560000002"]
        );
        assert_eq!(query_sessions_by_prefix("2024-03", &conn).unwrap().len(), 4);
        assert_eq!(query_sessions(&conn).unwrap().len(), 4);
    }

    #[test]
    fn malformed_rows_are_normalized_on_read() {
        let conn = conn();
        conn.execute_batch(
            "
            INSERT INTO sessions (id, date) VALUES ('2024-03-04', 'not a date');
            INSERT INTO session_results VALUES ('2024-03-04', 'legacy', 0, 95, NULL);
            INSERT INTO session_results VALUES ('2024-03-04', 'broken', 1, 12, '{oops');
            INSERT INTO session_results VALUES ('2024-03-04', 'negative', 2, -8, '[-3, 4]');
            ",
        )
        .unwrap();
        let loaded = query_session_by_id("2024-03-04", &conn).unwrap().unwrap();
        assert_eq!(loaded.results.get("legacy").unwrap().passages, vec![95]);
        assert_eq!(loaded.results.get("broken").unwrap().passages, vec![12]);
        let negative = loaded.results.get("negative").unwrap();
        assert_eq!((negative.total, negative.passages.clone()), (0, vec![0, 4]));
        assert_eq!(loaded.date.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
    }
}
