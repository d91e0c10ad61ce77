/// Database migrations and schema management.
use anyhow::Result;
use rusqlite::Connection;

/// Creates the schema if it doesn't exist yet and upgrades older layouts.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS students (
            id          TEXT    PRIMARY KEY,
            name        TEXT    NOT NULL,
            created_at  TEXT    NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id          TEXT    PRIMARY KEY,
            date        TEXT    NOT NULL
        );

        CREATE TABLE IF NOT EXISTS session_results (
            session_id  TEXT    NOT NULL,
            student_id  TEXT    NOT NULL,
            position    INTEGER NOT NULL,
            total       INTEGER NOT NULL,
            passages    TEXT,
            PRIMARY KEY (session_id, student_id),
            FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
        );
        ",
    )?;
    migrate_results_add_passages(conn)?;
    Ok(())
}

/// Early databases stored only a total per student.
fn migrate_results_add_passages(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare("PRAGMA table_info(session_results)")?;
    let rows = stmt.query_map([], |row| {
        let name: String = row.get(1)?;
        Ok(name)
    })?;
    for row in rows {
        if row? == "passages" {
            return Ok(());
        }
    }

    conn.execute("ALTER TABLE session_results ADD COLUMN passages TEXT", [])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(conn: &Connection) -> Vec<String> {
        let mut stmt = conn.prepare("PRAGMA table_info(session_results)").unwrap();
        stmt.query_map([], |row| row.get(1))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn fresh_database_has_passages_column() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        assert!(columns(&conn).contains(&"passages".to_string()));
        // Running twice is harmless.
        run_migrations(&conn).unwrap();
    }

    #[test]
    fn total_only_schema_is_upgraded() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE session_results (
                session_id  TEXT    NOT NULL,
                student_id  TEXT    NOT NULL,
                position    INTEGER NOT NULL,
                total       INTEGER NOT NULL,
                PRIMARY KEY (session_id, student_id)
            );
            ",
        )
        .unwrap();
        run_migrations(&conn).unwrap();
        assert!(columns(&conn).contains(&"passages".to_string()));
    }
}
