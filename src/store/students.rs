/// Roster queries.
use anyhow::Result;
use chrono::{DateTime, Local};
use rusqlite::Connection;
use tracing::info;

use crate::error::InputError;
use crate::types::{Student, sort_roster};

/// All students, sorted by name.
pub fn query_students(conn: &Connection) -> Result<Vec<Student>> {
    let mut stmt = conn.prepare("SELECT id, name, created_at FROM students")?;
    let rows = stmt.query_map([], |row| {
        Ok(Student {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: DateTime::parse_from_rfc3339(&row.get::<_, String>(2)?)
                .map(|date| date.with_timezone(&Local))
                .unwrap_or_default(),
        })
    })?;
    let mut students = Vec::new();
    for row in rows {
        students.push(row?);
    }
    sort_roster(&mut students);
    Ok(students)
}

pub fn create_student(name: &str, now: DateTime<Local>, conn: &Connection) -> Result<Student> {
    if name.trim().is_empty() {
        return Err(InputError::EmptyName.into());
    }
    let student = Student::new(name, now);
    conn.execute(
        "INSERT INTO students (id, name, created_at) VALUES (?1, ?2, ?3)",
        (&student.id, &student.name, student.created_at.to_rfc3339()),
    )?;
    info!(student = %student.id, "student added");
    Ok(student)
}

/// Results that reference the student are left in place.
pub fn delete_student(id: &str, conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM students WHERE id = ?1", [id])?;
    Ok(())
}

pub fn upsert_students(students: &[Student], conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    for student in students {
        tx.execute(
            "INSERT INTO students (id, name, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            (&student.id, &student.name, student.created_at.to_rfc3339()),
        )?;
    }
    tx.commit()?;
    Ok(())
}
