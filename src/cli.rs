/// CLI argument parsing and command handling.
use anyhow::Result;
use chrono::Datelike;
use clap::{Parser, Subcommand};

use crate::app::App;
use crate::clock::{DateRange, month_range, week_range};
use crate::engine::Command as EngineCommand;
use crate::input::{parse_adjustment, parse_day, parse_duration, parse_month};
use crate::stats::{PeriodKind, build_report};
use crate::store::SessionStore;
use crate::sync::SyncStatus;
use crate::ui::helpers::{format_clock, format_duration};

#[derive(Parser)]
#[command(
    name = "speakr",
    version,
    about = "Speakr - A terminal-based classroom speaking-time tracker"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Student {
        #[command(subcommand)]
        command: StudentCommand,
    },
    Stats {
        #[command(subcommand)]
        command: StatsCommand,
    },
    /// List sessions whose id starts with the prefix (default: this month).
    History { prefix: Option<String> },
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum StudentCommand {
    Add { name: String },
    List,
    Remove { name: String },
}

#[derive(Subcommand, Debug)]
pub enum StatsCommand {
    Day { date: Option<String> },
    /// The Monday-to-Sunday week containing the date.
    Week { date: Option<String> },
    /// A calendar month as YYYY-MM.
    Month { month: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Create a supplementary session on the given day (default: today).
    New { date: Option<String> },
    /// Print every result of a stored session.
    Show { session: String },
    /// Overwrite a student's total in a session.
    Set {
        session: String,
        student: String,
        total: String,
    },
    /// Add or remove time in today's session.
    Adjust {
        student: String,
        #[arg(allow_hyphen_values = true)]
        delta: String,
    },
}

/// Execute a one-shot CLI command against the loaded state.
pub fn run(command: Command, app: &mut App) -> Result<()> {
    match command {
        Command::Student {
            command: StudentCommand::Add { name },
        } => handle_student_add(name, app)?,
        Command::Student {
            command: StudentCommand::List,
        } => handle_student_list(app),
        Command::Student {
            command: StudentCommand::Remove { name },
        } => handle_student_remove(&name, app)?,
        Command::Stats { command } => handle_stats(command, app)?,
        Command::History { prefix } => handle_history(prefix, app)?,
        Command::Session {
            command: SessionCommand::Show { session },
        } => handle_session_show(&session, app)?,
        Command::Session {
            command: SessionCommand::New { date },
        } => {
            let day = match date {
                Some(value) => parse_day(&value)?,
                None => app.today(),
            };
            app.dispatch(EngineCommand::NewSession(day))?;
            save(app);
            if let Some(status) = &app.status {
                println!("{status}");
            }
        }
        Command::Session {
            command:
                SessionCommand::Set {
                    session,
                    student,
                    total,
                },
        } => {
            let seconds = parse_duration(&total)?;
            let student_id = app.find_student(&student)?.id.clone();
            app.dispatch(EngineCommand::SetTotal {
                session_id: session.clone(),
                student_id,
                seconds,
            })?;
            save(app);
            println!("Set {student} to {} in {session}.", format_clock(seconds));
        }
        Command::Session {
            command: SessionCommand::Adjust { student, delta },
        } => {
            let delta = parse_adjustment(&delta)?;
            let student_id = app.find_student(&student)?.id.clone();
            app.dispatch(EngineCommand::Adjust(student_id.clone(), delta))?;
            save(app);
            let total = app
                .current_result(&student_id)
                .map(|result| result.total)
                .unwrap_or(0);
            println!("{student} now at {} today.", format_clock(total));
        }
    }
    Ok(())
}

fn save(app: &mut App) {
    app.persist();
    if app.sync_status == SyncStatus::Unsynced {
        println!("Warning: changes could not be saved.");
    }
}

fn handle_student_add(name: String, app: &mut App) -> Result<()> {
    if app
        .students
        .iter()
        .any(|student| student.name.eq_ignore_ascii_case(name.trim()))
    {
        println!("Student '{name}' already exists.");
        return Ok(());
    }
    app.dispatch(EngineCommand::AddStudent(name.clone()))?;
    save(app);
    println!("Added '{}'.", name.trim());
    Ok(())
}

fn handle_student_list(app: &App) {
    if app.students.is_empty() {
        println!("No students.");
        return;
    }
    for student in &app.students {
        println!("{}  {}", student.id, student.name);
    }
}

fn handle_student_remove(name: &str, app: &mut App) -> Result<()> {
    let id = app.find_student(name)?.id.clone();
    app.dispatch(EngineCommand::DeleteStudent(id))?;
    save(app);
    println!("Removed '{name}'.");
    Ok(())
}

fn handle_stats(command: StatsCommand, app: &App) -> Result<()> {
    let today = app.today();
    let (kind, range) = match command {
        StatsCommand::Day { date } => {
            let day = date.as_deref().map(parse_day).transpose()?.unwrap_or(today);
            (PeriodKind::Day, DateRange::single(day))
        }
        StatsCommand::Week { date } => {
            let day = date.as_deref().map(parse_day).transpose()?.unwrap_or(today);
            (PeriodKind::Week, week_range(day))
        }
        StatsCommand::Month { month } => {
            let (year, month) = match month {
                Some(value) => parse_month(&value)?,
                None => (today.year(), today.month()),
            };
            let Some(range) = month_range(year, month) else {
                println!("Month {year}-{month:02} is out of range.");
                return Ok(());
            };
            (PeriodKind::Month, range)
        }
    };

    let report = build_report(kind, range, app.ledger.sessions(), &app.students);
    println!("{} {}", report.kind.label(), report.range.label());
    println!("  Total time            {}", format_duration(report.totals.total_time));
    println!("  Active students       {}", report.totals.active_students.len());
    println!("  Interventions         {}", report.totals.sessions_count);
    println!(
        "  Avg per student       {}",
        format_clock(report.averages.per_active_student)
    );
    println!(
        "  Avg per intervention  {}",
        format_clock(report.averages.per_intervention)
    );
    println!("  Avg per day           {}", format_clock(report.averages.per_day));
    if !report.ranking.is_empty() {
        println!();
        for (index, entry) in report.ranking.iter().enumerate() {
            println!(
                "  {:>2}. {:<20} {}  ({} sessions)",
                index + 1,
                entry.label,
                format_clock(entry.seconds),
                entry.interventions
            );
        }
    }
    Ok(())
}

fn handle_history(prefix: Option<String>, app: &App) -> Result<()> {
    let prefix = prefix.unwrap_or_else(|| app.today().format("%Y-%m").to_string());
    let sessions = app.store().sessions_by_prefix(&prefix)?;
    if sessions.is_empty() {
        println!("No sessions matching '{prefix}'.");
        return Ok(());
    }
    for session in sessions {
        println!("{}  {}", session.id, format_duration(session.recorded_seconds()));
        for (student_id, result) in session.results.iter() {
            if !result.is_active() {
                continue;
            }
            println!(
                "  {:<20} {}",
                app.student_name(student_id),
                format_clock(result.total)
            );
        }
    }
    Ok(())
}

fn handle_session_show(id: &str, app: &App) -> Result<()> {
    let Some(session) = app.store().get_session(id)? else {
        println!("Session '{id}' not found.");
        return Ok(());
    };
    println!(
        "{}  {}",
        session.id,
        session.date.format("%Y-%m-%d %H:%M")
    );
    for (student_id, result) in session.results.iter() {
        let passages = result
            .passages
            .iter()
            .map(|p| format_clock(*p))
            .collect::<Vec<_>>()
            .join(" + ");
        println!(
            "  {:<20} {}  [{passages}]",
            app.student_name(student_id),
            format_clock(result.total)
        );
    }
    Ok(())
}
