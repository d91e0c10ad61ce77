use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span, Text},
};

use super::live::section_title;
use super::theme::Theme;
use crate::app::App;

pub fn build_students_text(app: &App) -> Text<'_> {
    let mut lines = Vec::new();
    lines.push(section_title(&format!("Roster ({})", app.students.len())));
    lines.push(Line::from(""));

    for (index, student) in app.students.iter().enumerate() {
        let selected = index == app.selected_student_index;
        lines.push(Line::from(vec![
            Span::styled(
                if selected { "> " } else { "  " },
                Style::default()
                    .fg(Theme::selection_marker())
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                student.name.as_str(),
                if selected {
                    Style::default()
                        .fg(Theme::highlight())
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Theme::text())
                },
            ),
            Span::styled(
                format!("  since {}", student.created_at.format("%Y-%m-%d")),
                Style::default().fg(Theme::dim()),
            ),
        ]));
    }

    Text::from(lines)
}
