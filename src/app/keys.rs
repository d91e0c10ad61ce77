use crossterm::event::KeyCode;

use crate::engine::Command;
use crate::input::{parse_adjustment, parse_day, parse_duration};
use crate::stats::PeriodKind;

use super::{App, AppEvent, AppView, FocusMode, Popup, PopupKind, TABS};

impl App {
    pub(super) fn handle_key(&mut self, key: KeyCode) {
        if self.popup.is_some() {
            self.handle_popup_key(key);
            return;
        }

        match key {
            KeyCode::Char('q') => self.shutdown(),
            KeyCode::Char('l') => self.navigate_to(AppView::Live),
            KeyCode::Char('t') => self.navigate_to(AppView::Stats),
            KeyCode::Char('h') => self.navigate_to(AppView::History),
            KeyCode::Char('s') => self.navigate_to(AppView::Students),
            KeyCode::Char('?') => {
                if self.view == AppView::Help {
                    self.go_back();
                } else {
                    self.navigate_to(AppView::Help);
                }
            }
            KeyCode::Tab => {
                if self.focus_mode == FocusMode::TabBar {
                    self.focus_mode = FocusMode::Content;
                } else {
                    self.focus_mode = FocusMode::TabBar;
                }
            }
            KeyCode::Left => {
                if self.focus_mode == FocusMode::TabBar {
                    self.navigate_tab_left();
                } else {
                    self.shift_view(-1);
                }
            }
            KeyCode::Right => {
                if self.focus_mode == FocusMode::TabBar {
                    self.navigate_tab_right();
                } else {
                    self.shift_view(1);
                }
            }
            KeyCode::Up => {
                if self.focus_mode == FocusMode::Content {
                    self.move_selection_up();
                }
            }
            KeyCode::Down => {
                if self.focus_mode == FocusMode::Content {
                    self.move_selection_down();
                }
            }
            KeyCode::Enter => {
                if self.focus_mode == FocusMode::TabBar {
                    self.activate_selected_tab();
                } else if self.view == AppView::History && self.selected_session().is_some() {
                    self.selected_result_index = 0;
                    self.navigate_to(AppView::SessionDetail);
                }
            }
            KeyCode::Esc => self.go_back(),
            _ => match self.view {
                AppView::Live => self.handle_live_key(key),
                AppView::Stats => self.handle_stats_key(key),
                AppView::History => self.handle_history_key(key),
                AppView::SessionDetail => self.handle_session_detail_key(key),
                AppView::Students => self.handle_students_key(key),
                AppView::Help => {}
            },
        }
    }

    fn handle_live_key(&mut self, key: KeyCode) {
        let Some(student_id) = self.selected_student().map(|s| s.id.clone()) else {
            if key == KeyCode::Char('n') {
                self.popup = Some(Popup::new(PopupKind::NewStudent, "New student"));
            }
            return;
        };
        let command = match key {
            KeyCode::Char(' ') => Command::Toggle(student_id),
            KeyCode::Char('p') => Command::StepPassage(student_id),
            KeyCode::Char('r') => Command::Reset(student_id),
            KeyCode::Char('d') => {
                let Some(result) = self.current_result(&student_id) else {
                    return;
                };
                if result.passages.is_empty() {
                    return;
                }
                Command::RemovePassage(student_id, result.passages.len() - 1)
            }
            KeyCode::Char('a') => {
                let title = format!("Adjust {}", self.student_name(&student_id));
                self.popup = Some(Popup::new(PopupKind::Adjust { student_id }, title));
                return;
            }
            KeyCode::Char('x') => {
                self.apply(Command::StopAll);
                self.status = Some("All timers stopped.".to_string());
                return;
            }
            KeyCode::Char('n') => {
                self.popup = Some(Popup::new(PopupKind::NewStudent, "New student"));
                return;
            }
            _ => return,
        };
        self.apply(command);
    }

    fn handle_stats_key(&mut self, key: KeyCode) {
        let today = self.today();
        match key {
            KeyCode::Char('d') => self.period.set_kind(PeriodKind::Day),
            KeyCode::Char('w') => self.period.set_kind(PeriodKind::Week),
            KeyCode::Char('m') => self.period.set_kind(PeriodKind::Month),
            KeyCode::Char('[') => self.period.shift_month(-1, today),
            KeyCode::Char(']') => self.period.shift_month(1, today),
            KeyCode::Char('0') => self.period = crate::stats::PeriodCursor::new(self.period.kind, today),
            _ => {}
        }
    }

    fn handle_history_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('n') => {
                let day = self
                    .selected_session()
                    .map(|session| session.day_id().to_string())
                    .unwrap_or_else(|| self.today_id());
                self.popup =
                    Some(Popup::new(PopupKind::NewSession, "New session").with_input(day));
            }
            KeyCode::Char('[') => self.shift_history_month(-1),
            KeyCode::Char(']') => self.shift_history_month(1),
            _ => {}
        }
    }

    fn handle_session_detail_key(&mut self, key: KeyCode) {
        let Some(session) = self.selected_session() else {
            return;
        };
        let session_id = session.id.clone();
        let student_id = session
            .results
            .iter()
            .nth(self.selected_result_index)
            .map(|(id, _)| id.clone());
        match (key, student_id) {
            (KeyCode::Char('e'), Some(student_id)) => {
                let title = format!("Total of {} in {session_id}", self.student_name(&student_id));
                self.popup = Some(Popup::new(
                    PopupKind::SetTotal {
                        session_id,
                        student_id,
                    },
                    title,
                ));
            }
            (KeyCode::Char('x'), Some(student_id)) => {
                self.apply(Command::RemoveFromSession {
                    session_id,
                    student_id,
                });
                self.clamp_result_index();
            }
            (KeyCode::Char('a'), _) => self.apply(Command::AddRosterToSession(session_id)),
            _ => {}
        }
    }

    fn handle_students_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('n') => {
                self.popup = Some(Popup::new(PopupKind::NewStudent, "New student"));
            }
            KeyCode::Char('d') => {
                let Some(student) = self.selected_student() else {
                    self.status = Some("No student selected.".to_string());
                    return;
                };
                let title = format!("Delete {}?", student.name);
                let student_id = student.id.clone();
                self.popup = Some(Popup::new(PopupKind::ConfirmDelete { student_id }, title));
            }
            _ => {}
        }
    }

    fn handle_popup_key(&mut self, key: KeyCode) {
        let Some(popup) = self.popup.as_mut() else {
            return;
        };
        if let PopupKind::ConfirmDelete { student_id } = &popup.kind {
            match key {
                KeyCode::Char('y') | KeyCode::Enter => {
                    let command = Command::DeleteStudent(student_id.clone());
                    self.popup = None;
                    self.apply(command);
                    self.status = Some("Student deleted.".to_string());
                }
                KeyCode::Esc | KeyCode::Char('n') => self.popup = None,
                _ => {}
            }
            return;
        }
        match key {
            KeyCode::Esc => {
                self.popup = None;
                self.clear_status();
            }
            KeyCode::Enter => self.apply_popup(),
            KeyCode::Backspace | KeyCode::Delete => {
                popup.input.pop();
            }
            KeyCode::Char(ch) => {
                if !ch.is_control() {
                    popup.input.push(ch);
                }
            }
            _ => {}
        }
    }

    fn apply_popup(&mut self) {
        let Some(popup) = self.popup.take() else {
            return;
        };
        let text = popup.input.trim();
        let command = match &popup.kind {
            PopupKind::NewStudent => Ok(Command::AddStudent(text.to_string())),
            PopupKind::Adjust { student_id } => {
                parse_adjustment(text).map(|delta| Command::Adjust(student_id.clone(), delta))
            }
            PopupKind::SetTotal {
                session_id,
                student_id,
            } => parse_duration(text).map(|seconds| Command::SetTotal {
                session_id: session_id.clone(),
                student_id: student_id.clone(),
                seconds,
            }),
            PopupKind::NewSession => parse_day(text).map(Command::NewSession),
            PopupKind::ConfirmDelete { .. } => return,
        };
        let command = match command {
            Ok(command) => command,
            Err(err) => {
                self.status = Some(err.to_string());
                self.popup = Some(popup);
                return;
            }
        };
        if let Err(err) = self.dispatch(command) {
            self.status = Some(err.to_string());
            self.popup = Some(popup);
            return;
        }
        match popup.kind {
            PopupKind::NewStudent => self.status = Some("Student added.".to_string()),
            PopupKind::NewSession => {}
            _ => self.status = Some("Saved.".to_string()),
        }
    }

    fn apply(&mut self, command: Command) {
        self.update(AppEvent::Command(command));
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    fn shift_view(&mut self, delta: i32) {
        let today = self.today();
        match self.view {
            AppView::Stats => self.period.shift(delta, today),
            AppView::History => self.shift_history_month(delta),
            _ => {}
        }
    }

    fn navigate_to(&mut self, view: AppView) {
        if self.view != view {
            self.view_history.push(self.view.clone());
            self.view = view;
            if let Some(index) = TABS.iter().position(|v| {
                *v == self.view || (self.view == AppView::SessionDetail && *v == AppView::History)
            }) {
                self.selected_tab_index = index;
            }
        }
    }

    fn go_back(&mut self) {
        if let Some(prev_view) = self.view_history.pop() {
            self.view = prev_view;
        }
        self.clear_status();
    }

    fn navigate_tab_left(&mut self) {
        if self.selected_tab_index == 0 {
            self.selected_tab_index = TABS.len() - 1;
        } else {
            self.selected_tab_index -= 1;
        }
    }

    fn navigate_tab_right(&mut self) {
        self.selected_tab_index = (self.selected_tab_index + 1) % TABS.len();
    }

    fn activate_selected_tab(&mut self) {
        let target_view = TABS[self.selected_tab_index].clone();
        self.navigate_to(target_view);
        self.focus_mode = FocusMode::Content;
    }

    fn list_len(&self) -> usize {
        match self.view {
            AppView::Live | AppView::Students => self.students.len(),
            AppView::History => self.history_sessions().len(),
            AppView::SessionDetail => self.selected_session().map_or(0, |s| s.results.len()),
            AppView::Stats | AppView::Help => 0,
        }
    }

    fn selection_mut(&mut self) -> Option<&mut usize> {
        match self.view {
            AppView::Live | AppView::Students => Some(&mut self.selected_student_index),
            AppView::History => Some(&mut self.selected_session_index),
            AppView::SessionDetail => Some(&mut self.selected_result_index),
            AppView::Stats | AppView::Help => None,
        }
    }

    fn move_selection_up(&mut self) {
        let len = self.list_len();
        if len == 0 {
            return;
        }
        if let Some(index) = self.selection_mut() {
            *index = if *index == 0 { len - 1 } else { *index - 1 };
        }
    }

    fn move_selection_down(&mut self) {
        let len = self.list_len();
        if len == 0 {
            return;
        }
        if let Some(index) = self.selection_mut() {
            *index = (*index + 1) % len;
        }
    }

    fn clamp_result_index(&mut self) {
        let len = self.list_len();
        if self.selected_result_index >= len {
            self.selected_result_index = len.saturating_sub(1);
        }
    }
}
