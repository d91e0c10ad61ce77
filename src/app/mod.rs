mod keys;
mod popup;
mod state;

use crossterm::event::KeyCode;

use crate::engine::Command;

pub use popup::{Popup, PopupKind};
pub use state::App;

/// Possible input events the app reacts to.
pub enum AppEvent {
    Tick,
    KeyPress(KeyCode),
    Command(Command),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppView {
    Live,
    Stats,
    History,
    SessionDetail,
    Students,
    Help,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusMode {
    TabBar,
    Content,
}

/// Views reachable from the tab bar, in display order.
pub const TABS: [AppView; 5] = [
    AppView::Live,
    AppView::Stats,
    AppView::History,
    AppView::Students,
    AppView::Help,
];

impl AppView {
    pub fn title(&self) -> &'static str {
        match self {
            AppView::Live => "Live",
            AppView::Stats => "Stats",
            AppView::History | AppView::SessionDetail => "History",
            AppView::Students => "Students",
            AppView::Help => "Help",
        }
    }
}
