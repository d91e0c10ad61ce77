use ratatui::style::Color;

/// Unified color theme for the application
pub struct Theme;

impl Theme {
    /// Primary branding color
    pub fn primary() -> Color {
        Color::Magenta
    }

    /// Secondary/border color
    pub fn secondary() -> Color {
        Color::Cyan
    }

    /// Improvement against the previous period
    pub fn better() -> Color {
        Color::Green
    }

    /// Running timer
    pub fn active() -> Color {
        Color::LightGreen
    }

    /// Regression against the previous period, unsynced status
    pub fn warn() -> Color {
        Color::Yellow
    }

    /// Selection/highlight
    pub fn highlight() -> Color {
        Color::Cyan
    }

    /// Selection marker/arrow
    pub fn selection_marker() -> Color {
        Color::Green
    }

    /// Dimmed/inactive text
    pub fn dim() -> Color {
        Color::DarkGray
    }

    /// Normal text
    pub fn text() -> Color {
        Color::White
    }

    /// Accent for numbers/counts
    pub fn accent() -> Color {
        Color::LightBlue
    }
}
