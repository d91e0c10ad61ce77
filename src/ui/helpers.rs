/// `hh:mm:ss`.
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// `mm:ss`; minutes are not wrapped into hours.
pub fn format_clock(total_seconds: u64) -> String {
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

pub fn clamp_name(value: &str, width: usize) -> String {
    let value_len = value.chars().count();
    if value_len <= width {
        return format!("{value:<width$}", width = width);
    }
    let trimmed = value
        .chars()
        .take(width.saturating_sub(2))
        .collect::<String>();
    format!("{trimmed}..")
}

/// Horizontal bar scaled so that `max` fills `width` cells.
pub fn bar(value: u64, max: u64, width: usize) -> String {
    if max == 0 || value == 0 {
        return String::new();
    }
    let cells = ((value as u128 * width as u128).div_ceil(max as u128)) as usize;
    "█".repeat(cells.min(width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_keeps_minutes_past_the_hour() {
        assert_eq!(format_clock(95), "01:35");
        assert_eq!(format_clock(3725), "62:05");
        assert_eq!(format_duration(3725), "01:02:05");
    }

    #[test]
    fn bars_scale_to_width() {
        assert_eq!(bar(0, 10, 20), "");
        assert_eq!(bar(10, 10, 20).chars().count(), 20);
        assert_eq!(bar(1, 100, 20).chars().count(), 1);
        assert_eq!(clamp_name("Alexandra", 6), "Alex..");
    }
}
