pub fn format_duration(duration: chrono::Duration) -> String {
    let hours = duration.num_hours();
    let minutes = duration.num_minutes() % 60;
    let seconds = duration.num_seconds() % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// `MM:SS` for countdowns.
pub fn format_countdown(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Width available for a progress bar: a third of the terminal, within 10..=40.
pub fn bar_width() -> usize {
    term_size::dimensions()
        .map(|(w, _)| w / 3)
        .unwrap_or(30)
        .clamp(10, 40)
}

pub fn progress_bar(percent: u8, width: usize) -> String {
    let percent = percent.min(100) as usize;
    let filled = percent * width / 100;
    format!("[{}{}]", "█".repeat(filled), "·".repeat(width - filled))
}
