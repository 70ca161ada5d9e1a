use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Split a second count into (hours, minutes, seconds).
pub fn split_seconds(total: u64) -> (u64, u64, u64) {
    (total / 3600, (total / 60) % 60, total % 60)
}

/// Format seconds as `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_hms(total: u64) -> String {
    let (hours, minutes, seconds) = split_seconds(total);
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Fill the `%HOURS%`, `%MINUTES%` and `%SECONDS%` placeholders of a template.
pub fn fill_timer_template(template: &str, total: u64) -> String {
    let (hours, minutes, seconds) = split_seconds(total);
    template
        .replace("%HOURS%", &format!("{:02}", hours))
        .replace("%MINUTES%", &format!("{:02}", minutes))
        .replace("%SECONDS%", &format!("{:02}", seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(59), "00:00:59");
        assert_eq!(format_hms(3661), "01:01:01");
        assert_eq!(format_hms(90_000), "25:00:00");
    }

    #[test]
    fn test_fill_timer_template() {
        assert_eq!(
            fill_timer_template("§7%HOURS%:%MINUTES%:%SECONDS%", 754),
            "§700:12:34"
        );
    }
}
