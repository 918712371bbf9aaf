use colored::Colorize;

use crate::error::AuthError;

pub fn print_error(err: &AuthError, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&err.to_json()).unwrap_or_default());
    } else {
        eprintln!("{}", err);
    }
}

/// `label: yes/no` line, colored when writing to a terminal.
pub fn presence_line(label: &str, present: bool, is_tty: bool) -> String {
    let value = match (present, is_tty) {
        (true, true) => "present".green().to_string(),
        (false, true) => "missing".red().to_string(),
        (true, false) => "present".to_string(),
        (false, false) => "missing".to_string(),
    };
    format!("{label}: {value}")
}

/// Human-readable token expiry relative to `now_ms`.
pub fn format_expiry(expiry_date: Option<i64>, now_ms: i64) -> String {
    let Some(expiry) = expiry_date else {
        return "never".to_string();
    };
    let when = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(expiry)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| expiry.to_string());
    if expiry <= now_ms {
        return format!("{when} (expired)");
    }
    let mins = (expiry - now_ms) / 60_000;
    if mins >= 60 {
        format!("{when} (in {}h {}m)", mins / 60, mins % 60)
    } else {
        format!("{when} (in {mins}m)")
    }
}
