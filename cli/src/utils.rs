pub fn truncate_string(s: &str, max_length: usize) -> String {
    if s.len() <= max_length {
        s.to_string()
    } else {
        format!("{}...", &s[..max_length.saturating_sub(3)])
    }
}

pub fn format_priority(value: f64) -> String {
    format!("{:.3}", value)
}

pub fn priority_color(value: f64) -> &'static str {
    if value > 1.0 {
        "red"
    } else if value >= 0.8 {
        "yellow"
    } else if value >= 0.3 {
        "blue"
    } else {
        "green"
    }
}