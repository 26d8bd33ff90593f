pub const BACKEND_ENV: &str = "AUDIOWATCH_BACKEND";
pub const TRACE_EVENTS_ENV: &str = "AUDIOWATCH_TRACE_EVENTS";

pub fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| flag_value(&v))
        .unwrap_or(false)
}

pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn flag_value(v: &str) -> bool {
    let s = v.trim().to_ascii_lowercase();
    s == "1" || s == "true" || s == "yes" || s == "on"
}

#[cfg(test)]
mod tests {
    use super::flag_value;

    #[test]
    fn flag_values() {
        assert!(flag_value("1"));
        assert!(flag_value(" Yes "));
        assert!(flag_value("ON"));
        assert!(!flag_value("0"));
        assert!(!flag_value("off"));
        assert!(!flag_value(""));
    }
}
