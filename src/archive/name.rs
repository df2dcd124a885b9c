use chrono::Utc;

pub const EXTENSION: &str = ".tar.gz";

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn file_name(millis: i64) -> String {
    format!("{millis}{EXTENSION}")
}

pub fn parse_timestamp(name: &str) -> Option<i64> {
    let stem = name.strip_suffix(EXTENSION)?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    stem.parse().ok()
}
