use chrono::Utc;

pub fn unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}
