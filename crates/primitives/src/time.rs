use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A UNIX timestamp in seconds.
pub type Timestamp = u64;

/// Get the current UNIX timestamp in seconds.
pub fn current_timestamp_seconds() -> Timestamp {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}

/// Returns how long to wait until the wall clock reaches `timestamp`, or `None` if it already did.
pub fn duration_until(timestamp: Timestamp) -> Option<Duration> {
    let now = current_timestamp_seconds();
    (timestamp > now).then(|| Duration::from_secs(timestamp - now))
}

/// Sleep until the wall clock reaches `timestamp`. Returns immediately if it is in the past.
pub async fn sleep_until_timestamp(timestamp: Timestamp) {
    if let Some(wait) = duration_until(timestamp) {
        tokio::time::sleep(wait).await;
    }
}
