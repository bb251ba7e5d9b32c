use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime, UtcOffset};

/// A UTC instant, serialized as RFC 3339 text.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Timestamp(#[serde(with = "time::serde::rfc3339")] pub OffsetDateTime);

impl Timestamp {
    pub fn now_utc() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn from(dt: OffsetDateTime) -> Self {
        Self(dt.to_offset(UtcOffset::UTC))
    }

    /// Returns the inner UTC `OffsetDateTime` without consuming the wrapper.
    pub fn as_inner(&self) -> OffsetDateTime {
        self.0
    }

    /// Consumes the wrapper and returns the inner UTC `OffsetDateTime`.
    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    /// Returns the instant shifted forward by `delta` (negative values move it back).
    pub fn plus(&self, delta: Duration) -> Self {
        Self(self.0.saturating_add(delta))
    }

    /// Returns how long ago `self` was, measured from `now` (negative when in the future).
    pub fn elapsed_since(&self, now: Timestamp) -> Duration {
        now.0 - self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::UtcOffset;

    #[test]
    fn given_now_utc_when_called_should_return_utc_offset() {
        let result = Timestamp::now_utc();
        assert_eq!(result.as_inner().offset(), UtcOffset::UTC);
    }

    #[test]
    fn given_from_with_non_utc_offset_when_called_should_store_same_instant_in_utc() {
        let offset = UtcOffset::from_hms(-5, 0, 0).expect("valid offset");
        let dt = OffsetDateTime::now_utc().to_offset(offset);
        let result = Timestamp::from(dt);
        assert_eq!(result.as_inner().offset(), UtcOffset::UTC);
        assert_eq!(result.as_inner().unix_timestamp(), dt.unix_timestamp());
    }

    #[test]
    fn given_plus_when_called_should_shift_instant() {
        let start = Timestamp::now_utc();
        let later = start.plus(Duration::seconds(45));
        assert_eq!(start.elapsed_since(later), Duration::seconds(45));
    }

    #[test]
    fn given_timestamp_when_serialized_should_use_rfc3339_text() {
        let ts = Timestamp::from(time::macros::datetime!(2024-03-01 12:30:00 UTC));
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2024-03-01T12:30:00Z\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
