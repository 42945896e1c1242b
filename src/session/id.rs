use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of session identifiers.
pub trait SessionIdGenerator: Send + Sync {
    fn next_session_id(&self) -> String;
}

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RANDOM_SUFFIX_LEN: usize = 9;

/// `session_<unix millis>_<9 random base36 chars>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampSessionIds;

impl SessionIdGenerator for TimestampSessionIds {
    fn next_session_id(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis());
        let suffix: String = (0..RANDOM_SUFFIX_LEN)
            .map(|_| char::from(BASE36[fastrand::usize(..BASE36.len())]))
            .collect();
        format!("session_{millis}_{suffix}")
    }
}

/// Deterministic `<prefix>_<n>` identifiers.
#[derive(Debug)]
pub struct SequentialSessionIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialSessionIds {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(1),
        }
    }
}

impl SessionIdGenerator for SequentialSessionIds {
    fn next_session_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}_{n}", self.prefix)
    }
}

/// Per-exchange ids for log correlation.
pub(crate) struct ExchangeIdGenerator {
    seed: u128,
    counter: AtomicU64,
}

impl ExchangeIdGenerator {
    #[must_use]
    pub(crate) fn new() -> Self {
        let seed_hi = u128::from(fastrand::u64(..));
        let seed_lo = u128::from(fastrand::u64(..));
        Self {
            seed: (seed_hi << 64) | seed_lo,
            counter: AtomicU64::new(1),
        }
    }

    pub(crate) fn next_exchange_id(&self) -> uuid::Uuid {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        uuid::Uuid::from_u128(self.seed ^ u128::from(seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_id_shape() {
        let id = TimestampSessionIds.next_session_id();
        let parts: Vec<&str> = id.splitn(3, '_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "session");
        assert!(parts[1].parse::<u128>().is_ok());
        assert_eq!(parts[2].len(), RANDOM_SUFFIX_LEN);
        assert!(parts[2]
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));
    }

    #[test]
    fn test_timestamp_ids_differ() {
        let a = TimestampSessionIds.next_session_id();
        let b = TimestampSessionIds.next_session_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialSessionIds::new("s");
        assert_eq!(ids.next_session_id(), "s_1");
        assert_eq!(ids.next_session_id(), "s_2");
    }

    #[test]
    fn test_exchange_ids_unique() {
        let ids = ExchangeIdGenerator::new();
        assert_ne!(ids.next_exchange_id(), ids.next_exchange_id());
    }
}
