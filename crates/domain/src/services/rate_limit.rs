//! Rate-Limit / Circuit Breaker state machine (C3, §4.3).

use chrono::{DateTime, Duration, Utc};

use crate::errors::ProviderError;
use crate::models::rate_limit::RateLimitRecord;

const FAILURE_THRESHOLD: i64 = 3;
const CIRCUIT_OPEN_DURATION_MINS: i64 = 5;

/// `ShouldFetch(now)` (§4.3).
pub fn should_fetch(record: &RateLimitRecord, now: DateTime<Utc>) -> bool {
    if let Some(open_until) = record.circuit_open_until {
        if now < open_until {
            return false;
        }
    }
    if let (Some(remaining), Some(reset_at)) = (record.remaining, record.reset_at) {
        if remaining <= 0 && now < reset_at {
            return false;
        }
    }
    true
}

/// Additionally consults the platform's declared minimum fetch interval
/// against the account's last successful fetch (§4.3, §4.5 step 2).
pub fn is_minimum_interval_satisfied(
    last_fetched_at: Option<DateTime<Utc>>,
    minimum_interval_days: Option<i64>,
    now: DateTime<Utc>,
) -> bool {
    match (last_fetched_at, minimum_interval_days) {
        (Some(last), Some(days)) => now - last >= Duration::days(days),
        _ => true,
    }
}

/// Update on a successful fetch: replace quota fields, clear all
/// failure/circuit state (§4.3).
pub fn record_success(
    record: &mut RateLimitRecord,
    remaining: Option<i64>,
    reset_at: Option<DateTime<Utc>>,
) {
    record.remaining = remaining;
    record.reset_at = reset_at;
    record.consecutive_failures = 0;
    record.last_failure_at = None;
    record.circuit_open_until = None;
}

/// Update on a failed fetch (§4.3). `rate_limited` failures set the quota
/// fields directly from the provider's reported retry-after; three
/// consecutive failures of any kind opens the circuit.
pub fn record_failure(record: &mut RateLimitRecord, error: &ProviderError, now: DateTime<Utc>) {
    record.consecutive_failures += 1;
    record.last_failure_at = Some(now);

    if let ProviderError::RateLimited { retry_after_secs } = error {
        record.remaining = Some(0);
        record.reset_at = Some(now + Duration::seconds(retry_after_secs.unwrap_or(0)));
    }

    if record.consecutive_failures >= FAILURE_THRESHOLD {
        record.circuit_open_until = Some(now + Duration::minutes(CIRCUIT_OPEN_DURATION_MINS));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn fresh() -> RateLimitRecord {
        RateLimitRecord::new(Uuid::new_v4())
    }

    #[test]
    fn allows_fetch_with_no_prior_state() {
        assert!(should_fetch(&fresh(), Utc::now()));
    }

    #[test]
    fn blocks_while_circuit_open() {
        let mut record = fresh();
        let now = Utc::now();
        record.circuit_open_until = Some(now + Duration::minutes(1));
        assert!(!should_fetch(&record, now));
        assert!(should_fetch(&record, now + Duration::minutes(2)));
    }

    #[test]
    fn blocks_on_exhausted_quota_before_reset() {
        let mut record = fresh();
        let now = Utc::now();
        record.remaining = Some(0);
        record.reset_at = Some(now + Duration::minutes(10));
        assert!(!should_fetch(&record, now));
        assert!(should_fetch(&record, now + Duration::minutes(11)));
    }

    #[test]
    fn opens_circuit_after_three_failures() {
        let mut record = fresh();
        let now = Utc::now();
        for _ in 0..2 {
            record_failure(&mut record, &ProviderError::NetworkError("timeout".into()), now);
            assert!(record.circuit_open_until.is_none());
        }
        record_failure(&mut record, &ProviderError::NetworkError("timeout".into()), now);
        assert_eq!(record.consecutive_failures, 3);
        assert!(record.circuit_open_until.is_some());
        assert!(!should_fetch(&record, now));
    }

    #[test]
    fn success_clears_failure_state() {
        let mut record = fresh();
        let now = Utc::now();
        record_failure(&mut record, &ProviderError::NetworkError("x".into()), now);
        record_success(&mut record, Some(100), Some(now + Duration::hours(1)));
        assert_eq!(record.consecutive_failures, 0);
        assert!(record.circuit_open_until.is_none());
        assert_eq!(record.remaining, Some(100));
    }

    #[test]
    fn rate_limited_failure_sets_reset_at_from_retry_after() {
        let mut record = fresh();
        let now = Utc::now();
        record_failure(
            &mut record,
            &ProviderError::RateLimited {
                retry_after_secs: Some(120),
            },
            now,
        );
        assert_eq!(record.remaining, Some(0));
        assert_eq!(record.reset_at, Some(now + Duration::seconds(120)));
    }

    #[test]
    fn minimum_interval_blocks_before_due() {
        let now = Utc::now();
        assert!(!is_minimum_interval_satisfied(
            Some(now - Duration::hours(1)),
            Some(1),
            now
        ));
        assert!(is_minimum_interval_satisfied(
            Some(now - Duration::days(2)),
            Some(1),
            now
        ));
        assert!(is_minimum_interval_satisfied(None, Some(1), now));
    }
}
