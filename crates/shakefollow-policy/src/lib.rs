//! Per-service query-time schedule and retry policy.
//!
//! A [`Policy`] is a small pure-function object: given elapsed time since
//! origin and a retry count, it answers scheduling questions. No IO, no
//! mutable state — mirrors the deterministic, side-effect-free watermark
//! idiom used elsewhere in this workspace for freshness checks.

mod registry;

pub use registry::PolicyRegistry;

use chrono::{DateTime, Utc};

/// Inputs a [`Policy`] needs to answer a scheduling question about one row.
#[derive(Debug, Clone, Copy)]
pub struct PolicyMeta {
    pub origin_time: DateTime<Utc>,
    pub now: DateTime<Utc>,
    pub retry_count: i32,
}

impl PolicyMeta {
    /// Elapsed time since origin, in minutes, as a fractional value so
    /// drift-tolerance comparisons are not rounded away.
    pub fn elapsed_minutes(&self) -> f64 {
        (self.now - self.origin_time).num_milliseconds() as f64 / 60_000.0
    }
}

/// One service's update cadence.
///
/// Implementations must be stateless and side-effect free: every method is a
/// pure function of its inputs, so the registry can hold them as
/// `Arc<dyn Policy>` shared across every worker without synchronization.
pub trait Policy: Send + Sync {
    fn service_name(&self) -> &str;

    /// `true` iff elapsed minutes lies within `drift_tolerance` of any
    /// scheduled delay and does not exceed `max_delay + grace`.
    fn should_query(&self, meta: &PolicyMeta) -> (bool, String);

    /// Smallest scheduled delay strictly greater than elapsed minutes;
    /// `None` if none remain.
    fn next_delay_minutes(&self, elapsed_minutes: f64) -> Option<i32>;

    /// Largest scheduled delay <= elapsed minutes; 0 if none.
    fn current_delay_minutes(&self, elapsed_minutes: f64) -> i32;

    /// `true` when `now > origin_time + max_delay + grace`.
    fn is_terminal(&self, elapsed_minutes: f64) -> bool;

    /// `true` iff `retry_count < max_retries`.
    fn should_retry_on_failure(&self, retry_count: i32) -> bool;

    /// The full ordered list of scheduled delays, in minutes.
    fn delays(&self) -> &[i32];
}

/// A policy defined by a fixed list of scheduled delays plus drift/grace
/// tolerances. Covers RRSM; ESM and EMSC register as placeholders (see
/// [`PlaceholderPolicy`]) with the same contract but no real schedule, so
/// the scheduler stays uniform across services.
#[derive(Debug, Clone)]
pub struct FixedSchedulePolicy {
    service_name: String,
    delays: Vec<i32>,
    drift_tolerance_minutes: f64,
    grace_minutes: f64,
    max_retries: i32,
}

impl FixedSchedulePolicy {
    pub fn new(
        service_name: impl Into<String>,
        delays: Vec<i32>,
        drift_tolerance_minutes: f64,
        grace_minutes: f64,
        max_retries: i32,
    ) -> Self {
        let mut delays = delays;
        delays.sort_unstable();
        Self {
            service_name: service_name.into(),
            delays,
            drift_tolerance_minutes,
            grace_minutes,
            max_retries,
        }
    }

    /// The concrete RRSM schedule named in the design notes.
    pub fn rrsm() -> Self {
        Self::new(
            "RRSM",
            vec![0, 5, 15, 60, 180, 360, 1440, 2880],
            1.0,
            15.0,
            3,
        )
    }

    fn max_delay(&self) -> i32 {
        self.delays.last().copied().unwrap_or(0)
    }
}

impl Policy for FixedSchedulePolicy {
    fn service_name(&self) -> &str {
        &self.service_name
    }

    fn should_query(&self, meta: &PolicyMeta) -> (bool, String) {
        let elapsed = meta.elapsed_minutes();
        let max_delay = self.max_delay() as f64;
        if elapsed > max_delay + self.grace_minutes {
            return (
                false,
                format!(
                    "elapsed {elapsed:.3}m exceeds max_delay {max_delay}m + grace {}m",
                    self.grace_minutes
                ),
            );
        }
        let hit = self
            .delays
            .iter()
            .find(|d| (elapsed - **d as f64).abs() <= self.drift_tolerance_minutes);
        match hit {
            Some(d) => (true, format!("within drift of scheduled delay {d}m")),
            None => (
                false,
                format!("elapsed {elapsed:.3}m matches no scheduled delay within drift"),
            ),
        }
    }

    fn next_delay_minutes(&self, elapsed_minutes: f64) -> Option<i32> {
        self.delays
            .iter()
            .copied()
            .find(|d| (*d as f64) > elapsed_minutes)
    }

    fn current_delay_minutes(&self, elapsed_minutes: f64) -> i32 {
        self.delays
            .iter()
            .copied()
            .filter(|d| (*d as f64) <= elapsed_minutes)
            .max()
            .unwrap_or(0)
    }

    fn is_terminal(&self, elapsed_minutes: f64) -> bool {
        elapsed_minutes > self.max_delay() as f64 + self.grace_minutes
    }

    fn should_retry_on_failure(&self, retry_count: i32) -> bool {
        retry_count < self.max_retries
    }

    fn delays(&self) -> &[i32] {
        &self.delays
    }
}

/// Registered placeholder for services with no live schedule yet (ESM,
/// EMSC). Always declines to query and reports no next delay, but keeps the
/// `Policy` contract so the scheduler never special-cases a service name.
#[derive(Debug, Clone)]
pub struct PlaceholderPolicy {
    service_name: String,
}

impl PlaceholderPolicy {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }
}

impl Policy for PlaceholderPolicy {
    fn service_name(&self) -> &str {
        &self.service_name
    }

    fn should_query(&self, _meta: &PolicyMeta) -> (bool, String) {
        (false, "placeholder policy never queries".to_string())
    }

    fn next_delay_minutes(&self, _elapsed_minutes: f64) -> Option<i32> {
        None
    }

    fn current_delay_minutes(&self, _elapsed_minutes: f64) -> i32 {
        0
    }

    fn is_terminal(&self, _elapsed_minutes: f64) -> bool {
        true
    }

    fn should_retry_on_failure(&self, _retry_count: i32) -> bool {
        false
    }

    fn delays(&self) -> &[i32] {
        &[]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn meta_at(elapsed_minutes: i64, retry_count: i32) -> PolicyMeta {
        let origin = Utc::now();
        PolicyMeta {
            origin_time: origin,
            now: origin + Duration::minutes(elapsed_minutes),
            retry_count,
        }
    }

    #[test]
    fn should_query_true_within_drift_of_scheduled_delay() {
        let p = FixedSchedulePolicy::rrsm();
        let (ok, _) = p.should_query(&meta_at(5, 0));
        assert!(ok);
    }

    #[test]
    fn should_query_false_between_scheduled_delays() {
        let p = FixedSchedulePolicy::rrsm();
        let (ok, _) = p.should_query(&meta_at(30, 0));
        assert!(!ok);
    }

    #[test]
    fn should_query_false_past_max_delay_plus_grace() {
        let p = FixedSchedulePolicy::rrsm();
        let (ok, _) = p.should_query(&meta_at(2880 + 16, 0));
        assert!(!ok);
    }

    #[test]
    fn next_delay_minutes_finds_smallest_greater_delay() {
        let p = FixedSchedulePolicy::rrsm();
        assert_eq!(p.next_delay_minutes(6.0), Some(15));
        assert_eq!(p.next_delay_minutes(2880.0), None);
    }

    #[test]
    fn current_delay_minutes_finds_largest_delay_leq_elapsed() {
        let p = FixedSchedulePolicy::rrsm();
        assert_eq!(p.current_delay_minutes(10.0), 5);
        assert_eq!(p.current_delay_minutes(0.0), 0);
    }

    #[test]
    fn retry_respects_max_retries_default_three() {
        let p = FixedSchedulePolicy::rrsm();
        assert!(p.should_retry_on_failure(2));
        assert!(!p.should_retry_on_failure(3));
    }

    #[test]
    fn placeholder_never_queries_or_retries() {
        let p = PlaceholderPolicy::new("ESM");
        assert!(!p.should_query(&meta_at(0, 0)).0);
        assert!(!p.should_retry_on_failure(0));
        assert_eq!(p.next_delay_minutes(0.0), None);
    }
}
