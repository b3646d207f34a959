//! Retry policy types and configuration.

use std::fmt;
use std::time::Duration;

/// Number of attempts used by [`RetryPolicy::default`].
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// A retry policy describing how many times an operation may be attempted.
///
/// Policies are plain data: they describe retry behavior but don't execute it.
/// [`RetryRunner`](crate::retry::RetryRunner) is what interprets them.
///
/// `max_attempts` counts every invocation, including the first one, and is
/// always at least 1. Retries are immediate unless a [`Backoff`] is configured.
///
/// # Examples
///
/// ```rust
/// use chordjob::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(3).with_timeout(Duration::from_secs(10));
///
/// assert_eq!(policy.max_attempts(), 3);
/// assert_eq!(policy.timeout(), Some(Duration::from_secs(10)));
/// assert_eq!(policy.delay_before_retry(1), None); // no backoff configured
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    timeout: Option<Duration>,
    backoff: Backoff,
    max_delay: Option<Duration>,
    jitter: JitterStrategy,
}

/// The delay strategy applied between attempts.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case", tag = "kind"))]
pub enum Backoff {
    /// Retry immediately.
    #[default]
    None,
    /// Fixed delay between attempts.
    Constant {
        /// Delay before every retry.
        #[cfg_attr(feature = "serde", serde(with = "millis"))]
        delay: Duration,
    },
    /// Delay increases linearly: base * retry.
    Linear {
        /// Base delay duration.
        #[cfg_attr(feature = "serde", serde(with = "millis"))]
        base: Duration,
    },
    /// Delay doubles: base * 2^(retry - 1).
    Exponential {
        /// Base delay duration.
        #[cfg_attr(feature = "serde", serde(with = "millis"))]
        base: Duration,
    },
    /// Delay follows the Fibonacci sequence: base * fib(retry).
    Fibonacci {
        /// Base delay duration.
        #[cfg_attr(feature = "serde", serde(with = "millis"))]
        base: Duration,
    },
}

/// Strategy for adding randomness to backoff delays.
///
/// Without the `jitter` feature every strategy returns the delay unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(
    feature = "serde",
    serde(rename_all = "snake_case", tag = "kind", content = "factor")
)]
pub enum JitterStrategy {
    /// No jitter applied.
    #[default]
    None,
    /// Add ±factor randomness to the delay.
    Proportional(f64),
    /// Random delay between 0 and the calculated delay.
    Full,
}

/// Error returned by [`RetryPolicy::validate`] and policy deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// `max_attempts` was zero; at least one attempt is always made.
    ZeroAttempts,
    /// A zero timeout would fail every attempt before it starts.
    ZeroTimeout,
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroAttempts => write!(f, "retry policy must allow at least one attempt"),
            Self::ZeroTimeout => write!(f, "retry policy timeout must be greater than zero"),
        }
    }
}

impl std::error::Error for PolicyError {}

impl Default for RetryPolicy {
    /// Five immediate attempts, no timeout.
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryPolicy {
    /// Create a policy allowing `max_attempts` invocations in total.
    ///
    /// A value of `0` is raised to `1`: the operation always runs at least once.
    ///
    /// ```rust
    /// use chordjob::RetryPolicy;
    ///
    /// assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
    /// assert_eq!(RetryPolicy::new(4).max_attempts(), 4);
    /// ```
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            timeout: None,
            backoff: Backoff::None,
            max_delay: None,
            jitter: JitterStrategy::None,
        }
    }

    /// A policy that runs the operation exactly once.
    pub fn once() -> Self {
        Self::new(1)
    }

    /// Set the total number of attempts (clamped to at least 1).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Bound every individual attempt by `timeout`.
    ///
    /// An attempt that does not finish in time counts as a failed attempt and
    /// is retried like any other failure. A zero timeout would fail every
    /// attempt, so `Duration::ZERO` clears the timeout instead.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Set the delay strategy between attempts.
    ///
    /// ```rust
    /// use chordjob::{Backoff, RetryPolicy};
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new(4)
    ///     .with_backoff(Backoff::Exponential { base: Duration::from_millis(100) });
    ///
    /// assert_eq!(policy.delay_before_retry(1), Some(Duration::from_millis(100)));
    /// assert_eq!(policy.delay_before_retry(2), Some(Duration::from_millis(200)));
    /// assert_eq!(policy.delay_before_retry(3), Some(Duration::from_millis(400)));
    /// ```
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Cap every backoff delay at `max_delay`.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Add proportional jitter (`factor` is clamped to `0.0..=1.0`; NaN and
    /// infinities become `0.0`).
    ///
    /// **Note**: Requires the `jitter` feature. Without it, this method does nothing.
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter = JitterStrategy::Proportional(jitter_factor(factor));
        self
    }

    /// Use full jitter: a random delay between 0 and the calculated delay.
    ///
    /// **Note**: Requires the `jitter` feature. Without it, this method does nothing.
    pub fn with_full_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::Full;
        self
    }

    /// Total number of attempts, including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Per-attempt timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The configured backoff strategy.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// The maximum delay cap.
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// The jitter strategy.
    pub fn jitter(&self) -> &JitterStrategy {
        &self.jitter
    }

    /// Delay to wait before retry number `retry` (1-based), before jitter.
    ///
    /// Returns `None` when no delay applies: either the backoff is
    /// [`Backoff::None`] or `retry` would exceed the attempt budget.
    pub fn delay_before_retry(&self, retry: u32) -> Option<Duration> {
        if retry == 0 || retry >= self.max_attempts {
            return None;
        }

        let delay = match &self.backoff {
            Backoff::None => return None,
            Backoff::Constant { delay } => *delay,
            Backoff::Linear { base } => base.saturating_mul(retry),
            Backoff::Exponential { base } => {
                base.saturating_mul(2u32.saturating_pow(retry - 1))
            }
            Backoff::Fibonacci { base } => base.saturating_mul(fibonacci(retry)),
        };

        Some(match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        })
    }

    /// Delay before retry `retry` with jitter applied.
    pub(crate) fn jittered_delay(&self, retry: u32) -> Option<Duration> {
        let delay = self.delay_before_retry(retry)?;
        Some(self.jitter.apply(delay, self.max_delay))
    }

    /// Check the policy's invariants.
    ///
    /// Policies built with the constructors always pass; this exists for
    /// values assembled from configuration.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.max_attempts == 0 {
            return Err(PolicyError::ZeroAttempts);
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(PolicyError::ZeroTimeout);
        }
        Ok(())
    }
}

impl JitterStrategy {
    /// Apply jitter to `delay`, keeping the result under `max_delay`.
    pub fn apply(&self, delay: Duration, max_delay: Option<Duration>) -> Duration {
        let jittered = match self {
            JitterStrategy::None => delay,
            #[cfg(feature = "jitter")]
            JitterStrategy::Proportional(factor) => {
                use rand::Rng;
                let millis = delay.as_millis() as f64;
                let spread = millis * jitter_factor(*factor);
                let low = (millis - spread).max(0.0);
                let high = millis + spread;
                if high <= low {
                    delay
                } else {
                    Duration::from_millis(rand::rng().random_range(low..=high) as u64)
                }
            }
            #[cfg(not(feature = "jitter"))]
            JitterStrategy::Proportional(_) => delay,
            #[cfg(feature = "jitter")]
            JitterStrategy::Full => {
                use rand::Rng;
                let millis = delay.as_millis() as u64;
                if millis == 0 {
                    Duration::ZERO
                } else {
                    Duration::from_millis(rand::rng().random_range(0..=millis))
                }
            }
            #[cfg(not(feature = "jitter"))]
            JitterStrategy::Full => delay,
        };

        match max_delay {
            Some(max) => jittered.min(max),
            None => jittered,
        }
    }
}

fn jitter_factor(factor: f64) -> f64 {
    if factor.is_finite() {
        factor.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn fibonacci(n: u32) -> u32 {
    if n == 0 {
        return 0;
    }
    let mut a = 0u32;
    let mut b = 1u32;
    for _ in 1..n {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    b
}

#[cfg(feature = "serde")]
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(ceil(*d))
    }

    /// Whole milliseconds, rounding any remainder up so a non-zero duration
    /// never becomes zero.
    pub fn ceil(d: Duration) -> u64 {
        let millis = d.as_millis() + u128::from(d.subsec_nanos() % 1_000_000 != 0);
        u64::try_from(millis).unwrap_or(u64::MAX)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::{
        jitter_factor, millis, Backoff, JitterStrategy, PolicyError, RetryPolicy,
        DEFAULT_MAX_ATTEMPTS,
    };
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    /// Wire shape of a policy: `{ "max_attempts": 3, "timeout_ms": 5000 }`.
    #[derive(Deserialize, Serialize)]
    struct PolicyConfig {
        #[serde(default = "default_attempts")]
        max_attempts: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
        #[serde(default)]
        backoff: Backoff,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_delay_ms: Option<u64>,
        #[serde(default)]
        jitter: JitterStrategy,
    }

    fn default_attempts() -> u32 {
        DEFAULT_MAX_ATTEMPTS
    }

    impl PolicyConfig {
        fn into_policy(self) -> Result<RetryPolicy, PolicyError> {
            let policy = RetryPolicy {
                max_attempts: self.max_attempts,
                timeout: self.timeout_ms.map(Duration::from_millis),
                backoff: self.backoff,
                max_delay: self.max_delay_ms.map(Duration::from_millis),
                jitter: match self.jitter {
                    JitterStrategy::Proportional(factor) => {
                        JitterStrategy::Proportional(jitter_factor(factor))
                    }
                    other => other,
                },
            };
            policy.validate()?;
            Ok(policy)
        }
    }

    impl<'de> Deserialize<'de> for RetryPolicy {
        fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
            let config = PolicyConfig::deserialize(d)?;
            config.into_policy().map_err(serde::de::Error::custom)
        }
    }

    impl Serialize for RetryPolicy {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            PolicyConfig {
                max_attempts: self.max_attempts,
                timeout_ms: self.timeout.map(millis::ceil),
                backoff: self.backoff.clone(),
                max_delay_ms: self.max_delay.map(millis::ceil),
                jitter: self.jitter.clone(),
            }
            .serialize(s)
        }
    }
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    #[test]
    fn test_default_policy_has_five_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.timeout(), None);
        assert_eq!(policy.backoff(), &Backoff::None);
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
        assert_eq!(RetryPolicy::new(3).with_max_attempts(0).max_attempts(), 1);
        assert!(RetryPolicy::new(0).validate().is_ok());
    }

    #[test]
    fn test_no_backoff_means_immediate_retry() {
        let policy = RetryPolicy::new(3);
        assert_eq!(policy.delay_before_retry(1), None);
        assert_eq!(policy.delay_before_retry(2), None);
    }

    #[test]
    fn test_constant_delay() {
        let policy = RetryPolicy::new(4).with_backoff(Backoff::Constant {
            delay: Duration::from_millis(100),
        });

        assert_eq!(policy.delay_before_retry(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_before_retry(3), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_before_retry(4), None);
    }

    #[test]
    fn test_linear_delay() {
        let policy = RetryPolicy::new(5).with_backoff(Backoff::Linear {
            base: Duration::from_millis(100),
        });

        assert_eq!(policy.delay_before_retry(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_before_retry(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_before_retry(4), Some(Duration::from_millis(400)));
    }

    #[test]
    fn test_fibonacci_delay() {
        let policy = RetryPolicy::new(7).with_backoff(Backoff::Fibonacci {
            base: Duration::from_millis(100),
        });

        let delays: Vec<_> = (1..7).filter_map(|r| policy.delay_before_retry(r)).collect();
        assert_eq!(
            delays,
            [100, 100, 200, 300, 500, 800]
                .into_iter()
                .map(Duration::from_millis)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_max_delay_cap() {
        let policy = RetryPolicy::new(10)
            .with_backoff(Backoff::Exponential {
                base: Duration::from_millis(100),
            })
            .with_max_delay(Duration::from_millis(500));

        assert_eq!(policy.delay_before_retry(3), Some(Duration::from_millis(400)));
        assert_eq!(policy.delay_before_retry(4), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_before_retry(9), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_zero_timeout_clears_timeout() {
        let policy = RetryPolicy::new(2)
            .with_timeout(Duration::from_secs(1))
            .with_timeout(Duration::ZERO);
        assert_eq!(policy.timeout(), None);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut policy = RetryPolicy::new(2);
        policy.timeout = Some(Duration::ZERO);
        assert_eq!(policy.validate(), Err(PolicyError::ZeroTimeout));
    }

    #[test]
    fn test_non_finite_jitter_factor_becomes_zero() {
        for factor in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let policy = RetryPolicy::new(3).with_jitter(factor);
            assert_eq!(policy.jitter(), &JitterStrategy::Proportional(0.0));
        }
        assert_eq!(
            RetryPolicy::new(3).with_jitter(4.0).jitter(),
            &JitterStrategy::Proportional(1.0)
        );
    }

    #[test]
    fn test_non_finite_proportional_jitter_keeps_delay() {
        let delay = Duration::from_millis(100);
        for factor in [f64::NAN, f64::INFINITY] {
            assert_eq!(JitterStrategy::Proportional(factor).apply(delay, None), delay);
        }

        let policy = RetryPolicy::new(3)
            .with_backoff(Backoff::Constant { delay })
            .with_jitter(f64::NAN);
        assert_eq!(policy.jittered_delay(1), Some(delay));
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_full_jitter_stays_within_delay() {
        let delay = Duration::from_millis(200);
        for _ in 0..200 {
            let jittered = JitterStrategy::Full.apply(delay, None);
            assert!(jittered <= delay, "{:?} exceeds {:?}", jittered, delay);
        }
        assert_eq!(JitterStrategy::Full.apply(Duration::ZERO, None), Duration::ZERO);
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_proportional_jitter_stays_within_factor() {
        let delay = Duration::from_millis(1_000);
        let policy = RetryPolicy::new(3)
            .with_backoff(Backoff::Constant { delay })
            .with_jitter(0.25);

        for _ in 0..200 {
            let jittered = policy.jittered_delay(1).unwrap();
            assert!(
                (750..=1_250).contains(&jittered.as_millis()),
                "{:?} outside 750ms..=1250ms",
                jittered
            );
        }
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_jitter_respects_max_delay() {
        let policy = RetryPolicy::new(3)
            .with_backoff(Backoff::Constant {
                delay: Duration::from_millis(1_000),
            })
            .with_max_delay(Duration::from_millis(1_000))
            .with_jitter(1.0);

        for _ in 0..100 {
            assert!(policy.jittered_delay(1).unwrap() <= Duration::from_millis(1_000));
        }
    }

    #[test]
    fn test_jitter_none_returns_delay() {
        let delay = Duration::from_millis(100);
        assert_eq!(JitterStrategy::None.apply(delay, None), delay);
        assert_eq!(
            JitterStrategy::None.apply(delay, Some(Duration::from_millis(40))),
            Duration::from_millis(40)
        );
    }

    #[test]
    fn test_fibonacci_function() {
        assert_eq!(fibonacci(0), 0);
        assert_eq!(fibonacci(1), 1);
        assert_eq!(fibonacci(2), 1);
        assert_eq!(fibonacci(6), 8);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_policy_from_json_config() {
        let policy: RetryPolicy =
            serde_json::from_str(r#"{ "max_attempts": 3, "timeout_ms": 2500 }"#).unwrap();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.timeout(), Some(Duration::from_millis(2500)));

        let policy: RetryPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy, RetryPolicy::default());

        let policy: RetryPolicy = serde_json::from_str(
            r#"{ "max_attempts": 4, "backoff": { "kind": "linear", "base": 50 } }"#,
        )
        .unwrap();
        assert_eq!(policy.delay_before_retry(2), Some(Duration::from_millis(100)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_policy_survives_serialization() {
        let policy = RetryPolicy::new(4)
            .with_timeout(Duration::from_millis(2_500))
            .with_backoff(Backoff::Exponential {
                base: Duration::from_millis(100),
            })
            .with_max_delay(Duration::from_secs(5))
            .with_jitter(0.2);

        let json = serde_json::to_string(&policy).unwrap();
        let back: RetryPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);

        let full = RetryPolicy::new(2).with_full_jitter();
        let json = serde_json::to_string(&full).unwrap();
        let back: RetryPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back.jitter(), &JitterStrategy::Full);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_sub_millisecond_durations_round_up() {
        let policy = RetryPolicy::new(3)
            .with_timeout(Duration::from_micros(500))
            .with_backoff(Backoff::Constant {
                delay: Duration::from_micros(1_200),
            });

        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["timeout_ms"], 1);
        assert_eq!(json["backoff"]["delay"], 2);

        let back: RetryPolicy = serde_json::from_value(json).unwrap();
        assert_eq!(back.timeout(), Some(Duration::from_millis(1)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_policy_config_reads_jitter() {
        let policy: RetryPolicy = serde_json::from_str(
            r#"{ "max_attempts": 3, "jitter": { "kind": "proportional", "factor": 0.5 } }"#,
        )
        .unwrap();
        assert_eq!(policy.jitter(), &JitterStrategy::Proportional(0.5));

        let policy: RetryPolicy =
            serde_json::from_str(r#"{ "jitter": { "kind": "full" } }"#).unwrap();
        assert_eq!(policy.jitter(), &JitterStrategy::Full);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_policy_config_rejects_zero_attempts() {
        let result = serde_json::from_str::<RetryPolicy>(r#"{ "max_attempts": 0 }"#);
        assert!(result.is_err());
    }
}
