//! Bus connectivity supervisor.
//!
//! Runs once at startup: pings the bus until it answers or the retry budget
//! is exhausted. The server must not accept traffic before this succeeds.

use std::time::Duration;

use async_trait::async_trait;
use relay_core::DomainError;

use crate::pool::{RedisPool, RedisResult};

/// Anything that can answer a liveness ping
#[async_trait]
pub trait BusProbe: Send + Sync {
    async fn ping(&self) -> RedisResult<()>;
}

#[async_trait]
impl BusProbe for RedisPool {
    async fn ping(&self) -> RedisResult<()> {
        self.health_check().await
    }
}

/// Fixed-delay retry budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(5))
    }
}

impl From<&relay_common::BusStartupConfig> for RetryPolicy {
    fn from(config: &relay_common::BusStartupConfig) -> Self {
        Self::new(config.max_attempts, config.retry_delay)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Message bus unreachable after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

impl From<SupervisorError> for DomainError {
    fn from(err: SupervisorError) -> Self {
        DomainError::BusUnavailable(err.to_string())
    }
}

/// Startup connectivity gate
#[derive(Debug, Clone, Copy, Default)]
pub struct BusSupervisor {
    policy: RetryPolicy,
}

impl BusSupervisor {
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Ping until the bus answers; returns the attempt number that succeeded
    pub async fn wait_until_ready<P>(&self, probe: &P) -> Result<u32, SupervisorError>
    where
        P: BusProbe + ?Sized,
    {
        let max_attempts = self.policy.max_attempts;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match probe.ping().await {
                Ok(()) => {
                    tracing::info!(attempt, "Message bus is reachable");
                    return Ok(attempt);
                }
                Err(e) => {
                    last_error = e.to_string();
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "Message bus not reachable"
                    );
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.policy.delay).await;
            }
        }

        tracing::error!(attempts = max_attempts, "Giving up on message bus");
        Err(SupervisorError::Exhausted {
            attempts: max_attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::RedisPoolError;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails until `succeed_on` pings have been made
    struct FlakyProbe {
        calls: AtomicU32,
        succeed_on: Option<u32>,
    }

    impl FlakyProbe {
        fn new(succeed_on: Option<u32>) -> Self {
            Self {
                calls: AtomicU32::new(0),
                succeed_on,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BusProbe for FlakyProbe {
        async fn ping(&self) -> RedisResult<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            match self.succeed_on {
                Some(n) if call >= n => Ok(()),
                _ => Err(RedisPoolError::UnexpectedReply("connection refused".into())),
            }
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(10, Duration::from_millis(1))
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.delay, Duration::from_secs(5));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_fails_after_ten_attempts() {
        let probe = FlakyProbe::new(None);
        let err = BusSupervisor::new(fast_policy())
            .wait_until_ready(&probe)
            .await
            .unwrap_err();

        assert_eq!(probe.calls(), 10);
        let SupervisorError::Exhausted { attempts, .. } = &err;
        assert_eq!(*attempts, 10);

        let domain: DomainError = err.into();
        assert!(matches!(domain, DomainError::BusUnavailable(_)));
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let probe = FlakyProbe::new(Some(3));
        let attempt = BusSupervisor::new(fast_policy())
            .wait_until_ready(&probe)
            .await
            .unwrap();

        assert_eq!(attempt, 3);
        assert_eq!(probe.calls(), 3);
    }

    #[tokio::test]
    async fn test_waits_between_attempts() {
        let probe = FlakyProbe::new(Some(3));
        let started = std::time::Instant::now();

        BusSupervisor::new(RetryPolicy::new(10, Duration::from_millis(20)))
            .wait_until_ready(&probe)
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(40));
    }
}
