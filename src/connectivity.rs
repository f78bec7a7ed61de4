//! Connection retry policy and link-state tracking.
//!
//! Two flavours share one [`RetryPolicy`]:
//!
//! - [`retry_blocking`] — boot-time link setup; sleeps between attempts and
//!   gives up after `max_attempts`.
//! - [`Reconnector`] — non-blocking, polled once per loop iteration; reports
//!   a [`LinkState`] instead of stalling the loop.
//!
//! Delays grow by `multiplier` from `initial_delay_ms` up to `max_delay_ms`.
//! A multiplier of 1 gives the fixed-delay spin.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Bounded-retry-with-backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// `None` = retry forever.
    pub max_attempts: Option<u32>,
    pub initial_delay_ms: u32,
    pub max_delay_ms: u32,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    /// Broker default: unbounded, 2 s → 4 s → 8 s … capped at 60 s.
    fn default() -> Self {
        Self {
            max_attempts: None,
            initial_delay_ms: 2_000,
            max_delay_ms: 60_000,
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// `attempts` tries with a constant `delay_ms` between them.
    pub const fn fixed(attempts: u32, delay_ms: u32) -> Self {
        Self {
            max_attempts: Some(attempts),
            initial_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            multiplier: 1,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == Some(0) {
            return Err(ConfigError::ValidationFailed("retry max_attempts must be > 0"));
        }
        if self.multiplier == 0 {
            return Err(ConfigError::ValidationFailed("retry multiplier must be >= 1"));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(ConfigError::ValidationFailed(
                "retry max_delay_ms below initial_delay_ms",
            ));
        }
        Ok(())
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> u32 {
        let mut delay = self.initial_delay_ms;
        for _ in 1..attempt {
            delay = delay.saturating_mul(self.multiplier);
            if delay >= self.max_delay_ms {
                return self.max_delay_ms;
            }
        }
        delay.min(self.max_delay_ms)
    }

    /// Whether another attempt is allowed after `attempts` failures.
    pub fn allows(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }
}

/// Observable state of a retried connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Never attempted, or explicitly torn down.
    Down,
    Up,
    /// `attempt` connects have failed; next try at `retry_at_ms`.
    Waiting { attempt: u32, retry_at_ms: u64 },
    /// The policy's attempt budget is spent.
    GaveUp { attempts: u32 },
}

impl LinkState {
    pub fn is_up(&self) -> bool {
        matches!(self, Self::Up)
    }
}

/// Retry `op` until it succeeds or the policy is exhausted.
///
/// `sleep_ms` is injected so host tests do not actually wait.
pub fn retry_blocking<T, E: core::fmt::Display>(
    policy: &RetryPolicy,
    mut sleep_ms: impl FnMut(u32),
    mut op: impl FnMut(u32) -> Result<T, E>,
) -> Result<T, crate::error::CommsError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => {
                if !policy.allows(attempt) {
                    warn!("LINK | giving up after {} attempts: {}", attempt, e);
                    return Err(crate::error::CommsError::RetryExhausted);
                }
                let delay = policy.delay_after(attempt);
                warn!("LINK | attempt {} failed ({}), retrying in {}ms", attempt, e, delay);
                sleep_ms(delay);
            }
        }
    }
}

/// Non-blocking reconnect driver.
pub struct Reconnector {
    policy: RetryPolicy,
    state: LinkState,
}

impl Reconnector {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: LinkState::Down,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Try to (re)connect if a retry is due.  `connect` is only invoked when
    /// the link is down and the backoff delay has elapsed.
    pub fn poll<E: core::fmt::Display>(
        &mut self,
        now_ms: u64,
        connect: impl FnOnce() -> Result<(), E>,
    ) -> LinkState {
        let failed_so_far = match self.state {
            LinkState::Up | LinkState::GaveUp { .. } => return self.state,
            LinkState::Waiting { attempt, retry_at_ms } => {
                if now_ms < retry_at_ms {
                    return self.state;
                }
                attempt
            }
            LinkState::Down => 0,
        };

        match connect() {
            Ok(()) => {
                info!("LINK | connected after {} failed attempts", failed_so_far);
                self.state = LinkState::Up;
            }
            Err(e) => {
                let attempt = failed_so_far + 1;
                if self.policy.allows(attempt) {
                    let delay = self.policy.delay_after(attempt);
                    warn!("LINK | connect attempt {} failed ({}), next in {}ms", attempt, e, delay);
                    self.state = LinkState::Waiting {
                        attempt,
                        retry_at_ms: now_ms + u64::from(delay),
                    };
                } else {
                    warn!("LINK | connect failed {} times, giving up", attempt);
                    self.state = LinkState::GaveUp { attempts: attempt };
                }
            }
        }
        self.state
    }

    /// Report that an established link dropped.  The first retry happens on
    /// the next poll.
    pub fn mark_lost(&mut self) {
        if self.state == LinkState::Up {
            warn!("LINK | connection lost");
            self.state = LinkState::Down;
        }
    }

    /// Forget any give-up verdict (e.g. after Wi-Fi came back).
    pub fn reset(&mut self) {
        self.state = LinkState::Down;
    }
}
