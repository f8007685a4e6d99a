use crate::infrastructure::Backoff;
use std::time::Duration;
use tokio::time::Instant;

/// Attempt bookkeeping owned by [`ReconnectScheduler`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconnectAttempt {
    pub count: u32,
    pub last_attempt_at: Option<Instant>,
    pub in_flight: bool,
}

/// Who is asking for a reconnect; decides which guards apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOrigin {
    /// Public API, network events, lifecycle: throttled
    External,
    /// Backoff retry expiry: not throttled
    ScheduledRetry,
    /// Retry armed after exhaustion: runs even with the counter spent
    ExhaustedRetry,
}

/// Result of a reconnect request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A connect sequence started
    Started { attempt: u32, sequence: u64 },
    /// Another sequence is in flight
    InFlight,
    /// Too soon after the last attempt started
    Throttled { remaining: Duration },
    /// Already connected; nothing to do
    AlreadyConnected,
    /// Counter exhausted; caller should defer a retry by `retry_in`
    Exhausted { attempts: u32, retry_in: Duration },
}

/// Result of a failed connect sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    Retry { attempts: u32, retry_in: Duration },
    Exhausted { attempts: u32, retry_in: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    Idle,
    /// Waiting for the transport to report success
    Connecting,
    /// Transport succeeded, waiting for the link to settle
    Stabilizing,
}

/// Backoff timing, attempt counting and the single-flight guard.
///
/// Purely decides; the connection loop owns the timers and the transport
/// and acts on the outcomes. Each started sequence gets a fresh sequence
/// number so late results from aborted sequences can be told apart.
#[derive(Debug, Clone)]
pub struct ReconnectScheduler {
    attempt: ReconnectAttempt,
    phase: AttemptPhase,
    sequence: u64,
    backoff: Backoff,
    min_interval: Duration,
    max_attempts: u32,
}

impl ReconnectScheduler {
    pub fn new(backoff: Backoff, min_interval: Duration, max_attempts: u32) -> Self {
        Self {
            attempt: ReconnectAttempt::default(),
            phase: AttemptPhase::Idle,
            sequence: 0,
            backoff,
            min_interval,
            max_attempts,
        }
    }

    pub fn attempt(&self) -> ReconnectAttempt {
        self.attempt
    }

    pub fn attempts(&self) -> u32 {
        self.attempt.count
    }

    pub fn is_in_flight(&self) -> bool {
        self.attempt.in_flight
    }

    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }

    pub fn request(
        &mut self,
        now: Instant,
        already_connected: bool,
        origin: RequestOrigin,
    ) -> RequestOutcome {
        if self.attempt.in_flight {
            return RequestOutcome::InFlight;
        }

        if already_connected {
            return RequestOutcome::AlreadyConnected;
        }

        if origin == RequestOrigin::External
            && let Some(last) = self.attempt.last_attempt_at
        {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.min_interval {
                return RequestOutcome::Throttled {
                    remaining: self.min_interval - elapsed,
                };
            }
        }

        if origin != RequestOrigin::ExhaustedRetry && self.attempt.count >= self.max_attempts {
            return RequestOutcome::Exhausted {
                attempts: self.attempt.count,
                retry_in: self.backoff.delay(self.attempt.count.saturating_add(1)),
            };
        }

        self.attempt.in_flight = true;
        self.attempt.last_attempt_at = Some(now);
        self.attempt.count = self.attempt.count.saturating_add(1);
        self.sequence += 1;
        self.phase = AttemptPhase::Connecting;

        RequestOutcome::Started {
            attempt: self.attempt.count,
            sequence: self.sequence,
        }
    }

    fn is_current(&self, sequence: u64) -> bool {
        self.attempt.in_flight && self.sequence == sequence
    }

    /// Transport reported success for `sequence`. Returns `false` for stale
    /// or duplicate reports.
    pub fn connect_succeeded(&mut self, sequence: u64) -> bool {
        if !self.is_current(sequence) || self.phase != AttemptPhase::Connecting {
            return false;
        }
        self.phase = AttemptPhase::Stabilizing;
        true
    }

    /// The sequence failed. Returns `None` for stale sequences.
    pub fn fail(&mut self, sequence: u64) -> Option<FailureOutcome> {
        if !self.is_current(sequence) {
            return None;
        }

        self.attempt.in_flight = false;
        self.phase = AttemptPhase::Idle;

        let attempts = self.attempt.count;
        if attempts >= self.max_attempts {
            Some(FailureOutcome::Exhausted {
                attempts,
                retry_in: self.backoff.delay(attempts.saturating_add(1)),
            })
        } else {
            Some(FailureOutcome::Retry {
                attempts,
                retry_in: self.backoff.delay(attempts),
            })
        }
    }

    /// The sequence settled into a usable connection
    pub fn complete(&mut self, sequence: u64) -> bool {
        if !self.is_current(sequence) || self.phase != AttemptPhase::Stabilizing {
            return false;
        }
        self.attempt.count = 0;
        self.attempt.in_flight = false;
        self.phase = AttemptPhase::Idle;
        true
    }

    /// Zero the counter without touching throttle or in-flight state
    pub fn reset_count(&mut self) {
        self.attempt.count = 0;
    }

    /// Forget everything, invalidating any in-flight sequence
    pub fn reset(&mut self) {
        self.attempt = ReconnectAttempt::default();
        self.phase = AttemptPhase::Idle;
        self.sequence += 1;
    }
}

impl Default for ReconnectScheduler {
    fn default() -> Self {
        Self::new(
            Backoff::default(),
            Duration::from_millis(crate::types::MIN_RECONNECT_INTERVAL),
            crate::types::MAX_RETRY_ATTEMPTS,
        )
    }
}
