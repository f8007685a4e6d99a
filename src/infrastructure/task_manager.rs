use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Deferred callbacks the connection loop can arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Next reconnect attempt after a backoff
    Retry,
    /// Deadline for the in-flight connect sequence
    ConnectTimeout,
    /// Settling time after the transport reported success
    ConnectionStabilize,
    /// Settling time after the OS reported a network
    NetworkStabilize,
    /// Re-check of the OS after a network loss
    LossVerification,
    /// Next heartbeat tick
    Heartbeat,
}

/// Delivered to the loop when a timer elapses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken {
    pub kind: TimerKind,
    pub generation: u64,
}

struct ArmedTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Manages timer tasks with proper lifecycle handling.
///
/// At most one timer per [`TimerKind`] is armed; re-arming replaces it.
/// Each timer is a sleeping task that posts a [`TimerToken`] back to the
/// owning loop. Tokens from cancelled or replaced timers fail
/// [`accept`](Self::accept), so a firing that raced a cancel is dropped.
pub struct TaskManager {
    tx: mpsc::UnboundedSender<TimerToken>,
    timers: HashMap<TimerKind, ArmedTimer>,
    next_generation: u64,
}

impl TaskManager {
    pub fn new(tx: mpsc::UnboundedSender<TimerToken>) -> Self {
        Self {
            tx,
            timers: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Arm `kind` to fire after `delay`, replacing any armed timer of that kind
    pub fn arm(&mut self, kind: TimerKind, delay: Duration) {
        self.cancel(kind);

        self.next_generation += 1;
        let token = TimerToken {
            kind,
            generation: self.next_generation,
        };
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Loop gone means teardown already happened
            let _ = tx.send(token);
        });

        self.timers.insert(
            kind,
            ArmedTimer {
                generation: token.generation,
                handle,
            },
        );
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        if let Some(timer) = self.timers.remove(&kind) {
            timer.handle.abort();
        }
    }

    /// Abort every armed timer
    pub fn cancel_all(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.handle.abort();
        }
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.timers.contains_key(&kind)
    }

    /// Consume a fired token. Returns `false` for stale tokens.
    pub fn accept(&mut self, token: TimerToken) -> bool {
        match self.timers.get(&token.kind) {
            Some(timer) if timer.generation == token.generation => {
                self.timers.remove(&token.kind);
                true
            }
            _ => false,
        }
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = TaskManager::new(tx);

        tasks.arm(TimerKind::Retry, Duration::from_millis(500));
        assert!(tasks.is_armed(TimerKind::Retry));

        let token = rx.recv().await.unwrap();
        assert_eq!(token.kind, TimerKind::Retry);
        assert!(tasks.accept(token));
        assert!(!tasks.accept(token));
        assert!(!tasks.is_armed(TimerKind::Retry));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_invalidates_previous_token() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = TaskManager::new(tx);

        tasks.arm(TimerKind::Heartbeat, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(20)).await;
        let stale = rx.recv().await.unwrap();

        tasks.arm(TimerKind::Heartbeat, Duration::from_millis(10));
        assert!(!tasks.accept(stale));

        let fresh = rx.recv().await.unwrap();
        assert!(tasks.accept(fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_silences_timers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = TaskManager::new(tx);

        tasks.arm(TimerKind::Retry, Duration::from_millis(100));
        tasks.arm(TimerKind::ConnectTimeout, Duration::from_millis(200));
        tasks.cancel_all();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }
}
