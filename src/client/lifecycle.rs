use std::time::Duration;
use tokio::time::Instant;

/// Foreground/background tracking for the owning app
#[derive(Debug, Clone)]
pub struct AppLifecycle {
    foreground: bool,
    backgrounded_at: Option<Instant>,
}

impl AppLifecycle {
    pub fn new() -> Self {
        Self {
            foreground: true,
            backgrounded_at: None,
        }
    }

    pub fn is_foreground(&self) -> bool {
        self.foreground
    }

    pub fn enter_background(&mut self, now: Instant) {
        if self.foreground {
            self.foreground = false;
            self.backgrounded_at = Some(now);
        }
    }

    /// Returns how long the app spent in the background, if it was there
    pub fn enter_foreground(&mut self, now: Instant) -> Option<Duration> {
        if self.foreground {
            return None;
        }
        self.foreground = true;
        self.backgrounded_at
            .take()
            .map(|at| now.saturating_duration_since(at))
    }
}

impl Default for AppLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
