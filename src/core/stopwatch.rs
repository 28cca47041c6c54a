//! Named wall-clock timers.

use std::collections::HashMap;

use log::warn;
use web_time::{Duration, Instant};

/// A set of named timers.
///
/// A timer is started by name and finished by the same name. Starting a running
/// timer again restarts it.
#[derive(Debug, Default)]
pub struct Stopwatches {
    running: HashMap<String, Instant>,
    last: HashMap<String, Duration>,
}

impl Stopwatches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_timer(&mut self, name: &str) {
        self.running.insert(name.to_string(), Instant::now());
    }

    /// Stops the timer and returns how long it ran.
    ///
    /// Returns `None` and logs a warning if no timer of that name is running.
    pub fn finish_timer(&mut self, name: &str) -> Option<Duration> {
        let Some(start) = self.running.remove(name) else {
            warn!("Tried to finish stopwatch '{}' which was never started", name);
            return None;
        };
        let elapsed = start.elapsed();
        self.last.insert(name.to_string(), elapsed);
        Some(elapsed)
    }

    /// Duration of the last finished run of `name`.
    pub fn last_duration(&self, name: &str) -> Option<Duration> {
        self.last.get(name).copied()
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.running.contains_key(name)
    }
}
