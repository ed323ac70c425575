//! Fixed-interval task scheduler with an injectable clock.
//!
//! The scheduler owns one [`ScheduledTask`] per module. A task is due when
//! its `next_run_at` is not after the tick time; once returned by
//! [`Scheduler::due`] it is rebased to `now + interval`, so a stalled loop
//! never produces a burst of catch-up runs.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Minimum allowed interval (1 second).
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Errors from scheduler operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A task for this module already exists.
    #[error("module '{0}' is already scheduled")]
    DuplicateModule(String),
}

/// Source of the current time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic tests and simulations.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Start at the current instant.
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A periodic task for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub module_name: String,
    pub interval: Duration,
    pub next_run_at: Instant,
}

/// Set of periodic tasks, fixed once startup completes.
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    tasks: Vec<ScheduledTask>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            tasks: Vec::new(),
        }
    }

    /// Add a task that is due immediately.
    ///
    /// Intervals shorter than [`MIN_INTERVAL`] are clamped.
    pub fn register(
        &mut self,
        module_name: impl Into<String>,
        interval: Duration,
    ) -> Result<(), SchedulerError> {
        let module_name = module_name.into();
        if self.contains(&module_name) {
            return Err(SchedulerError::DuplicateModule(module_name));
        }

        let interval = if interval < MIN_INTERVAL {
            tracing::warn!(module = %module_name, min_interval = ?MIN_INTERVAL,
                "Interval is less than minimum allowed. Using minimum interval."
            );
            MIN_INTERVAL
        } else {
            interval
        };

        self.tasks.push(ScheduledTask {
            module_name,
            interval,
            next_run_at: self.clock.now(),
        });
        Ok(())
    }

    /// Names of every task due at `now`, in registration order.
    ///
    /// Each returned task is rebased to `now + interval`.
    pub fn due(&mut self, now: Instant) -> Vec<String> {
        self.tasks
            .iter_mut()
            .filter(|task| task.next_run_at <= now)
            .map(|task| {
                task.next_run_at = now + task.interval;
                task.module_name.clone()
            })
            .collect()
    }

    pub fn contains(&self, module_name: &str) -> bool {
        self.tasks.iter().any(|t| t.module_name == module_name)
    }

    pub fn tasks(&self) -> &[ScheduledTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> (Scheduler, ManualClock) {
        let clock = ManualClock::new();
        (Scheduler::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_all_due_after_registration_in_order() {
        let (mut scheduler, clock) = scheduler();
        let modules = ["cpu_monitor", "memory_monitor", "disk_monitor", "load_monitor"];
        for name in modules {
            scheduler.register(name, Duration::from_secs(60)).unwrap();
        }

        assert_eq!(scheduler.due(clock.now()), modules.to_vec());
    }

    #[test]
    fn test_not_due_again_before_interval() {
        let (mut scheduler, clock) = scheduler();
        scheduler
            .register("cpu_monitor", Duration::from_secs(10))
            .unwrap();

        assert_eq!(scheduler.due(clock.now()), vec!["cpu_monitor"]);
        for _ in 0..9 {
            clock.advance(Duration::from_secs(1));
            assert!(scheduler.due(clock.now()).is_empty());
        }
        clock.advance(Duration::from_secs(1));
        assert_eq!(scheduler.due(clock.now()), vec!["cpu_monitor"]);
    }

    #[test]
    fn test_mixed_intervals() {
        let (mut scheduler, clock) = scheduler();
        scheduler.register("fast", Duration::from_secs(2)).unwrap();
        scheduler.register("slow", Duration::from_secs(5)).unwrap();

        let mut fired = Vec::new();
        for second in 0..=10 {
            for name in scheduler.due(clock.now()) {
                fired.push((second, name));
            }
            clock.advance(Duration::from_secs(1));
        }

        let fast: Vec<_> = fired.iter().filter(|(_, n)| n == "fast").map(|(s, _)| *s).collect();
        let slow: Vec<_> = fired.iter().filter(|(_, n)| n == "slow").map(|(s, _)| *s).collect();
        assert_eq!(fast, vec![0, 2, 4, 6, 8, 10]);
        assert_eq!(slow, vec![0, 5, 10]);
    }

    #[test]
    fn test_rebases_after_stall() {
        let (mut scheduler, clock) = scheduler();
        scheduler.register("cpu_monitor", Duration::from_secs(10)).unwrap();
        scheduler.due(clock.now());

        // Stall for several intervals: only one run, then a full interval wait.
        clock.advance(Duration::from_secs(45));
        assert_eq!(scheduler.due(clock.now()), vec!["cpu_monitor"]);
        assert!(scheduler.due(clock.now()).is_empty());

        clock.advance(Duration::from_secs(9));
        assert!(scheduler.due(clock.now()).is_empty());
        clock.advance(Duration::from_secs(1));
        assert_eq!(scheduler.due(clock.now()), vec!["cpu_monitor"]);
    }

    #[test]
    fn test_duplicate_module() {
        let (mut scheduler, _clock) = scheduler();
        scheduler.register("cpu_monitor", Duration::from_secs(10)).unwrap();
        let err = scheduler
            .register("cpu_monitor", Duration::from_secs(20))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::DuplicateModule(ref n) if n == "cpu_monitor"));
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_interval_minimum() {
        let (mut scheduler, _clock) = scheduler();
        scheduler.register("cpu_monitor", Duration::ZERO).unwrap();
        assert_eq!(scheduler.tasks()[0].interval, MIN_INTERVAL);
    }
}
