//! Orchestrator: the collection run loop.
//!
//! Ties the [`CollectorRegistry`], [`Scheduler`], [`PointBuilder`] and
//! [`Sink`] together. Each tick, due modules are dispatched one at a time in
//! registration order. Every failure (unresolvable module, collector error,
//! panic or timeout, rejected point) is logged and contained to that module
//! or point; nothing stops the tick or the loop.
//!
//! A collection that outlives its timeout keeps its module out of dispatch
//! until it has actually finished, so one module never runs twice at once.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::collector::{
    Collected, CollectorError, CollectorRegistry, ModuleDescriptor, RegistryError, Resolution,
};
use crate::config::ModuleEntry;
use crate::point::PointBuilder;
use crate::scheduler::{Clock, Scheduler, SystemClock};
use crate::sink::{Sink, SinkTarget};

/// How often the loop checks for due modules (1 second).
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

/// Default upper bound on one `collect()` call (30 seconds).
pub const DEFAULT_COLLECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default module interval when an entry has no override (60 seconds).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Outcome counters for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Modules that were due and dispatched.
    pub dispatched: usize,
    /// Modules whose resolution or collection failed.
    pub failed: usize,
    /// Points accepted by the sink.
    pub points_written: usize,
    /// Points the sink rejected; they are not retried.
    pub points_dropped: usize,
}

impl TickReport {
    fn absorb(&mut self, other: TickReport) {
        self.dispatched += other.dispatched;
        self.failed += other.failed;
        self.points_written += other.points_written;
        self.points_dropped += other.points_dropped;
    }
}

/// Builder for [`Orchestrator`].
pub struct OrchestratorBuilder {
    registry: CollectorRegistry,
    sink: Arc<dyn Sink>,
    target: SinkTarget,
    clock: Arc<dyn Clock>,
    point_builder: PointBuilder,
    default_interval: Duration,
    collect_timeout: Duration,
    tick_period: Duration,
}

impl OrchestratorBuilder {
    pub fn new(registry: CollectorRegistry, sink: Arc<dyn Sink>, target: SinkTarget) -> Self {
        Self {
            registry,
            sink,
            target,
            clock: Arc::new(SystemClock),
            point_builder: PointBuilder::new(),
            default_interval: DEFAULT_INTERVAL,
            collect_timeout: DEFAULT_COLLECT_TIMEOUT,
            tick_period: DEFAULT_TICK_PERIOD,
        }
    }

    /// Set the time source used for scheduling.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the point builder (e.g. one carrying static tags).
    pub fn point_builder(mut self, point_builder: PointBuilder) -> Self {
        self.point_builder = point_builder;
        self
    }

    /// Set the interval for modules without an override.
    pub fn default_interval(mut self, interval: Duration) -> Self {
        self.default_interval = interval;
        self
    }

    /// Set the upper bound on a single collection.
    pub fn collect_timeout(mut self, timeout: Duration) -> Self {
        self.collect_timeout = timeout;
        self
    }

    /// Set how often the run loop checks for due modules.
    pub fn tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Resolve configured modules and schedule every available one.
    ///
    /// Modules that are disabled, unknown or missing a prerequisite are
    /// logged once here and never scheduled.
    pub fn build(self, modules: &[ModuleEntry]) -> Orchestrator {
        let mut scheduler = Scheduler::new(Arc::clone(&self.clock));
        let mut descriptors = Vec::with_capacity(modules.len());
        let mut tag_keys = HashMap::new();
        let mut seen = HashSet::new();

        for entry in modules {
            let name = entry.name();

            if !seen.insert(name) {
                tracing::warn!(module = %name, "Skipping duplicate module");
                continue;
            }

            if !entry.enabled() {
                tracing::info!(module = %name, "Module disabled in configuration");
                descriptors.push(ModuleDescriptor::disabled(name));
                continue;
            }

            let resolved = self.registry.resolve(name);
            descriptors.push(ModuleDescriptor::from_resolution(name, &resolved));

            match resolved {
                Ok(Resolution::Available(collector)) => {
                    let interval = entry.interval_or(self.default_interval);
                    if let Err(e) = scheduler.register(name, interval) {
                        tracing::warn!(module = %name, error = %e, "Skipping duplicate module");
                        continue;
                    }
                    tag_keys.insert(name.to_string(), collector.tag_keys());
                    tracing::info!(
                        module = %name, interval = ?interval,
                        "Scheduled {} module", name
                    );
                }
                Ok(Resolution::Unavailable { reason }) => {
                    tracing::warn!(
                        module = %name, reason = %reason,
                        "Module unavailable, disabling {}", name
                    );
                }
                Err(e) => {
                    tracing::error!(module = %name, error = %e, "Module cannot be scheduled");
                }
            }
        }

        Orchestrator {
            registry: self.registry,
            scheduler,
            point_builder: self.point_builder,
            sink: self.sink,
            target: self.target,
            collect_timeout: self.collect_timeout,
            tick_period: self.tick_period,
            modules: descriptors,
            tag_keys,
            overdue: HashMap::new(),
        }
    }
}

/// The collection run loop.
pub struct Orchestrator {
    registry: CollectorRegistry,
    scheduler: Scheduler,
    point_builder: PointBuilder,
    sink: Arc<dyn Sink>,
    target: SinkTarget,
    collect_timeout: Duration,
    tick_period: Duration,
    modules: Vec<ModuleDescriptor>,
    tag_keys: HashMap<String, &'static [&'static str]>,
    /// Collections that timed out but have not finished yet.
    overdue: HashMap<String, JoinHandle<Result<Collected, CollectorError>>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("scheduler", &self.scheduler)
            .field("target", &self.target)
            .field("collect_timeout", &self.collect_timeout)
            .field("overdue", &self.overdue.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Startup view of every configured module.
    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    /// Names of scheduled modules, in registration order.
    pub fn scheduled(&self) -> Vec<&str> {
        self.scheduler
            .tasks()
            .iter()
            .map(|t| t.module_name.as_str())
            .collect()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Run every module due at `now`, sequentially.
    pub async fn tick(&mut self, now: Instant) -> TickReport {
        let due = self.scheduler.due(now);
        let mut report = TickReport::default();
        if due.is_empty() {
            return report;
        }

        tracing::debug!(count = due.len(), "Dispatching due modules");
        for name in &due {
            report.absorb(self.run_module(name).await);
        }
        report
    }

    /// Run the loop until `shutdown` is cancelled.
    ///
    /// A tick in progress when shutdown is requested runs to completion
    /// (each collection is still bounded by the collect timeout).
    pub async fn run(&mut self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(modules = self.scheduler.len(), "Orchestrator started");
        if self.scheduler.is_empty() {
            tracing::warn!("No modules scheduled");
        }

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let now = self.scheduler.clock().now();
                    let report = self.tick(now).await;
                    if report.dispatched > 0 {
                        tracing::debug!(
                            dispatched = report.dispatched,
                            failed = report.failed,
                            points_written = report.points_written,
                            points_dropped = report.points_dropped,
                            "Tick complete"
                        );
                    }
                }
            }
        }

        tracing::info!("Orchestrator stopped");
    }

    async fn run_module(&mut self, name: &str) -> TickReport {
        let mut report = TickReport {
            dispatched: 1,
            ..TickReport::default()
        };

        let data = match self.collect(name).await {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(module = %name, error = %e, "Error running module {}", name);
                tracing::debug!(module = %name, error = ?e, "Collection failure detail");
                report.failed = 1;
                return report;
            }
        };

        let records = data.len();
        let tag_keys = self.tag_keys.get(name).copied().unwrap_or_default();
        let points = self.point_builder.build_tagged(name, tag_keys, data);
        tracing::debug!(
            module = %name, records, points = points.len(),
            "Collection succeeded"
        );

        for point in &points {
            match self.sink.write(point, &self.target).await {
                Ok(()) => report.points_written += 1,
                Err(e) => {
                    tracing::error!(module = %name, error = %e, "Failed to write point");
                    tracing::debug!(module = %name, point = ?point, error = ?e, "Dropped point");
                    report.points_dropped += 1;
                }
            }
        }
        report
    }

    /// Resolve and invoke one collector, containing errors, panics and hangs.
    async fn collect(&mut self, name: &str) -> Result<Collected, ModuleFailure> {
        if let Some(previous) = self.overdue.get(name) {
            if !previous.is_finished() {
                return Err(ModuleFailure::StillRunning);
            }
            self.overdue.remove(name);
        }

        let collector = self.registry.resolve_available(name)?;

        let mut task = tokio::spawn(async move { collector.collect().await });
        match tokio::time::timeout(self.collect_timeout, &mut task).await {
            Ok(Ok(result)) => Ok(result?),
            Ok(Err(join_err)) => Err(ModuleFailure::Panicked(join_err.to_string())),
            Err(_) => {
                // Abort only takes effect at the next await point; a collector
                // blocking its thread keeps running until it returns.
                task.abort();
                self.overdue.insert(name.to_string(), task);
                Err(CollectorError::Timeout(self.collect_timeout).into())
            }
        }
    }
}

/// Why one module invocation produced no data.
#[derive(Debug, thiserror::Error)]
enum ModuleFailure {
    #[error(transparent)]
    Resolve(#[from] RegistryError),

    #[error(transparent)]
    Collect(#[from] CollectorError),

    #[error("collector panicked: {0}")]
    Panicked(String),

    #[error("previous collection has not finished, skipping this cycle")]
    StillRunning,
}
