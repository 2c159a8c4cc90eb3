//! Background scheduler for full refetch runs.
//!
//! The cadence is either a fixed interval or a cron expression, chosen
//! once from configuration. Each fire spawns the orchestrator's
//! `trigger_now` on its own task; overlapping fires are absorbed by the
//! orchestrator's single-flight guard.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::orchestrator::RefetchOrchestrator;
use crate::config::{RefetchConfig, RefetchMechanism};
use crate::{FeedSyncError, Result};

/// Parse a cron expression.
///
/// Five-field expressions are read as Unix cron: a `0` seconds field is
/// prepended and numeric weekdays (0-7, Sunday is 0 or 7) are shifted to
/// the 1-7 numbering used by `cron`, where 1 is Sunday. Six and
/// seven-field expressions are used as given.
pub fn parse_cron_expression(expr: &str) -> Result<Schedule> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    let normalized = if fields.len() == 5 {
        format!(
            "0 {} {} {} {} {}",
            fields[0],
            fields[1],
            fields[2],
            fields[3],
            unix_weekdays(fields[4])
        )
    } else {
        fields.join(" ")
    };

    Schedule::from_str(&normalized)
        .map_err(|e| FeedSyncError::Config(format!("invalid cron expression '{}': {}", expr, e)))
}

/// Rewrite a Unix day-of-week field for the `cron` crate.
///
/// Names, `*` and `?` pass through; anything unparseable is left for
/// `Schedule::from_str` to reject.
fn unix_weekdays(field: &str) -> String {
    field
        .split(',')
        .map(|part| {
            let (base, step) = match part.split_once('/') {
                Some((base, step)) => (base, Some(step)),
                None => (part, None),
            };
            let with_step = |s: String| match step {
                Some(step) => format!("{}/{}", s, step),
                None => s,
            };

            if let Some((start, end)) = base.split_once('-') {
                match (unix_day(start), unix_day(end)) {
                    (Some(a), Some(b)) if a <= b => with_step(format!("{}-{}", a, b)),
                    // Ranges ending on Sunday (7) wrap past the end of the week
                    (Some(a), Some(1)) if step.is_none() => format!("{}-7,1", a),
                    (Some(a), Some(b)) if step.is_none() => format!("{}-7,1-{}", a, b),
                    _ => part.to_string(),
                }
            } else {
                match unix_day(base) {
                    Some(day) => with_step(day.to_string()),
                    None => part.to_string(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn unix_day(value: &str) -> Option<u8> {
    match value.parse::<u8>() {
        Ok(day) if day <= 7 => Some(day % 7 + 1),
        _ => None,
    }
}

/// When the scheduler fires.
#[derive(Debug, Clone)]
pub enum Cadence {
    /// Every period, starting one period after start.
    Interval(Duration),
    /// On each time matched by the schedule.
    Cron(Schedule),
}

impl Cadence {
    /// Build the cadence selected by the refetch configuration.
    pub fn from_config(config: &RefetchConfig) -> Result<Self> {
        match config.mechanism {
            RefetchMechanism::Interval => {
                let period = config.interval();
                if period.is_zero() {
                    return Err(FeedSyncError::Config(
                        "refetch interval must be greater than zero".to_string(),
                    ));
                }
                Ok(Cadence::Interval(period))
            }
            RefetchMechanism::Cron => Ok(Cadence::Cron(parse_cron_expression(
                &config.cron_expression,
            )?)),
        }
    }
}

/// Triggers the orchestrator on a cadence.
pub struct Scheduler {
    orchestrator: Arc<RefetchOrchestrator>,
    cadence: Cadence,
}

impl Scheduler {
    /// Create a scheduler that will trigger `orchestrator` on `cadence`.
    pub fn new(orchestrator: Arc<RefetchOrchestrator>, cadence: Cadence) -> Self {
        Self {
            orchestrator,
            cadence,
        }
    }

    /// Create a scheduler from configuration, rejecting invalid cadences.
    pub fn from_config(
        orchestrator: Arc<RefetchOrchestrator>,
        config: &RefetchConfig,
    ) -> Result<Self> {
        Ok(Self::new(orchestrator, Cadence::from_config(config)?))
    }

    /// Start the timer on a background task.
    ///
    /// Fails with `Config` when called outside a Tokio runtime.
    pub fn start(self) -> Result<SchedulerHandle> {
        let runtime = Handle::try_current().map_err(|e| {
            FeedSyncError::Config(format!("scheduler needs a Tokio runtime: {}", e))
        })?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = match self.cadence {
            Cadence::Interval(period) => {
                info!("Scheduling feed refetch every {} ms", period.as_millis());
                runtime.spawn(run_interval(self.orchestrator, period, shutdown_rx))
            }
            Cadence::Cron(schedule) => {
                info!("Scheduling feed refetch with cron '{}'", schedule);
                runtime.spawn(run_cron(self.orchestrator, schedule, shutdown_rx))
            }
        };

        Ok(SchedulerHandle {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }
}

/// Owns the scheduler task. Dropping the handle aborts the timer.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stop firing and wait for the timer task to exit.
    ///
    /// A refetch already in flight keeps running on its own task.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Scheduler task ended abnormally: {}", e);
            }
        }
        info!("Scheduler stopped");
    }

    /// Returns true once the timer task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn fire(orchestrator: &Arc<RefetchOrchestrator>) {
    debug!("Scheduler fired");
    let orchestrator = Arc::clone(orchestrator);
    tokio::spawn(async move { orchestrator.trigger_now().await });
}

async fn run_interval(
    orchestrator: Arc<RefetchOrchestrator>,
    period: Duration,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = timer.tick() => fire(&orchestrator),
            _ = &mut shutdown => break,
        }
    }
}

async fn run_cron(
    orchestrator: Arc<RefetchOrchestrator>,
    schedule: Schedule,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut after = Utc::now();

    loop {
        let Some(next) = schedule.after(&after).next() else {
            info!("Cron schedule has no further fire times");
            break;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        debug!("Next scheduled refetch at {}", next);

        tokio::select! {
            _ = tokio::time::sleep(wait) => fire(&orchestrator),
            _ = &mut shutdown => break,
        }

        // Skip fire times that passed while we were asleep
        after = next.max(Utc::now());
    }
}
