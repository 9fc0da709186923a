//! Periodic drivers
//!
//! A [`PeriodicDriver`] is a Tokio task calling a synchronous tick function
//! at a fixed period until told to stop. The analog scheduler and the pulse
//! consumer each get one, so the two cadences never influence each other.
//!
//! ```text
//! spawn ──► interval.tick() ──► tick() ──► interval.tick() ──► …
//!                 ▲                                 │
//!                 └──────── stop signal ◄───────────┘  shutdown(): signal + join
//! ```
//!
//! The tick function contains no await point, so stopping (or aborting, on
//! drop) can only happen between two ticks, never inside one.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::error::{StationError, StationResult};

/// Fixed-period task with deterministic shutdown
#[derive(Debug)]
pub struct PeriodicDriver {
    name: &'static str,
    period: Duration,
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<u64>>,
}

impl PeriodicDriver {
    /// Start calling `tick` every `period` on the current Tokio runtime
    ///
    /// A late tick is delayed rather than bursted: the cadence resumes one
    /// period after the late tick ran.
    pub fn spawn<F>(name: &'static str, period: Duration, mut tick: F) -> StationResult<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| StationError::NoRuntime)?;
        let (stop, mut stopped) = watch::channel(false);

        let task = runtime.spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks = 0u64;
            loop {
                tokio::select! {
                    biased;
                    _ = stopped.changed() => break,
                    _ = interval.tick() => {
                        tick();
                        ticks += 1;
                    }
                }
            }
            log::debug!("{}: stopped after {} ticks", name, ticks);
            ticks
        });

        log::info!("{}: started, period {:?}", name, period);
        Ok(Self {
            name,
            period,
            stop,
            task: Some(task),
        })
    }

    /// Driver name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Tick period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Task still running
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop and wait for the task; returns the number of ticks run
    pub async fn shutdown(mut self) -> StationResult<u64> {
        // Receiver gone means the task already ended
        let _ = self.stop.send(true);
        let Some(task) = self.task.take() else {
            return Ok(0);
        };
        let ticks = task
            .await
            .map_err(|_| StationError::DriverFailed { name: self.name })?;
        log::info!("{}: shut down", self.name);
        Ok(ticks)
    }
}

impl Drop for PeriodicDriver {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = self.stop.send(true);
            task.abort();
        }
    }
}
