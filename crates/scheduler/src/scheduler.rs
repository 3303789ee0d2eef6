//! Automatic backup scheduler
//!
//! `Disabled <-> Enabled`. While enabled, one armed task sleeps until the
//! next trigger, performs a silent backup, then computes and arms the next
//! trigger. Failures never escape the task; they set `pending_retry`.

use crate::error::Result;
use crate::job::BackupJob;
use crate::state::{SchedulerState, StateStore};
use crate::trigger::Trigger;
use chrono::{Local, Utc};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Wait before asking the trigger again after it failed to compute
const RESCHEDULE_BACKOFF: Duration = Duration::from_secs(15 * 60);

/// Result of one silent backup attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupAttempt {
    Completed,
    /// Remote medium or network unreachable; retried later
    Deferred(String),
    Failed(String),
}

pub struct BackupScheduler {
    job: Arc<dyn BackupJob>,
    state_store: Arc<dyn StateStore>,
    trigger: Trigger,
    state: Mutex<SchedulerState>,
    armed: Mutex<Option<JoinHandle<()>>>,
    running: tokio::sync::Mutex<()>,
}

impl BackupScheduler {
    /// Load persisted state; nothing is armed yet
    pub fn new(
        job: Arc<dyn BackupJob>,
        state_store: Arc<dyn StateStore>,
        trigger: Trigger,
    ) -> Result<Arc<Self>> {
        let state = state_store.load()?;
        Ok(Arc::new(Self {
            job,
            state_store,
            trigger,
            state: Mutex::new(state),
            armed: Mutex::new(None),
            running: tokio::sync::Mutex::new(()),
        }))
    }

    pub fn state(&self) -> SchedulerState {
        self.state.lock().clone()
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    /// Whether a trigger task is currently armed
    pub fn is_armed(&self) -> bool {
        self.armed
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Turn automatic backup on and arm the trigger
    pub fn enable(self: &Arc<Self>) -> Result<()> {
        self.update(|state| state.enabled = true)?;
        info!("Automatic backup enabled ({})", self.trigger);
        self.arm();
        Ok(())
    }

    /// Turn automatic backup off; a pending trigger is cancelled
    pub fn disable(&self) -> Result<()> {
        self.update(|state| state.enabled = false)?;
        self.cancel();
        info!("Automatic backup disabled");
        Ok(())
    }

    /// Arm the trigger if automatic backup is enabled. Called at startup.
    pub fn start(self: &Arc<Self>) -> bool {
        if self.state.lock().enabled {
            self.arm();
            true
        } else {
            debug!("Automatic backup disabled, not arming");
            false
        }
    }

    /// Retry once if the previous attempt did not complete
    pub async fn retry_if_needed(&self) -> Option<BackupAttempt> {
        let state = self.refresh();
        if !(state.enabled && state.pending_retry) {
            return None;
        }
        info!("Retrying pending automatic backup");
        Some(self.perform_silent_backup().await)
    }

    /// Back up without user interaction. Never returns an error: the
    /// outcome is recorded in the state instead.
    pub async fn perform_silent_backup(&self) -> BackupAttempt {
        let _running = self.running.lock().await;
        let started = Utc::now();

        let attempt = match self.job.run().await {
            Ok(()) => BackupAttempt::Completed,
            Err(e) if e.is_unavailable() => BackupAttempt::Deferred(e.to_string()),
            Err(e) => BackupAttempt::Failed(e.to_string()),
        };

        let saved = self.update(|state| {
            state.last_attempt = Some(started);
            match &attempt {
                BackupAttempt::Completed => {
                    state.pending_retry = false;
                    state.last_automatic_backup = Some(started);
                }
                BackupAttempt::Deferred(_) | BackupAttempt::Failed(_) => {
                    state.pending_retry = true;
                }
            }
        });
        if let Err(e) = saved {
            error!("Could not persist scheduler state: {}", e);
        }

        match &attempt {
            BackupAttempt::Completed => info!("Automatic backup completed"),
            BackupAttempt::Deferred(reason) => info!("Automatic backup deferred: {}", reason),
            BackupAttempt::Failed(reason) => warn!("Automatic backup failed: {}", reason),
        }
        attempt
    }

    fn arm(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(run_trigger_loop(weak));
        if let Some(previous) = self.armed.lock().replace(handle) {
            previous.abort();
        }
    }

    fn cancel(&self) {
        if let Some(handle) = self.armed.lock().take() {
            handle.abort();
        }
    }

    /// Delay until the next trigger. A trigger that cannot be computed is
    /// recorded as a pending retry and asked again after a backoff.
    fn next_delay(&self) -> Duration {
        match self.trigger.delay_from(&Local::now()) {
            Ok(delay) => {
                debug!("Next automatic backup in {:?}", delay);
                delay
            }
            Err(e) => {
                warn!("Could not arm next automatic backup: {}", e);
                if let Err(e) = self.update(|state| state.pending_retry = true) {
                    error!("Could not persist scheduler state: {}", e);
                }
                RESCHEDULE_BACKOFF
            }
        }
    }

    /// Reload the persisted state. Another process (`tv auto disable`) may
    /// have changed it since this scheduler was created.
    fn refresh(&self) -> SchedulerState {
        match self.state_store.load() {
            Ok(persisted) => {
                *self.state.lock() = persisted.clone();
                persisted
            }
            Err(e) => {
                warn!("Could not reload scheduler state, using cached copy: {}", e);
                self.state()
            }
        }
    }

    /// Apply a change to the persisted state and save it; memory is only
    /// updated once saved
    fn update(&self, change: impl FnOnce(&mut SchedulerState)) -> Result<()> {
        let mut state = self.state.lock();
        let mut next = match self.state_store.load() {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!("Could not reload scheduler state, using cached copy: {}", e);
                state.clone()
            }
        };
        change(&mut next);
        self.state_store.save(&next)?;
        *state = next;
        Ok(())
    }
}

impl Drop for BackupScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Sleep, back up, re-arm. Holds only a weak reference so dropping the
/// scheduler ends the loop.
async fn run_trigger_loop(weak: Weak<BackupScheduler>) {
    loop {
        let delay = match weak.upgrade() {
            Some(scheduler) => scheduler.next_delay(),
            None => return,
        };

        tokio::time::sleep(delay).await;

        let Some(scheduler) = weak.upgrade() else {
            return;
        };
        if !scheduler.refresh().enabled {
            info!("Automatic backup was disabled, trigger stopped");
            return;
        }
        scheduler.perform_silent_backup().await;
    }
}
