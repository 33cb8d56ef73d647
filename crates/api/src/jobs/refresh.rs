//! Auto-group refresh scheduler.
//!
//! A single background loop alternating between an event-aware wait and a
//! work pass over due auto-group zones. The wait ends on whichever comes
//! first: a shutdown signal (loop exits without another pass), a refresh
//! trigger (consumed on observation), or the configured wakeup ceiling.
//! Signals are per-instance primitives, so test schedulers do not interfere
//! with each other.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use domain::models::zone::{Zone, ZonePayload};
use domain::services::evaluation::evaluate_thresholds;
use domain::services::repository::ZoneRepository;
use domain::services::weather::WeatherProvider;

use crate::config::SchedulerConfig;

/// Outcome of the wait phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitOutcome {
    /// Run a work pass: a trigger fired or the ceiling elapsed.
    Proceed,
    /// Shutdown was requested; exit without another pass.
    Shutdown,
}

/// Cloneable, non-blocking handle for forcing an immediate refresh pass.
///
/// Safe to call from request handlers while the scheduler is mid-wait; the
/// signal is stored if the scheduler is not currently waiting.
#[derive(Clone)]
pub struct RefreshHandle {
    trigger: Arc<Notify>,
}

impl RefreshHandle {
    /// Signals the scheduler to start a work pass without waiting for the
    /// wakeup ceiling. Never blocks.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }
}

/// Background refresh scheduler with an explicit start/stop lifecycle.
pub struct RefreshScheduler {
    repo: Arc<dyn ZoneRepository>,
    weather: Arc<dyn WeatherProvider>,
    wakeup_timeout: Duration,
    evaluate: bool,
    trigger: Arc<Notify>,
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    pub fn new(
        repo: Arc<dyn ZoneRepository>,
        weather: Arc<dyn WeatherProvider>,
        config: &SchedulerConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            repo,
            weather,
            wakeup_timeout: Duration::from_secs(config.wakeup_timeout_secs),
            evaluate: config.evaluate_thresholds,
            trigger: Arc::new(Notify::new()),
            shutdown_tx,
            handle: None,
        }
    }

    /// Handle for triggering refreshes from elsewhere in the process.
    pub fn refresh_handle(&self) -> RefreshHandle {
        RefreshHandle {
            trigger: Arc::clone(&self.trigger),
        }
    }

    /// Spawns the scheduler loop. Idempotent per instance: calling twice
    /// replaces nothing, the first loop keeps running.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            warn!("refresh scheduler already started");
            return;
        }

        let repo = Arc::clone(&self.repo);
        let weather = Arc::clone(&self.weather);
        let trigger = Arc::clone(&self.trigger);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let wakeup_timeout = self.wakeup_timeout;
        let evaluate = self.evaluate;

        info!(
            wakeup_timeout_secs = wakeup_timeout.as_secs(),
            evaluate_thresholds = evaluate,
            "refresh scheduler starting"
        );

        self.handle = Some(tokio::spawn(async move {
            loop {
                match event_aware_wait(&trigger, &mut shutdown_rx, wakeup_timeout).await {
                    WaitOutcome::Shutdown => break,
                    WaitOutcome::Proceed => {
                        run_pass(repo.as_ref(), weather.as_ref(), evaluate).await;
                    }
                }
            }
            info!("refresh scheduler stopped");
        }));
    }

    /// Requests shutdown and waits for the loop to exit. No background
    /// activity survives this call.
    pub async fn stop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("refresh scheduler task panicked: {}", e);
            }
        }
    }
}

/// Waits for a trigger, shutdown, or the wakeup ceiling, whichever first.
/// Shutdown takes priority when several are ready at once.
async fn event_aware_wait(
    trigger: &Notify,
    shutdown_rx: &mut watch::Receiver<bool>,
    ceiling: Duration,
) -> WaitOutcome {
    tokio::select! {
        biased;
        changed = shutdown_rx.changed() => match changed {
            Ok(()) if *shutdown_rx.borrow_and_update() => WaitOutcome::Shutdown,
            // Sender dropped: nobody can stop us cleanly anymore, so exit.
            Err(_) => WaitOutcome::Shutdown,
            Ok(()) => WaitOutcome::Proceed,
        },
        _ = trigger.notified() => WaitOutcome::Proceed,
        _ = tokio::time::sleep(ceiling) => WaitOutcome::Proceed,
    }
}

/// One work pass: refresh every due auto-group zone.
///
/// A repository failure aborts only this pass; due zones stay due and are
/// retried after the next wait.
async fn run_pass(repo: &dyn ZoneRepository, weather: &dyn WeatherProvider, evaluate: bool) {
    let now = Utc::now();
    let due = match repo.find_due_auto_groups(now).await {
        Ok(due) => due,
        Err(e) => {
            error!(error = %e, "could not query due auto-group zones");
            return;
        }
    };

    if due.is_empty() {
        return;
    }

    info!(count = due.len(), "refreshing due auto-group zones");
    for mut zone in due {
        refresh_auto_group(repo, weather, evaluate, &mut zone).await;
    }
}

/// Refreshes one auto-group zone in place and persists it. Returns whether
/// the refreshed state reached the store.
///
/// Sub-zones are refreshed sequentially; a weather failure for one sub-zone
/// is logged and leaves that sub-zone's previous payload untouched while the
/// rest of the group still refreshes and the group still reschedules. A
/// failed write is logged here; the scheduler lets the zone stay due and
/// retry next cycle, while the manual refresh handler surfaces it.
pub(crate) async fn refresh_auto_group(
    repo: &dyn ZoneRepository,
    weather: &dyn WeatherProvider,
    evaluate: bool,
    zone: &mut Zone,
) -> bool {
    let name = zone.name.clone();
    let Some(payload) = zone.payload.as_mut().and_then(ZonePayload::as_auto_group_mut) else {
        warn!(zone = %name, "auto-group zone carries no group payload, skipping");
        return false;
    };

    for sub_zone in payload.zones.iter_mut() {
        match weather.fetch(&sub_zone.bbox).await {
            Ok(snapshot) => sub_zone.apply_snapshot(Some(&snapshot)),
            Err(e) => warn!(
                zone = %name,
                sub_zone = %sub_zone.name,
                error = %e,
                "weather fetch failed, keeping previous payload"
            ),
        }
    }

    if evaluate {
        let thresholds = payload.threshold.clone();
        evaluate_thresholds(&mut payload.zones, &thresholds);
    }

    payload.next_refresh = Utc::now() + chrono::Duration::seconds(payload.refresh_rate as i64);

    match repo.replace(zone).await {
        Ok(true) => {
            info!(zone = %name, "auto-group zone refreshed");
            true
        }
        Ok(false) => {
            warn!(zone = %name, "auto-group zone disappeared before write");
            false
        }
        Err(e) => {
            error!(zone = %name, error = %e, "could not persist refreshed auto-group zone");
            false
        }
    }
}
