//! Cancellable monitoring poller.
//!
//! While active, a spawned task fetches a [`MonitoringSample`] from the
//! backend once per interval and publishes it as the latest sample. The first
//! fetch happens one full interval after `start`.
//!
//! Stopping signals the task over a `watch` shutdown channel and aborts its
//! `JoinHandle`. A sample is committed under the watch channel's write lock
//! only if shutdown has not been signalled, and `stop` takes that lock after
//! signalling, so no sample is committed once `stop` has returned. `start` and
//! `stop` are serialized under one lock: repeated starts never spawn a second
//! timer, and stop-then-start always leaves exactly one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::backend::Backend;
use crate::domain::MonitoringSample;
use crate::obs;

/// Lower bound for the poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

struct PollerTask {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Periodic metrics fetcher with explicit start/stop.
pub struct MonitoringPoller {
    backend: Arc<dyn Backend>,
    interval: Duration,
    latest: Arc<watch::Sender<Option<MonitoringSample>>>,
    fetches: Arc<AtomicU64>,
    task: Mutex<Option<PollerTask>>,
}

impl MonitoringPoller {
    pub fn new(backend: Arc<dyn Backend>, interval: Duration) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            backend,
            interval: interval.max(MIN_POLL_INTERVAL),
            latest: Arc::new(latest),
            fetches: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }

    fn task(&self) -> MutexGuard<'_, Option<PollerTask>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_active(&self) -> bool {
        self.task()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Start polling. Returns `false` if already active.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut slot = self.task();
        if slot.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            return false;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.backend),
            self.interval,
            Arc::clone(&self.latest),
            Arc::clone(&self.fetches),
            shutdown_rx,
        ));
        *slot = Some(PollerTask {
            shutdown_tx,
            handle,
        });

        obs::emit_monitor_started(self.interval.as_millis() as u64);
        true
    }

    /// Stop polling immediately. Returns `false` if not active.
    pub fn stop(&self) -> bool {
        let Some(task) = self.task().take() else {
            return false;
        };
        let _ = task.shutdown_tx.send(true);
        task.handle.abort();
        // Waits out a commit already holding the slot; later ones see the flag.
        self.latest.send_if_modified(|_| false);

        obs::emit_monitor_stopped(self.fetch_count());
        true
    }

    /// Flip between active and stopped. Returns the new active state.
    pub fn toggle(&self) -> bool {
        if self.is_active() {
            self.stop();
            false
        } else {
            self.start()
        }
    }

    /// Most recent sample, kept after stop and after a failed fetch.
    pub fn latest(&self) -> Option<MonitoringSample> {
        self.latest.borrow().clone()
    }

    /// Receiver that observes every committed sample.
    pub fn subscribe(&self) -> watch::Receiver<Option<MonitoringSample>> {
        self.latest.subscribe()
    }

    /// Number of fetches issued to the backend since creation.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Drop for MonitoringPoller {
    fn drop(&mut self) {
        if let Some(task) = self.task().take() {
            task.handle.abort();
        }
    }
}

async fn poll_loop(
    backend: Arc<dyn Backend>,
    period: Duration,
    latest: Arc<watch::Sender<Option<MonitoringSample>>>,
    fetches: Arc<AtomicU64>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                fetches.fetch_add(1, Ordering::SeqCst);
                let result = tokio::select! {
                    result = backend.sample_metrics() => result,
                    _ = shutdown_rx.changed() => break,
                };
                if *shutdown_rx.borrow() {
                    break;
                }
                match result {
                    Ok(sample) => {
                        // Re-checked under the slot's write lock; see `stop`.
                        latest.send_if_modified(|slot| {
                            if *shutdown_rx.borrow() {
                                return false;
                            }
                            obs::emit_monitor_sample(&sample);
                            *slot = Some(sample);
                            true
                        });
                    }
                    Err(e) => obs::emit_monitor_fetch_error(&e),
                }
            }

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}
