//! Deferred work for the monitors
//!
//! Every monitor defers its slow work (UI-settle waits, delegation waits,
//! tap pacing) to a delay queue it owns: a single worker thread executing
//! tasks cooperatively in FIFO order. Delayed work checks the owner's
//! liveness flag before acting, so a monitor torn down between scheduling
//! and execution silently drops the pending work instead of acting on stale
//! state. Models the platform's post-delayed handler plus its
//! remove-all-callbacks teardown.

use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Sleep slice while waiting out a delay, so shutdown is never stuck behind
/// a long wait.
const CANCEL_POLL_MS: u64 = 25;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Single-threaded cooperative delay queue.
///
/// Each task carries an absolute deadline fixed at scheduling time; the
/// worker sleeps only the remainder once the task is dequeued, so delays
/// overlap instead of serialising when several tasks are scheduled in a
/// burst.
pub struct DelayQueue {
    label: String,
    sender: Mutex<Option<Sender<(Instant, Task)>>>,
    alive: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DelayQueue {
    /// Spawn the worker. `alive` is the owning monitor's liveness flag; the
    /// queue shares it rather than keeping its own so that tearing the
    /// monitor down cancels queued work and in-flight pacing alike.
    pub fn new(label: &str, alive: Arc<AtomicBool>) -> Self {
        let (sender, receiver) = unbounded::<(Instant, Task)>();
        let worker_alive = Arc::clone(&alive);
        let worker_label = label.to_string();

        let worker = thread::Builder::new()
            .name(format!("delay-{label}"))
            .spawn(move || {
                while let Ok((deadline, task)) = receiver.recv() {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if !interruptible_sleep(remaining, &worker_alive) {
                        tracing::debug!("{worker_label}: dropping delayed task, owner torn down");
                        continue;
                    }
                    task();
                }
                tracing::debug!("{worker_label}: delay worker exiting");
            })
            .ok();

        if worker.is_none() {
            tracing::error!("{label}: failed to spawn delay worker");
        }

        Self {
            label: label.to_string(),
            sender: Mutex::new(Some(sender)),
            alive,
            worker: Mutex::new(worker),
        }
    }

    /// Schedule `task` to run after `delay`, measured from now. A no-op
    /// once the owner is torn down.
    pub fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.alive.load(Ordering::SeqCst) {
            tracing::debug!("{}: schedule ignored, owner torn down", self.label);
            return;
        }
        let deadline = Instant::now() + delay;
        if let Some(sender) = self.sender.lock().as_ref() {
            if sender.send((deadline, Box::new(task))).is_err() {
                tracing::warn!("{}: delay worker gone, task dropped", self.label);
            }
        }
    }

    /// Tear down: pending tasks are dropped and the worker joined.
    pub fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
        // Closing the channel wakes the worker out of recv.
        self.sender.lock().take();
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::error!("{}: delay worker panicked", self.label);
            }
        }
    }
}

impl Drop for DelayQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sleep for `delay` in small slices, returning false as soon as `alive`
/// goes down.
pub(crate) fn interruptible_sleep(delay: Duration, alive: &AtomicBool) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if !alive.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        let remaining = deadline - now;
        thread::sleep(remaining.min(Duration::from_millis(CANCEL_POLL_MS)));
    }
}
