//! The last-read position and the coalescing writer that persists it.
//!
//! Scrolling reports a new position many times per second. Writes are
//! collapsed: the first report opens a window, later reports inside it
//! replace the pending value, and the most recent value is written when the
//! window closes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::store::{self, KeyValueStore};

pub const LAST_READ_KEY: &str = "lastRead";
pub const LAST_READ_WINDOW: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LastRead {
    pub surah: u32,
    pub ayah: u32,
}

impl Default for LastRead {
    fn default() -> Self {
        Self { surah: 1, ayah: 1 }
    }
}

impl LastRead {
    pub fn new(surah: u32, ayah: u32) -> Self {
        Self { surah, ayah }
    }

    /// Nothing read yet: the position is still the very first verse.
    pub fn is_start(&self) -> bool {
        *self == Self::default()
    }

    /// Stored position, or `1:1` when absent or unreadable.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        store::get_as::<LastRead>(store, LAST_READ_KEY).unwrap_or_default()
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> anyhow::Result<()> {
        store::set_as(store, LAST_READ_KEY, self)
    }
}

/// A pending-value slot with a fixed window.
#[derive(Debug, Clone)]
pub struct Debounce<T> {
    window: Duration,
    pending: Option<T>,
    opened_at: Option<Instant>,
}

impl<T> Debounce<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            opened_at: None,
        }
    }

    /// Replace the pending value. Opens the window if none is open.
    pub fn submit(&mut self, value: T, now: Instant) {
        if self.opened_at.is_none() {
            self.opened_at = Some(now);
        }
        self.pending = Some(value);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.opened_at.map(|opened| opened + self.window)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The pending value once the window has closed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.take(),
            _ => None,
        }
    }

    /// The pending value regardless of the window.
    pub fn take(&mut self) -> Option<T> {
        self.opened_at = None;
        self.pending.take()
    }
}

/// Background writer for the last-read position.
pub struct LastReadWriter {
    // `None` drops whatever is pending
    tx: mpsc::UnboundedSender<Option<LastRead>>,
    last_reported: Option<LastRead>,
    task: JoinHandle<()>,
}

impl LastReadWriter {
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<dyn KeyValueStore>, window: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_writer(store, window, rx));
        Self {
            tx,
            last_reported: None,
            task,
        }
    }

    /// Record the reading position. Repeats of the previous report are
    /// dropped here; everything else is coalesced by the writer task.
    pub fn report(&mut self, position: LastRead) {
        if self.last_reported == Some(position) {
            return;
        }
        self.last_reported = Some(position);
        if self.tx.send(Some(position)).is_err() {
            warn!("last-read writer has stopped, position {}:{} not saved", position.surah, position.ayah);
        }
    }

    pub fn last_reported(&self) -> Option<LastRead> {
        self.last_reported
    }

    /// Forget any pending position without writing it. Used after the store
    /// has been cleared.
    pub fn discard(&mut self) {
        self.last_reported = None;
        if self.tx.send(None).is_err() {
            warn!("last-read writer has stopped");
        }
    }

    /// Flush whatever is pending and stop the writer.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            warn!(error = %e, "last-read writer task failed");
        }
    }
}

async fn run_writer(
    store: Arc<dyn KeyValueStore>,
    window: Duration,
    mut rx: mpsc::UnboundedReceiver<Option<LastRead>>,
) {
    let mut slot = Debounce::new(window);

    loop {
        let received = match slot.deadline() {
            Some(deadline) => {
                tokio::select! {
                    received = rx.recv() => received,
                    _ = tokio::time::sleep_until(deadline.into()) => {
                        if let Some(position) = slot.poll(Instant::now()) {
                            persist(store.as_ref(), position);
                        }
                        continue;
                    }
                }
            }
            None => rx.recv().await,
        };

        match received {
            Some(Some(position)) => slot.submit(position, Instant::now()),
            Some(None) => {
                if let Some(dropped) = slot.take() {
                    debug!(surah = dropped.surah, ayah = dropped.ayah, "discarded pending last read");
                }
            }
            None => break,
        }
    }

    if let Some(position) = slot.take() {
        persist(store.as_ref(), position);
    }
}

fn persist(store: &dyn KeyValueStore, position: LastRead) {
    match position.save(store) {
        Ok(()) => debug!(surah = position.surah, ayah = position.ayah, "saved last read"),
        Err(e) => warn!(error = %e, "failed to save last read"),
    }
}
