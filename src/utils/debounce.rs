//! Quiet-period coalescing for live search input.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEBOUNCE_ENV: &str = "TABLE_PAGER_DEBOUNCE_MS";

/// Debounce delay from `TABLE_PAGER_DEBOUNCE_MS`, else [`DEFAULT_DEBOUNCE`].
pub fn debounce_from_env() -> Duration {
    parse_debounce(std::env::var(DEBOUNCE_ENV).ok().as_deref())
}

fn parse_debounce(raw: Option<&str>) -> Duration {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return DEFAULT_DEBOUNCE;
    };
    match raw.parse::<u64>() {
        Ok(ms) => Duration::from_millis(ms),
        Err(_) => {
            warn!(
                value = raw,
                "{DEBOUNCE_ENV} is not a whole number of milliseconds; using default"
            );
            DEFAULT_DEBOUNCE
        }
    }
}

/// Emits a pushed search term only after `delay` has passed without another push.
///
/// Must be used inside a tokio runtime.
#[derive(Debug)]
pub struct SearchDebouncer {
    delay: Duration,
    tx: UnboundedSender<String>,
    pending: Option<Pending>,
}

/// The scheduled term is taken from `term` exactly once, either by the timer
/// task (which sends it) or by [`SearchDebouncer::flush`].
#[derive(Debug)]
struct Pending {
    token: CancellationToken,
    term: Arc<Mutex<Option<String>>>,
}

fn lock_slot(slot: &Mutex<Option<String>>) -> MutexGuard<'_, Option<String>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> (Self, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        (
            Self {
                delay,
                tx,
                pending: None,
            },
            rx,
        )
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn push(&mut self, term: impl Into<String>) {
        self.cancel();

        let token = CancellationToken::new();
        let child = token.clone();
        let term = Arc::new(Mutex::new(Some(term.into())));
        let slot = Arc::clone(&term);
        let tx = self.tx.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                () = child.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let mut slot = lock_slot(&slot);
                    if let Some(term) = slot.take() {
                        let _ = tx.send(term);
                    }
                }
            }
        });
        self.pending = Some(Pending { token, term });
    }

    /// Returns the pending term now instead of after the quiet period.
    ///
    /// `None` when nothing is pending or the timer already sent it; in the
    /// latter case the term is in the receiver by the time this returns.
    pub fn flush(&mut self) -> Option<String> {
        let pending = self.pending.take()?;
        pending.token.cancel();
        lock_slot(&pending.term).take()
    }

    /// Drops the pending term, if any.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.token.cancel();
            lock_slot(&pending.term).take();
        }
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
