//! Cooperative cancellation shared by every thread a search spawns.
//!
//! A token trips either when [`CancellationToken::cancel`] is called or when
//! its deadline passes. Hot loops poll [`CancellationToken::is_cancelled`];
//! blocking channel operations wait on [`CancelSignals`] inside a
//! `crossbeam_channel::select!` so they wake up the moment the token trips.
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Why a search stopped before draining its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The deadline elapsed
    DeadlineExceeded,
    /// [`CancellationToken::cancel`] was called
    Cancelled,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    // Dropping the sender disconnects every clone of `done`, which wakes any
    // select! blocked on it.
    trigger: Mutex<Option<Sender<()>>>,
    done: Receiver<()>,
}

/// Cloneable handle to one search's cancellation state.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// A token that only trips on explicit cancellation.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A token that also trips once `deadline` has passed.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::build(Some(deadline))
    }

    /// A token that trips `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Instant::now().checked_add(timeout))
    }

    fn build(deadline: Option<Instant>) -> Self {
        let (trigger, done) = crossbeam_channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline,
                trigger: Mutex::new(Some(trigger)),
                done,
            }),
        }
    }

    /// Trips the token. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        let mut trigger = match self.inner.trigger.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        trigger.take();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// True once cancelled or past the deadline.
    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// The reason the token tripped, if it has. Explicit cancellation wins
    /// over an elapsed deadline.
    pub fn reason(&self) -> Option<CancelReason> {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return Some(CancelReason::Cancelled);
        }
        match self.inner.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Receivers to park on in a `select!`. Each blocking thread takes its own
    /// set, since a deadline receiver delivers its tick only once.
    pub fn signals(&self) -> CancelSignals {
        let deadline = match self.inner.deadline {
            Some(at) => crossbeam_channel::at(at),
            None => crossbeam_channel::never(),
        };
        CancelSignals {
            cancelled: self.inner.done.clone(),
            deadline,
        }
    }
}

/// Per-thread wake-up sources for blocking operations.
///
/// `cancelled` never carries a message; it becomes ready (disconnected) when
/// the token is cancelled. `deadline` fires once when the deadline passes.
#[derive(Debug)]
pub struct CancelSignals {
    pub cancelled: Receiver<()>,
    pub deadline: Receiver<Instant>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::select;
    use std::thread;

    #[test]
    fn test_fresh_token_is_live() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert_eq!(token.reason(), None);
        assert_eq!(token.deadline(), None);
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        clone.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some(CancelReason::Cancelled));
    }

    #[test]
    fn test_deadline_trips_token() {
        let token = CancellationToken::with_timeout(Duration::from_millis(10));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(token.reason(), Some(CancelReason::DeadlineExceeded));
    }

    #[test]
    fn test_signals_wake_blocked_select_on_cancel() {
        let token = CancellationToken::new();
        let signals = token.signals();
        let (_tx, rx) = crossbeam_channel::bounded::<u32>(0);

        let canceller = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            canceller.cancel();
        });

        let woke_by_cancel = select! {
            recv(rx) -> _ => false,
            recv(signals.cancelled) -> _ => true,
            recv(signals.deadline) -> _ => false,
        };
        handle.join().unwrap();
        assert!(woke_by_cancel);
    }

    #[test]
    fn test_signals_wake_blocked_select_on_deadline() {
        let token = CancellationToken::with_timeout(Duration::from_millis(20));
        let signals = token.signals();
        let (_tx, rx) = crossbeam_channel::bounded::<u32>(0);

        let woke_by_deadline = select! {
            recv(rx) -> _ => false,
            recv(signals.cancelled) -> _ => false,
            recv(signals.deadline) -> _ => true,
        };
        assert!(woke_by_deadline);
        assert!(token.is_cancelled());
    }
}
