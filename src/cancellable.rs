//! Cancellation handles for in-flight asynchronous operations.
//!
//! A [`Cancellable`] is handed out by every asynchronous operation of the
//! crate (progressive downloads, HTTP resources). It carries no result: the
//! operation reports the outcome itself, with a `cancelled` error when the
//! handle was triggered first.

use tokio_util::sync::{CancellationToken, DropGuard};

/// Capability to abort an in-flight operation.
///
/// Clones share the same underlying token, so cancelling any clone cancels
/// the operation. Cancelling is idempotent and has no effect once the
/// operation has completed.
#[derive(Debug, Clone, Default)]
pub struct Cancellable {
    token: CancellationToken,
}

impl Cancellable {
    /// Creates a new, not yet cancelled handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of the operation.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once [`cancel`](Self::cancel) was called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when the handle is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Returns a handle cancelled together with `self`, which can also be
    /// cancelled on its own without affecting `self`.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Returns a guard cancelling the operation when dropped, unless disarmed.
    #[must_use]
    pub fn drop_guard(self) -> DropGuard {
        self.token.drop_guard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let cancellable = Cancellable::new();
        let clone = cancellable.clone();
        assert!(!clone.is_cancelled());

        cancellable.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let cancellable = Cancellable::new();
        cancellable.cancel();
        cancellable.cancel();
        assert!(cancellable.is_cancelled());
    }

    #[test]
    fn test_child_follows_parent_but_not_reverse() {
        let parent = Cancellable::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());

        let other = parent.child();
        parent.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_drop_guard_cancels_on_drop() {
        let cancellable = Cancellable::new();
        {
            let _guard = cancellable.clone().drop_guard();
        }
        assert!(cancellable.is_cancelled());

        let kept = Cancellable::new();
        let guard = kept.clone().drop_guard();
        let _ = guard.disarm();
        assert!(!kept.is_cancelled());
    }

    #[test]
    fn test_cancelled_future_wakes_on_cancel() {
        let cancellable = Cancellable::new();
        let mut waiter = tokio_test::task::spawn(cancellable.cancelled());
        tokio_test::assert_pending!(waiter.poll());

        cancellable.cancel();
        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }

    #[test]
    fn test_child_cancelled_future_wakes_on_parent_cancel() {
        let parent = Cancellable::new();
        let child = parent.child();
        let mut waiter = tokio_test::task::spawn(child.cancelled());
        tokio_test::assert_pending!(waiter.poll());

        parent.cancel();
        tokio_test::assert_ready!(waiter.poll());
    }
}
