//! Reply dispatcher.
//!
//! Tracks pending commands by packet id and routes replies to the waiting
//! callers via oneshot channels.
use std::collections::HashMap;

use tokio::sync::oneshot;

/// The outcome delivered to a waiting command.
#[derive(Debug, PartialEq, Eq)]
pub enum DispatchResult {
    /// Reply body of a successful command.
    Success(Vec<u8>),
    /// The VM rejected the command with this error code.
    Error(u16),
}

/// Manages pending commands and routes replies.
#[derive(Debug, Default)]
pub struct Dispatcher {
    pending: HashMap<u32, oneshot::Sender<DispatchResult>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending command and return a receiver for its reply.
    pub fn register(&mut self, id: u32) -> oneshot::Receiver<DispatchResult> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        rx
    }

    /// How many commands are waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Route a reply to its waiting command. Returns `false` for unknown ids.
    pub fn resolve(&mut self, id: u32, error_code: u16, data: Vec<u8>) -> bool {
        let Some(sender) = self.pending.remove(&id) else {
            tracing::warn!("reply for unknown packet id {}", id);
            return false;
        };
        let result = if error_code == 0 {
            DispatchResult::Success(data)
        } else {
            DispatchResult::Error(error_code)
        };
        // The caller may have timed out and dropped its receiver.
        let _ = sender.send(result);
        true
    }

    /// Forget a pending command. Returns true if it was found.
    pub fn cancel(&mut self, id: u32) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Drop every pending command; their callers see a closed channel.
    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatcher_new_empty() {
        assert_eq!(Dispatcher::new().pending_count(), 0);
    }

    #[tokio::test]
    async fn dispatcher_register_and_resolve() {
        let mut disp = Dispatcher::new();
        let rx = disp.register(1);
        assert_eq!(disp.pending_count(), 1);

        assert!(disp.resolve(1, 0, vec![1, 2]));
        assert_eq!(disp.pending_count(), 0);
        assert_eq!(rx.await.unwrap(), DispatchResult::Success(vec![1, 2]));
    }

    #[tokio::test]
    async fn dispatcher_resolve_error_code() {
        let mut disp = Dispatcher::new();
        let rx = disp.register(9);
        disp.resolve(9, 13, Vec::new());
        assert_eq!(rx.await.unwrap(), DispatchResult::Error(13));
    }

    #[test]
    fn dispatcher_unknown_id_ignored() {
        let mut disp = Dispatcher::new();
        assert!(!disp.resolve(999, 0, Vec::new()));
    }

    #[test]
    fn dispatcher_resolve_after_receiver_dropped() {
        let mut disp = Dispatcher::new();
        drop(disp.register(4));
        assert!(disp.resolve(4, 0, Vec::new()));
    }

    #[test]
    fn dispatcher_cancel() {
        let mut disp = Dispatcher::new();
        let _rx = disp.register(1);
        assert!(disp.cancel(1));
        assert!(!disp.cancel(1));
    }

    #[tokio::test]
    async fn dispatcher_cancel_all_closes_receivers() {
        let mut disp = Dispatcher::new();
        let rx1 = disp.register(1);
        let rx2 = disp.register(2);
        disp.cancel_all();
        assert_eq!(disp.pending_count(), 0);
        assert!(rx1.await.is_err());
        assert!(rx2.await.is_err());
    }
}
