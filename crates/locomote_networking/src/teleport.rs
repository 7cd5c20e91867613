//! # Teleport Handshake
//!
//! Two-way acknowledgment of server-initiated teleports.
//!
//! ```text
//! SERVER                                   OWNER CLIENT
//!   │ teleport()                              │
//!   │── state [IS_TELEPORT] (reliable) ──────►│ warp, start confirming
//!   │   waiting: drop client messages         │
//!   │◄── next message [IS_TELEPORT] ──────────│ (reliable)
//!   │   waiting cleared, waiters wake         │
//! ```
//!
//! Without the wait a stale pre-teleport input could arrive after the warp
//! and be validated against the new position.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Teleport state for one entity.
#[derive(Debug)]
pub struct TeleportHandshake {
    /// Server is waiting for the owner client's echo.
    waiting: watch::Sender<bool>,
    /// Cancelled when the entity is destroyed.
    lifetime: CancellationToken,
    /// Server: the next state message carries `IS_TELEPORT`.
    teleporting: bool,
    /// Server: directional flags survive the teleport.
    still_move: bool,
    /// Client: the next outbound message carries `IS_TELEPORT`.
    client_confirming: bool,
}

impl TeleportHandshake {
    /// Creates an idle handshake.
    #[must_use]
    pub fn new() -> Self {
        let (waiting, _) = watch::channel(false);
        Self {
            waiting,
            lifetime: CancellationToken::new(),
            teleporting: false,
            still_move: false,
            client_confirming: false,
        }
    }

    /// Server side: marks the next state message and optionally waits for
    /// the owner client.
    pub fn begin_server_teleport(&mut self, still_move: bool, wait_for_client: bool) {
        self.teleporting = true;
        self.still_move = still_move;
        if wait_for_client {
            self.waiting.send_replace(true);
        }
    }

    /// Server side: the pending teleport mark, left in place.
    #[must_use]
    pub const fn pending_server_teleport(&self) -> Option<bool> {
        if self.teleporting {
            Some(self.still_move)
        } else {
            None
        }
    }

    /// Server side: takes the pending teleport mark, returning `still_move`.
    pub fn take_server_teleport(&mut self) -> Option<bool> {
        if self.teleporting {
            self.teleporting = false;
            Some(self.still_move)
        } else {
            None
        }
    }

    /// True while the server drops the owner client's messages.
    #[must_use]
    pub fn is_waiting_client_confirm(&self) -> bool {
        *self.waiting.borrow()
    }

    /// Server side: the owner client echoed the teleport.
    pub fn confirm_from_client(&mut self) {
        self.waiting.send_replace(false);
    }

    /// Client side: a teleport arrived; echo it in the next message.
    pub fn begin_client_confirm(&mut self) {
        self.client_confirming = true;
    }

    /// True until the client's echo has been written.
    #[must_use]
    pub const fn is_client_confirming(&self) -> bool {
        self.client_confirming
    }

    /// Client side: takes the pending echo.
    pub fn take_client_confirm(&mut self) -> bool {
        std::mem::take(&mut self.client_confirming)
    }

    /// Handle that resolves once the wait clears or the entity is gone.
    #[must_use]
    pub fn waiter(&self) -> TeleportConfirmWaiter {
        TeleportConfirmWaiter {
            waiting: self.waiting.subscribe(),
            lifetime: self.lifetime.clone(),
        }
    }

    /// Ends the entity's lifetime; pending waiters complete.
    pub fn mark_destroyed(&mut self) {
        self.lifetime.cancel();
    }

    /// True once the entity was destroyed.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.lifetime.is_cancelled()
    }
}

impl Default for TeleportHandshake {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TeleportHandshake {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

/// Awaitable view of a server's teleport wait.
#[derive(Clone, Debug)]
pub struct TeleportConfirmWaiter {
    waiting: watch::Receiver<bool>,
    lifetime: CancellationToken,
}

impl TeleportConfirmWaiter {
    /// Completes when the owner client confirmed the teleport, when the
    /// entity is destroyed, or when its backend is dropped.
    pub async fn wait(mut self) {
        if self.lifetime.is_cancelled() {
            return;
        }
        tokio::select! {
            () = self.lifetime.cancelled() => {}
            _ = self.waiting.wait_for(|waiting| !*waiting) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_mark_taken_once() {
        let mut handshake = TeleportHandshake::new();
        handshake.begin_server_teleport(true, false);
        assert_eq!(handshake.take_server_teleport(), Some(true));
        assert_eq!(handshake.take_server_teleport(), None);
        assert!(!handshake.is_waiting_client_confirm());
    }

    #[test]
    fn test_client_confirm_taken_once() {
        let mut handshake = TeleportHandshake::new();
        handshake.begin_client_confirm();
        assert!(handshake.is_client_confirming());
        assert!(handshake.take_client_confirm());
        assert!(!handshake.take_client_confirm());
    }

    #[tokio::test]
    async fn test_wait_completes_immediately_when_idle() {
        let handshake = TeleportHandshake::new();
        handshake.waiter().wait().await;
    }

    #[tokio::test]
    async fn test_wait_completes_on_confirm() {
        let mut handshake = TeleportHandshake::new();
        handshake.begin_server_teleport(false, true);
        let waiter = handshake.waiter();
        let task = tokio::spawn(waiter.wait());
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        handshake.confirm_from_client();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_completes_on_destroy() {
        let mut handshake = TeleportHandshake::new();
        handshake.begin_server_teleport(false, true);
        let task = tokio::spawn(handshake.waiter().wait());

        handshake.mark_destroyed();
        task.await.unwrap();
        assert!(handshake.is_waiting_client_confirm());
    }

    #[tokio::test]
    async fn test_wait_completes_on_drop() {
        let mut handshake = TeleportHandshake::new();
        handshake.begin_server_teleport(false, true);
        let task = tokio::spawn(handshake.waiter().wait());
        drop(handshake);
        task.await.unwrap();
    }
}
