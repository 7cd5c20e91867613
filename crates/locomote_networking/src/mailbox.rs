//! # Movement Mailbox
//!
//! Per-entity inbound queue between the transport and the simulation.
//!
//! ```text
//! transport threads                        simulation thread
//! ┌──────────────┐  post (try_send)   ┌──────────────────────┐
//! │MailboxSender │ ─────────────────► │ MovementMailbox      │
//! └──────────────┘     bounded        │   drain_into(backend)│
//!                                     └──────────────────────┘
//! ```
//!
//! Messages are applied in arrival order on the simulation thread, so a
//! backend is only ever touched by one thread. Posting never blocks: a full
//! mailbox rejects the message and the sender decides what to drop.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use locomote_shared::MovementConfig;
use thiserror::Error;

use crate::backend::MovementBackend;
use crate::protocol::{MessageKind, OutboundMessage};

/// A message received from the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    /// Message kind.
    pub kind: MessageKind,
    /// Sender clock in milliseconds.
    pub timestamp: u32,
    /// Encoded payload.
    pub payload: Vec<u8>,
}

impl From<OutboundMessage> for InboundMessage {
    fn from(message: OutboundMessage) -> Self {
        Self {
            kind: message.kind,
            timestamp: message.timestamp,
            payload: message.payload,
        }
    }
}

/// Mailbox errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxError {
    /// The mailbox is at capacity.
    #[error("mailbox full ({capacity} messages)")]
    Full {
        /// Configured capacity.
        capacity: usize,
    },

    /// The mailbox was dropped.
    #[error("mailbox closed")]
    Closed,
}

/// Result type for mailbox operations.
pub type MailboxResult<T> = Result<T, MailboxError>;

/// Counters from one [`MovementMailbox::drain_into`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Messages that changed state.
    pub applied: u32,
    /// Valid messages the backend chose not to apply (stale, ignored,
    /// awaiting teleport confirm).
    pub dropped: u32,
    /// Malformed payloads.
    pub rejected: u32,
}

/// Cloneable posting handle.
#[derive(Clone, Debug)]
pub struct MailboxSender {
    sender: Sender<InboundMessage>,
    capacity: usize,
}

impl MailboxSender {
    /// Queues a message without blocking.
    ///
    /// # Errors
    ///
    /// [`MailboxError::Full`] at capacity, [`MailboxError::Closed`] once the
    /// mailbox is gone.
    pub fn post(&self, message: InboundMessage) -> MailboxResult<()> {
        self.sender.try_send(message).map_err(|error| match error {
            TrySendError::Full(_) => MailboxError::Full {
                capacity: self.capacity,
            },
            TrySendError::Disconnected(_) => MailboxError::Closed,
        })
    }
}

/// Bounded inbound queue for one entity.
#[derive(Debug)]
pub struct MovementMailbox {
    sender: MailboxSender,
    receiver: Receiver<InboundMessage>,
}

impl MovementMailbox {
    /// Creates a mailbox holding up to `capacity` messages (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Self {
            sender: MailboxSender { sender, capacity },
            receiver,
        }
    }

    /// Creates a mailbox sized by `config.mailbox_capacity`.
    #[must_use]
    pub fn from_config(config: &MovementConfig) -> Self {
        Self::new(config.mailbox_capacity)
    }

    /// Handle for transport threads.
    #[must_use]
    pub fn sender(&self) -> MailboxSender {
        self.sender.clone()
    }

    /// Queues a message without blocking.
    ///
    /// # Errors
    ///
    /// [`MailboxError::Full`] at capacity.
    pub fn post(&self, message: InboundMessage) -> MailboxResult<()> {
        self.sender.post(message)
    }

    /// Queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// True if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Maximum queued messages.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.sender.capacity
    }

    /// Applies every queued message to `backend`, in arrival order.
    pub fn drain_into<B: MovementBackend + ?Sized>(&self, backend: &mut B) -> DrainStats {
        let mut stats = DrainStats::default();
        while let Ok(message) = self.receiver.try_recv() {
            let result = match message.kind {
                MessageKind::ClientInput | MessageKind::ClientState => {
                    backend.read_client_state_at_server(message.timestamp, &message.payload)
                }
                MessageKind::ServerState => {
                    backend.read_server_state_at_client(message.timestamp, &message.payload)
                }
            };
            match result {
                Ok(outcome) if outcome.was_applied() => stats.applied += 1,
                Ok(_) => stats.dropped += 1,
                Err(error) => {
                    tracing::warn!(%error, kind = ?message.kind, "rejected malformed movement message");
                    stats.rejected += 1;
                }
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CapsuleMovement, FlatGround};
    use crate::integration::StatEntity;
    use locomote_shared::{EntityRole, MovementSecure, MovementState, Vec3};

    fn message(timestamp: u32) -> InboundMessage {
        InboundMessage {
            kind: MessageKind::ClientInput,
            timestamp,
            payload: Vec::new(),
        }
    }

    fn capsule(role: EntityRole) -> CapsuleMovement<StatEntity> {
        CapsuleMovement::new(
            StatEntity::new(role),
            MovementSecure::ServerAuthoritative,
            MovementConfig::default(),
            FlatGround::new(0.0),
            Vec3::ZERO,
        )
    }

    #[test]
    fn test_post_rejects_when_full() {
        let mailbox = MovementMailbox::new(2);
        mailbox.post(message(1)).unwrap();
        mailbox.post(message(2)).unwrap();
        assert_eq!(mailbox.post(message(3)), Err(MailboxError::Full { capacity: 2 }));
        assert_eq!(mailbox.len(), 2);
    }

    #[test]
    fn test_sender_closed_after_drop() {
        let mailbox = MovementMailbox::new(4);
        let sender = mailbox.sender();
        drop(mailbox);
        assert_eq!(sender.post(message(1)), Err(MailboxError::Closed));
    }

    #[test]
    fn test_post_from_other_thread() {
        let mailbox = MovementMailbox::new(16);
        let sender = mailbox.sender();
        let handle = std::thread::spawn(move || {
            for timestamp in 0..8 {
                sender.post(message(timestamp)).unwrap();
            }
        });
        handle.join().unwrap();
        assert_eq!(mailbox.len(), 8);
    }

    #[test]
    fn test_drain_routes_and_counts() {
        let mut client = capsule(EntityRole::OWNER_CLIENT);
        let mut server = capsule(EntityRole::SERVER_REMOTE_OWNER);

        client.key_movement(Vec3::Z, MovementState::FORWARD);
        client.tick(0.1);
        let input = client.write_client_state(100).unwrap();

        let mailbox = MovementMailbox::from_config(server.sync().config());
        mailbox.post(input.into()).unwrap();
        mailbox.post(message(200)).unwrap();

        let stats = mailbox.drain_into(&mut server);
        assert_eq!(stats, DrainStats { applied: 1, dropped: 0, rejected: 1 });
        assert!(mailbox.is_empty());
    }
}
