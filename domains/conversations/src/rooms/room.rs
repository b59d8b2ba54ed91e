use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, oneshot};

use crate::domain::entities::Message;

/// Opaque handle identifying one attached connection
pub type ConnectionId = u64;

type Outbox = mpsc::UnboundedSender<Message>;

/// A message together with the members attached when it was published
struct Envelope {
    message: Message,
    recipients: Vec<(ConnectionId, Outbox)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Running,
    Stopped,
}

/// Per-conversation broadcast unit.
///
/// Publishing hands the message to the room's dispatch loop, which fans it
/// out to every member attached at publish time, including the sender.
pub struct Room {
    conversation_id: i64,
    members: Mutex<HashMap<ConnectionId, Outbox>>,
    broadcast: mpsc::UnboundedSender<Envelope>,
    stop: Mutex<Option<oneshot::Sender<()>>>,
    running: Arc<AtomicBool>,
}

impl Room {
    /// Build a room and spawn its dispatch loop.
    pub(crate) fn start(conversation_id: i64) -> Arc<Self> {
        let (broadcast, inbox) = mpsc::unbounded_channel();
        let (stop, stop_signal) = oneshot::channel();
        let running = Arc::new(AtomicBool::new(true));

        tokio::spawn(dispatch(conversation_id, inbox, stop_signal, running.clone()));
        tracing::debug!(conversation_id, "Room dispatch loop started");

        Arc::new(Self {
            conversation_id,
            members: Mutex::new(HashMap::new()),
            broadcast,
            stop: Mutex::new(Some(stop)),
            running,
        })
    }

    pub fn conversation_id(&self) -> i64 {
        self.conversation_id
    }

    pub fn state(&self) -> RoomState {
        if self.running.load(Ordering::SeqCst) {
            RoomState::Running
        } else {
            RoomState::Stopped
        }
    }

    pub fn member_count(&self) -> usize {
        self.lock_members().len()
    }

    pub fn is_member(&self, connection: ConnectionId) -> bool {
        self.lock_members().contains_key(&connection)
    }

    /// Queue `message` for every current member. Returns `false` once the
    /// room has stopped.
    pub fn publish(&self, message: Message) -> bool {
        // Snapshot and enqueue under the same lock so delivery order matches
        // publish order and membership at publish time.
        let members = self.lock_members();
        let recipients = members
            .iter()
            .map(|(id, outbox)| (*id, outbox.clone()))
            .collect();

        let message_id = message.id;
        if self
            .broadcast
            .send(Envelope {
                message,
                recipients,
            })
            .is_err()
        {
            tracing::warn!(
                conversation_id = self.conversation_id,
                message_id,
                "Publish to stopped room dropped"
            );
            return false;
        }
        true
    }

    pub(crate) fn join(&self, connection: ConnectionId) -> mpsc::UnboundedReceiver<Message> {
        let (outbox, inbox) = mpsc::unbounded_channel();
        self.lock_members().insert(connection, outbox);
        inbox
    }

    /// Remove a member, returning how many remain, or `None` if the
    /// connection was not a member.
    pub(crate) fn leave(&self, connection: ConnectionId) -> Option<usize> {
        let mut members = self.lock_members();
        members.remove(&connection)?;
        Some(members.len())
    }

    /// Signal the dispatch loop to exit. Only the first call has an effect.
    pub(crate) fn stop(&self) {
        let sender = self
            .stop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            let _ = sender.send(());
        }
    }

    fn lock_members(&self) -> MutexGuard<'_, HashMap<ConnectionId, Outbox>> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("conversation_id", &self.conversation_id)
            .field("members", &self.member_count())
            .field("state", &self.state())
            .finish()
    }
}

async fn dispatch(
    conversation_id: i64,
    mut inbox: mpsc::UnboundedReceiver<Envelope>,
    mut stop: oneshot::Receiver<()>,
    running: Arc<AtomicBool>,
) {
    loop {
        tokio::select! {
            envelope = inbox.recv() => match envelope {
                Some(envelope) => deliver(conversation_id, envelope),
                None => break,
            },
            _ = &mut stop => break,
        }
    }

    // Closed before the state flips so a stopped room rejects publishes
    drop(inbox);
    running.store(false, Ordering::SeqCst);
    tracing::debug!(conversation_id, "Room dispatch loop stopped");
}

fn deliver(conversation_id: i64, envelope: Envelope) {
    let Envelope {
        message,
        recipients,
    } = envelope;

    for (connection, outbox) in recipients {
        if outbox.send(message.clone()).is_err() {
            tracing::warn!(
                conversation_id,
                connection,
                message_id = message.id,
                "Failed to deliver message to member"
            );
        }
    }
}
