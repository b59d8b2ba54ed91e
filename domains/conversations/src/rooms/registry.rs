use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use super::room::{ConnectionId, Room};
use crate::domain::entities::Message;

/// What a connection holds while attached to a room
#[derive(Debug)]
pub struct Membership {
    pub room: Arc<Room>,
    pub connection: ConnectionId,
    /// Messages fanned out to this connection
    pub outbox: mpsc::UnboundedReceiver<Message>,
}

/// Process-wide mapping from conversation id to its live [`Room`].
///
/// Lock order is registry map, then room membership. Attach and detach hold
/// the map lock for their whole duration, so creation and teardown of a
/// room never interleave with another attach on the same conversation.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<i64, Arc<Room>>>,
    next_connection: AtomicU64,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new connection, creating the room if none is live.
    pub fn attach(&self, conversation_id: i64) -> Membership {
        let connection = self.next_connection.fetch_add(1, Ordering::Relaxed) + 1;

        let mut rooms = self.lock_rooms();
        let room = rooms
            .entry(conversation_id)
            .or_insert_with(|| {
                tracing::info!(conversation_id, "Room created");
                Room::start(conversation_id)
            })
            .clone();
        let outbox = room.join(connection);

        tracing::info!(
            conversation_id,
            connection,
            members = room.member_count(),
            rooms = rooms.len(),
            "Connection attached"
        );

        Membership {
            room,
            connection,
            outbox,
        }
    }

    /// Detach a connection. The last member out stops the room and removes
    /// it. Unknown rooms or connections are logged and ignored.
    pub fn detach(&self, conversation_id: i64, connection: ConnectionId) {
        let mut rooms = self.lock_rooms();

        let Some(room) = rooms.get(&conversation_id).cloned() else {
            tracing::warn!(conversation_id, connection, "Detach from a room that is not live");
            return;
        };

        match room.leave(connection) {
            None => {
                tracing::warn!(conversation_id, connection, "Connection not found in room");
            }
            Some(0) => {
                room.stop();
                rooms.remove(&conversation_id);
                tracing::info!(
                    conversation_id,
                    connection,
                    rooms = rooms.len(),
                    "Last connection detached, room closed"
                );
            }
            Some(remaining) => {
                tracing::info!(
                    conversation_id,
                    connection,
                    members = remaining,
                    "Connection detached"
                );
            }
        }
    }

    pub fn room(&self, conversation_id: i64) -> Option<Arc<Room>> {
        self.lock_rooms().get(&conversation_id).cloned()
    }

    /// Publish to the conversation's room if one is live.
    pub fn publish(&self, message: Message) -> bool {
        match self.room(message.chat_id) {
            Some(room) => room.publish(message),
            None => false,
        }
    }

    pub fn room_count(&self) -> usize {
        self.lock_rooms().len()
    }

    fn lock_rooms(&self) -> MutexGuard<'_, HashMap<i64, Arc<Room>>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
