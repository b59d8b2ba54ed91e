//! Live rooms: one in-memory broadcast unit per conversation
//!
//! The [`RoomRegistry`] owns the conversation-to-room mapping. A room is
//! created on the first attach and torn down on the last detach. Rooms keep
//! outbound handles keyed by [`ConnectionId`], never the connections
//! themselves, so a connection's lifetime does not depend on its room.

mod registry;
mod room;

pub use registry::{Membership, RoomRegistry};
pub use room::{ConnectionId, Room, RoomState};
