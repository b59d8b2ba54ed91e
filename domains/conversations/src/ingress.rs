//! Per-connection read, validate, persist, publish loop

use std::fmt::Display;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use parley_common::Error;

use crate::domain::entities::MessageFrame;
use crate::rooms::{ConnectionId, Room};
use crate::service::MessageService;

/// Why an ingress loop ended
#[derive(Debug)]
pub enum IngressEnd {
    /// Peer closed the connection
    Closed,
    /// Reading from the transport failed
    ReadFailed(String),
    /// Peer sent a frame that could not be decoded
    Protocol(Error),
}

/// Everything one connection's ingress loop needs
pub struct Ingress {
    pub conversation_id: i64,
    pub sender: i64,
    pub connection: ConnectionId,
    pub messages: MessageService,
    pub room: Arc<Room>,
}

impl Ingress {
    /// Consume text frames until the peer goes away or misbehaves.
    ///
    /// Blank text and failed writes are logged and skipped; the connection
    /// stays open. Frames are handled strictly in arrival order.
    pub async fn run<S, E>(&self, frames: S) -> IngressEnd
    where
        S: Stream<Item = Result<String, E>>,
        E: Display,
    {
        let mut frames = std::pin::pin!(frames);

        while let Some(frame) = frames.next().await {
            let raw = match frame {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::info!(
                        conversation_id = self.conversation_id,
                        connection = self.connection,
                        error = %e,
                        "Connection read failed"
                    );
                    return IngressEnd::ReadFailed(e.to_string());
                }
            };

            let frame = match MessageFrame::decode(&raw) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(
                        conversation_id = self.conversation_id,
                        connection = self.connection,
                        error = %e,
                        "Dropping connection after malformed frame"
                    );
                    return IngressEnd::Protocol(e);
                }
            };

            self.handle(frame).await;
        }

        IngressEnd::Closed
    }

    async fn handle(&self, frame: MessageFrame) {
        if let Some(chat_id) = frame.chat_id.filter(|id| *id != self.conversation_id) {
            tracing::debug!(
                conversation_id = self.conversation_id,
                frame_chat_id = chat_id,
                "Ignoring chat_id from frame"
            );
        }

        if frame.text.trim().is_empty() {
            tracing::debug!(
                conversation_id = self.conversation_id,
                connection = self.connection,
                "Skipping blank message"
            );
            return;
        }

        match self
            .messages
            .record(self.conversation_id, self.sender, &frame.text)
            .await
        {
            Ok(message) => {
                self.room.publish(message);
            }
            Err(e) => {
                tracing::warn!(
                    conversation_id = self.conversation_id,
                    connection = self.connection,
                    sender = self.sender,
                    error = %e,
                    "Message not recorded"
                );
            }
        }
    }
}
