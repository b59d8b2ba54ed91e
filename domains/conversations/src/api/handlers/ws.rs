//! WebSocket endpoint scoped to one conversation.
//!
//! After upgrade the connection is attached to the conversation's room.
//! Inbound text frames run through [`Ingress`]; everything the room fans out
//! is written back as JSON text frames by a separate writer task, which
//! flushes anything still queued and closes the socket once the connection
//! detaches.

use std::fmt::Display;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures_util::{stream, Sink, SinkExt, StreamExt};
use parley_auth::AuthUser;
use parley_common::Result;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::api::middleware::ConversationsState;
use crate::domain::entities::Message;
use crate::ingress::{Ingress, IngressEnd};
use crate::rooms::{ConnectionId, Membership};

const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Upgrade to a WebSocket once the caller is known to be a participant
pub async fn conversation_socket(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Path(conversation_id): Path<i64>,
    ws: WebSocketUpgrade,
) -> Result<Response> {
    state
        .conversations
        .get_for_participant(conversation_id, ctx.user_id())
        .await?;

    let user_id = ctx.user_id();
    Ok(ws.on_upgrade(move |socket| serve_socket(socket, state, conversation_id, user_id)))
}

async fn serve_socket(
    socket: WebSocket,
    state: ConversationsState,
    conversation_id: i64,
    user_id: i64,
) {
    let Membership {
        room,
        connection,
        outbox,
    } = state.rooms.attach(conversation_id);

    let (sink, source) = socket.split();

    let mut writer = tokio::spawn(drain_outbox(sink, outbox, conversation_id, connection));

    // Text frames only; close ends the stream, control and binary frames are skipped
    let frames = stream::unfold(source, |mut source| async move {
        loop {
            match source.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    return Some((Ok(text.as_str().to_owned()), source))
                }
                Some(Ok(WsMessage::Close(_))) | None => return None,
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Some((Err(e), source)),
            }
        }
    });

    let ingress = Ingress {
        conversation_id,
        sender: user_id,
        connection,
        messages: state.messages.clone(),
        room,
    };

    match ingress.run(frames).await {
        IngressEnd::Closed => {
            tracing::info!(conversation_id, connection, "WebSocket closed by peer");
        }
        IngressEnd::ReadFailed(reason) => {
            tracing::info!(conversation_id, connection, reason = %reason, "WebSocket read failed");
        }
        IngressEnd::Protocol(e) => {
            tracing::warn!(conversation_id, connection, error = %e, "WebSocket closed after protocol error");
        }
    }

    // Detach drops the room's handle to the outbox, letting the writer
    // flush what is queued and send a close frame
    state.rooms.detach(conversation_id, connection);
    if timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        tracing::warn!(conversation_id, connection, "WebSocket writer did not drain in time");
        writer.abort();
    }
}

/// Write every outbound message as a JSON text frame until the outbox
/// closes, then send a close frame. Stops early if the peer is gone.
async fn drain_outbox<S>(
    mut sink: S,
    mut outbox: mpsc::UnboundedReceiver<Message>,
    conversation_id: i64,
    connection: ConnectionId,
) where
    S: Sink<WsMessage> + Unpin,
    S::Error: Display,
{
    while let Some(message) = outbox.recv().await {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(message_id = message.id, error = %e, "Failed to serialize message");
                continue;
            }
        };
        if let Err(e) = sink.send(WsMessage::Text(json.into())).await {
            tracing::debug!(conversation_id, connection, error = %e, "WebSocket writer closed");
            return;
        }
    }

    if let Err(e) = sink.send(WsMessage::Close(None)).await {
        tracing::debug!(conversation_id, connection, error = %e, "Failed to send close frame");
    }
}
