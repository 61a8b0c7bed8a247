//! WebSocket upgrade handler for real-time marketplace connections.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Resolve the bearer credential (header or `?token=`); 401 on failure
//! 2. Upgrade to WebSocket
//! 3. Register with the hub, which joins the user and role channels
//! 4. Pump frames both ways until disconnect
//! 5. Tear down registration and every membership

use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::adapters::http::middleware::AuthRejection;
use crate::application::{bearer_token, IdentityResolver, RealtimeHub};
use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::domain::realtime::{RealtimeError, SenderContext};

use super::messages::{ClientFrame, ServerFrame};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub hub: Arc<RealtimeHub>,
    pub identity: IdentityResolver,
}

impl WebSocketState {
    pub fn new(hub: Arc<RealtimeHub>, identity: IdentityResolver) -> Self {
        Self { hub, identity }
    }
}

/// Browsers cannot set headers on a WebSocket handshake, so the token may
/// also travel in the query string.
#[derive(Debug, Default, Deserialize)]
pub struct SocketQuery {
    token: Option<String>,
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /socket`
///
/// The credential is checked before the upgrade is accepted, so a rejected
/// client never reaches an event handler.
pub async fn ws_handler(
    State(state): State<WebSocketState>,
    Query(query): Query<SocketQuery>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let credential = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string)
        .or(query.token);

    let Some(raw) = credential else {
        return AuthRejection(AuthError::MissingCredential).into_response();
    };

    let user = match state.identity.resolve(&raw).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "WebSocket handshake rejected");
            return AuthRejection(e).into_response();
        }
    };

    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, user, state)),
        Err(rejection) => rejection.into_response(),
    }
}

/// Run an established connection until either side closes it.
async fn handle_socket(socket: WebSocket, user: AuthenticatedUser, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();
    let (sink, mut outbound) = mpsc::unbounded_channel();

    let ctx = match state.hub.connect(&user, sink).await {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "Could not register connection");
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    // Drain this connection's queue onto the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let text = match ServerFrame::from(&event).to_text() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(
                        connection_id = %ctx.connection_id,
                        event = event.kind.as_str(),
                        "Failed to encode frame: {}",
                        e
                    );
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(text)).await {
                tracing::debug!(
                    connection_id = %ctx.connection_id,
                    "Send error, closing connection: {}",
                    e
                );
                break;
            }
        }
    });

    // Frames are handled one at a time, in arrival order.
    let hub = state.hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => handle_frame(&hub, &ctx, &text).await,
                Ok(Message::Binary(_)) => {
                    tracing::warn!(
                        connection_id = %ctx.connection_id,
                        "Received unsupported binary message"
                    );
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    tracing::debug!(connection_id = %ctx.connection_id, "Client sent close frame");
                    break;
                }
                Err(e) => {
                    tracing::debug!(connection_id = %ctx.connection_id, "Receive error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            // Never cancel an event mid-write; the closed socket ends the stream.
            let _ = recv_task.await;
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    state.hub.disconnect(&ctx).await;
}

async fn handle_frame(hub: &RealtimeHub, ctx: &SenderContext, text: &str) {
    let frame = match ClientFrame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(connection_id = %ctx.connection_id, "Unparseable frame: {}", e);
            return;
        }
    };

    match hub.handle(ctx, &frame.event, frame.data).await {
        Ok(outcome) => {
            tracing::trace!(
                connection_id = %ctx.connection_id,
                event = %frame.event,
                delivered = outcome.delivered,
                "Event dispatched"
            );
        }
        Err(RealtimeError::PersistenceFailure(_)) => {
            // Already logged by the hub with the write's context.
        }
        Err(e) => {
            tracing::warn!(
                connection_id = %ctx.connection_id,
                user_id = %ctx.user_id,
                event = %frame.event,
                error = %e,
                "Inbound event dropped"
            );
        }
    }
}

/// Create axum router for the WebSocket endpoint.
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/socket", get(ws_handler))
}
