//! Per-connection reader task.
//!
//! The task first finishes the WebSocket upgrade, bounded by the
//! handshake timeout. It then registers the session, then reads frames until the peer goes
//! away. It never handles a frame itself: each one is submitted to the
//! shared task pool, so a slow frame does not hold up the next read.
//! Frames from one connection may therefore be handled in any order.

use std::sync::Arc;

use skirmish_protocol::{Codec, PlayerId};
use skirmish_session::{Authenticator, Session};
use skirmish_tasks::TaskKind;
use skirmish_transport::{Connection, Handshake, WebSocketHandshake};

use crate::dispatcher::dispatch;
use crate::notifier::deliver;
use crate::server::ServerState;
use crate::SkirmishError;

/// Tears the session down when the reader exits, however it exits.
///
/// `Drop` is synchronous, so the lobby work runs on a spawned task.
struct DisconnectGuard<A: Authenticator, C: Codec> {
    player_id: PlayerId,
    state: Arc<ServerState<A, C>>,
}

impl<A: Authenticator, C: Codec> Drop for DisconnectGuard<A, C> {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(%player_id, "runtime gone, session not cleaned up");
            return;
        };
        runtime.spawn(async move {
            disconnect(&state, player_id).await;
        });
    }
}

/// Removes the player from their room and the session registry, then
/// tells the remaining room members.
async fn disconnect<A: Authenticator, C: Codec>(state: &ServerState<A, C>, player_id: PlayerId) {
    let broadcasts = state.lobby.lock().await.disconnect(player_id);
    for broadcast in broadcasts {
        if let Err(e) = deliver(&state.tasks, &state.codec, broadcast) {
            tracing::debug!(%player_id, error = %e, "leave notification not delivered");
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, C>(
    handshake: WebSocketHandshake,
    state: Arc<ServerState<A, C>>,
) -> Result<(), SkirmishError>
where
    A: Authenticator,
    C: Codec,
{
    let remote = handshake.peer_addr();
    let conn = match handshake.complete().await {
        Ok(conn) => Arc::new(conn),
        Err(e) => {
            tracing::debug!(?remote, error = %e, "upgrade refused");
            return Err(e.into());
        }
    };
    let player_id = PlayerId::from(conn.id());
    let address = conn.peer_addr();

    {
        let session = Session::new(player_id, Arc::clone(&conn)).with_address(address);
        state.lobby.lock().await.connect(session)?;
    }
    let _guard = DisconnectGuard {
        player_id,
        state: Arc::clone(&state),
    };

    loop {
        let frame = match conn.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::debug!(%player_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                // Best effort; the peer is probably gone already.
                let _ = conn.close().await;
                return Err(e.into());
            }
        };

        let task_state = Arc::clone(&state);
        let submitted = state.tasks.submit(TaskKind::Inbound, async move {
            dispatch(&task_state, player_id, &frame).await;
        });
        if let Err(e) = submitted {
            tracing::debug!(%player_id, "server shutting down, closing connection");
            let _ = conn.close().await;
            return Err(e.into());
        }
    }

    // _guard drops here → lobby disconnect fires.
    Ok(())
}
