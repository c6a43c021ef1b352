//! Routes one inbound frame to the lobby and sends what comes back.
//!
//! The lobby lock is held only for the lobby call itself. Encoding, the
//! response send, and notification delivery all happen after it is
//! released.

use skirmish_protocol::{
    ClientNotification, Codec, CreateRoomFromSaveRequest, CreateRoomRequest, Envelope, Inbound,
    PlayerId, Request,
};
use skirmish_room::{RoomOrigin, RoomParams};
use skirmish_session::Authenticator;
use skirmish_transport::Connection;

use crate::lobby::Handled;
use crate::notifier::{Broadcast, deliver};
use crate::server::{Peer, ServerState};
use crate::SkirmishError;

/// Handles one frame from `player_id`.
///
/// Frames that do not decode, or decode to something a client may not
/// send, are dropped without a reply.
pub(crate) async fn dispatch<A, C>(state: &ServerState<A, C>, player_id: PlayerId, frame: &[u8])
where
    A: Authenticator,
    C: Codec,
{
    let inbound = state
        .codec
        .decode::<Envelope>(frame)
        .and_then(Envelope::into_inbound);
    let inbound = match inbound {
        Ok(inbound) => inbound,
        Err(e) => {
            tracing::debug!(%player_id, error = %e, "dropping undecodable frame");
            return;
        }
    };

    let result = match inbound {
        Inbound::Request {
            request_id,
            request,
        } => handle_request(state, player_id, request_id, request).await,
        Inbound::Notification(notification) => {
            handle_notification(state, player_id, notification).await
        }
    };
    match result {
        Ok(()) => {}
        Err(SkirmishError::Transport(e)) if e.is_peer_gone() => {
            tracing::trace!(%player_id, error = %e, "peer gone before the response");
        }
        Err(e) => tracing::debug!(%player_id, error = %e, "frame handling failed"),
    }
}

async fn handle_request<A, C>(
    state: &ServerState<A, C>,
    player_id: PlayerId,
    request_id: i64,
    request: Request,
) -> Result<(), SkirmishError>
where
    A: Authenticator,
    C: Codec,
{
    let operation = request.operation();
    tracing::trace!(%player_id, request_id, ?operation, "request");

    let handled = match request {
        Request::Authenticate(creds) => {
            // The authenticator may be slow; ask it before taking the lock.
            let verdict = state.auth.authenticate(&creds.username, &creds.v_string).await;
            if let Err(e) = &verdict {
                tracing::debug!(%player_id, error = %e, "credentials refused");
            }
            state
                .lobby
                .lock()
                .await
                .authenticate(player_id, &creds.username, verdict.is_ok())
        }
        Request::ListRooms => state.lobby.lock().await.list_rooms(player_id),
        Request::CreateRoom(req) => {
            let params = fresh_map_params(req);
            state.lobby.lock().await.create_room(player_id, params)
        }
        Request::CreateRoomFromSave(req) => {
            let params = saved_game_params(req);
            state.lobby.lock().await.create_room(player_id, params)
        }
        Request::JoinRoom(req) => state.lobby.lock().await.join_room(player_id, req.room_number),
        Request::StartGame => state.lobby.lock().await.start_game(player_id),
    };

    let Some(Handled {
        requester,
        reply,
        broadcasts,
    }) = handled
    else {
        tracing::debug!(
            %player_id,
            ?operation,
            "request ignored: session gone or not authenticated"
        );
        return Ok(());
    };

    let bytes = state.codec.encode(&Envelope::response(request_id, &reply)?)?;
    let sent = requester.send(&bytes).await;
    // Notifications go out even if the requester vanished meanwhile.
    deliver_all(state, broadcasts)?;
    sent.map_err(SkirmishError::from)
}

async fn handle_notification<A, C>(
    state: &ServerState<A, C>,
    player_id: PlayerId,
    notification: ClientNotification,
) -> Result<(), SkirmishError>
where
    A: Authenticator,
    C: Codec,
{
    let broadcasts = {
        let mut lobby = state.lobby.lock().await;
        match notification {
            ClientNotification::PlayerLeaving => lobby.leave_room(player_id),
            ClientNotification::UpdateAllocation(teams) => {
                lobby.update_allocation(player_id, teams)
            }
            ClientNotification::Message(m) => lobby.message(player_id, m.message),
            ClientNotification::GameEvent(e) => {
                lobby.game_event(player_id, e.event, state.config.relay_game_events)
            }
        }
    };
    deliver_all(state, broadcasts)
}

fn deliver_all<A, C>(
    state: &ServerState<A, C>,
    broadcasts: Vec<Broadcast<Peer>>,
) -> Result<(), SkirmishError>
where
    A: Authenticator,
    C: Codec,
{
    for broadcast in broadcasts {
        deliver(&state.tasks, &state.codec, broadcast)?;
    }
    Ok(())
}

/// Out-of-range capacities become 0 and are refused by the room.
fn capacity(requested: i64) -> usize {
    usize::try_from(requested).unwrap_or(0)
}

fn fresh_map_params(req: CreateRoomRequest) -> RoomParams {
    RoomParams {
        map_name: req.map_name,
        capacity: capacity(req.capacity),
        start_gold: req.start_gold,
        max_population: req.max_population,
        origin: RoomOrigin::Map(req.map),
    }
}

fn saved_game_params(req: CreateRoomFromSaveRequest) -> RoomParams {
    RoomParams {
        map_name: req.map_name,
        capacity: capacity(req.capacity),
        start_gold: req.start_gold,
        max_population: req.max_population,
        origin: RoomOrigin::SavedGame(req.game),
    }
}
