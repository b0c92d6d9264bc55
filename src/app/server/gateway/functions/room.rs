use crate::app::server::{
    errors::ApiError,
    game::GameVariant,
    gateway::{protocol::ServerEvent, Gateway},
    models::PlayerView,
};

fn member_ids(players: &[PlayerView]) -> Vec<String> {
    players
        .iter()
        .map(|player| player.player_id.clone())
        .collect()
}

pub async fn create_room(
    gateway: &Gateway,
    connection_id: &str,
    name: String,
    variant: GameVariant,
) -> Result<(), ApiError> {
    let snapshot = gateway
        .registry
        .create_room(connection_id, name, variant)?;
    gateway
        .connections
        .join_group(connection_id, &snapshot.room_code);

    gateway.connections.send_to(
        connection_id,
        ServerEvent::RoomCreated {
            code: snapshot.room_code,
            game: snapshot.variant,
            players: snapshot.players.clone(),
        },
    );

    gateway.connections.send_to(
        connection_id,
        ServerEvent::PlayersUpdate {
            players: snapshot.players,
        },
    );

    Ok(())
}

pub async fn join_room(
    gateway: &Gateway,
    connection_id: &str,
    room_code: &str,
    name: String,
) -> Result<(), ApiError> {
    let snapshot = gateway
        .registry
        .join_room(room_code, connection_id, name)
        .await?;
    gateway.connections.join_group(connection_id, room_code);

    gateway.connections.send_to(
        connection_id,
        ServerEvent::RoomJoined {
            code: snapshot.room_code,
            game: snapshot.variant,
            players: snapshot.players.clone(),
        },
    );

    gateway.connections.send_to_many(
        &member_ids(&snapshot.players),
        ServerEvent::PlayersUpdate {
            players: snapshot.players,
        },
    );

    Ok(())
}

pub async fn set_secret(
    gateway: &Gateway,
    connection_id: &str,
    room_code: &str,
    secret: String,
) -> Result<(), ApiError> {
    let mut session = gateway.registry.session(room_code).await?;
    session.set_secret(connection_id, secret)?;

    gateway.connections.send_to_many(
        &session.player_ids(),
        ServerEvent::PlayersUpdate {
            players: session.players_view(),
        },
    );

    Ok(())
}

pub async fn leave_room(
    gateway: &Gateway,
    connection_id: &str,
    room_code: &str,
) -> Result<(), ApiError> {
    depart(gateway, connection_id, room_code).await?;

    gateway.connections.send_to(
        connection_id,
        ServerEvent::LeftRoom {
            code: room_code.to_string(),
        },
    );

    Ok(())
}

/// Take a player out of a room and update whoever is left
pub async fn depart(
    gateway: &Gateway,
    connection_id: &str,
    room_code: &str,
) -> Result<(), ApiError> {
    let outcome = gateway.registry.leave(room_code, connection_id).await;
    gateway.connections.leave_group(connection_id, room_code);
    let outcome = outcome?;

    let remaining = member_ids(&outcome.players);
    gateway.connections.send_to_many(
        &remaining,
        ServerEvent::PlayersUpdate {
            players: outcome.players,
        },
    );

    if let Some(game_over) = outcome.departure.game_over {
        super::announce_game_over(gateway, &remaining, game_over);
    }

    Ok(())
}
