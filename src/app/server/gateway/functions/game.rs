use crate::app::server::{
    errors::ApiError,
    game::chess::Square,
    gateway::{protocol::ServerEvent, Gateway},
    session::{GameOver, Session},
};

pub async fn start_game(
    gateway: &Gateway,
    connection_id: &str,
    room_code: &str,
) -> Result<(), ApiError> {
    let mut session = gateway.registry.session(room_code).await?;
    let state = session.start_game(connection_id)?.clone();
    tracing::info!(room_code, variant = %session.variant(), "game started");

    gateway.connections.send_to_many(
        &session.player_ids(),
        ServerEvent::StartAck {
            code: room_code.to_string(),
            game: session.variant(),
            state,
            players: session.players_view(),
        },
    );
    super::publish_state(gateway, &session);

    Ok(())
}

pub async fn roll_dice(
    gateway: &Gateway,
    connection_id: &str,
    room_code: &str,
) -> Result<(), ApiError> {
    let mut session = gateway.registry.session(room_code).await?;
    let roll = session.roll_dice(connection_id, gateway.dice.as_ref())?;
    tracing::debug!(room_code, value = roll.value, turn_passed = roll.turn_passed, "dice rolled");

    gateway.connections.send_to_many(
        &session.player_ids(),
        ServerEvent::DiceResult {
            value: roll.value,
            player_id: connection_id.to_string(),
            turn_passed: roll.turn_passed,
        },
    );

    if roll.turn_passed {
        super::publish_state(gateway, &session);
    }

    Ok(())
}

pub async fn move_token(
    gateway: &Gateway,
    connection_id: &str,
    room_code: &str,
    token_index: usize,
) -> Result<(), ApiError> {
    let mut session = gateway.registry.session(room_code).await?;
    let game_over = session.move_token(connection_id, token_index)?;

    publish_move(gateway, &session, game_over);
    Ok(())
}

pub async fn chess_move(
    gateway: &Gateway,
    connection_id: &str,
    room_code: &str,
    from: Square,
    to: Square,
) -> Result<(), ApiError> {
    let mut session = gateway.registry.session(room_code).await?;
    let game_over = session.chess_move(connection_id, from, to)?;

    publish_move(gateway, &session, game_over);
    Ok(())
}

pub async fn resign(
    gateway: &Gateway,
    connection_id: &str,
    room_code: &str,
) -> Result<(), ApiError> {
    let mut session = gateway.registry.session(room_code).await?;
    let game_over = session.resign(connection_id)?;
    tracing::info!(room_code, connection_id, "player resigned");

    super::announce_game_over(gateway, &session.player_ids(), game_over);
    Ok(())
}

fn publish_move(gateway: &Gateway, session: &Session, game_over: Option<GameOver>) {
    super::publish_state(gateway, session);

    if let Some(game_over) = game_over {
        super::announce_game_over(gateway, &session.player_ids(), game_over);
    }
}
