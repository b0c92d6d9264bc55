pub mod game;
pub mod room;

use super::{protocol::ServerEvent, Gateway};
use crate::app::server::session::{GameOver, Session};

/// Send the current board to everyone in the room
fn publish_state(gateway: &Gateway, session: &Session) {
    if let Some(state) = session.game() {
        gateway.connections.send_to_many(
            &session.player_ids(),
            ServerEvent::StateUpdate {
                state: state.clone(),
            },
        );
    }
}

/// Tell the room who won, and only the winner what the secret was
fn announce_game_over(gateway: &Gateway, members: &[String], game_over: GameOver) {
    tracing::info!(winner_id = %game_over.winner_id, "game over");

    gateway.connections.send_to_many(
        members,
        ServerEvent::GameOver {
            winner_id: game_over.winner_id.clone(),
            winner_name: game_over.winner_name,
        },
    );

    gateway.connections.send_to(
        &game_over.winner_id,
        ServerEvent::RevealSecret {
            secret: game_over.secret,
        },
    );
}
