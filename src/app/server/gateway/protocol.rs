//! Named events exchanged with clients
//!
//! On the wire every event is `{"event": "<name>", "data": {...}}`.

use crate::app::server::{
    game::{chess::Square, GameState, GameVariant},
    models::PlayerView,
};

/// Actions sent by a player
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    CreateRoom {
        #[serde(default)]
        name: String,
        #[serde(default)]
        game: GameVariant,
    },
    JoinRoom {
        code: String,
        #[serde(default)]
        name: String,
    },
    SetSecret {
        room: String,
        #[serde(default)]
        secret: String,
    },
    StartGame {
        room: String,
    },
    RollDice {
        room: String,
    },
    MoveToken {
        room: String,
        #[serde(alias = "tokenIndex")]
        token_index: usize,
    },
    ChessMove {
        room: String,
        from: Square,
        to: Square,
    },
    Resign {
        room: String,
    },
    LeaveRoom {
        room: String,
    },
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "create_room",
            Self::JoinRoom { .. } => "join_room",
            Self::SetSecret { .. } => "set_secret",
            Self::StartGame { .. } => "start_game",
            Self::RollDice { .. } => "roll_dice",
            Self::MoveToken { .. } => "move_token",
            Self::ChessMove { .. } => "chess_move",
            Self::Resign { .. } => "resign",
            Self::LeaveRoom { .. } => "leave_room",
        }
    }

    /// Room the action targets, `None` for room creation
    pub fn room_code(&self) -> Option<&str> {
        match self {
            Self::CreateRoom { .. } => None,
            Self::JoinRoom { code, .. } => Some(code.as_str()),
            Self::SetSecret { room, .. }
            | Self::StartGame { room }
            | Self::RollDice { room }
            | Self::MoveToken { room, .. }
            | Self::ChessMove { room, .. }
            | Self::Resign { room }
            | Self::LeaveRoom { room } => Some(room.as_str()),
        }
    }
}

/// Events delivered to one player or to a whole room
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// First event on every connection, carries the identity used in game state
    Welcome {
        player_id: String,
    },
    RoomCreated {
        code: String,
        game: GameVariant,
        players: Vec<PlayerView>,
    },
    RoomJoined {
        code: String,
        game: GameVariant,
        players: Vec<PlayerView>,
    },
    PlayersUpdate {
        players: Vec<PlayerView>,
    },
    StartAck {
        code: String,
        game: GameVariant,
        state: GameState,
        players: Vec<PlayerView>,
    },
    StateUpdate {
        state: GameState,
    },
    DiceResult {
        value: u8,
        player_id: String,
        turn_passed: bool,
    },
    GameOver {
        winner_id: String,
        winner_name: String,
    },
    RevealSecret {
        secret: String,
    },
    LeftRoom {
        code: String,
    },
    JoinError {
        msg: String,
    },
    StartDenied {
        msg: String,
    },
    NotYourTurn {
        msg: String,
    },
    NoDice {
        msg: String,
    },
    InvalidMove {
        msg: String,
    },
    IllegalMove {
        msg: String,
    },
    Error {
        msg: String,
    },
}
