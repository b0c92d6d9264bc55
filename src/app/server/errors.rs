use thiserror::Error;

use crate::app::server::{
    game::{chess::MoveRejection, GameVariant},
    gateway::protocol::ServerEvent,
};

/// Every way a player action can be refused
///
/// These are always local to the acting player: the session is left untouched
/// and the rejection is only delivered back to whoever sent the action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Room {room_code} not found")]
    RoomNotFound { room_code: String },
    #[error("Room {room_code} is full")]
    RoomFull { room_code: String },
    #[error("Only the host can start the game")]
    NotHost,
    #[error("Need 2 players and both secrets set")]
    NotReady,
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Roll the dice first")]
    NoDicePending,
    #[error("Invalid move")]
    InvalidMove,
    #[error("{0}")]
    IllegalMove(#[from] MoveRejection),
    #[error("No free room code found after {attempts} attempts")]
    CollisionExhausted { attempts: u32 },
    #[error("Not a member of room {room_code}")]
    NotInRoom { room_code: String },
    #[error("The game has not started yet")]
    GameNotStarted,
    #[error("A game is already in progress")]
    GameInProgress,
    #[error("The game is already over")]
    GameFinished,
    #[error("Action not available in a {variant} game")]
    WrongVariant { variant: GameVariant },
    #[error("The secret can no longer be changed")]
    SecretLocked,
    #[error("{message}")]
    BadRequest { message: String },
}

impl From<ApiError> for ServerEvent {
    fn from(value: ApiError) -> Self {
        tracing::warn!(api_error = ?value);
        let msg = value.to_string();
        match value {
            ApiError::RoomNotFound { .. }
            | ApiError::RoomFull { .. }
            | ApiError::CollisionExhausted { .. } => Self::JoinError { msg },
            ApiError::NotHost | ApiError::NotReady | ApiError::GameInProgress => {
                Self::StartDenied { msg }
            }
            ApiError::NotYourTurn => Self::NotYourTurn { msg },
            ApiError::NoDicePending => Self::NoDice { msg },
            ApiError::InvalidMove => Self::InvalidMove { msg },
            ApiError::IllegalMove(_) => Self::IllegalMove { msg },
            ApiError::NotInRoom { .. }
            | ApiError::GameNotStarted
            | ApiError::GameFinished
            | ApiError::WrongVariant { .. }
            | ApiError::SecretLocked
            | ApiError::BadRequest { .. } => Self::Error { msg },
        }
    }
}
