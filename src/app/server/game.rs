use std::fmt;

use rand::Rng;

pub mod chess;
pub mod ludo;

/// The rule set a room is created with
#[derive(serde::Deserialize, serde::Serialize, Copy, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GameVariant {
    #[default]
    Ludo,
    Chess,
}

impl fmt::Display for GameVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ludo => f.write_str("ludo"),
            Self::Chess => f.write_str("chess"),
        }
    }
}

/// Board state of a running game, tagged by variant
///
/// The tag picks the rule engine once, at game start. The engines never see
/// each other's state.
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum GameState {
    Ludo(ludo::LudoState),
    Chess(chess::ChessState),
}

impl GameState {
    /// Fresh state for `variant`, seats assigned in join order
    pub fn new(variant: GameVariant, player_ids: &[String]) -> Self {
        match variant {
            GameVariant::Ludo => Self::Ludo(ludo::LudoState::new(player_ids)),
            GameVariant::Chess => Self::Chess(chess::ChessState::new(player_ids)),
        }
    }

    pub fn variant(&self) -> GameVariant {
        match self {
            Self::Ludo(_) => GameVariant::Ludo,
            Self::Chess(_) => GameVariant::Chess,
        }
    }
}

/// Source of dice values for Ludo rolls
pub trait Dice: Send + Sync {
    /// A value in `1..=6`
    fn roll(&self) -> u8;
}

/// Uniformly random dice backed by the thread local rng
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomDice;

impl Dice for RandomDice {
    fn roll(&self) -> u8 {
        rand::thread_rng().gen_range(1..=6)
    }
}
