//! Ludo rules on the classic 52 square ring
//!
//! A token's position is tracked as the number of steps it has taken from its
//! owner's start square. `-1` is at base, `0..=51` is on the shared ring,
//! `52..=57` is the private home stretch and `999` is finished.

pub const AT_BASE: i16 = -1;
pub const FINISHED: i16 = 999;
pub const MAIN_RING_LEN: i16 = 52;
pub const HOME_STRETCH_LEN: i16 = 6;
pub const TOTAL_STEPS: i16 = MAIN_RING_LEN + HOME_STRETCH_LEN;
pub const TOKENS_PER_PLAYER: usize = 4;

/// Ring square each seat enters on, by seat index
pub const START_SQUARES: [i16; 4] = [0, 13, 26, 39];
pub const SAFE_SQUARES: [i16; 8] = [0, 8, 13, 21, 26, 34, 39, 47];

const RELEASE_VALUE: u8 = 6;

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Seat {
    pub player_id: String,
    pub tokens: [i16; TOKENS_PER_PLAYER],
}

/// Dice value waiting to be spent, and who rolled it
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PendingRoll {
    pub value: u8,
    pub roller: String,
}

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LudoState {
    /// Seats in turn order, fixed when the game starts
    pub seats: Vec<Seat>,
    pub turn_index: usize,
    pub pending_roll: Option<PendingRoll>,
}

impl LudoState {
    pub fn new(player_ids: &[String]) -> Self {
        let seats = player_ids
            .iter()
            .map(|player_id| Seat {
                player_id: player_id.clone(),
                tokens: [AT_BASE; TOKENS_PER_PLAYER],
            })
            .collect();

        Self {
            seats,
            turn_index: 0,
            pending_roll: None,
        }
    }

    pub fn current_player(&self) -> Option<&str> {
        self.seats
            .get(self.turn_index)
            .map(|seat| seat.player_id.as_str())
    }

    /// Hand the turn to the next seat
    pub fn advance_turn(&mut self) {
        if !self.seats.is_empty() {
            self.turn_index = (self.turn_index + 1) % self.seats.len();
        }
    }

    pub fn tokens(&self, player_id: &str) -> Option<&[i16; TOKENS_PER_PLAYER]> {
        self.seat_index(player_id).map(|index| &self.seats[index].tokens)
    }

    fn seat_index(&self, player_id: &str) -> Option<usize> {
        self.seats
            .iter()
            .position(|seat| seat.player_id == player_id)
    }
}

/// Absolute ring square of a token, `None` when it is not on the shared ring
pub fn board_square(seat_index: usize, steps: i16) -> Option<i16> {
    if (0..MAIN_RING_LEN).contains(&steps) {
        let start = START_SQUARES[seat_index % START_SQUARES.len()];
        Some((start + steps) % MAIN_RING_LEN)
    } else {
        None
    }
}

pub fn is_safe_square(square: i16) -> bool {
    SAFE_SQUARES.contains(&square)
}

fn can_move(steps: i16, dice: u8) -> bool {
    match steps {
        FINISHED => false,
        AT_BASE => dice == RELEASE_VALUE,
        _ => true,
    }
}

/// Whether any of the player's tokens can legally use `dice`
pub fn has_legal_move(state: &LudoState, player_id: &str, dice: u8) -> bool {
    state
        .tokens(player_id)
        .is_some_and(|tokens| tokens.iter().any(|&steps| can_move(steps, dice)))
}

/// Move one token by `dice` steps, returns whether the move was legal
///
/// Nothing is mutated when the move is refused. A legal move that lands on a
/// shared square outside the safe set sends every opposing token on that
/// square back to base.
pub fn move_token(state: &mut LudoState, player_id: &str, token_index: usize, dice: u8) -> bool {
    let Some(seat_index) = state.seat_index(player_id) else {
        return false;
    };
    let Some(&steps) = state.seats[seat_index].tokens.get(token_index) else {
        return false;
    };

    if !can_move(steps, dice) {
        return false;
    }

    let new_steps = if steps == AT_BASE {
        0
    } else {
        match steps + i16::from(dice) {
            overshoot if overshoot >= TOTAL_STEPS => FINISHED,
            in_transit => in_transit,
        }
    };
    state.seats[seat_index].tokens[token_index] = new_steps;

    // Entering from base lands on the start square, which is always safe
    if steps != AT_BASE {
        if let Some(square) = board_square(seat_index, new_steps) {
            if !is_safe_square(square) {
                capture(state, seat_index, square);
            }
        }
    }

    true
}

fn capture(state: &mut LudoState, mover_seat: usize, square: i16) {
    for (seat_index, seat) in state.seats.iter_mut().enumerate() {
        if seat_index == mover_seat {
            continue;
        }
        for token in seat.tokens.iter_mut() {
            if board_square(seat_index, *token) == Some(square) {
                *token = AT_BASE;
            }
        }
    }
}

/// The first player, in turn order, whose tokens have all finished
pub fn check_winner(state: &LudoState) -> Option<&str> {
    state
        .seats
        .iter()
        .find(|seat| seat.tokens.iter().all(|&steps| steps == FINISHED))
        .map(|seat| seat.player_id.as_str())
}
