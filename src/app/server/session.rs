use crate::app::server::{
    errors::ApiError,
    game::{
        chess::{self, ChessState, MoveRejection, Square},
        ludo::{self, LudoState, PendingRoll},
        Dice, GameState, GameVariant,
    },
    models::{Player, PlayerView},
};

pub const MAX_PLAYERS: usize = 2;

/// Dice value that earns the roller another turn
const EXTRA_TURN_VALUE: u8 = 6;

#[derive(serde::Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Phase {
    Lobby,
    InProgress,
    Finished { winner_id: String },
}

/// Everything the host needs to announce the end of a game
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameOver {
    pub winner_id: String,
    pub winner_name: String,
    pub secret: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RollOutcome {
    pub value: u8,
    /// The roll left no token able to move, so the turn moved on
    pub turn_passed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Departure {
    pub remaining: usize,
    pub new_host: Option<String>,
    /// Leaving a running game hands the win to whoever stays
    pub game_over: Option<GameOver>,
}

/// One room: its players, who hosts it and the game being played in it
///
/// A session is never touched by two handlers at once, the registry hands it
/// out behind a lock, so every check here and the mutation after it happen
/// atomically.
#[derive(Clone, Debug)]
pub struct Session {
    room_code: String,
    players: Vec<Player>,
    variant: GameVariant,
    host_id: String,
    phase: Phase,
    game: Option<GameState>,
}

impl Session {
    pub fn new(room_code: String, creator: Player, variant: GameVariant) -> Self {
        Self {
            room_code,
            host_id: creator.player_id.clone(),
            players: vec![creator],
            variant,
            phase: Phase::Lobby,
            game: None,
        }
    }

    pub fn room_code(&self) -> &str {
        &self.room_code
    }

    pub fn variant(&self) -> GameVariant {
        self.variant
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player_ids(&self) -> Vec<String> {
        self.players
            .iter()
            .map(|player| player.player_id.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.players
            .iter()
            .any(|player| player.player_id == player_id)
    }

    /// The player list as broadcast to room members
    pub fn players_view(&self) -> Vec<PlayerView> {
        self.players
            .iter()
            .map(|player| PlayerView::new(player, &self.host_id))
            .collect()
    }

    pub fn add_player(&mut self, player: Player) -> Result<(), ApiError> {
        if self.contains(&player.player_id) {
            return Err(ApiError::BadRequest {
                message: "Already in this room".to_string(),
            });
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(ApiError::RoomFull {
                room_code: self.room_code.clone(),
            });
        }

        self.players.push(player);
        Ok(())
    }

    /// Remove a player, reassigning the host and settling a running game
    pub fn remove_player(&mut self, player_id: &str) -> Result<Departure, ApiError> {
        self.ensure_member(player_id)?;

        let game_over = match self.phase {
            Phase::InProgress => self.opponent_of(player_id).map(|winner| self.finish(&winner)),
            Phase::Lobby | Phase::Finished { .. } => None,
        };

        self.players.retain(|player| player.player_id != player_id);

        let new_host = match self.players.first() {
            Some(next_host) if self.host_id == player_id => {
                self.host_id = next_host.player_id.clone();
                Some(self.host_id.clone())
            }
            _ => None,
        };

        Ok(Departure {
            remaining: self.players.len(),
            new_host,
            game_over,
        })
    }

    pub fn set_secret(&mut self, player_id: &str, secret: String) -> Result<(), ApiError> {
        if self.phase == Phase::InProgress {
            return Err(ApiError::SecretLocked);
        }

        let player = self
            .players
            .iter_mut()
            .find(|player| player.player_id == player_id)
            .ok_or_else(|| ApiError::NotInRoom {
                room_code: self.room_code.clone(),
            })?;

        if player.secret_set() {
            return Err(ApiError::SecretLocked);
        }

        player.assign_secret(secret);
        Ok(())
    }

    pub fn start_game(&mut self, requester_id: &str) -> Result<&GameState, ApiError> {
        if self.host_id != requester_id {
            return Err(ApiError::NotHost);
        }
        if self.phase == Phase::InProgress {
            return Err(ApiError::GameInProgress);
        }
        if self.players.len() < MAX_PLAYERS || !self.players.iter().all(Player::secret_set) {
            return Err(ApiError::NotReady);
        }

        let game = GameState::new(self.variant, &self.player_ids());
        self.phase = Phase::InProgress;
        Ok(self.game.insert(game))
    }

    pub fn roll_dice(&mut self, requester_id: &str, dice: &dyn Dice) -> Result<RollOutcome, ApiError> {
        let state = self.ludo_turn(requester_id)?;

        if state.pending_roll.is_some() {
            return Err(ApiError::BadRequest {
                message: "Dice already rolled, move a token".to_string(),
            });
        }

        let value = dice.roll();
        let turn_passed = !ludo::has_legal_move(state, requester_id, value);

        if turn_passed {
            state.advance_turn();
        } else {
            state.pending_roll = Some(PendingRoll {
                value,
                roller: requester_id.to_string(),
            });
        }

        Ok(RollOutcome { value, turn_passed })
    }

    /// Spend the pending dice on one token
    ///
    /// A refused move keeps the dice pending so the player can pick another
    /// token, the turn only moves on once the dice has been spent.
    pub fn move_token(
        &mut self,
        requester_id: &str,
        token_index: usize,
    ) -> Result<Option<GameOver>, ApiError> {
        let state = self.ludo_turn(requester_id)?;

        let value = match &state.pending_roll {
            Some(roll) if roll.roller == requester_id => roll.value,
            _ => return Err(ApiError::NoDicePending),
        };

        if !ludo::move_token(state, requester_id, token_index, value) {
            return Err(ApiError::InvalidMove);
        }

        state.pending_roll = None;
        if value != EXTRA_TURN_VALUE {
            state.advance_turn();
        }

        let winner = ludo::check_winner(state).map(str::to_string);
        Ok(winner.map(|winner| self.finish(&winner)))
    }

    pub fn chess_move(
        &mut self,
        requester_id: &str,
        from: Square,
        to: Square,
    ) -> Result<Option<GameOver>, ApiError> {
        self.ensure_member(requester_id)?;
        let state = match self.active_game()? {
            GameState::Chess(state) => state,
            other => {
                return Err(ApiError::WrongVariant {
                    variant: other.variant(),
                })
            }
        };

        match state.color_of(requester_id) {
            Some(color) if color == state.turn => {}
            Some(_) => return Err(MoveRejection::NotYourTurn.into()),
            None => return Err(MoveRejection::NotYourPiece.into()),
        }

        let outcome = chess::apply_move(state, requester_id, from, to)?;
        Ok(outcome.winner.map(|winner| self.finish(&winner)))
    }

    /// Concede, the opponent wins whatever the board looks like
    pub fn resign(&mut self, requester_id: &str) -> Result<GameOver, ApiError> {
        self.ensure_member(requester_id)?;
        match self.phase {
            Phase::Lobby => return Err(ApiError::NotReady),
            Phase::Finished { .. } => return Err(ApiError::GameFinished),
            Phase::InProgress => {}
        }

        let winner = self.opponent_of(requester_id).ok_or(ApiError::NotReady)?;
        Ok(self.finish(&winner))
    }

    fn ensure_member(&self, player_id: &str) -> Result<(), ApiError> {
        if self.contains(player_id) {
            Ok(())
        } else {
            Err(ApiError::NotInRoom {
                room_code: self.room_code.clone(),
            })
        }
    }

    fn opponent_of(&self, player_id: &str) -> Option<String> {
        self.players
            .iter()
            .find(|player| player.player_id != player_id)
            .map(|player| player.player_id.clone())
    }

    fn active_game(&mut self) -> Result<&mut GameState, ApiError> {
        match self.phase {
            Phase::Lobby => Err(ApiError::GameNotStarted),
            Phase::Finished { .. } => Err(ApiError::GameFinished),
            Phase::InProgress => self.game.as_mut().ok_or(ApiError::GameNotStarted),
        }
    }

    /// The Ludo state, provided it is `requester_id`'s turn
    fn ludo_turn(&mut self, requester_id: &str) -> Result<&mut LudoState, ApiError> {
        self.ensure_member(requester_id)?;
        let state = match self.active_game()? {
            GameState::Ludo(state) => state,
            other => {
                return Err(ApiError::WrongVariant {
                    variant: other.variant(),
                })
            }
        };

        if state.current_player() != Some(requester_id) {
            return Err(ApiError::NotYourTurn);
        }
        Ok(state)
    }

    fn finish(&mut self, winner_id: &str) -> GameOver {
        self.phase = Phase::Finished {
            winner_id: winner_id.to_string(),
        };

        let winner = self
            .players
            .iter()
            .find(|player| player.player_id == winner_id);

        GameOver {
            winner_id: winner_id.to_string(),
            winner_name: winner.map(|player| player.name.clone()).unwrap_or_default(),
            secret: winner
                .and_then(|player| player.secret.clone())
                .unwrap_or_default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn game_mut(&mut self) -> Option<&mut GameState> {
        self.game.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Mutex};

    use super::*;
    use crate::app::server::game::{
        chess::{Color, Piece, PieceKind},
        ludo::{AT_BASE, FINISHED},
    };

    const HOST: &str = "conn_host";
    const GUEST: &str = "conn_guest";

    struct ScriptedDice(Mutex<VecDeque<u8>>);

    impl ScriptedDice {
        fn new(values: &[u8]) -> Self {
            Self(Mutex::new(values.iter().copied().collect()))
        }
    }

    impl Dice for ScriptedDice {
        fn roll(&self) -> u8 {
            self.0.lock().unwrap().pop_front().expect("dice script ran out")
        }
    }

    fn lobby(variant: GameVariant) -> Session {
        let mut session = Session::new(
            "ROOM42".to_string(),
            Player::new(HOST.to_string(), "Hana".to_string()),
            variant,
        );
        session
            .add_player(Player::new(GUEST.to_string(), "Gus".to_string()))
            .unwrap();
        session
    }

    fn started(variant: GameVariant) -> Session {
        let mut session = lobby(variant);
        session.set_secret(HOST, "host secret".to_string()).unwrap();
        session.set_secret(GUEST, "guest secret".to_string()).unwrap();
        session.start_game(HOST).unwrap();
        session
    }

    fn ludo(session: &Session) -> &LudoState {
        match session.game() {
            Some(GameState::Ludo(state)) => state,
            other => panic!("expected a ludo game, got {other:?}"),
        }
    }

    fn chess_state(session: &mut Session) -> &mut ChessState {
        match session.game_mut() {
            Some(GameState::Chess(state)) => state,
            other => panic!("expected a chess game, got {other:?}"),
        }
    }

    #[test]
    fn room_holds_at_most_two_players() {
        let mut session = lobby(GameVariant::Ludo);
        let error = session
            .add_player(Player::new("conn_third".to_string(), "Tia".to_string()))
            .unwrap_err();

        assert_eq!(
            error,
            ApiError::RoomFull {
                room_code: "ROOM42".to_string()
            }
        );
        assert_eq!(session.players().len(), 2);
    }

    #[test]
    fn start_requires_host_two_players_and_secrets() {
        let mut session = Session::new(
            "ROOM42".to_string(),
            Player::new(HOST.to_string(), "Hana".to_string()),
            GameVariant::Ludo,
        );
        session.set_secret(HOST, "s".to_string()).unwrap();
        assert_eq!(session.start_game(HOST).unwrap_err(), ApiError::NotReady);

        session
            .add_player(Player::new(GUEST.to_string(), "Gus".to_string()))
            .unwrap();
        assert_eq!(session.start_game(GUEST).unwrap_err(), ApiError::NotHost);
        assert_eq!(session.start_game(HOST).unwrap_err(), ApiError::NotReady);
        assert_eq!(session.phase(), &Phase::Lobby);
        assert!(session.game().is_none());

        session.set_secret(GUEST, "t".to_string()).unwrap();
        assert!(session.start_game(HOST).is_ok());
        assert_eq!(session.phase(), &Phase::InProgress);
        assert_eq!(session.start_game(HOST).unwrap_err(), ApiError::GameInProgress);
    }

    #[test]
    fn ludo_starts_with_every_token_at_base() {
        let session = started(GameVariant::Ludo);
        let state = ludo(&session);

        assert_eq!(state.turn_index, 0);
        assert_eq!(state.current_player(), Some(HOST));
        let tokens = state
            .seats
            .iter()
            .flat_map(|seat| seat.tokens)
            .collect::<Vec<_>>();
        assert_eq!(tokens, vec![AT_BASE; 8]);
    }

    #[test]
    fn six_keeps_the_turn_and_other_values_pass_it() {
        let mut session = started(GameVariant::Ludo);
        let dice = ScriptedDice::new(&[6, 3]);

        let roll = session.roll_dice(HOST, &dice).unwrap();
        assert_eq!(roll, RollOutcome { value: 6, turn_passed: false });
        assert_eq!(session.move_token(HOST, 0).unwrap(), None);
        assert_eq!(ludo(&session).tokens(HOST).unwrap()[0], 0);
        assert_eq!(ludo(&session).current_player(), Some(HOST));
        assert_eq!(ludo(&session).pending_roll, None);

        session.roll_dice(HOST, &dice).unwrap();
        session.move_token(HOST, 0).unwrap();
        assert_eq!(ludo(&session).tokens(HOST).unwrap()[0], 3);
        assert_eq!(ludo(&session).current_player(), Some(GUEST));
    }

    #[test]
    fn only_the_current_player_may_roll_or_move() {
        let mut session = started(GameVariant::Ludo);
        let dice = ScriptedDice::new(&[6]);

        assert_eq!(
            session.roll_dice(GUEST, &dice).unwrap_err(),
            ApiError::NotYourTurn
        );
        assert_eq!(session.move_token(GUEST, 0).unwrap_err(), ApiError::NotYourTurn);
        assert_eq!(
            session.move_token(HOST, 0).unwrap_err(),
            ApiError::NoDicePending
        );
    }

    #[test]
    fn roll_without_a_legal_move_passes_the_turn() {
        let mut session = started(GameVariant::Ludo);
        let dice = ScriptedDice::new(&[4]);

        let roll = session.roll_dice(HOST, &dice).unwrap();

        assert!(roll.turn_passed);
        assert_eq!(ludo(&session).pending_roll, None);
        assert_eq!(ludo(&session).current_player(), Some(GUEST));
    }

    #[test]
    fn dice_cannot_be_rerolled_before_moving() {
        let mut session = started(GameVariant::Ludo);
        let dice = ScriptedDice::new(&[6, 6]);

        session.roll_dice(HOST, &dice).unwrap();
        assert!(matches!(
            session.roll_dice(HOST, &dice),
            Err(ApiError::BadRequest { .. })
        ));
    }

    #[test]
    fn rejected_moves_are_idempotent() {
        let mut session = started(GameVariant::Ludo);
        let dice = ScriptedDice::new(&[6]);
        session.roll_dice(HOST, &dice).unwrap();
        let before = ludo(&session).clone();

        for _ in 0..3 {
            assert_eq!(session.move_token(HOST, 7).unwrap_err(), ApiError::InvalidMove);
            assert_eq!(ludo(&session), &before);
            assert_eq!(session.move_token(GUEST, 0).unwrap_err(), ApiError::NotYourTurn);
            assert_eq!(ludo(&session), &before);
        }

        // The dice is still there for a legal token
        assert!(session.move_token(HOST, 0).is_ok());
    }

    #[test]
    fn finishing_all_tokens_ends_the_game() {
        let mut session = started(GameVariant::Ludo);
        if let Some(GameState::Ludo(state)) = session.game_mut() {
            state.seats[0].tokens = [FINISHED, FINISHED, FINISHED, 55];
        }
        let dice = ScriptedDice::new(&[4]);

        session.roll_dice(HOST, &dice).unwrap();
        let game_over = session.move_token(HOST, 3).unwrap();

        assert_eq!(
            game_over,
            Some(GameOver {
                winner_id: HOST.to_string(),
                winner_name: "Hana".to_string(),
                secret: "host secret".to_string(),
            })
        );
        assert_eq!(
            session.phase(),
            &Phase::Finished {
                winner_id: HOST.to_string()
            }
        );
        assert_eq!(
            session.roll_dice(GUEST, &dice).unwrap_err(),
            ApiError::GameFinished
        );
    }

    #[test]
    fn king_capture_finishes_a_chess_game() {
        let mut session = started(GameVariant::Chess);
        let state = chess_state(&mut session);
        state.board = [[None; 8]; 8];
        state.board[7][4] = Some(Piece::new(Color::White, PieceKind::King));
        state.board[0][0] = Some(Piece::new(Color::Black, PieceKind::King));
        state.board[0][4] = Some(Piece::new(Color::Black, PieceKind::Rook));
        state.board[5][0] = Some(Piece::new(Color::White, PieceKind::Pawn));

        session
            .chess_move(HOST, Square::new(5, 0), Square::new(4, 0))
            .unwrap();
        let game_over = session
            .chess_move(GUEST, Square::new(0, 4), Square::new(7, 4))
            .unwrap()
            .unwrap();

        assert_eq!(game_over.winner_id, GUEST);
        assert_eq!(game_over.secret, "guest secret");
        assert_eq!(
            session.phase(),
            &Phase::Finished {
                winner_id: GUEST.to_string()
            }
        );
        assert_eq!(
            session
                .chess_move(HOST, Square::new(4, 0), Square::new(3, 0))
                .unwrap_err(),
            ApiError::GameFinished
        );
    }

    #[test]
    fn chess_moves_out_of_turn_are_refused_untouched() {
        let mut session = started(GameVariant::Chess);
        let before = session.game().cloned();

        for (from, to) in [((1, 4), (3, 4)), ((6, 4), (4, 4)), ((4, 4), (3, 4))] {
            let error = session
                .chess_move(GUEST, Square::new(from.0, from.1), Square::new(to.0, to.1))
                .unwrap_err();
            assert_eq!(error, ApiError::IllegalMove(MoveRejection::NotYourTurn));
            assert_eq!(error.to_string(), "not your turn");
            assert_eq!(session.game().cloned(), before);
        }
    }

    #[test]
    fn variant_specific_actions_are_gated() {
        let mut chess = started(GameVariant::Chess);
        let dice = ScriptedDice::new(&[6]);
        assert_eq!(
            chess.roll_dice(HOST, &dice).unwrap_err(),
            ApiError::WrongVariant {
                variant: GameVariant::Chess
            }
        );

        let mut ludo = started(GameVariant::Ludo);
        assert_eq!(
            ludo.chess_move(HOST, Square::new(6, 0), Square::new(5, 0))
                .unwrap_err(),
            ApiError::WrongVariant {
                variant: GameVariant::Ludo
            }
        );

        let mut waiting = lobby(GameVariant::Ludo);
        assert_eq!(
            waiting.roll_dice(HOST, &dice).unwrap_err(),
            ApiError::GameNotStarted
        );
    }

    #[test]
    fn resignation_hands_the_win_to_the_opponent() {
        let mut waiting = lobby(GameVariant::Chess);
        assert_eq!(waiting.resign(GUEST).unwrap_err(), ApiError::NotReady);

        let mut session = started(GameVariant::Chess);
        let game_over = session.resign(HOST).unwrap();

        assert_eq!(game_over.winner_id, GUEST);
        assert_eq!(game_over.winner_name, "Gus");
        assert_eq!(session.resign(GUEST).unwrap_err(), ApiError::GameFinished);
    }

    #[test]
    fn secrets_are_set_once_and_never_mid_game() {
        let mut session = lobby(GameVariant::Ludo);
        session.set_secret(HOST, "first".to_string()).unwrap();
        assert_eq!(
            session.set_secret(HOST, "second".to_string()).unwrap_err(),
            ApiError::SecretLocked
        );
        assert_eq!(session.players()[0].secret.as_deref(), Some("first"));

        let views = session.players_view();
        assert!(views[0].secret_set && views[0].is_host);
        assert!(!views[1].secret_set && !views[1].is_host);
    }

    #[test]
    fn leaving_host_passes_the_room_on() {
        let mut session = lobby(GameVariant::Ludo);

        let departure = session.remove_player(HOST).unwrap();

        assert_eq!(
            departure,
            Departure {
                remaining: 1,
                new_host: Some(GUEST.to_string()),
                game_over: None,
            }
        );
        assert_eq!(session.host_id(), GUEST);

        let departure = session.remove_player(GUEST).unwrap();
        assert_eq!(departure.remaining, 0);
        assert!(session.is_empty());
    }

    #[test]
    fn leaving_mid_game_forfeits() {
        let mut session = started(GameVariant::Ludo);

        let departure = session.remove_player(GUEST).unwrap();

        assert_eq!(departure.new_host, None);
        assert_eq!(departure.game_over.unwrap().winner_id, HOST);
        assert!(matches!(session.phase(), Phase::Finished { .. }));
    }

    #[test]
    fn finished_games_can_be_restarted() {
        let mut session = started(GameVariant::Ludo);
        session.resign(GUEST).unwrap();

        session.start_game(HOST).unwrap();

        assert_eq!(session.phase(), &Phase::InProgress);
        assert_eq!(ludo(&session).turn_index, 0);
    }
}
