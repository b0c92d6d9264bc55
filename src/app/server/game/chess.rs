//! Chess move validation without check detection
//!
//! The only way a game ends is by capturing the opposing king.

use std::collections::HashMap;

use thiserror::Error;

pub const BOARD_SIZE: i64 = 8;

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

#[derive(serde::Deserialize, serde::Serialize, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Row delta of a forward pawn step, white moves towards row 0
    fn forward(self) -> i64 {
        match self {
            Self::White => -1,
            Self::Black => 1,
        }
    }

    fn pawn_row(self) -> i64 {
        match self {
            Self::White => 6,
            Self::Black => 1,
        }
    }
}

#[derive(serde::Deserialize, serde::Serialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

#[derive(serde::Deserialize, serde::Serialize, Copy, Clone, Debug, PartialEq, Eq)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    pub fn new(color: Color, kind: PieceKind) -> Self {
        Self { color, kind }
    }
}

/// A board coordinate as sent by a client, not yet range checked
#[derive(serde::Deserialize, serde::Serialize, Copy, Clone, Debug, PartialEq, Eq)]
pub struct Square {
    pub r: i64,
    pub c: i64,
}

impl Square {
    pub fn new(r: i64, c: i64) -> Self {
        Self { r, c }
    }

    fn on_board(self) -> bool {
        (0..BOARD_SIZE).contains(&self.r) && (0..BOARD_SIZE).contains(&self.c)
    }
}

pub type Board = [[Option<Piece>; 8]; 8];

/// Why a chess move was refused
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum MoveRejection {
    #[error("out of range")]
    OutOfRange,
    #[error("no piece")]
    NoPiece,
    #[error("not your piece")]
    NotYourPiece,
    #[error("not your turn")]
    NotYourTurn,
    #[error("own piece capture")]
    OwnCapture,
    #[error("illegal geometry")]
    Geometry,
}

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ChessState {
    /// Indexed `[row][column]`, black's back rank is row 0
    pub board: Board,
    pub turn: Color,
    pub colors: HashMap<String, Color>,
}

impl ChessState {
    /// Standard opening position, the first player takes white
    pub fn new(player_ids: &[String]) -> Self {
        let mut board: Board = [[None; 8]; 8];
        for (column, kind) in BACK_RANK.into_iter().enumerate() {
            board[0][column] = Some(Piece::new(Color::Black, kind));
            board[1][column] = Some(Piece::new(Color::Black, PieceKind::Pawn));
            board[6][column] = Some(Piece::new(Color::White, PieceKind::Pawn));
            board[7][column] = Some(Piece::new(Color::White, kind));
        }

        let colors = player_ids
            .iter()
            .zip([Color::White, Color::Black])
            .map(|(player_id, color)| (player_id.clone(), color))
            .collect();

        Self {
            board,
            turn: Color::White,
            colors,
        }
    }

    pub fn color_of(&self, player_id: &str) -> Option<Color> {
        self.colors.get(player_id).copied()
    }

    /// Piece on a square already known to be on the board
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.board[square.r as usize][square.c as usize]
    }

    fn set(&mut self, square: Square, piece: Option<Piece>) {
        self.board[square.r as usize][square.c as usize] = piece;
    }

    /// Every square strictly between `from` and `to` along a straight or diagonal line is empty
    fn path_is_clear(&self, from: Square, to: Square) -> bool {
        let (dr, dc) = (to.r - from.r, to.c - from.c);
        let distance = dr.abs().max(dc.abs());
        let (step_r, step_c) = (dr.signum(), dc.signum());

        (1..distance).all(|step| {
            self.piece_at(Square::new(from.r + step_r * step, from.c + step_c * step))
                .is_none()
        })
    }
}

/// Result of a legal move
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    pub captured: Option<Piece>,
    /// Set when the move captured the opposing king
    pub winner: Option<String>,
}

/// Validate and apply a move for `player_id`
///
/// Checks run in a fixed order and the first failure is returned, leaving the
/// state untouched.
pub fn apply_move(
    state: &mut ChessState,
    player_id: &str,
    from: Square,
    to: Square,
) -> Result<MoveOutcome, MoveRejection> {
    if !from.on_board() || !to.on_board() {
        return Err(MoveRejection::OutOfRange);
    }

    let piece = state.piece_at(from).ok_or(MoveRejection::NoPiece)?;

    if state.color_of(player_id) != Some(piece.color) {
        return Err(MoveRejection::NotYourPiece);
    }

    if state.turn != piece.color {
        return Err(MoveRejection::NotYourTurn);
    }

    let target = state.piece_at(to);
    if target.is_some_and(|target| target.color == piece.color) {
        return Err(MoveRejection::OwnCapture);
    }

    if !is_legal_geometry(state, piece, from, to, target) {
        return Err(MoveRejection::Geometry);
    }

    state.set(to, Some(piece));
    state.set(from, None);
    state.turn = state.turn.opponent();

    let winner = match target {
        Some(Piece {
            kind: PieceKind::King,
            ..
        }) => Some(player_id.to_string()),
        _ => None,
    };

    Ok(MoveOutcome {
        captured: target,
        winner,
    })
}

fn is_legal_geometry(
    state: &ChessState,
    piece: Piece,
    from: Square,
    to: Square,
    target: Option<Piece>,
) -> bool {
    let (dr, dc) = (to.r - from.r, to.c - from.c);
    let straight = (dr == 0) != (dc == 0);
    let diagonal = dr != 0 && dr.abs() == dc.abs();

    match piece.kind {
        PieceKind::Pawn => {
            let forward = piece.color.forward();
            let single_push = dc == 0 && dr == forward && target.is_none();
            let capture = dc.abs() == 1 && dr == forward && target.is_some();
            let double_push = dc == 0
                && dr == 2 * forward
                && from.r == piece.color.pawn_row()
                && target.is_none()
                && state
                    .piece_at(Square::new(from.r + forward, from.c))
                    .is_none();

            single_push || capture || double_push
        }
        PieceKind::Knight => {
            (dr.abs() == 2 && dc.abs() == 1) || (dr.abs() == 1 && dc.abs() == 2)
        }
        PieceKind::Bishop => diagonal && state.path_is_clear(from, to),
        PieceKind::Rook => straight && state.path_is_clear(from, to),
        PieceKind::Queen => (straight || diagonal) && state.path_is_clear(from, to),
        PieceKind::King => dr.abs().max(dc.abs()) == 1,
    }
}
