use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::board::{BOARD_SIZE, Board, DIRECTIONS, Position};
use crate::history::{History, MoveRecord};
use crate::loader::{BoardLoader, LoadError};
use crate::logger::{GameLogger, GameReport};
use crate::piece::{Piece, Player, PlayerRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub from: Position,
    pub to: Position,
}

impl Move {
    pub fn new(from: Position, to: Position) -> Self {
        Move { from, to }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Why a move was refused. A refused move never changes the game.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("Game already over")]
    GameOver,
    #[error("Piece must move to another square")]
    Stationary,
    #[error("Pieces move along a row or a column only")]
    NotOrthogonal,
    #[error("No piece at {0}")]
    EmptySource(Position),
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Only the king may enter corner {0}")]
    PawnIntoCorner(Position),
    #[error("Destination {0} is off the board")]
    OffBoard(Position),
    #[error("Path blocked at {0}")]
    Blocked(Position),
}

/// What an accepted move did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveSummary {
    pub captures: Vec<Position>,
    pub winner: Option<Player>,
}

/// A game in progress: board, move history, whose turn it is and both
/// players' win counters.
pub struct Game {
    loader: Box<dyn BoardLoader>,
    logger: Box<dyn GameLogger>,
    defender: PlayerRecord,
    attacker: PlayerRecord,
    board: Board,
    history: History,
    current_player: Player,
}

impl Game {
    /// Loads the starting layout and starts a game with the attackers to move.
    pub fn new(
        loader: Box<dyn BoardLoader>,
        logger: Box<dyn GameLogger>,
    ) -> Result<Self, LoadError> {
        let board = Board::from_layout(loader.load()?)?;
        Ok(Game {
            loader,
            logger,
            defender: PlayerRecord::new(Player::Defenders),
            attacker: PlayerRecord::new(Player::Attackers),
            board,
            history: History::new(),
            current_player: Player::Attackers,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_size(&self) -> usize {
        BOARD_SIZE
    }

    pub fn piece_at(&self, pos: Position) -> Option<&Piece> {
        self.board.get(pos)
    }

    /// The defending side.
    pub fn first_player(&self) -> &PlayerRecord {
        &self.defender
    }

    /// The attacking side.
    pub fn second_player(&self) -> &PlayerRecord {
        &self.attacker
    }

    pub fn player(&self, player: Player) -> &PlayerRecord {
        match player {
            Player::Defenders => &self.defender,
            Player::Attackers => &self.attacker,
        }
    }

    fn player_mut(&mut self, player: Player) -> &mut PlayerRecord {
        match player {
            Player::Defenders => &mut self.defender,
            Player::Attackers => &mut self.attacker,
        }
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn is_second_player_turn(&self) -> bool {
        self.current_player == Player::Attackers
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn move_count(&self) -> usize {
        self.history.len()
    }

    pub fn is_game_finished(&self) -> bool {
        self.check_winner().is_some()
    }

    pub fn winner(&self) -> Option<Player> {
        self.check_winner()
    }

    pub fn display_board(&self) -> String {
        self.board.display()
    }

    /// Moves the piece at `src` to `dst`, returning whether the move happened.
    pub fn move_piece(&mut self, src: Position, dst: Position) -> bool {
        self.make_move(Move::new(src, dst)).is_ok()
    }

    /// Plays a move: validates it, moves the piece, resolves captures around
    /// the destination and checks whether the game is over.
    pub fn make_move(&mut self, mv: Move) -> Result<MoveSummary, MoveError> {
        if let Err(e) = self.validate(mv) {
            trace!(%mv, error = %e, "move rejected");
            return Err(e);
        }

        let Move { from, to } = mv;
        let mut piece = self.board.remove(from).ok_or(MoveError::EmptySource(from))?;
        let id = piece.id();
        piece.record_move(to);
        self.board.place(to, piece);
        self.board.step_here(to, id);

        let mut captures = Vec::new();
        for (dx, dy) in DIRECTIONS {
            let (x, y) = to.offset(dx, dy);
            if let Some(capture) = self.attempt_capture(to, x, y) {
                captures.push(capture);
            }
        }
        let captured: Vec<Position> = captures.iter().map(|(pos, _)| *pos).collect();

        self.history.push(MoveRecord {
            piece: id,
            source: from,
            destination: to,
            captures,
            winner: None,
        });
        self.current_player = self.current_player.opponent();
        debug!(%mv, captures = captured.len(), "move played");

        let winner = self.check_winner();
        if let Some(winner) = winner {
            if let Some(record) = self.history.last_mut() {
                record.winner = Some(winner);
            }
            self.finish_game(winner);
        }

        Ok(MoveSummary {
            captures: captured,
            winner,
        })
    }

    /// Checks a move against the rules in order, stopping at the first failure.
    fn validate(&self, mv: Move) -> Result<(), MoveError> {
        let Move { from, to } = mv;

        if self.is_game_finished() {
            return Err(MoveError::GameOver);
        }
        if from == to {
            return Err(MoveError::Stationary);
        }
        if from.x != to.x && from.y != to.y {
            return Err(MoveError::NotOrthogonal);
        }
        let piece = self.board.get(from).ok_or(MoveError::EmptySource(from))?;
        if piece.owner() != self.current_player {
            return Err(MoveError::NotYourTurn);
        }
        if piece.is_pawn() && to.is_corner() {
            return Err(MoveError::PawnIntoCorner(to));
        }
        if !to.is_inside_board() {
            return Err(MoveError::OffBoard(to));
        }
        match self.first_blocker(from, to) {
            Some(blocker) => Err(MoveError::Blocked(blocker)),
            None => Ok(()),
        }
    }

    /// First occupied square on the straight path from `from` (exclusive) to
    /// `to` (inclusive).
    fn first_blocker(&self, from: Position, to: Position) -> Option<Position> {
        let dx = (to.x as isize - from.x as isize).signum();
        let dy = (to.y as isize - from.y as isize).signum();

        let mut current = from;
        while current != to {
            let (x, y) = current.offset(dx, dy);
            current = Position::checked(x, y)?;
            if !self.board.is_empty(current) {
                return Some(current);
            }
        }
        None
    }

    /// Tries to capture the piece at `(target_x, target_y)` using the pawn that
    /// just arrived at `capturer`.
    ///
    /// The target is captured when the square beyond it, seen from the
    /// capturer, is off the board, a corner, or holds a pawn of the capturer's
    /// side. The king is never captured this way and never captures or assists.
    ///
    /// # Panics
    ///
    /// Panics if `capturer` is empty.
    fn attempt_capture(
        &mut self,
        capturer: Position,
        target_x: isize,
        target_y: isize,
    ) -> Option<(Position, Piece)> {
        let target = Position::checked(target_x, target_y)?;
        if target.is_corner() {
            return None;
        }
        let Some(capturing) = self.board.get(capturer) else {
            panic!("capture attempted from empty square {capturer}");
        };
        if !capturing.is_pawn() {
            return None;
        }
        let side = capturing.owner();

        let captured = self.board.get(target)?;
        if captured.owner() == side || captured.is_king() {
            return None;
        }

        let dx = target.x as isize - capturer.x as isize;
        let dy = target.y as isize - capturer.y as isize;
        let (assist_x, assist_y) = target.offset(dx, dy);
        // Off the board or in a corner, the assist square counts as an ally
        if let Some(assist) = Position::checked(assist_x, assist_y) {
            if !assist.is_corner() {
                match self.board.get(assist) {
                    Some(ally) if ally.owner() == side && !ally.is_king() => {}
                    _ => return None,
                }
            }
        }

        let captured = self.board.remove(target)?;
        if let Some(capturing) = self.board.get_mut(capturer) {
            capturing.add_capture();
        }
        debug!(at = %target, piece = %captured, "captured");
        Some((target, captured))
    }

    /// The defenders win when the king stands in a corner; the attackers win
    /// when each of the king's four sides is off the board or an attacker.
    ///
    /// # Panics
    ///
    /// Panics if the king is missing from the board.
    fn check_winner(&self) -> Option<Player> {
        let Some(king) = self.board.king() else {
            panic!("king missing from board");
        };
        if king.is_corner() {
            return Some(Player::Defenders);
        }

        let boxed = DIRECTIONS
            .iter()
            .filter(|&&(dx, dy)| {
                let (x, y) = king.offset(dx, dy);
                match Position::checked(x, y) {
                    None => true,
                    Some(side) => self
                        .board
                        .get(side)
                        .is_some_and(|piece| piece.owner() == Player::Attackers),
                }
            })
            .count();

        if boxed == DIRECTIONS.len() {
            Some(Player::Attackers)
        } else {
            None
        }
    }

    fn finish_game(&mut self, winner: Player) {
        self.player_mut(winner).add_win();

        let pieces = self
            .board
            .iter()
            .map(|(_, piece)| piece)
            .chain(self.history.captured_pieces());
        let report = GameReport::build(winner, &self.board, pieces);

        let record = match winner {
            Player::Defenders => &self.defender,
            Player::Attackers => &self.attacker,
        };
        info!(%winner, wins = record.wins(), moves = self.history.len(), "game over");
        self.logger.log_game(record, &report);
    }

    /// Takes back the last move, restoring the board, turn, captured pieces
    /// and per-piece statistics exactly. Undoing a winning move also takes
    /// back the win. Returns `false` when there is nothing to undo.
    pub fn undo_last_move(&mut self) -> bool {
        let Some(record) = self.history.pop() else {
            return false;
        };
        let MoveRecord {
            piece: id,
            source,
            destination,
            captures,
            winner,
        } = record;

        let Some(mut piece) = self.board.remove(destination) else {
            panic!("moved piece {id:?} missing from {destination}");
        };
        debug_assert_eq!(piece.id(), id);

        piece.undo_move();
        self.board.undo_step(destination, id);
        if piece.is_pawn() {
            piece.undo_captures(captures.len() as u32);
        }
        self.board.place(source, piece);
        for (pos, captured) in captures {
            self.board.place(pos, captured);
        }

        self.current_player = self.current_player.opponent();
        if let Some(winner) = winner {
            self.player_mut(winner).undo_win();
        }
        debug!(from = %destination, to = %source, "move undone");
        true
    }

    /// Reloads the starting layout and clears the history. Win counters are
    /// kept. On a load error the current game is left untouched.
    pub fn reset(&mut self) -> Result<(), LoadError> {
        let board = Board::from_layout(self.loader.load()?)?;
        self.board = board;
        self.history.clear();
        self.current_player = Player::Attackers;
        info!("game reset");
        Ok(())
    }

    /// Every legal move for `player`, regardless of whose turn it is.
    pub fn legal_moves(&self, player: Player) -> Vec<Move> {
        if self.is_game_finished() {
            return Vec::new();
        }

        let mut moves = Vec::new();
        let mut squares: Vec<Position> = self
            .board
            .iter()
            .filter(|(_, piece)| piece.owner() == player)
            .map(|(pos, _)| pos)
            .collect();
        squares.sort();

        for pos in squares {
            moves.extend(self.legal_moves_for_piece(pos));
        }
        moves
    }

    pub fn legal_moves_for_piece(&self, from: Position) -> Vec<Move> {
        let mut moves = Vec::new();
        let Some(piece) = self.board.get(from) else {
            return moves;
        };

        for (dx, dy) in DIRECTIONS {
            let mut current = from;
            loop {
                let (x, y) = current.offset(dx, dy);
                let Some(to) = Position::checked(x, y) else {
                    break;
                };
                if !self.board.is_empty(to) {
                    break;
                }
                current = to;

                // Corners end every edge, so nothing lies beyond them
                if piece.is_pawn() && to.is_corner() {
                    break;
                }
                moves.push(Move::new(from, to));
            }
        }

        moves
    }
}
