use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::loader::{Layout, LoadError};
use crate::piece::{Piece, PieceId, Player};

/// Width and height of the board. Only square boards are supported.
pub const BOARD_SIZE: usize = 11;

/// Whether the (possibly negative) coordinates name a square on the board.
pub fn is_inside_board(x: isize, y: isize) -> bool {
    (0..BOARD_SIZE as isize).contains(&x) && (0..BOARD_SIZE as isize).contains(&y)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Builds a position from signed coordinates, `None` when off the board.
    pub fn checked(x: isize, y: isize) -> Option<Self> {
        if is_inside_board(x, y) {
            Some(Position::new(x as usize, y as usize))
        } else {
            None
        }
    }

    pub fn is_inside_board(&self) -> bool {
        self.x < BOARD_SIZE && self.y < BOARD_SIZE
    }

    pub fn is_corner(&self) -> bool {
        (self.x == 0 || self.x == BOARD_SIZE - 1) && (self.y == 0 || self.y == BOARD_SIZE - 1)
    }

    /// Signed coordinates of the square `(dx, dy)` away, which may be off the board.
    pub fn offset(&self, dx: isize, dy: isize) -> (isize, isize) {
        (self.x as isize + dx, self.y as isize + dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Orthogonal neighbour offsets in the order captures are resolved: -x, +x, -y, +y.
pub const DIRECTIONS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Sparse board contents plus the bookkeeping needed for end-of-game statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    pieces: HashMap<Position, Piece>,
    /// Every square that has ever held a piece, with the pieces that stepped
    /// there in order. A piece may appear more than once.
    known_positions: HashMap<Position, Vec<PieceId>>,
    known_pieces: BTreeSet<PieceId>,
}

impl Board {
    /// Validates a loaded layout and builds a board from it.
    pub fn from_layout(layout: Layout) -> Result<Board, LoadError> {
        let mut board = Board::default();
        let mut kings = 0;

        for (pos, piece) in layout {
            if !pos.is_inside_board() {
                return Err(LoadError::OutOfBounds(pos));
            }
            if piece.position() != Some(pos) {
                return Err(LoadError::Misplaced {
                    label: piece.label(),
                    at: pos,
                });
            }
            if board.known_pieces.contains(&piece.id()) {
                return Err(LoadError::DuplicatePiece(piece.label()));
            }
            if piece.is_king() {
                kings += 1;
            }
            board.add_piece(piece);
        }

        if kings != 1 {
            return Err(LoadError::KingCount(kings));
        }
        Ok(board)
    }

    /// Puts a new piece on the square its history ends on and starts tracking it.
    pub(crate) fn add_piece(&mut self, piece: Piece) {
        if let Some(pos) = piece.position() {
            self.known_pieces.insert(piece.id());
            self.step_here(pos, piece.id());
            self.place(pos, piece);
        }
    }

    /// Finds the king by scanning the board.
    pub fn king(&self) -> Option<Position> {
        self.pieces
            .iter()
            .find(|(_, piece)| piece.is_king())
            .map(|(&pos, _)| pos)
    }

    pub fn get(&self, pos: Position) -> Option<&Piece> {
        self.pieces.get(&pos)
    }

    pub(crate) fn get_mut(&mut self, pos: Position) -> Option<&mut Piece> {
        self.pieces.get_mut(&pos)
    }

    pub fn is_empty(&self, pos: Position) -> bool {
        !self.pieces.contains_key(&pos)
    }

    pub(crate) fn remove(&mut self, pos: Position) -> Option<Piece> {
        self.pieces.remove(&pos)
    }

    pub(crate) fn place(&mut self, pos: Position, piece: Piece) {
        let previous = self.pieces.insert(pos, piece);
        debug_assert!(previous.is_none(), "placed a piece on occupied square {pos}");
    }

    /// Records that `piece` stepped onto `pos`.
    pub(crate) fn step_here(&mut self, pos: Position, piece: PieceId) {
        self.known_positions.entry(pos).or_default().push(piece);
    }

    /// Forgets the most recent step of `piece` onto `pos`. The square stays known.
    pub(crate) fn undo_step(&mut self, pos: Position, piece: PieceId) {
        if let Some(steppers) = self.known_positions.get_mut(&pos) {
            if let Some(i) = steppers.iter().rposition(|&id| id == piece) {
                steppers.remove(i);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, &Piece)> {
        self.pieces.iter().map(|(&pos, piece)| (pos, piece))
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    pub fn count(&self, player: Player) -> usize {
        self.pieces.values().filter(|p| p.owner() == player).count()
    }

    /// Every square that has held a piece since the last load.
    pub fn known_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.known_positions.keys().copied()
    }

    /// Number of different pieces that have stepped on `pos`.
    pub fn distinct_steppers(&self, pos: Position) -> usize {
        self.known_positions
            .get(&pos)
            .map(|steppers| steppers.iter().collect::<BTreeSet<_>>().len())
            .unwrap_or(0)
    }

    pub fn known_pieces(&self) -> &BTreeSet<PieceId> {
        &self.known_pieces
    }

    /// Renders the board as text, with `x` across and `y` down.
    pub fn display(&self) -> String {
        let mut result = String::new();
        result.push_str("   ");
        for x in 0..BOARD_SIZE {
            result.push_str(&format!("{:2} ", x));
        }
        result.push('\n');

        for y in 0..BOARD_SIZE {
            result.push_str(&format!("{:2} ", y));
            for x in 0..BOARD_SIZE {
                let pos = Position::new(x, y);
                let c = match self.get(pos) {
                    Some(piece) if piece.is_king() => 'K',
                    Some(piece) if piece.owner() == Player::Defenders => 'D',
                    Some(_) => 'A',
                    None if pos.is_corner() => 'X',
                    None => '.',
                };
                result.push_str(&format!(" {} ", c));
            }
            result.push('\n');
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_board() {
        assert!(is_inside_board(0, 0));
        assert!(is_inside_board(10, 10));
        assert!(!is_inside_board(-1, 5));
        assert!(!is_inside_board(5, 11));
        assert_eq!(Position::checked(3, -1), None);
        assert_eq!(Position::checked(3, 4), Some(Position::new(3, 4)));
    }

    #[test]
    fn test_corner_identification() {
        assert!(Position::new(0, 0).is_corner());
        assert!(Position::new(0, 10).is_corner());
        assert!(Position::new(10, 0).is_corner());
        assert!(Position::new(10, 10).is_corner());

        assert!(!Position::new(0, 5).is_corner());
        assert!(!Position::new(5, 5).is_corner());
        assert!(!Position::new(1, 1).is_corner());
    }

    #[test]
    fn test_layout_requires_exactly_one_king() {
        let mut layout = Layout::new();
        let a = Position::new(0, 3);
        layout.insert(a, Piece::pawn(Player::Attackers, 1, a));
        assert!(matches!(Board::from_layout(layout.clone()), Err(LoadError::KingCount(0))));

        let k1 = Position::new(5, 5);
        let k2 = Position::new(6, 6);
        layout.insert(k1, Piece::king(1, k1));
        layout.insert(k2, Piece::king(2, k2));
        assert!(matches!(Board::from_layout(layout), Err(LoadError::KingCount(2))));
    }

    #[test]
    fn test_layout_rejects_misplaced_piece() {
        let mut layout = Layout::new();
        layout.insert(Position::new(5, 5), Piece::king(1, Position::new(4, 4)));
        assert!(matches!(Board::from_layout(layout), Err(LoadError::Misplaced { .. })));
    }

    #[test]
    fn test_layout_rejects_duplicate_ids() {
        let mut layout = Layout::new();
        let k = Position::new(5, 5);
        let a = Position::new(0, 3);
        let b = Position::new(0, 4);
        layout.insert(k, Piece::king(1, k));
        layout.insert(a, Piece::pawn(Player::Attackers, 1, a));
        layout.insert(b, Piece::pawn(Player::Attackers, 1, b));
        assert!(matches!(Board::from_layout(layout), Err(LoadError::DuplicatePiece(_))));
    }

    #[test]
    fn test_step_tracking() {
        let k = Position::new(5, 5);
        let mut layout = Layout::new();
        layout.insert(k, Piece::king(1, k));
        let mut board = Board::from_layout(layout).unwrap();
        assert_eq!(board.king(), Some(k));

        let id = board.get(k).unwrap().id();
        let other = PieceId {
            owner: Player::Attackers,
            number: 1,
        };
        board.step_here(k, other);
        board.step_here(k, id);
        assert_eq!(board.distinct_steppers(k), 2);

        board.undo_step(k, id);
        board.undo_step(k, other);
        assert_eq!(board.distinct_steppers(k), 1);
        assert!(board.known_positions().any(|p| p == k));
    }

    #[test]
    fn test_display_marks_empty_corners() {
        let k = Position::new(0, 0);
        let mut layout = Layout::new();
        layout.insert(k, Piece::king(1, k));
        let board = Board::from_layout(layout).unwrap();
        let text = board.display();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), BOARD_SIZE + 1);
        assert!(rows[1].contains('K'));
        assert!(rows[11].starts_with("10  X "));
    }
}
