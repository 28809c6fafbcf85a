use serde::{Deserialize, Serialize};
use std::fmt;

use crate::board::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Player {
    Attackers,
    Defenders,
}

impl Player {
    pub fn opponent(&self) -> Player {
        match self {
            Player::Attackers => Player::Defenders,
            Player::Defenders => Player::Attackers,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Player::Attackers => "Attackers",
            Player::Defenders => "Defenders",
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One side of the game together with the number of games it has won.
///
/// Win counters survive board resets; they live as long as the [`Game`](crate::Game).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    player: Player,
    wins: u32,
}

impl PlayerRecord {
    pub fn new(player: Player) -> Self {
        PlayerRecord { player, wins: 0 }
    }

    pub fn player(&self) -> Player {
        self.player
    }

    pub fn is_defender(&self) -> bool {
        self.player == Player::Defenders
    }

    pub fn wins(&self) -> u32 {
        self.wins
    }

    pub(crate) fn add_win(&mut self) {
        self.wins += 1;
    }

    pub(crate) fn undo_win(&mut self) {
        self.wins = self.wins.saturating_sub(1);
    }
}

/// Stable identity of a piece: its owner plus a per-side serial number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceId {
    pub owner: Player,
    pub number: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PieceKind {
    King,
    Pawn { captures: u32 },
}

/// A piece on (or captured from) the board.
///
/// The owner is part of the [`PieceId`] and can never change. `moves` always
/// starts with the square the piece was loaded on; its last entry is the
/// square the piece currently stands on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    id: PieceId,
    kind: PieceKind,
    moves: Vec<Position>,
}

impl Piece {
    /// The king always belongs to the defenders.
    pub fn king(number: u16, at: Position) -> Self {
        Piece {
            id: PieceId {
                owner: Player::Defenders,
                number,
            },
            kind: PieceKind::King,
            moves: vec![at],
        }
    }

    pub fn pawn(owner: Player, number: u16, at: Position) -> Self {
        Piece {
            id: PieceId { owner, number },
            kind: PieceKind::Pawn { captures: 0 },
            moves: vec![at],
        }
    }

    pub fn id(&self) -> PieceId {
        self.id
    }

    pub fn owner(&self) -> Player {
        self.id.owner
    }

    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    pub fn is_king(&self) -> bool {
        matches!(self.kind, PieceKind::King)
    }

    pub fn is_pawn(&self) -> bool {
        matches!(self.kind, PieceKind::Pawn { .. })
    }

    /// Number of captures made by this piece. Always zero for the king.
    pub fn captures(&self) -> u32 {
        match self.kind {
            PieceKind::King => 0,
            PieceKind::Pawn { captures } => captures,
        }
    }

    pub fn moves(&self) -> &[Position] {
        &self.moves
    }

    /// Number of moves made, not counting the starting square.
    pub fn move_count(&self) -> usize {
        self.moves.len().saturating_sub(1)
    }

    pub fn position(&self) -> Option<Position> {
        self.moves.last().copied()
    }

    /// Total number of squares travelled over all moves.
    pub fn distance(&self) -> usize {
        self.moves
            .windows(2)
            .map(|w| w[0].x.abs_diff(w[1].x) + w[0].y.abs_diff(w[1].y))
            .sum()
    }

    /// Short label used in reports, e.g. `K7`, `D3` or `A12`.
    pub fn label(&self) -> String {
        let prefix = match (self.kind, self.owner()) {
            (PieceKind::King, _) => 'K',
            (PieceKind::Pawn { .. }, Player::Defenders) => 'D',
            (PieceKind::Pawn { .. }, Player::Attackers) => 'A',
        };
        format!("{}{}", prefix, self.id.number)
    }

    pub(crate) fn record_move(&mut self, to: Position) {
        self.moves.push(to);
    }

    pub(crate) fn undo_move(&mut self) {
        // The starting square is never popped
        if self.moves.len() > 1 {
            self.moves.pop();
        }
    }

    pub(crate) fn add_capture(&mut self) {
        if let PieceKind::Pawn { captures } = &mut self.kind {
            *captures += 1;
        }
    }

    pub(crate) fn undo_captures(&mut self, count: u32) {
        if let PieceKind::Pawn { captures } = &mut self.kind {
            *captures = captures.saturating_sub(count);
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_king_belongs_to_defenders() {
        let king = Piece::king(7, Position::new(5, 5));
        assert_eq!(king.owner(), Player::Defenders);
        assert!(king.is_king());
        assert_eq!(king.label(), "K7");
    }

    #[test]
    fn test_labels_follow_owner() {
        let a = Piece::pawn(Player::Attackers, 12, Position::new(0, 3));
        let d = Piece::pawn(Player::Defenders, 3, Position::new(5, 3));
        assert_eq!(a.label(), "A12");
        assert_eq!(d.label(), "D3");
    }

    #[test]
    fn test_move_history_and_distance() {
        let mut pawn = Piece::pawn(Player::Attackers, 1, Position::new(0, 3));
        pawn.record_move(Position::new(2, 3));
        pawn.record_move(Position::new(2, 7));
        assert_eq!(pawn.move_count(), 2);
        assert_eq!(pawn.distance(), 6);
        assert_eq!(pawn.position(), Some(Position::new(2, 7)));

        pawn.undo_move();
        pawn.undo_move();
        pawn.undo_move();
        assert_eq!(pawn.moves(), &[Position::new(0, 3)]);
        assert_eq!(pawn.distance(), 0);
    }

    #[test]
    fn test_king_never_counts_captures() {
        let mut king = Piece::king(1, Position::new(5, 5));
        king.add_capture();
        assert_eq!(king.captures(), 0);
    }

    #[test]
    fn test_capture_rollback() {
        let mut pawn = Piece::pawn(Player::Defenders, 2, Position::new(4, 4));
        pawn.add_capture();
        pawn.add_capture();
        pawn.add_capture();
        pawn.undo_captures(2);
        assert_eq!(pawn.captures(), 1);
    }

    #[test]
    fn test_win_counter() {
        let mut record = PlayerRecord::new(Player::Defenders);
        assert!(record.is_defender());
        record.add_win();
        record.add_win();
        record.undo_win();
        assert_eq!(record.wins(), 1);
    }
}
