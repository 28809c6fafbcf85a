use serde::{Deserialize, Serialize};

use crate::board::Position;
use crate::piece::{Piece, PieceId, Player};

/// Everything needed to take a move back exactly.
///
/// Captured pieces are owned by the record until the move is undone, at which
/// point they go back to the board at their recorded squares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub piece: PieceId,
    pub source: Position,
    pub destination: Position,
    /// Captures in the order they were resolved.
    pub captures: Vec<(Position, Piece)>,
    /// Set when this move ended the game.
    pub winner: Option<Player>,
}

impl MoveRecord {
    pub fn capture_count(&self) -> u32 {
        self.captures.len() as u32
    }

    pub fn captured_at(&self, pos: Position) -> Option<&Piece> {
        self.captures
            .iter()
            .find(|(at, _)| *at == pos)
            .map(|(_, piece)| piece)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    records: Vec<MoveRecord>,
}

impl History {
    pub fn new() -> Self {
        History::default()
    }

    pub fn push(&mut self, record: MoveRecord) {
        self.records.push(record);
    }

    pub fn pop(&mut self) -> Option<MoveRecord> {
        self.records.pop()
    }

    pub fn last(&self) -> Option<&MoveRecord> {
        self.records.last()
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut MoveRecord> {
        self.records.last_mut()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Oldest move first.
    pub fn iter(&self) -> impl Iterator<Item = &MoveRecord> {
        self.records.iter()
    }

    /// Every piece currently held by a capture record.
    pub fn captured_pieces(&self) -> impl Iterator<Item = &Piece> {
        self.records
            .iter()
            .flat_map(|record| record.captures.iter().map(|(_, piece)| piece))
    }
}
