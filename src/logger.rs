use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::io::{self, Write};

use crate::board::{Board, Position};
use crate::piece::{Piece, PieceId, Player, PlayerRecord};

/// Width of the separator line between report sections.
const SEPARATOR_WIDTH: usize = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceMoves {
    pub label: String,
    pub owner: Player,
    pub moves: Vec<Position>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceCount {
    pub label: String,
    pub owner: Player,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquareCount {
    pub position: Position,
    pub pieces: usize,
}

/// End-of-game statistics over every piece and square seen since the last load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameReport {
    pub winner: Player,
    /// Pieces that moved, winner's side first, then fewest moves first.
    pub moves: Vec<PieceMoves>,
    /// Pawns that captured at least once, most captures first.
    pub captures: Vec<PieceCount>,
    /// Pieces that travelled, longest distance first.
    pub distance: Vec<PieceCount>,
    /// Squares stepped on by two or more different pieces, busiest first.
    pub squares: Vec<SquareCount>,
}

impl GameReport {
    /// Builds the report from the board's tracking sets and every known piece,
    /// whether still on the board or captured.
    pub fn build<'a, I>(winner: Player, board: &Board, pieces: I) -> Self
    where
        I: IntoIterator<Item = &'a Piece>,
    {
        let known = board.known_pieces();
        let pieces: HashMap<PieceId, &Piece> = pieces
            .into_iter()
            .filter(|p| known.contains(&p.id()))
            .map(|p| (p.id(), p))
            .collect();
        let mut pieces: Vec<&Piece> = pieces.into_values().collect();
        pieces.sort_by_key(|p| p.id());

        let losing = |p: &Piece| p.owner() != winner;

        let mut moved: Vec<&Piece> = pieces.iter().copied().filter(|p| p.move_count() > 0).collect();
        moved.sort_by_key(|p| (losing(*p), p.move_count(), p.id().number));

        let mut capturers: Vec<&Piece> = pieces.iter().copied().filter(|p| p.captures() > 0).collect();
        capturers.sort_by_key(|p| (Reverse(p.captures()), losing(*p), p.id().number));

        let mut travellers: Vec<&Piece> = pieces.iter().copied().filter(|p| p.distance() > 0).collect();
        travellers.sort_by_key(|p| (Reverse(p.distance()), losing(*p), p.id().number));

        let mut squares: Vec<SquareCount> = board
            .known_positions()
            .map(|position| SquareCount {
                position,
                pieces: board.distinct_steppers(position),
            })
            .filter(|s| s.pieces >= 2)
            .collect();
        squares.sort_by_key(|s| (Reverse(s.pieces), s.position.x, s.position.y));

        GameReport {
            winner,
            moves: moved
                .into_iter()
                .map(|p| PieceMoves {
                    label: p.label(),
                    owner: p.owner(),
                    moves: p.moves().to_vec(),
                })
                .collect(),
            captures: capturers
                .into_iter()
                .map(|p| PieceCount {
                    label: p.label(),
                    owner: p.owner(),
                    count: p.captures() as usize,
                })
                .collect(),
            distance: travellers
                .into_iter()
                .map(|p| PieceCount {
                    label: p.label(),
                    owner: p.owner(),
                    count: p.distance(),
                })
                .collect(),
            squares,
        }
    }

    /// Renders the report as plain text sections separated by rows of `*`.
    pub fn to_text(&self) -> String {
        let separator = "*".repeat(SEPARATOR_WIDTH);
        let mut result = String::new();

        for piece in &self.moves {
            let moves: Vec<String> = piece.moves.iter().map(|p| p.to_string()).collect();
            result.push_str(&format!("{}: [{}]\n", piece.label, moves.join(", ")));
        }
        result.push_str(&separator);
        result.push('\n');

        for piece in &self.captures {
            result.push_str(&format!("{}: {} kills\n", piece.label, piece.count));
        }
        result.push_str(&separator);
        result.push('\n');

        for piece in &self.distance {
            result.push_str(&format!("{}: {} squares\n", piece.label, piece.count));
        }
        result.push_str(&separator);
        result.push('\n');

        for square in &self.squares {
            result.push_str(&format!("{}{} pieces\n", square.position, square.pieces));
        }
        result.push_str(&separator);
        result.push('\n');

        result
    }
}

/// Receives the winner and the statistics report when a game ends.
pub trait GameLogger {
    fn log_game(&mut self, winner: &PlayerRecord, report: &GameReport);
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl GameLogger for NullLogger {
    fn log_game(&mut self, _winner: &PlayerRecord, _report: &GameReport) {}
}

/// Writes reports to any [`Write`] sink, as text or JSON.
#[derive(Debug)]
pub struct WriterLogger<W: Write> {
    out: W,
    format: ReportFormat,
}

impl WriterLogger<io::Stdout> {
    pub fn stdout(format: ReportFormat) -> Self {
        WriterLogger::new(io::stdout(), format)
    }
}

impl<W: Write> WriterLogger<W> {
    pub fn new(out: W, format: ReportFormat) -> Self {
        WriterLogger { out, format }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_report(&mut self, winner: &PlayerRecord, report: &GameReport) -> io::Result<()> {
        match self.format {
            ReportFormat::Text => {
                writeln!(self.out, "{} win! (total wins: {})", winner.player(), winner.wins())?;
                self.out.write_all(report.to_text().as_bytes())?;
            }
            ReportFormat::Json => {
                serde_json::to_writer_pretty(&mut self.out, report)?;
                writeln!(self.out)?;
            }
        }
        self.out.flush()
    }
}

impl<W: Write> GameLogger for WriterLogger<W> {
    fn log_game(&mut self, winner: &PlayerRecord, report: &GameReport) {
        if let Err(e) = self.write_report(winner, report) {
            tracing::warn!(error = %e, "failed to write game report");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Layout;

    fn board_with(pieces: &[Piece]) -> Board {
        let layout: Layout = pieces
            .iter()
            .map(|p| (p.position().unwrap(), p.clone()))
            .collect();
        Board::from_layout(layout).unwrap()
    }

    fn sample() -> (Board, Vec<Piece>) {
        let mut king = Piece::king(7, Position::new(5, 5));
        let mut a1 = Piece::pawn(Player::Attackers, 1, Position::new(3, 0));
        let mut a2 = Piece::pawn(Player::Attackers, 2, Position::new(4, 0));
        let d1 = Piece::pawn(Player::Defenders, 1, Position::new(5, 3));
        let mut board = board_with(&[king.clone(), a1.clone(), a2.clone(), d1.clone()]);

        king.record_move(Position::new(5, 4));
        board.step_here(Position::new(5, 4), king.id());
        a1.record_move(Position::new(3, 4));
        board.step_here(Position::new(3, 4), a1.id());
        a1.record_move(Position::new(5, 4));
        board.step_here(Position::new(5, 4), a1.id());
        a1.add_capture();
        a2.record_move(Position::new(4, 2));
        board.step_here(Position::new(4, 2), a2.id());

        (board, vec![king, a1, a2, d1])
    }

    #[test]
    fn test_report_ordering() {
        let (board, pieces) = sample();
        let report = GameReport::build(Player::Defenders, &board, &pieces);

        let labels: Vec<&str> = report.moves.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["K7", "A2", "A1"]);

        assert_eq!(report.captures.len(), 1);
        assert_eq!(report.captures[0].label, "A1");
        assert_eq!(report.captures[0].count, 1);

        let distance: Vec<(&str, usize)> = report
            .distance
            .iter()
            .map(|d| (d.label.as_str(), d.count))
            .collect();
        assert_eq!(distance, vec![("A1", 6), ("A2", 2), ("K7", 1)]);

        assert_eq!(
            report.squares,
            vec![SquareCount {
                position: Position::new(5, 4),
                pieces: 2
            }]
        );
    }

    #[test]
    fn test_report_ignores_unknown_pieces() {
        let (board, mut pieces) = sample();
        let mut stranger = Piece::pawn(Player::Attackers, 99, Position::new(9, 9));
        stranger.record_move(Position::new(9, 1));
        pieces.push(stranger);
        let report = GameReport::build(Player::Attackers, &board, &pieces);
        assert!(report.moves.iter().all(|m| m.label != "A99"));
    }

    #[test]
    fn test_text_report() {
        let (board, pieces) = sample();
        let report = GameReport::build(Player::Defenders, &board, &pieces);
        let text = report.to_text();
        assert!(text.starts_with("K7: [(5, 5), (5, 4)]\n"));
        assert!(text.contains("A1: 1 kills\n"));
        assert!(text.contains("A1: 6 squares\n"));
        assert!(text.contains("(5, 4)2 pieces\n"));
        assert_eq!(text.lines().filter(|l| *l == "*".repeat(75)).count(), 4);
    }

    #[test]
    fn test_writer_logger_json() {
        let (board, pieces) = sample();
        let report = GameReport::build(Player::Attackers, &board, &pieces);
        let mut logger = WriterLogger::new(Vec::new(), ReportFormat::Json);
        logger.log_game(&PlayerRecord::new(Player::Attackers), &report);

        let out = logger.into_inner();
        let parsed: GameReport = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_writer_logger_text_header() {
        let (board, pieces) = sample();
        let report = GameReport::build(Player::Defenders, &board, &pieces);
        let mut logger = WriterLogger::new(Vec::new(), ReportFormat::Text);
        logger.log_game(&PlayerRecord::new(Player::Defenders), &report);

        let out = String::from_utf8(logger.into_inner()).unwrap();
        assert!(out.starts_with("Defenders win! (total wins: 0)\n"));
    }
}
