use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::board::{BOARD_SIZE, Position};
use crate::piece::{Piece, Player};

/// Initial board contents: every occupied square and the piece on it.
pub type Layout = HashMap<Position, Piece>;

/// The standard 11x11 opening: attackers in a T at each edge, defenders in a
/// diamond around the king.
pub const DEFAULT_LAYOUT: &str = "\
...AAAAA...
.....A.....
...........
A....D....A
A...DDD...A
AA.DDKDD.AA
A...DDD...A
A....D....A
...........
.....A.....
...AAAAA...
";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read layout {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Layout has {0} rows, expected {size}", size = BOARD_SIZE)]
    RowCount(usize),
    #[error("Layout row {row} has {len} squares, expected {size}", size = BOARD_SIZE)]
    RowLength { row: usize, len: usize },
    #[error("Unknown symbol {symbol:?} at ({x}, {y})")]
    UnknownSymbol { symbol: char, x: usize, y: usize },
    #[error("Layout must contain exactly one king, found {0}")]
    KingCount(usize),
    #[error("Piece placed outside the board at {0}")]
    OutOfBounds(Position),
    #[error("Piece {label} is stored at {at} but its history says otherwise")]
    Misplaced { label: String, at: Position },
    #[error("Piece {0} appears more than once")]
    DuplicatePiece(String),
}

/// Produces the starting layout for a game. Called once at construction and
/// again on every reset.
pub trait BoardLoader {
    fn load(&self) -> Result<Layout, LoadError>;
}

/// The built-in opening position.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLayout;

impl BoardLoader for DefaultLayout {
    fn load(&self) -> Result<Layout, LoadError> {
        parse_layout(DEFAULT_LAYOUT)
    }
}

/// A layout held in memory in the text format accepted by [`parse_layout`].
#[derive(Debug, Clone)]
pub struct LayoutText(pub String);

impl BoardLoader for LayoutText {
    fn load(&self) -> Result<Layout, LoadError> {
        parse_layout(&self.0)
    }
}

/// A layout read from a text file on every load.
#[derive(Debug, Clone)]
pub struct LayoutFile {
    path: PathBuf,
}

impl LayoutFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        LayoutFile {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl BoardLoader for LayoutFile {
    fn load(&self) -> Result<Layout, LoadError> {
        let text = fs::read_to_string(&self.path).map_err(|source| LoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        parse_layout(&text)
    }
}

/// Parses a text layout.
///
/// The layout has one line per row (`y`) and one symbol per column (`x`):
/// `.` empty, `A` attacker, `D` defender, `K` king. Blank lines are skipped.
/// Pieces are numbered per side in reading order, the king counting as a
/// defender.
pub fn parse_layout(text: &str) -> Result<Layout, LoadError> {
    let rows: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if rows.len() != BOARD_SIZE {
        return Err(LoadError::RowCount(rows.len()));
    }

    let mut layout = Layout::new();
    let mut attackers = 0;
    let mut defenders = 0;

    for (y, row) in rows.iter().enumerate() {
        let len = row.chars().count();
        if len != BOARD_SIZE {
            return Err(LoadError::RowLength { row: y, len });
        }

        for (x, symbol) in row.chars().enumerate() {
            let pos = Position::new(x, y);
            let piece = match symbol {
                '.' => continue,
                'A' => {
                    attackers += 1;
                    Piece::pawn(Player::Attackers, attackers, pos)
                }
                'D' => {
                    defenders += 1;
                    Piece::pawn(Player::Defenders, defenders, pos)
                }
                'K' => {
                    defenders += 1;
                    Piece::king(defenders, pos)
                }
                _ => return Err(LoadError::UnknownSymbol { symbol, x, y }),
            };
            layout.insert(pos, piece);
        }
    }

    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(layout: &Layout, player: Player) -> usize {
        layout.values().filter(|p| p.owner() == player).count()
    }

    #[test]
    fn test_default_layout_counts() {
        let layout = DefaultLayout.load().unwrap();
        assert_eq!(count(&layout, Player::Attackers), 24);
        assert_eq!(count(&layout, Player::Defenders), 13);
        assert_eq!(layout.values().filter(|p| p.is_king()).count(), 1);
    }

    #[test]
    fn test_default_layout_numbering() {
        let layout = DefaultLayout.load().unwrap();
        let king = &layout[&Position::new(5, 5)];
        assert!(king.is_king());
        assert_eq!(king.label(), "K7");
        assert_eq!(layout[&Position::new(3, 0)].label(), "A1");
        assert_eq!(layout[&Position::new(5, 3)].label(), "D1");
        assert_eq!(layout[&Position::new(7, 10)].label(), "A24");
    }

    #[test]
    fn test_rejects_wrong_row_count() {
        let err = parse_layout("K..\n...").unwrap_err();
        assert!(matches!(err, LoadError::RowCount(2)));
    }

    #[test]
    fn test_rejects_short_row() {
        let text = DEFAULT_LAYOUT.replacen("...........", "..........", 1);
        let err = parse_layout(&text).unwrap_err();
        assert!(matches!(err, LoadError::RowLength { row: 2, len: 10 }));
    }

    #[test]
    fn test_rejects_unknown_symbol() {
        let text = DEFAULT_LAYOUT.replacen("K", "Q", 1);
        let err = parse_layout(&text).unwrap_err();
        assert!(matches!(
            err,
            LoadError::UnknownSymbol {
                symbol: 'Q',
                x: 5,
                y: 5
            }
        ));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = LayoutFile::new("no/such/layout.txt").load().unwrap_err();
        assert!(err.to_string().contains("no/such/layout.txt"));
    }

    #[test]
    fn test_in_memory_layout() {
        let text = DEFAULT_LAYOUT.replace('A', ".");
        let layout = LayoutText(text).load().unwrap();
        assert_eq!(count(&layout, Player::Attackers), 0);
        assert_eq!(layout.len(), 13);
    }
}
