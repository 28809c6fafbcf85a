pub mod board;
pub mod config;
pub mod game;
pub mod history;
pub mod loader;
pub mod logger;
pub mod piece;

pub use board::*;
pub use config::*;
pub use game::*;
pub use history::*;
pub use loader::*;
pub use logger::*;
pub use piece::*;
