use std::env;
use std::error::Error;
use std::io::{self, BufRead, Write};
use tafl_engine::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play(Move),
    Undo,
    Reset,
    Board,
    Moves,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let coords = match words.as_slice() {
        ["undo"] => return Ok(Command::Undo),
        ["reset"] => return Ok(Command::Reset),
        ["board"] => return Ok(Command::Board),
        ["moves"] => return Ok(Command::Moves),
        ["help"] => return Ok(Command::Help),
        ["quit"] | ["exit"] => return Ok(Command::Quit),
        ["move", rest @ ..] => rest,
        rest => rest,
    };

    let numbers = coords
        .iter()
        .map(|w| w.parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("bad coordinate: {}", e))?;
    match numbers.as_slice() {
        &[x1, y1, x2, y2] => Ok(Command::Play(Move::new(
            Position::new(x1, y1),
            Position::new(x2, y2),
        ))),
        _ => Err(format!("expected 4 coordinates, got {}", numbers.len())),
    }
}

fn load_config() -> Result<GameConfig, ConfigError> {
    let args: Vec<String> = env::args().skip(1).collect();
    match args.as_slice() {
        [flag, path] if flag == "--config" => GameConfig::from_file(path),
        _ => Ok(GameConfig::default()),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  move X1 Y1 X2 Y2   move the piece at (X1, Y1) to (X2, Y2)");
    println!("  undo               take back the last move");
    println!("  reset              start again from the opening layout");
    println!("  board              show the board");
    println!("  moves              list legal moves for the side to play");
    println!("  quit               leave");
}

fn main() -> Result<(), Box<dyn Error>> {
    let config = load_config()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut game = Game::new(
        config.loader(),
        Box::new(WriterLogger::stdout(config.report_format)),
    )?;

    println!("Tafl");
    println!("====\n");
    print_help();
    if config.show_board {
        println!("\n{}", game.display_board());
    }

    let stdin = io::stdin();
    loop {
        print!("{} to play> ", game.current_player());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        let changed = match command {
            Command::Play(mv) => match game.make_move(mv) {
                Ok(summary) => {
                    if !summary.captures.is_empty() {
                        let captured: Vec<String> =
                            summary.captures.iter().map(|p| p.to_string()).collect();
                        println!("Captured: {}", captured.join(", "));
                    }
                    true
                }
                Err(e) => {
                    println!("Illegal move: {}", e);
                    false
                }
            },
            Command::Undo => {
                let undone = game.undo_last_move();
                if !undone {
                    println!("Nothing to undo");
                }
                undone
            }
            Command::Reset => {
                game.reset()?;
                true
            }
            Command::Board => {
                println!("{}", game.display_board());
                false
            }
            Command::Moves => {
                let moves = game.legal_moves(game.current_player());
                println!("{} legal moves", moves.len());
                for mv in moves {
                    println!("  {}", mv);
                }
                false
            }
            Command::Help => {
                print_help();
                false
            }
            Command::Quit => break,
        };

        if changed && config.show_board {
            println!("{}", game.display_board());
        }
        if changed && game.is_game_finished() {
            println!(
                "Score: Defenders {} - Attackers {} (undo or reset to continue)",
                game.first_player().wins(),
                game.second_player().wins()
            );
        }
    }

    Ok(())
}
