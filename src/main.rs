//! Numgrid Client
//!
//! Text-mode front end. Prints the board, reads moves as point lists such
//! as `0,0 1,0 1,1` from stdin, and drives the game and highscores clients.
//! Logs go to stderr so they do not interleave with the board.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use numgrid::{
    Board, ClientConfig, GameClient, HighscoresClient, Point, PollStatus, SubmitOutcome, VERSION,
};

fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    info!("Numgrid Client v{}", VERSION);

    let config = ClientConfig::from_env().context("reading configuration")?;
    info!("Game server: {}", config.game.url);
    info!("Highscores server: {}", config.highscores.url);

    let stdin = io::stdin();
    let mut input = stdin.lock();

    let name = match config.player_name.clone() {
        Some(name) => name,
        None => match prompt(&mut input, "Enter Username: ")? {
            Some(name) if !name.is_empty() => name,
            _ => return Ok(()),
        },
    };

    let mut game = GameClient::connect(config.game.clone(), name.as_str())
        .context("connecting to game server")?;
    let mut score: u64 = 0;

    loop {
        wait_for_board(&mut game)?;
        let Some(board) = game.board() else {
            continue;
        };
        print_board(board, score);

        let line = if board.can_move() {
            prompt(&mut input, "move> ")?
        } else {
            println!("GAME OVER");
            println!("Final score: {score}");
            println!("press r to retry, h for highscores, q to quit");
            prompt(&mut input, "> ")?
        };
        let Some(line) = line else {
            break;
        };

        match line.as_str() {
            "" => {}
            "q" => break,
            "h" => show_highscores(&config)?,
            "r" => {
                game.close().context("closing game session")?;
                game = GameClient::connect(config.game.clone(), name.as_str())
                    .context("reconnecting to game server")?;
                score = 0;
            }
            text => match parse_points(text) {
                Ok(points) => match game.play(&points)? {
                    (SubmitOutcome::Sent, gained) => score += gained,
                    (SubmitOutcome::Rejected, _) => println!("illegal move"),
                    (SubmitOutcome::Busy, _) => println!("still waiting for the server"),
                },
                Err(e) => println!("{e}"),
            },
        }
    }

    game.close().context("closing game session")?;
    Ok(())
}

/// Poll until the outstanding snapshot (if any) arrives.
fn wait_for_board(game: &mut GameClient) -> Result<()> {
    while game.poll().context("waiting for board")? == PollStatus::Pending {}
    Ok(())
}

/// Fetch and print the highscores list.
fn show_highscores(config: &ClientConfig) -> Result<()> {
    let mut highscores = HighscoresClient::connect(config.highscores.clone())
        .context("connecting to highscores server")?;

    println!("LOADING HIGHSCORES");
    while highscores.poll().context("waiting for highscores")? == PollStatus::Pending {}

    match highscores.format() {
        Some(text) if !text.is_empty() => println!("{text}"),
        Some(_) => println!("no highscores yet"),
        None => warn!("Highscores client finished without a list"),
    }
    Ok(())
}

fn print_board(board: &Board, score: u64) {
    let cell_width = board
        .values()
        .iter()
        .map(|v| v.to_string().len())
        .max()
        .unwrap_or(1)
        .max(2);

    println!();
    println!("Score: {score}");
    print!("   ");
    for x in 0..board.width() {
        print!(" {x:>cell_width$}");
    }
    println!();
    for (y, row) in board.rows().enumerate() {
        print!("{y:>3}");
        for value in row {
            print!(" {value:>cell_width$}");
        }
        println!();
    }
}

fn parse_points(text: &str) -> Result<Vec<Point>, numgrid::core::ParsePointError> {
    text.split_whitespace().map(str::parse).collect()
}

/// Print `label` and read one trimmed line. `None` at end of input.
fn prompt(input: &mut impl BufRead, label: &str) -> Result<Option<String>> {
    print!("{label}");
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
