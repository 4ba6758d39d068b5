use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{cursor, execute};

use snakeq::{Direction, Game, GameConfig};

#[derive(Parser)]
#[command(name = "play")]
#[command(version, about = "Play snake in the terminal")]
struct Cli {
    #[arg(long, default_value = "20")]
    width: i32,

    #[arg(long, default_value = "10")]
    height: i32,

    /// Milliseconds per tick
    #[arg(long, default_value = "150")]
    tick_ms: u64,
}

enum Input {
    Turn(Direction),
    Quit,
}

fn read_input(code: KeyCode, modifiers: KeyModifiers) -> Option<Input> {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Some(Input::Quit);
    }

    // use WASD or arrow keys for input
    match code {
        KeyCode::Up | KeyCode::Char('w') => Some(Input::Turn(Direction::Up)),
        KeyCode::Down | KeyCode::Char('s') => Some(Input::Turn(Direction::Down)),
        KeyCode::Left | KeyCode::Char('a') => Some(Input::Turn(Direction::Left)),
        KeyCode::Right | KeyCode::Char('d') => Some(Input::Turn(Direction::Right)),
        KeyCode::Char('q') | KeyCode::Esc => Some(Input::Quit),
        _ => None,
    }
}

fn draw(out: &mut impl Write, game: &Game) -> io::Result<()> {
    execute!(out, Clear(ClearType::All), cursor::MoveTo(0, 0))?;
    // raw mode does not translate \n
    let frame = game.to_string().replace('\n', "\r\n");
    write!(out, "Score: {}\r\n{}", game.score(), frame)?;
    out.flush()
}

fn run(game: &mut Game, tick: Duration) -> Result<()> {
    let mut stdout = io::stdout();
    let mut heading = Direction::Right;

    while !game.is_terminal() {
        let deadline = Instant::now() + tick;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !event::poll(remaining)? {
                break;
            }
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match read_input(key.code, key.modifiers) {
                    Some(Input::Turn(direction)) => heading = direction,
                    Some(Input::Quit) => return Ok(()),
                    None => {}
                }
            }
        }

        game.step_direction(heading);
        // a refused reversal leaves the snake on its old heading
        heading = game.snake().heading();
        draw(&mut stdout, game)?;
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut game = Game::from_entropy(GameConfig::new(cli.width, cli.height)).context("failed to create game")?;

    terminal::enable_raw_mode().context("failed to enable raw mode")?;
    let result = run(&mut game, Duration::from_millis(cli.tick_ms));
    terminal::disable_raw_mode().context("failed to disable raw mode")?;
    result?;

    println!("Game Over! Final Score: {}", game.score());
    Ok(())
}
