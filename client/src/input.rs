//! Console input mapped onto move commands

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Direction, Packet};

/// Pixels per key press
pub const DEFAULT_STEP: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputCommand {
    Move(Direction),
    Help,
    Quit,
}

/// Turns typed words into commands and commands into packets
pub struct InputManager {
    step: f64,
    rng: StdRng,
    moves_sent: u64,
}

impl InputManager {
    pub fn new(step: f64) -> Self {
        Self {
            step,
            rng: StdRng::from_entropy(),
            moves_sent: 0,
        }
    }

    /// Seeded variant for reproducible bot runs
    pub fn with_seed(step: f64, seed: u64) -> Self {
        Self {
            step,
            rng: StdRng::seed_from_u64(seed),
            moves_sent: 0,
        }
    }

    pub fn moves_sent(&self) -> u64 {
        self.moves_sent
    }

    /// Parses one console line. Words may be direction names (`up`, `left`,
    /// ...) or runs of `w`/`a`/`s`/`d`, where each letter is one move.
    /// Unknown words are skipped.
    pub fn parse_line(line: &str) -> Vec<InputCommand> {
        let mut commands = Vec::new();

        for word in line.split_whitespace() {
            let word = word.to_ascii_lowercase();
            match word.as_str() {
                "q" | "quit" | "exit" => commands.push(InputCommand::Quit),
                "h" | "help" | "?" => commands.push(InputCommand::Help),
                other => {
                    if let Some(direction) = Direction::parse(other) {
                        commands.push(InputCommand::Move(direction));
                    } else if other.chars().all(|c| "wasd".contains(c)) {
                        commands.extend(other.chars().filter_map(key_direction).map(InputCommand::Move));
                    }
                }
            }
        }

        commands
    }

    pub fn move_packet(&mut self, direction: Direction) -> Packet {
        self.moves_sent += 1;
        Packet::Move {
            direction: direction.as_str().to_string(),
            pixels: self.step,
        }
    }

    /// Move in a uniformly random direction, used in bot mode
    pub fn random_move(&mut self) -> Packet {
        let direction = Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())];
        self.move_packet(direction)
    }
}

fn key_direction(key: char) -> Option<Direction> {
    match key {
        'w' => Some(Direction::Up),
        'a' => Some(Direction::Left),
        's' => Some(Direction::Down),
        'd' => Some(Direction::Right),
        _ => None,
    }
}

pub const HELP: &str = "Commands: w/a/s/d or up/down/left/right (repeat letters to move several times), help, quit";
