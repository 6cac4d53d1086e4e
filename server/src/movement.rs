//! Movement and collision resolution
//!
//! Commands arrive straight from clients, so everything here treats its input
//! as untrusted: a command that fails validation is dropped without touching
//! any state. Accepted moves are clamped into the arena and then checked
//! against the live collectibles, collecting at most one per move.

use crate::arena::Arena;
use log::debug;
use shared::{check_collision, Collectible, Direction, Player, PlayerId};

/// A validated move command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveCommand {
    pub direction: Direction,
    /// Whole pixels, always in `1..=ceil(max_step)`
    pub distance: i32,
}

impl MoveCommand {
    /// Validates raw client input. Returns `None` for an unknown direction or
    /// a distance that is not finite or falls outside `(0, max_step]`.
    ///
    /// Fractional distances round up, so every accepted command moves at
    /// least one pixel.
    pub fn parse(direction: &str, pixels: f64, max_step: f64) -> Option<Self> {
        let direction = Direction::parse(direction)?;
        if !pixels.is_finite() || pixels <= 0.0 || pixels > max_step {
            return None;
        }

        Some(Self {
            direction,
            distance: pixels.ceil() as i32,
        })
    }
}

/// Result of an accepted move
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub player: Player,
    pub collected: Option<Collectible>,
}

/// Moves a copy of `player` and clamps it into `[0, dim - size]` on both axes.
pub fn apply_move(player: &Player, command: MoveCommand, width: i32, height: i32) -> Player {
    let mut moved = player.clone();

    match command.direction {
        Direction::Up => moved.y = moved.y.saturating_sub(command.distance),
        Direction::Down => moved.y = moved.y.saturating_add(command.distance),
        Direction::Left => moved.x = moved.x.saturating_sub(command.distance),
        Direction::Right => moved.x = moved.x.saturating_add(command.distance),
    }

    // Clamp every time, even when no bound was crossed
    moved.x = moved.x.clamp(0, (width - Player::SIZE).max(0));
    moved.y = moved.y.clamp(0, (height - Player::SIZE).max(0));
    moved
}

/// First collectible, in iteration order, overlapping the player's box
pub fn find_collision<'a>(player: &Player, collectibles: &'a [Collectible]) -> Option<&'a Collectible> {
    collectibles.iter().find(|c| check_collision(player, *c))
}

/// Runs one move command against the arena.
///
/// Returns `None` when the command is malformed or the player is unknown; the
/// arena is untouched in that case. Otherwise the moved player is written
/// back, and if it overlaps a collectible that collectible is removed and its
/// value added to the score. Replacing the collectible is left to the caller.
pub fn resolve_move(
    arena: &mut Arena,
    player_id: &PlayerId,
    direction: &str,
    pixels: f64,
    max_step: f64,
) -> Option<MoveOutcome> {
    let command = MoveCommand::parse(direction, pixels, max_step)?;
    let current = arena.get_player(player_id)?;

    let mut moved = apply_move(current, command, arena.width(), arena.height());

    let hit = find_collision(&moved, arena.list_collectibles()).map(|c| c.id.clone());
    let collected = hit.and_then(|id| arena.remove_collectible(&id));

    if let Some(collectible) = &collected {
        moved.score = moved.score.saturating_add(collectible.value);
        debug!(
            "Player {} collected {} worth {} (score {})",
            player_id, collectible.id, collectible.value, moved.score
        );
    }

    arena.update_player(moved.clone());

    Some(MoveOutcome {
        player: moved,
        collected,
    })
}
