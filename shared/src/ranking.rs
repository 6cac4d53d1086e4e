//! Leaderboard ordering shared by the server and the client mirror

use crate::{Player, PlayerId};
use std::cmp::Ordering;
use std::fmt;

/// A player's leaderboard position, rendered as `position/total`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rank {
    pub position: usize,
    pub total: usize,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.position, self.total)
    }
}

/// Score descending, then id ascending
pub fn compare_standing(a: &Player, b: &Player) -> Ordering {
    b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id))
}

/// Sorted view of the given players, best first
pub fn leaderboard<'a, I>(players: I) -> Vec<&'a Player>
where
    I: IntoIterator<Item = &'a Player>,
{
    let mut sorted: Vec<&Player> = players.into_iter().collect();
    sorted.sort_by(|a, b| compare_standing(a, b));
    sorted
}

/// Position of `player_id` among `players`.
///
/// A player missing from the set is ranked last, and `total` is never below
/// one so an empty arena still renders as `1/1`.
pub fn rank<'a, I>(player_id: &PlayerId, players: I) -> Rank
where
    I: IntoIterator<Item = &'a Player>,
{
    let sorted = leaderboard(players);
    let total = sorted.len().max(1);
    let position = sorted
        .iter()
        .position(|p| &p.id == player_id)
        .map(|index| index + 1)
        .unwrap_or(total);

    Rank { position, total }
}
