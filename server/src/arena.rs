//! Arena state store: the single owner of every live player and collectible
//!
//! The arena holds no rules of its own. Movement, pickups and spawning are
//! decided elsewhere and written back through the methods here, so every
//! change to the live entity set passes through one place.

use crate::config::ArenaConfig;
use log::info;
use rand::rngs::StdRng;
use rand::Rng;
use shared::{Collectible, CollectibleId, Player, PlayerId};
use std::collections::HashMap;

/// Live players and collectibles of one arena
///
/// Players are keyed by id. Collectibles keep their insertion order so that
/// when a move overlaps several of them, the oldest one is taken.
#[derive(Debug, Clone)]
pub struct Arena {
    width: i32,
    height: i32,
    player_margin: i32,
    rng: StdRng,
    players: HashMap<PlayerId, Player>,
    /// Kept in insertion order; collision scans rely on it.
    collectibles: Vec<Collectible>,
}

impl Arena {
    /// Creates an empty arena with the dimensions and player margin of
    /// `config`. `rng` places new players.
    pub fn new(config: &ArenaConfig, rng: StdRng) -> Self {
        Self {
            width: config.width,
            height: config.height,
            player_margin: config.player_margin,
            rng,
            players: HashMap::new(),
            collectibles: Vec::new(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Creates a player at a random position inside the arena margins.
    /// An existing player with the same id is replaced.
    pub fn add_player(&mut self, id: PlayerId) -> Player {
        let max_x = (self.width - Player::SIZE - self.player_margin).max(self.player_margin);
        let max_y = (self.height - Player::SIZE - self.player_margin).max(self.player_margin);
        let x = self.rng.gen_range(self.player_margin..=max_x);
        let y = self.rng.gen_range(self.player_margin..=max_y);

        let player = Player::new(id.clone(), x, y);

        info!("Added player {} at ({}, {})", id, player.x, player.y);
        self.players.insert(id, player.clone());
        player
    }

    /// Removes a player, returning it if it was live
    pub fn remove_player(&mut self, id: &PlayerId) -> Option<Player> {
        let removed = self.players.remove(id);
        if removed.is_some() {
            info!("Removed player {}", id);
        }
        removed
    }

    /// Looks up a live player
    pub fn get_player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    /// Writes back a player that is still live. Unknown ids are ignored so a
    /// departed player can never be resurrected.
    pub fn update_player(&mut self, player: Player) -> bool {
        match self.players.get_mut(&player.id) {
            Some(slot) => {
                *slot = player;
                true
            }
            None => false,
        }
    }

    /// Copies of all live players
    ///
    /// The order is unspecified. Callers that need a stable order sort the
    /// result, as the leaderboard does.
    pub fn list_players(&self) -> Vec<Player> {
        self.players.values().cloned().collect()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Adds a collectible at the end of the scan order
    ///
    /// A collectible with the same id is replaced rather than duplicated.
    pub fn add_collectible(&mut self, collectible: Collectible) {
        self.collectibles.retain(|c| c.id != collectible.id);
        self.collectibles.push(collectible);
    }

    /// Removes a collectible by id, returning it if it was present.
    /// The relative order of the remaining collectibles is preserved.
    pub fn remove_collectible(&mut self, id: &CollectibleId) -> Option<Collectible> {
        let index = self.collectibles.iter().position(|c| &c.id == id)?;
        Some(self.collectibles.remove(index))
    }

    /// Live collectibles in insertion order
    pub fn list_collectibles(&self) -> &[Collectible] {
        &self.collectibles
    }

    pub fn collectible_count(&self) -> usize {
        self.collectibles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn test_arena() -> Arena {
        Arena::new(&ArenaConfig::default(), StdRng::seed_from_u64(7))
    }

    fn pid(id: &str) -> PlayerId {
        PlayerId::new(id)
    }

    fn collectible(id: &str, x: i32, y: i32) -> Collectible {
        Collectible::new(CollectibleId::new(id), x, y)
    }

    #[test]
    fn test_add_player_inside_margins() {
        let mut arena = test_arena();

        for i in 0..200 {
            let player = arena.add_player(pid(&format!("p_{}", i)));
            assert!(player.x >= 40 && player.x <= 640 - 24 - 40);
            assert!(player.y >= 40 && player.y <= 480 - 24 - 40);
            assert_eq!(player.score, 0);
        }

        assert_eq!(arena.player_count(), 200);
    }

    #[test]
    fn test_get_and_remove_player() {
        let mut arena = test_arena();
        let player = arena.add_player(pid("a"));

        assert_eq!(arena.get_player(&pid("a")), Some(&player));
        assert_eq!(arena.remove_player(&pid("a")), Some(player));
        assert!(arena.get_player(&pid("a")).is_none());
    }

    #[test]
    fn test_remove_nonexistent_player_is_noop() {
        let mut arena = test_arena();
        arena.add_player(pid("a"));

        assert!(arena.remove_player(&pid("ghost")).is_none());
        assert!(arena.remove_player(&pid("ghost")).is_none());
        assert_eq!(arena.player_count(), 1);
    }

    #[test]
    fn test_update_player_ignores_departed_player() {
        let mut arena = test_arena();
        let mut player = arena.add_player(pid("a"));
        arena.remove_player(&pid("a"));

        player.score = 10;
        assert!(!arena.update_player(player));
        assert_eq!(arena.player_count(), 0);
    }

    #[test]
    fn test_update_player_writes_back() {
        let mut arena = test_arena();
        let mut player = arena.add_player(pid("a"));
        player.x = 0;
        player.score = 3;

        assert!(arena.update_player(player.clone()));
        assert_eq!(arena.get_player(&pid("a")), Some(&player));
    }

    #[test]
    fn test_collectibles_keep_insertion_order() {
        let mut arena = test_arena();
        arena.add_collectible(collectible("c_2", 10, 10));
        arena.add_collectible(collectible("c_1", 20, 20));
        arena.add_collectible(collectible("c_3", 30, 30));

        let ids: Vec<&str> = arena
            .list_collectibles()
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, vec!["c_2", "c_1", "c_3"]);
    }

    #[test]
    fn test_remove_collectible() {
        let mut arena = test_arena();
        arena.add_collectible(collectible("c_1", 10, 10));

        let removed = arena.remove_collectible(&CollectibleId::new("c_1"));
        assert_eq!(removed.map(|c| c.x), Some(10));
        assert_eq!(arena.collectible_count(), 0);

        assert!(arena
            .remove_collectible(&CollectibleId::new("c_1"))
            .is_none());
    }

    #[test]
    fn test_list_players_returns_every_player() {
        let mut arena = test_arena();
        arena.add_player(pid("a"));
        arena.add_player(pid("b"));

        let mut ids: Vec<PlayerId> = arena.list_players().into_iter().map(|p| p.id).collect();
        ids.sort();
        assert_eq!(ids, vec![pid("a"), pid("b")]);
    }
}
