//! Collectible spawning

use crate::arena::Arena;
use crate::config::ArenaConfig;
use crate::utils::IdGenerator;
use rand::rngs::StdRng;
use rand::Rng;
use shared::{Collectible, CollectibleId};
use std::ops::RangeInclusive;

pub const COLLECTIBLE_ID_PREFIX: &str = "c";

/// Produces collectibles at uniform random positions inside the spawn margins
#[derive(Debug, Clone)]
pub struct Spawner {
    rng: StdRng,
    x_range: RangeInclusive<i32>,
    y_range: RangeInclusive<i32>,
}

impl Spawner {
    pub fn new(config: &ArenaConfig, rng: StdRng) -> Self {
        let margin = config.collectible_margin;
        let max_x = (config.width - Collectible::SIZE - margin).max(margin);
        let max_y = (config.height - Collectible::SIZE - margin).max(margin);

        Self {
            rng,
            x_range: margin..=max_x,
            y_range: margin..=max_y,
        }
    }

    /// Creates a fresh collectible worth one point. The caller decides where
    /// it goes; the spawner keeps no reference to it.
    pub fn spawn(&mut self, ids: &mut dyn IdGenerator) -> Collectible {
        let id = CollectibleId::new(ids.next_id(COLLECTIBLE_ID_PREFIX));
        let x = self.rng.gen_range(self.x_range.clone());
        let y = self.rng.gen_range(self.y_range.clone());

        Collectible::new(id, x, y)
    }

    /// Spawns into the arena until it holds at least `min` collectibles and
    /// returns what was added.
    pub fn fill(&mut self, arena: &mut Arena, ids: &mut dyn IdGenerator, min: usize) -> Vec<Collectible> {
        let mut spawned = Vec::new();
        while arena.collectible_count() < min {
            let collectible = self.spawn(ids);
            arena.add_collectible(collectible.clone());
            spawned.push(collectible);
        }
        spawned
    }
}
