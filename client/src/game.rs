//! Client-side mirror of the arena, rebuilt from the snapshot and kept in
//! step by applying deltas in arrival order.

use log::debug;
use shared::{leaderboard, rank, Collectible, CollectibleId, Packet, Player, PlayerId, Rank};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ClientGameState {
    pub my_id: Option<PlayerId>,
    pub players: HashMap<PlayerId, Player>,
    pub collectibles: HashMap<CollectibleId, Collectible>,
    pub updates_applied: u64,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the initial snapshot has arrived
    pub fn is_synced(&self) -> bool {
        self.my_id.is_some()
    }

    /// Applies one server packet. Deltas arriving before the snapshot are
    /// ignored since the snapshot already reflects them. Returns whether the
    /// mirror changed.
    pub fn apply_packet(&mut self, packet: &Packet) -> bool {
        if let Packet::State {
            player_id,
            players,
            collectibles,
        } = packet
        {
            self.my_id = Some(player_id.clone());
            self.players = players.iter().map(|p| (p.id.clone(), p.clone())).collect();
            self.collectibles = collectibles
                .iter()
                .map(|c| (c.id.clone(), c.clone()))
                .collect();
            self.updates_applied += 1;
            return true;
        }

        if !self.is_synced() {
            debug!("Ignoring delta received before snapshot: {:?}", packet);
            return false;
        }

        match packet {
            Packet::PlayerJoined { player } | Packet::PlayerMoved { player } => {
                self.players.insert(player.id.clone(), player.clone());
            }
            Packet::CollectibleTaken {
                player_id,
                collectible_id,
                new_collectible,
                score,
            } => {
                self.collectibles.remove(collectible_id);
                self.collectibles
                    .insert(new_collectible.id.clone(), new_collectible.clone());
                if let Some(player) = self.players.get_mut(player_id) {
                    player.score = *score;
                }
            }
            Packet::PlayerLeft { id } => {
                self.players.remove(id);
            }
            _ => return false,
        }

        self.updates_applied += 1;
        true
    }

    pub fn my_player(&self) -> Option<&Player> {
        self.my_id.as_ref().and_then(|id| self.players.get(id))
    }

    pub fn my_score(&self) -> u32 {
        self.my_player().map(|p| p.score).unwrap_or(0)
    }

    pub fn my_rank(&self) -> Option<Rank> {
        let id = self.my_id.as_ref()?;
        Some(rank(id, self.players.values()))
    }

    /// Label shown next to the score, e.g. `Rank: 2/5`
    pub fn rank_label(&self) -> String {
        match self.my_rank() {
            Some(rank) => format!("Rank: {}", rank),
            None => "Rank: -".to_string(),
        }
    }

    pub fn leaderboard(&self) -> Vec<&Player> {
        leaderboard(self.players.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, x: i32, y: i32, score: u32) -> Player {
        let mut p = Player::new(PlayerId::new(id), x, y);
        p.score = score;
        p
    }

    fn collectible(id: &str) -> Collectible {
        Collectible::new(CollectibleId::new(id), 100, 100)
    }

    fn synced_state() -> ClientGameState {
        let mut state = ClientGameState::new();
        state.apply_packet(&Packet::State {
            player_id: PlayerId::new("me"),
            players: vec![player("me", 10, 10, 0), player("other", 50, 50, 2)],
            collectibles: vec![collectible("c_1")],
        });
        state
    }

    #[test]
    fn test_snapshot_initializes_mirror() {
        let state = synced_state();

        assert!(state.is_synced());
        assert_eq!(state.players.len(), 2);
        assert_eq!(state.collectibles.len(), 1);
        assert_eq!(state.my_player().map(|p| p.x), Some(10));
    }

    #[test]
    fn test_delta_before_snapshot_is_ignored() {
        let mut state = ClientGameState::new();
        let changed = state.apply_packet(&Packet::PlayerJoined {
            player: player("x", 0, 0, 0),
        });

        assert!(!changed);
        assert!(state.players.is_empty());
    }

    #[test]
    fn test_join_move_and_leave() {
        let mut state = synced_state();

        state.apply_packet(&Packet::PlayerJoined {
            player: player("new", 1, 1, 0),
        });
        assert_eq!(state.players.len(), 3);

        state.apply_packet(&Packet::PlayerMoved {
            player: player("new", 9, 1, 0),
        });
        assert_eq!(state.players[&PlayerId::new("new")].x, 9);

        state.apply_packet(&Packet::PlayerLeft {
            id: PlayerId::new("new"),
        });
        assert_eq!(state.players.len(), 2);
        assert_eq!(state.updates_applied, 4);
    }

    #[test]
    fn test_collectible_taken_updates_score_and_items() {
        let mut state = synced_state();

        state.apply_packet(&Packet::CollectibleTaken {
            player_id: PlayerId::new("me"),
            collectible_id: CollectibleId::new("c_1"),
            new_collectible: collectible("c_2"),
            score: 3,
        });

        assert_eq!(state.my_score(), 3);
        assert!(!state.collectibles.contains_key(&CollectibleId::new("c_1")));
        assert!(state.collectibles.contains_key(&CollectibleId::new("c_2")));
        assert_eq!(state.rank_label(), "Rank: 1/2");
    }

    #[test]
    fn test_rank_label() {
        let state = synced_state();
        assert_eq!(state.rank_label(), "Rank: 2/2");
        assert_eq!(ClientGameState::new().rank_label(), "Rank: -");
    }

    #[test]
    fn test_client_packets_do_not_change_state() {
        let mut state = synced_state();
        assert!(!state.apply_packet(&Packet::Leave));
        assert_eq!(state.updates_applied, 1);
    }
}
