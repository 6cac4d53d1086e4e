//! Session lifecycle and the delta broadcast contract
//!
//! Every connection moves through `Connecting -> Active -> Disconnected`. A
//! joining client first receives a full snapshot that already contains its own
//! player, and only then are the other clients told about it. Accepted moves
//! are echoed to everyone, the mover included; a collection is announced
//! before the move that caused it. Malformed or stale commands produce no
//! output at all: the protocol has no error reply.
//!
//! All methods run to completion on the caller's timeline, so a move, its
//! collection, the replacement spawn and the resulting broadcasts are applied
//! as one step. Nothing here blocks or awaits.

use crate::arena::Arena;
use crate::config::ArenaConfig;
use crate::movement::{resolve_move, MoveOutcome};
use crate::spawner::Spawner;
use crate::utils::{IdGenerator, RandomIds};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{rank, Collectible, Packet, Player, PlayerId, Rank};
use std::collections::HashMap;

pub type ConnectionId = u32;

pub const PLAYER_ID_PREFIX: &str = "p";

/// Delivery primitive the protocol broadcasts through
pub trait Outbox {
    fn send_to(&mut self, conn: ConnectionId, packet: &Packet);

    /// Sends to every registered connection except `exclude`
    fn broadcast(&mut self, packet: &Packet, exclude: Option<ConnectionId>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    /// Terminal. Also reported for connection ids with no live session.
    Disconnected,
}

#[derive(Debug, Clone)]
struct Session {
    state: SessionState,
    player_id: Option<PlayerId>,
}

/// Authoritative arena plus the per-connection sessions bound to it
pub struct ArenaSync {
    config: ArenaConfig,
    arena: Arena,
    spawner: Spawner,
    ids: Box<dyn IdGenerator>,
    sessions: HashMap<ConnectionId, Session>,
}

impl ArenaSync {
    pub fn new(config: ArenaConfig) -> Self {
        Self::with_id_generator(config, Box::new(RandomIds::new()))
    }

    /// Builds the arena and spawns its starting collectibles, so at least one
    /// exists before the first connection is accepted.
    pub fn with_id_generator(config: ArenaConfig, mut ids: Box<dyn IdGenerator>) -> Self {
        let mut seed_rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut arena = Arena::new(&config, StdRng::seed_from_u64(seed_rng.gen()));
        let mut spawner = Spawner::new(&config, StdRng::seed_from_u64(seed_rng.gen()));

        let min = config.min_collectibles.max(1);
        for collectible in spawner.fill(&mut arena, ids.as_mut(), min) {
            info!(
                "Spawned collectible {} at ({}, {})",
                collectible.id, collectible.x, collectible.y
            );
        }

        Self {
            config,
            arena,
            spawner,
            ids,
            sessions: HashMap::new(),
        }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn session_state(&self, conn: ConnectionId) -> SessionState {
        self.sessions
            .get(&conn)
            .map(|s| s.state)
            .unwrap_or(SessionState::Disconnected)
    }

    pub fn player_for(&self, conn: ConnectionId) -> Option<&PlayerId> {
        self.sessions.get(&conn).and_then(|s| s.player_id.as_ref())
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions
            .values()
            .filter(|s| s.state == SessionState::Active)
            .count()
    }

    /// Leaderboard position of the player bound to `conn`
    pub fn rank_of(&self, conn: ConnectionId) -> Option<Rank> {
        let player_id = self.player_for(conn)?;
        let players = self.arena.list_players();
        Some(rank(player_id, &players))
    }

    /// Full state as seen by `player_id`
    pub fn snapshot(&self, player_id: &PlayerId) -> Packet {
        Packet::State {
            player_id: player_id.clone(),
            players: self.arena.list_players(),
            collectibles: self.arena.list_collectibles().to_vec(),
        }
    }

    /// Opens a session for a new connection. Returns the created player, or
    /// `None` if the connection already has a session.
    pub fn connect<O: Outbox>(&mut self, conn: ConnectionId, outbox: &mut O) -> Option<Player> {
        if self.sessions.contains_key(&conn) {
            debug!("Connection {} already has a session", conn);
            return None;
        }

        self.sessions.insert(
            conn,
            Session {
                state: SessionState::Connecting,
                player_id: None,
            },
        );

        let player_id = PlayerId::new(self.ids.next_id(PLAYER_ID_PREFIX));
        let player = self.arena.add_player(player_id.clone());

        // The joiner sees itself before anyone else hears about it
        outbox.send_to(conn, &self.snapshot(&player_id));
        outbox.broadcast(
            &Packet::PlayerJoined {
                player: player.clone(),
            },
            Some(conn),
        );

        if let Some(session) = self.sessions.get_mut(&conn) {
            session.state = SessionState::Active;
            session.player_id = Some(player_id.clone());
        }

        info!("Connection {} joined as player {}", conn, player_id);
        Some(player)
    }

    /// Dispatches an inbound packet. Server-to-client packets sent by a client
    /// are ignored.
    pub fn handle_packet<O: Outbox>(&mut self, conn: ConnectionId, packet: Packet, outbox: &mut O) {
        match packet {
            Packet::Move { direction, pixels } => {
                self.handle_move(conn, &direction, pixels, outbox);
            }
            Packet::Leave => {
                self.disconnect(conn, outbox);
            }
            other => {
                debug!("Ignoring unexpected packet from connection {}: {:?}", conn, other);
            }
        }
    }

    /// Applies a move for the player bound to `conn`. Returns whether the
    /// command was accepted; rejected commands leave no trace.
    pub fn handle_move<O: Outbox>(
        &mut self,
        conn: ConnectionId,
        direction: &str,
        pixels: f64,
        outbox: &mut O,
    ) -> bool {
        if self.session_state(conn) != SessionState::Active {
            return false;
        }
        let Some(player_id) = self.player_for(conn).cloned() else {
            return false;
        };

        let Some(MoveOutcome { player, collected }) = resolve_move(
            &mut self.arena,
            &player_id,
            direction,
            pixels,
            self.config.max_step,
        ) else {
            debug!(
                "Dropped move from {}: direction {:?}, pixels {}",
                player_id, direction, pixels
            );
            return false;
        };

        if let Some(taken) = collected {
            let replacement = self.replace_collectible();
            outbox.broadcast(
                &Packet::CollectibleTaken {
                    player_id: player.id.clone(),
                    collectible_id: taken.id,
                    new_collectible: replacement,
                    score: player.score,
                },
                None,
            );
        }

        outbox.broadcast(&Packet::PlayerMoved { player }, None);
        true
    }

    /// Closes the session bound to `conn` and announces the departure once.
    /// Returns false if there was no live session.
    pub fn disconnect<O: Outbox>(&mut self, conn: ConnectionId, outbox: &mut O) -> bool {
        let Some(session) = self.sessions.remove(&conn) else {
            return false;
        };

        if let Some(player_id) = session.player_id {
            self.arena.remove_player(&player_id);
            outbox.broadcast(&Packet::PlayerLeft { id: player_id.clone() }, Some(conn));
            info!("Connection {} left (player {})", conn, player_id);
        }

        true
    }

    fn replace_collectible(&mut self) -> Collectible {
        let replacement = self.spawner.spawn(self.ids.as_mut());
        self.arena.add_collectible(replacement.clone());

        let min = self.config.min_collectibles.max(1);
        self.spawner.fill(&mut self.arena, self.ids.as_mut(), min);

        assert!(
            self.arena.collectible_count() >= 1,
            "collectible population dropped to zero"
        );
        replacement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::SequentialIds;
    use shared::CollectibleId;

    /// Records every delivery as (recipient, packet)
    #[derive(Default)]
    struct RecordingOutbox {
        connections: Vec<ConnectionId>,
        sent: Vec<(ConnectionId, Packet)>,
    }

    impl RecordingOutbox {
        fn register(&mut self, conn: ConnectionId) {
            self.connections.push(conn);
        }

        fn unregister(&mut self, conn: ConnectionId) {
            self.connections.retain(|c| *c != conn);
        }

        fn received_by(&self, conn: ConnectionId) -> Vec<&Packet> {
            self.sent
                .iter()
                .filter(|(to, _)| *to == conn)
                .map(|(_, p)| p)
                .collect()
        }

        fn clear(&mut self) {
            self.sent.clear();
        }
    }

    impl Outbox for RecordingOutbox {
        fn send_to(&mut self, conn: ConnectionId, packet: &Packet) {
            if self.connections.contains(&conn) {
                self.sent.push((conn, packet.clone()));
            }
        }

        fn broadcast(&mut self, packet: &Packet, exclude: Option<ConnectionId>) {
            for conn in self.connections.clone() {
                if Some(conn) != exclude {
                    self.sent.push((conn, packet.clone()));
                }
            }
        }
    }

    fn test_sync() -> ArenaSync {
        let config = ArenaConfig {
            seed: Some(11),
            ..ArenaConfig::default()
        };
        ArenaSync::with_id_generator(config, Box::new(SequentialIds::new()))
    }

    fn join(sync: &mut ArenaSync, outbox: &mut RecordingOutbox, conn: ConnectionId) -> Player {
        outbox.register(conn);
        sync.connect(conn, outbox).unwrap()
    }

    /// Puts the player bound to `conn` at a fixed spot
    fn place(sync: &mut ArenaSync, conn: ConnectionId, x: i32, y: i32) {
        let id = sync.player_for(conn).unwrap().clone();
        let mut player = sync.arena.get_player(&id).unwrap().clone();
        player.x = x;
        player.y = y;
        sync.arena.update_player(player);
    }

    /// Replaces every collectible with one at a fixed spot
    fn only_collectible_at(sync: &mut ArenaSync, id: &str, x: i32, y: i32) {
        let existing: Vec<CollectibleId> = sync
            .arena
            .list_collectibles()
            .iter()
            .map(|c| c.id.clone())
            .collect();
        for old in existing {
            sync.arena.remove_collectible(&old);
        }
        sync.arena
            .add_collectible(Collectible::new(CollectibleId::new(id), x, y));
    }

    #[test]
    fn test_collectible_exists_before_any_connection() {
        let sync = test_sync();
        assert_eq!(sync.arena().collectible_count(), 1);
        assert_eq!(sync.arena().player_count(), 0);
    }

    #[test]
    fn test_min_collectibles_spawned_at_startup() {
        let config = ArenaConfig {
            min_collectibles: 4,
            seed: Some(1),
            ..ArenaConfig::default()
        };
        let sync = ArenaSync::with_id_generator(config, Box::new(SequentialIds::new()));
        assert_eq!(sync.arena().collectible_count(), 4);
    }

    #[test]
    fn test_connect_sends_snapshot_then_joined() {
        let mut sync = test_sync();
        let mut outbox = RecordingOutbox::default();

        let first = join(&mut sync, &mut outbox, 1);
        outbox.clear();
        let second = join(&mut sync, &mut outbox, 2);

        assert_eq!(sync.session_state(2), SessionState::Active);

        let to_second = outbox.received_by(2);
        assert_eq!(to_second.len(), 1);
        match to_second[0] {
            Packet::State {
                player_id,
                players,
                collectibles,
            } => {
                assert_eq!(player_id, &second.id);
                assert_eq!(players.len(), 2);
                assert!(players.contains(&second));
                assert!(players.contains(&first));
                assert_eq!(collectibles.len(), 1);
            }
            other => panic!("Expected snapshot, got {:?}", other),
        }

        let to_first = outbox.received_by(1);
        assert_eq!(
            to_first,
            vec![&Packet::PlayerJoined {
                player: second.clone()
            }]
        );
    }

    #[test]
    fn test_connect_twice_is_ignored() {
        let mut sync = test_sync();
        let mut outbox = RecordingOutbox::default();

        join(&mut sync, &mut outbox, 1);
        assert!(sync.connect(1, &mut outbox).is_none());
        assert_eq!(sync.arena().player_count(), 1);
    }

    #[test]
    fn test_accepted_move_is_broadcast_to_everyone() {
        let mut sync = test_sync();
        let mut outbox = RecordingOutbox::default();
        join(&mut sync, &mut outbox, 1);
        join(&mut sync, &mut outbox, 2);
        place(&mut sync, 1, 300, 300);
        only_collectible_at(&mut sync, "c_far", 20, 20);
        outbox.clear();

        assert!(sync.handle_move(1, "left", 8.0, &mut outbox));

        let moved = sync
            .arena()
            .get_player(sync.player_for(1).unwrap())
            .unwrap()
            .clone();
        assert_eq!((moved.x, moved.y), (292, 300));

        let expected = Packet::PlayerMoved { player: moved };
        assert_eq!(outbox.received_by(1), vec![&expected]);
        assert_eq!(outbox.received_by(2), vec![&expected]);
    }

    #[test]
    fn test_rejected_move_emits_nothing() {
        let mut sync = test_sync();
        let mut outbox = RecordingOutbox::default();
        join(&mut sync, &mut outbox, 1);
        join(&mut sync, &mut outbox, 2);
        let before = sync.arena().list_players();
        outbox.clear();

        assert!(!sync.handle_move(1, "right", 999.0, &mut outbox));
        assert!(!sync.handle_move(1, "diagonal", 8.0, &mut outbox));
        assert!(!sync.handle_move(1, "up", f64::NAN, &mut outbox));
        assert!(!sync.handle_move(1, "up", 0.0, &mut outbox));

        assert!(outbox.sent.is_empty());
        let mut after = sync.arena().list_players();
        let mut before = before;
        before.sort_by(|a, b| a.id.cmp(&b.id));
        after.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(before, after);
    }

    #[test]
    fn test_collection_scenario() {
        let mut sync = test_sync();
        let mut outbox = RecordingOutbox::default();
        join(&mut sync, &mut outbox, 1);
        join(&mut sync, &mut outbox, 2);
        place(&mut sync, 1, 10, 10);
        only_collectible_at(&mut sync, "target", 18, 10);
        outbox.clear();

        assert!(sync.handle_move(1, "right", 8.0, &mut outbox));

        let player_id = sync.player_for(1).unwrap().clone();
        let player = sync.arena().get_player(&player_id).unwrap().clone();
        assert_eq!((player.x, player.y, player.score), (18, 10, 1));

        let collectibles = sync.arena().list_collectibles();
        assert_eq!(collectibles.len(), 1);
        assert_ne!(collectibles[0].id.as_str(), "target");

        // Both clients see the collection first, then the move
        for conn in [1, 2] {
            let received = outbox.received_by(conn);
            assert_eq!(received.len(), 2);
            match received[0] {
                Packet::CollectibleTaken {
                    player_id: taker,
                    collectible_id,
                    new_collectible,
                    score,
                } => {
                    assert_eq!(taker, &player_id);
                    assert_eq!(collectible_id.as_str(), "target");
                    assert_eq!(new_collectible, &collectibles[0]);
                    assert_eq!(*score, 1);
                }
                other => panic!("Expected collection, got {:?}", other),
            }
            assert_eq!(
                received[1],
                &Packet::PlayerMoved {
                    player: player.clone()
                }
            );
        }
    }

    #[test]
    fn test_population_never_empty_across_many_collections() {
        let mut sync = test_sync();
        let mut outbox = RecordingOutbox::default();
        join(&mut sync, &mut outbox, 1);

        for _ in 0..50 {
            let target = sync.arena().list_collectibles()[0].clone();
            place(&mut sync, 1, target.x - 8, target.y);
            assert!(sync.handle_move(1, "right", 8.0, &mut outbox));
            assert!(sync.arena().collectible_count() >= 1);
        }

        let player_id = sync.player_for(1).unwrap();
        assert_eq!(sync.arena().get_player(player_id).unwrap().score, 50);
    }

    #[test]
    fn test_disconnect_broadcasts_left_once() {
        let mut sync = test_sync();
        let mut outbox = RecordingOutbox::default();
        join(&mut sync, &mut outbox, 1);
        join(&mut sync, &mut outbox, 2);
        let leaving = sync.player_for(1).unwrap().clone();
        outbox.clear();

        outbox.unregister(1);
        assert!(sync.disconnect(1, &mut outbox));
        assert!(!sync.disconnect(1, &mut outbox));

        assert_eq!(sync.session_state(1), SessionState::Disconnected);
        assert!(sync.arena().get_player(&leaving).is_none());
        assert_eq!(
            outbox.received_by(2),
            vec![&Packet::PlayerLeft { id: leaving }]
        );
    }

    #[test]
    fn test_moves_after_disconnect_are_dropped() {
        let mut sync = test_sync();
        let mut outbox = RecordingOutbox::default();
        join(&mut sync, &mut outbox, 1);
        join(&mut sync, &mut outbox, 2);
        outbox.unregister(1);
        sync.disconnect(1, &mut outbox);
        outbox.clear();

        assert!(!sync.handle_move(1, "up", 8.0, &mut outbox));
        sync.handle_packet(
            1,
            Packet::Move {
                direction: "up".to_string(),
                pixels: 8.0,
            },
            &mut outbox,
        );

        assert!(outbox.sent.is_empty());
        assert_eq!(sync.arena().player_count(), 1);
    }

    #[test]
    fn test_unknown_connection_is_noop() {
        let mut sync = test_sync();
        let mut outbox = RecordingOutbox::default();

        assert!(!sync.handle_move(99, "up", 8.0, &mut outbox));
        assert!(!sync.disconnect(99, &mut outbox));
        assert!(outbox.sent.is_empty());
    }

    #[test]
    fn test_leave_packet_disconnects() {
        let mut sync = test_sync();
        let mut outbox = RecordingOutbox::default();
        join(&mut sync, &mut outbox, 1);

        sync.handle_packet(1, Packet::Leave, &mut outbox);
        assert_eq!(sync.session_state(1), SessionState::Disconnected);
        assert_eq!(sync.arena().player_count(), 0);
    }

    #[test]
    fn test_server_packets_from_client_are_ignored() {
        let mut sync = test_sync();
        let mut outbox = RecordingOutbox::default();
        join(&mut sync, &mut outbox, 1);
        outbox.clear();

        sync.handle_packet(
            1,
            Packet::PlayerLeft {
                id: PlayerId::new("p_1"),
            },
            &mut outbox,
        );

        assert!(outbox.sent.is_empty());
        assert_eq!(sync.arena().player_count(), 1);
    }

    #[test]
    fn test_rank_of_connection() {
        let mut sync = test_sync();
        let mut outbox = RecordingOutbox::default();
        join(&mut sync, &mut outbox, 1);
        join(&mut sync, &mut outbox, 2);

        // Equal scores: sequential ids p_2 and p_3 break the tie
        assert_eq!(sync.rank_of(1), Some(Rank { position: 1, total: 2 }));
        assert_eq!(sync.rank_of(2), Some(Rank { position: 2, total: 2 }));
        assert_eq!(sync.rank_of(3), None);
    }
}
