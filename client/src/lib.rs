//! # Arena Client Library
//!
//! A headless client for the arena server. It keeps a local mirror of the
//! arena, turns console input (or random bot input) into move commands, and
//! prints a character map with the leaderboard.
//!
//! ## Architecture Overview
//!
//! The server is authoritative. The client never predicts: it sends a move and
//! waits for the `PlayerMoved` echo before its own position changes locally.
//!
//! ### State Mirroring
//! The first packet on every connection is a full snapshot that already
//! includes the client's own player. Every later packet is a delta applied in
//! arrival order; deltas never reference state the snapshot lacks.
//!
//! ### Ranking
//! The leaderboard uses the same ordering as the server (score descending,
//! id ascending), so every client computes the same ranks from the same
//! state.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The arena mirror: snapshot and delta application, own score and rank.
//!
//! ### Input Module (`input`)
//! Console words and `w`/`a`/`s`/`d` runs mapped to moves of a fixed step,
//! plus random moves for bot mode.
//!
//! ### Network Module (`network`)
//! TCP connection, a reader task decoding frames, and the select loop tying
//! packets, console lines and the bot timer together.
//!
//! ### Rendering Module (`rendering`)
//! Text output: a coarse character map and the leaderboard.
//!
//! ## Usage Example
//!
//! ```rust
//! use client::game::ClientGameState;
//! use client::rendering::Renderer;
//! use shared::{Packet, Player, PlayerId};
//!
//! let mut state = ClientGameState::new();
//! state.apply_packet(&Packet::State {
//!     player_id: PlayerId::new("p_1"),
//!     players: vec![Player::new(PlayerId::new("p_1"), 40, 40)],
//!     collectibles: vec![],
//! });
//!
//! assert_eq!(state.rank_label(), "Rank: 1/1");
//! println!("{}", Renderer::default().render(&state));
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
