//! # Arena Server Library
//!
//! This library provides the authoritative server for a small realtime
//! multiplayer arena. Players connect, move around a fixed rectangle, pick up
//! collectibles for points, and every client sees the same state through a
//! snapshot on join followed by incremental deltas.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Clients only ever send movement commands. The server validates them,
//! clamps positions into the arena, resolves collisions against collectibles
//! and keeps the scores. Clients render whatever the server tells them.
//!
//! ### Session Lifecycle
//! Each TCP connection is one session, `Connecting -> Active -> Disconnected`:
//! - A joining client receives the full state, already including itself
//! - Everyone else is then told about the new player
//! - On disconnect the player is removed and the departure announced once
//!
//! ### Delta Broadcasting
//! Accepted moves, collections and departures are pushed to every connected
//! client as they happen. Rejected commands produce no traffic at all; the
//! protocol has no error reply.
//!
//! ## Architecture Design
//!
//! ### Single Event Timeline
//! Network tasks only decode frames and forward them into one channel. The
//! main loop applies events one at a time, each including its broadcasts, so
//! the arena needs no lock and no client can observe a half-applied move.
//!
//! ### Injected Collaborators
//! The arena store, the spawner and the id generator are owned values handed
//! to the protocol, never globals. Tests substitute sequential ids and a
//! seeded random source for fully reproducible runs.
//!
//! ## Module Organization
//!
//! - `arena`: the state store owning all players and collectibles
//! - `movement`: command validation, clamping and collision resolution
//! - `spawner`: random collectible placement and minimum population
//! - `sync`: the session state machine and broadcast contract
//! - `client_manager`: registered connections and their outbound queues
//! - `network`: TCP accept, per-connection reader/writer tasks, main loop
//! - `config`: arena configuration and validation
//! - `utils`: timestamps and id generators
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ArenaConfig;
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(
//!         "127.0.0.1:3000",
//!         ArenaConfig::default(),
//!         32,                       // max clients
//!         Duration::from_secs(10), // stats log interval
//!     )
//!     .await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod arena;
pub mod client_manager;
pub mod config;
pub mod movement;
pub mod network;
pub mod spawner;
pub mod sync;
pub mod utils;
