//! Client connection management for the arena server
//!
//! This module tracks every accepted connection together with the queue that
//! feeds its writer task. It is the server's broadcast primitive:
//! - Registration with capacity enforcement
//! - Delivery to a single connection
//! - Broadcast to all connections, optionally skipping one
//! - Detection of connections that stopped reading
//!
//! Queues are bounded and owned by per-connection writer tasks, so sending
//! never blocks the event loop. A connection whose queue fills up is marked
//! as lagging and receives nothing further; the server evicts it after the
//! current event. Dropping a [`Client`] closes both halves of its socket.

use crate::sync::{ConnectionId, Outbox};
use log::{debug, info, warn};
use shared::Packet;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};

/// Packets a connection may have queued before it counts as lagging
pub const OUTBOUND_QUEUE_LEN: usize = 1024;

/// Result of queueing one packet for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// The queue is at capacity; the peer is not reading fast enough
    Full,
    /// The writer task is gone
    Closed,
}

/// A registered connection and its outbound queue
///
/// Each client holds:
/// - Connection metadata (ID, peer address, connect time)
/// - The sending side of its writer task's queue
/// - The close signal watched by its reader task
///
/// Dropping the client drops both, which ends the writer after it flushes
/// what is already queued and stops the reader at once.
#[derive(Debug)]
pub struct Client {
    /// Connection identifier assigned by the acceptor, never reused
    pub id: ConnectionId,
    /// Peer address, kept for logging
    pub addr: SocketAddr,
    pub connected_at: Instant,
    /// Packets queued for this connection so far
    pub packets_sent: u64,
    /// Set once the queue overflowed; no further packets are queued
    pub lagging: bool,
    outbound: mpsc::Sender<Packet>,
    _close: oneshot::Sender<()>,
}

impl Client {
    /// Creates a client around the channels of its writer and reader tasks
    ///
    /// `close` is never sent on. Its receiver resolves when the client is
    /// dropped, which is the reader task's signal to release the socket.
    pub fn new(
        id: ConnectionId,
        addr: SocketAddr,
        outbound: mpsc::Sender<Packet>,
        close: oneshot::Sender<()>,
    ) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            packets_sent: 0,
            lagging: false,
            outbound,
            _close: close,
        }
    }

    /// Queues a packet without waiting
    ///
    /// A full queue marks the client as lagging. Later calls return
    /// [`Delivery::Full`] without touching the queue, so a lagging client
    /// never sees a stream with gaps in it.
    pub fn send(&mut self, packet: Packet) -> Delivery {
        if self.lagging {
            return Delivery::Full;
        }

        match self.outbound.try_send(packet) {
            Ok(()) => {
                self.packets_sent += 1;
                Delivery::Queued
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    "Connection {} has {} packets queued, marking it as lagging",
                    self.id,
                    self.outbound.max_capacity()
                );
                self.lagging = true;
                Delivery::Full
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Connection {} writer closed, dropping packet", self.id);
                Delivery::Closed
            }
        }
    }

    /// Time since the connection was registered
    pub fn uptime(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Manages all registered connections
///
/// The ClientManager enforces the server's capacity limit and is the only
/// path packets take to the network. Connections that overflow their queue
/// are collected here until the server evicts them.
pub struct ClientManager {
    clients: HashMap<ConnectionId, Client>,
    max_clients: usize,
    lagging: Vec<ConnectionId>,
}

impl ClientManager {
    /// Creates an empty manager accepting at most `max_clients` connections
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            max_clients,
            lagging: Vec::new(),
        }
    }

    /// Registers a connection
    ///
    /// Returns false if the server is at capacity or the id is already taken.
    /// The channels are dropped in that case, which closes the connection
    /// without sending it anything.
    pub fn add_client(
        &mut self,
        id: ConnectionId,
        addr: SocketAddr,
        outbound: mpsc::Sender<Packet>,
        close: oneshot::Sender<()>,
    ) -> bool {
        if self.clients.len() >= self.max_clients || self.clients.contains_key(&id) {
            return false;
        }

        info!("Client {} connected from {}", id, addr);
        self.clients
            .insert(id, Client::new(id, addr, outbound, close));
        true
    }

    /// Unregisters a connection and closes its socket
    ///
    /// Returns false if the id was not registered.
    pub fn remove_client(&mut self, id: &ConnectionId) -> bool {
        if let Some(client) = self.clients.remove(id) {
            info!(
                "Client {} disconnected after {:.1}s ({} packets sent)",
                client.id,
                client.uptime().as_secs_f32(),
                client.packets_sent
            );
            true
        } else {
            false
        }
    }

    /// Connections whose queue overflowed since the last call
    pub fn take_lagging(&mut self) -> Vec<ConnectionId> {
        std::mem::take(&mut self.lagging)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    fn deliver(client: &mut Client, packet: &Packet, lagging: &mut Vec<ConnectionId>) {
        if client.lagging {
            return;
        }
        if client.send(packet.clone()) == Delivery::Full {
            lagging.push(client.id);
        }
    }
}

impl Outbox for ClientManager {
    fn send_to(&mut self, conn: ConnectionId, packet: &Packet) {
        if let Some(client) = self.clients.get_mut(&conn) {
            Self::deliver(client, packet, &mut self.lagging);
        }
    }

    fn broadcast(&mut self, packet: &Packet, exclude: Option<ConnectionId>) {
        for (id, client) in self.clients.iter_mut() {
            if Some(*id) == exclude {
                continue;
            }
            Self::deliver(client, packet, &mut self.lagging);
        }
    }
}
