//! Server network layer: TCP sessions feeding a single event loop

use crate::client_manager::{ClientManager, OUTBOUND_QUEUE_LEN};
use crate::config::ArenaConfig;
use crate::sync::{ArenaSync, ConnectionId};
use crate::utils::IdGenerator;
use log::{debug, error, info, warn};
use shared::{decode_packet, leaderboard, read_frame, write_packet, Packet};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    /// A new stream. `outbound` feeds its writer task; dropping `close`
    /// stops its reader task.
    ClientConnected {
        conn_id: ConnectionId,
        addr: SocketAddr,
        outbound: mpsc::Sender<Packet>,
        close: oneshot::Sender<()>,
    },
    PacketReceived {
        conn_id: ConnectionId,
        packet: Packet,
    },
    ClientDisconnected {
        conn_id: ConnectionId,
    },
    Shutdown,
}

/// Main server coordinating connections and the arena
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    clients: ClientManager,
    game: ArenaSync,
    stats_interval: Duration,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        config: ArenaConfig,
        max_clients: usize,
        stats_interval: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;
        Self::with_game(addr, ArenaSync::new(config), max_clients, stats_interval).await
    }

    /// Same as [`Server::new`] but with deterministic entity ids
    pub async fn with_id_generator(
        addr: &str,
        config: ArenaConfig,
        ids: Box<dyn IdGenerator>,
        max_clients: usize,
        stats_interval: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;
        let game = ArenaSync::with_id_generator(config, ids);
        Self::with_game(addr, game, max_clients, stats_interval).await
    }

    async fn with_game(
        addr: &str,
        game: ArenaSync,
        max_clients: usize,
        stats_interval: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            clients: ClientManager::new(max_clients),
            game,
            stats_interval,
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sender that can stop the loop with [`ServerMessage::Shutdown`]
    pub fn handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    pub fn game(&self) -> &ArenaSync {
        &self.game
    }

    /// Spawns task that accepts connections and starts their reader and writer
    fn spawn_acceptor(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut next_conn_id: ConnectionId = 1;

            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let conn_id = next_conn_id;
                        next_conn_id = next_conn_id.wrapping_add(1);

                        if let Err(e) = stream.set_nodelay(true) {
                            warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                        }

                        if !Self::spawn_connection(stream, addr, conn_id, &server_tx) {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Registers a new stream with the main loop. Returns false once the loop is gone.
    fn spawn_connection(
        stream: TcpStream,
        addr: SocketAddr,
        conn_id: ConnectionId,
        server_tx: &mpsc::UnboundedSender<ServerMessage>,
    ) -> bool {
        let (read_half, write_half) = stream.into_split();
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_LEN);
        let (close, close_rx) = oneshot::channel();

        // Queued before the reader exists, so the loop sees the connect first
        if server_tx
            .send(ServerMessage::ClientConnected {
                conn_id,
                addr,
                outbound,
                close,
            })
            .is_err()
        {
            error!("Main loop closed, refusing connection from {}", addr);
            return false;
        }

        tokio::spawn(Self::write_loop(conn_id, write_half, outbound_rx));
        tokio::spawn(Self::read_loop(
            conn_id,
            read_half,
            server_tx.clone(),
            close_rx,
        ));
        true
    }

    /// Forwards decoded packets until the peer closes, the stream breaks or
    /// the connection is unregistered. In the last case the main loop has
    /// already dropped the connection, so nothing is reported back and the
    /// read half is released right away.
    async fn read_loop(
        conn_id: ConnectionId,
        mut reader: OwnedReadHalf,
        server_tx: mpsc::UnboundedSender<ServerMessage>,
        mut close: oneshot::Receiver<()>,
    ) {
        loop {
            let frame = tokio::select! {
                frame = read_frame(&mut reader) => frame,
                _ = &mut close => {
                    debug!("Connection {} unregistered, closing reader", conn_id);
                    return;
                }
            };

            match frame {
                Ok(Some(body)) => match decode_packet(&body) {
                    Ok(packet) => {
                        if server_tx
                            .send(ServerMessage::PacketReceived { conn_id, packet })
                            .is_err()
                        {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("Dropping undecodable frame from connection {}: {}", conn_id, e);
                    }
                },
                Ok(None) => {
                    debug!("Connection {} closed by peer", conn_id);
                    break;
                }
                Err(e) => {
                    warn!("Connection {} read error: {}", conn_id, e);
                    break;
                }
            }
        }

        let _ = server_tx.send(ServerMessage::ClientDisconnected { conn_id });
    }

    async fn write_loop(
        conn_id: ConnectionId,
        mut writer: OwnedWriteHalf,
        mut outbound: mpsc::Receiver<Packet>,
    ) {
        while let Some(packet) = outbound.recv().await {
            if let Err(e) = write_packet(&mut writer, &packet).await {
                error!("Failed to send to connection {}: {}", conn_id, e);
                break;
            }
        }

        let _ = writer.shutdown().await;
    }

    /// Applies one event to the arena, including every broadcast it causes,
    /// then evicts connections that could not keep up with those broadcasts
    fn handle_message(&mut self, message: ServerMessage) {
        self.apply_message(message);
        self.evict_lagging();
    }

    fn apply_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::ClientConnected {
                conn_id,
                addr,
                outbound,
                close,
            } => {
                if !self.clients.add_client(conn_id, addr, outbound, close) {
                    warn!(
                        "Rejecting connection {} from {}: server full ({} clients)",
                        conn_id,
                        addr,
                        self.clients.max_clients()
                    );
                    return;
                }
                self.game.connect(conn_id, &mut self.clients);
            }

            ServerMessage::PacketReceived {
                conn_id,
                packet: Packet::Leave,
            }
            | ServerMessage::ClientDisconnected { conn_id } => {
                // Unregister first so the departing client is not sent its own departure
                self.clients.remove_client(&conn_id);
                self.game.disconnect(conn_id, &mut self.clients);
            }

            ServerMessage::PacketReceived { conn_id, packet } => {
                self.game.handle_packet(conn_id, packet, &mut self.clients);
            }

            ServerMessage::Shutdown => {}
        }
    }

    /// Drops every connection whose queue overflowed. Announcing a departure
    /// can overflow further queues, so this repeats until none are left.
    fn evict_lagging(&mut self) {
        loop {
            let lagging = self.clients.take_lagging();
            if lagging.is_empty() {
                break;
            }

            for conn_id in lagging {
                warn!("Evicting connection {}: not reading its packets", conn_id);
                self.clients.remove_client(&conn_id);
                self.game.disconnect(conn_id, &mut self.clients);
            }
        }
    }

    fn log_stats(&self) {
        if self.clients.is_empty() {
            return;
        }

        let arena = self.game.arena();
        let players = arena.list_players();
        let leader = leaderboard(&players)
            .first()
            .map(|p| format!("{} ({})", p.id, p.score))
            .unwrap_or_else(|| "none".to_string());

        debug!(
            "{} clients, {} players, {} collectibles, leader: {}",
            self.clients.len(),
            arena.player_count(),
            arena.collectible_count(),
            leader
        );
    }

    /// Main server loop: events are applied one at a time, in arrival order
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_acceptor();

        let mut stats_timer = interval(self.stats_interval);
        stats_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                        Some(message) => self.handle_message(message),
                    }
                },

                _ = stats_timer.tick() => {
                    self.log_stats();
                },
            }
        }

        Ok(())
    }
}
