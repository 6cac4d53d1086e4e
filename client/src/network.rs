//! Client network layer: one TCP session to the arena server
//!
//! A reader task decodes frames into a channel. The main loop selects over
//! that channel, console lines and an optional bot timer, so sending never
//! waits on a frame that is only half received.

use crate::game::ClientGameState;
use crate::input::{InputCommand, InputManager, HELP};
use crate::rendering::Renderer;
use log::{debug, error, info, warn};
use shared::{read_packet, write_packet, Packet};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// A connected arena client
///
/// Owns the write half of the socket, the local mirror of the arena and the
/// input source. The read half lives in a background task.
pub struct Client {
    writer: OwnedWriteHalf,
    incoming: mpsc::UnboundedReceiver<Packet>,
    connected: bool,

    game_state: ClientGameState,
    input_manager: InputManager,
    renderer: Renderer,

    /// Random move interval when running as a bot
    bot_interval: Option<Duration>,
}

impl Client {
    /// Connects to `server_addr` and starts the reader task
    ///
    /// `bot_interval` switches the client into bot mode: console input is
    /// ignored and a random move is sent on every tick once the snapshot has
    /// arrived.
    pub async fn new(
        server_addr: &str,
        input_manager: InputManager,
        bot_interval: Option<Duration>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = TcpStream::connect(server_addr).await?;
        stream.set_nodelay(true)?;
        info!("Connected to {}", server_addr);

        let (reader, writer) = stream.into_split();
        let (incoming_tx, incoming) = mpsc::unbounded_channel();
        tokio::spawn(Self::read_loop(reader, incoming_tx));

        Ok(Client {
            writer,
            incoming,
            connected: true,
            game_state: ClientGameState::new(),
            input_manager,
            renderer: Renderer::default(),
            bot_interval,
        })
    }

    /// Frames are read in their own task; `read_packet` must not be cancelled
    /// halfway through a frame by the select loop.
    async fn read_loop(mut reader: OwnedReadHalf, incoming: mpsc::UnboundedSender<Packet>) {
        loop {
            match read_packet(&mut reader).await {
                Ok(Some(packet)) => {
                    if incoming.send(packet).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    info!("Server closed the connection");
                    break;
                }
                Err(e) => {
                    error!("Error receiving packet: {}", e);
                    break;
                }
            }
        }
    }

    async fn send_packet(&mut self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        write_packet(&mut self.writer, packet).await?;
        Ok(())
    }

    /// Logs and applies one server packet. The view is reprinted after
    /// changes caused by this client, except in bot mode.
    fn handle_packet(&mut self, packet: Packet) {
        match &packet {
            Packet::State { player_id, players, collectibles } => {
                info!(
                    "Joined as {} ({} players, {} collectibles)",
                    player_id,
                    players.len(),
                    collectibles.len()
                );
            }
            Packet::PlayerJoined { player } => info!("Player {} joined", player.id),
            Packet::PlayerLeft { id } => info!("Player {} left", id),
            Packet::CollectibleTaken { player_id, collectible_id, score, .. } => {
                info!("{} took {} (score {})", player_id, collectible_id, score);
            }
            Packet::PlayerMoved { player } => {
                debug!("{} at ({}, {})", player.id, player.x, player.y);
            }
            other => {
                warn!("Unexpected packet type: {:?}", other);
                return;
            }
        }

        let is_mine = match &packet {
            Packet::State { .. } => true,
            Packet::PlayerMoved { player } => Some(&player.id) == self.game_state.my_id.as_ref(),
            Packet::CollectibleTaken { player_id, .. } => Some(player_id) == self.game_state.my_id.as_ref(),
            _ => false,
        };

        if self.game_state.apply_packet(&packet) && is_mine && self.bot_interval.is_none() {
            println!("{}", self.renderer.render(&self.game_state));
        }
    }

    /// Returns false when the user asked to quit
    async fn handle_line(&mut self, line: &str) -> Result<bool, Box<dyn std::error::Error>> {
        for command in InputManager::parse_line(line) {
            match command {
                InputCommand::Move(direction) => {
                    let packet = self.input_manager.move_packet(direction);
                    self.send_packet(&packet).await?;
                }
                InputCommand::Help => println!("{}", HELP),
                InputCommand::Quit => return Ok(false),
            }
        }
        Ok(true)
    }

    /// Runs the session until the user quits or the server hangs up
    ///
    /// On a user quit a `Leave` packet is sent before returning, so the
    /// server announces the departure without waiting for the socket to
    /// close.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut bot_timer = interval(self.bot_interval.unwrap_or(Duration::from_secs(3600)));
        bot_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let bot = self.bot_interval.is_some();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = !bot;

        if !bot {
            println!("{}", HELP);
        }

        while self.connected {
            tokio::select! {
                packet = self.incoming.recv() => {
                    match packet {
                        Some(packet) => self.handle_packet(packet),
                        None => self.connected = false,
                    }
                },

                line = lines.next_line(), if stdin_open => {
                    match line {
                        Ok(Some(line)) => {
                            if !self.handle_line(&line).await? {
                                break;
                            }
                        }
                        Ok(None) => stdin_open = false,
                        Err(e) => {
                            error!("Error reading input: {}", e);
                            stdin_open = false;
                        }
                    }
                },

                _ = bot_timer.tick(), if bot && self.game_state.is_synced() => {
                    let packet = self.input_manager.random_move();
                    self.send_packet(&packet).await?;
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Leave).await;
        }

        info!(
            "Leaving with score {} ({}), {} moves sent",
            self.game_state.my_score(),
            self.game_state.rank_label(),
            self.input_manager.moves_sent()
        );

        Ok(())
    }
}
