//! Wire protocol between the arena server and its clients
//!
//! Every message travels as one frame: a 4-byte big-endian length followed by
//! the bincode encoding of a [`Packet`]. One TCP stream carries one session.

use crate::{Collectible, CollectibleId, Player, PlayerId};
use bincode::{deserialize, serialize};
use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame body
pub const MAX_FRAME_LEN: usize = 64 * 1024;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    // Client -> server
    /// Direction and distance are carried raw and validated by the server.
    Move {
        direction: String,
        pixels: f64,
    },
    Leave,

    // Server -> client
    State {
        player_id: PlayerId,
        players: Vec<Player>,
        collectibles: Vec<Collectible>,
    },
    PlayerJoined {
        player: Player,
    },
    PlayerMoved {
        player: Player,
    },
    CollectibleTaken {
        player_id: PlayerId,
        collectible_id: CollectibleId,
        new_collectible: Collectible,
        score: u32,
    },
    PlayerLeft {
        id: PlayerId,
    },
}

fn invalid_data<E>(err: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, err)
}

/// Encodes a packet with its length prefix
pub fn encode_frame(packet: &Packet) -> io::Result<Vec<u8>> {
    let body = serialize(packet).map_err(invalid_data)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(invalid_data(format!(
            "frame of {} bytes exceeds limit of {}",
            body.len(),
            MAX_FRAME_LEN
        )));
    }

    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

pub fn decode_packet(body: &[u8]) -> Result<Packet, bincode::Error> {
    deserialize(body)
}

/// Reads one frame body. Returns `Ok(None)` when the peer closed the stream
/// on a frame boundary. A stream that ends inside the length header or the
/// body is reported as `InvalidData`.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    let filled = reader.read(&mut header).await?;
    if filled == 0 {
        return Ok(None);
    }
    reader
        .read_exact(&mut header[filled..])
        .await
        .map_err(truncated)?;

    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(invalid_data(format!(
            "frame of {} bytes exceeds limit of {}",
            len, MAX_FRAME_LEN
        )));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(truncated)?;
    Ok(Some(body))
}

fn truncated(err: io::Error) -> io::Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        invalid_data("stream ended inside a frame")
    } else {
        err
    }
}

/// Reads and decodes one packet, treating undecodable bodies as errors
pub async fn read_packet<R>(reader: &mut R) -> io::Result<Option<Packet>>
where
    R: AsyncRead + Unpin,
{
    match read_frame(reader).await? {
        Some(body) => decode_packet(&body).map(Some).map_err(invalid_data),
        None => Ok(None),
    }
}

pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(packet)?;
    writer.write_all(&frame).await?;
    writer.flush().await
}
