//! One-record-per-connection framing.
//!
//! A frame is a 4-byte big-endian length followed by a JSON document. The
//! sender opens a connection, writes a single frame and shuts its write half
//! down; the receiver decodes exactly one frame and drops the connection.

use std::io;
use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpSocket, TcpStream, lookup_host};
use tokio_util::codec::{Decoder, Encoder, Framed, LengthDelimitedCodec};
use tracing::trace;

use crate::error::{ChatError, Result};
use crate::messages::Message;

/// Largest accepted frame payload.
pub const MAX_FRAME_LENGTH: usize = 64 * 1024;

/// Frames values of type `T` (a [`Message`], or the bootstrap reply string).
#[derive(Debug)]
pub struct RecordCodec<T> {
    frames: LengthDelimitedCodec,
    _record: PhantomData<fn() -> T>,
}

impl<T> RecordCodec<T> {
    pub fn new() -> Self {
        Self {
            frames: LengthDelimitedCodec::builder()
                .max_frame_length(MAX_FRAME_LENGTH)
                .new_codec(),
            _record: PhantomData,
        }
    }
}

impl<T> Default for RecordCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> Decoder for RecordCodec<T> {
    type Item = T;
    type Error = ChatError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<T>> {
        match self.frames.decode(src).map_err(ChatError::Frame)? {
            Some(frame) => Ok(Some(serde_json::from_slice(&frame)?)),
            None => Ok(None),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<T>> {
        match self.decode(src)? {
            Some(record) => Ok(Some(record)),
            None if src.is_empty() => Ok(None),
            // Peer hung up in the middle of a frame.
            None => Err(ChatError::Closed),
        }
    }
}

impl<T: Serialize> Encoder<T> for RecordCodec<T> {
    type Error = ChatError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<()> {
        let payload = serde_json::to_vec(&item)?;
        self.frames.encode(Bytes::from(payload), dst)?;
        Ok(())
    }
}

pub fn framed<S, T>(stream: S) -> Framed<S, RecordCodec<T>>
where
    S: AsyncRead + AsyncWrite,
{
    Framed::new(stream, RecordCodec::new())
}

/// Reads the single record carried by a connection.
pub async fn read_record<S, T>(framed: &mut Framed<S, RecordCodec<T>>) -> Result<T>
where
    S: AsyncRead + AsyncWrite + Unpin,
    T: DeserializeOwned,
{
    match framed.next().await {
        Some(record) => record,
        None => Err(ChatError::Closed),
    }
}

/// Resolves `addr` and connects to the first address that accepts.
pub async fn connect(addr: &str) -> Result<TcpStream> {
    connect_with(addr, |_| Ok(())).await
}

/// Like [`connect`], but lets the caller set socket options before each
/// attempt.
pub async fn connect_with<F>(addr: &str, configure: F) -> Result<TcpStream>
where
    F: Fn(&TcpSocket) -> io::Result<()>,
{
    let resolved = lookup_host(addr).await.map_err(|source| ChatError::Connect {
        addr: addr.to_string(),
        source,
    })?;

    let mut last_error = None;
    for candidate in resolved {
        let attempt = async {
            let socket = if candidate.is_ipv4() { TcpSocket::new_v4()? } else { TcpSocket::new_v6()? };
            configure(&socket)?;
            socket.connect(candidate).await
        };
        match attempt.await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                trace!(%candidate, error = %e, "connect attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(ChatError::Connect {
        addr: addr.to_string(),
        source: last_error
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses resolved")),
    })
}

/// Opens a fresh connection to `addr`, writes `message` and closes it.
pub async fn send_record(addr: &str, message: Message) -> Result<()> {
    let stream = connect(addr).await?;
    let mut framed = framed::<_, Message>(stream);
    trace!(%addr, %message, "sending record");
    framed.send(message).await?;
    framed.close().await?;
    Ok(())
}
