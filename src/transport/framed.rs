//! Length-prefixed framing with full-write and full-read semantics.
//!
//! One frame on the wire is a 4-byte unsigned big-endian length followed by
//! exactly that many payload bytes. The payload is opaque here; every
//! protocol phase reuses this layer unchanged.
//!
//! Partial reads and writes from the underlying stream are looped over until
//! the frame is complete; only a terminal I/O error (or the peer closing
//! mid-frame) fails the operation.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ClientError, Result};

/// Frame length header size in bytes.
pub const LEN_PREFIX_SIZE: usize = 4;

/// Largest reply payload this client accepts. A longer declared length is a
/// protocol violation, not an allocation request.
pub const MAX_REPLY_BYTES: u32 = 1024 * 1024;

/// A stream connection wrapped with the framing protocol.
pub struct FramedStream<S> {
    stream: S,
    max_reply: u32,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            max_reply: MAX_REPLY_BYTES,
        }
    }

    /// Wrap a stream with a custom reply size cap.
    pub fn with_max_reply(stream: S, max_reply: u32) -> Self {
        Self { stream, max_reply }
    }

    /// Send one frame: length header, then the payload, fully written.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] on a terminal write failure and
    /// [`ClientError::Protocol`] when the payload does not fit the 4-byte
    /// length header.
    pub async fn send_frame(&mut self, payload: &[u8]) -> Result<()> {
        let len = u32::try_from(payload.len()).map_err(|_| {
            ClientError::Protocol(format!("payload of {} bytes overflows the frame header", payload.len()))
        })?;

        // write_all loops internally until every byte is out or the write
        // fails, which is exactly the full-write contract.
        self.stream.write_all(&len.to_be_bytes()).await?;
        self.stream.write_all(payload).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Receive one frame, blocking until the full payload arrived.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectionClosed`] when the peer closes before
    /// a full frame was read — never an empty payload — and
    /// [`ClientError::Protocol`] when the declared length exceeds the reply
    /// cap.
    pub async fn recv_frame(&mut self) -> Result<Bytes> {
        let mut header = [0u8; LEN_PREFIX_SIZE];
        self.stream
            .read_exact(&mut header)
            .await
            .map_err(map_closed)?;

        let len = u32::from_be_bytes(header);
        if len > self.max_reply {
            return Err(ClientError::Protocol(format!(
                "declared reply length {len} exceeds the {} byte cap",
                self.max_reply
            )));
        }

        let mut payload = vec![0u8; len as usize];
        self.stream
            .read_exact(&mut payload)
            .await
            .map_err(map_closed)?;
        Ok(Bytes::from(payload))
    }

    /// Shut down the write half of the connection. Errors are reported but a
    /// second call is never attempted by the owner.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Consume the wrapper and return the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

fn map_closed(err: std::io::Error) -> ClientError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        ClientError::ConnectionClosed
    } else {
        ClientError::Io(err)
    }
}
