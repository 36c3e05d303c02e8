//! Stream transport implementation
//!
//! Frames over any byte stream. TCP is the production channel; tests run
//! the same code over an in-memory duplex pipe.

use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::{SessionConfig, DEFAULT_MAX_FRAME_SIZE};
use crate::constants::FRAME_HEADER_SIZE;
use crate::error::{Error, Result};
use crate::packet::{parse_frame_length, Frame};

use super::Transport;

/// Frame transport over a byte stream
pub struct StreamTransport<S> {
    /// The underlying stream, `None` once closed
    stream: Option<S>,
    /// Largest accepted incoming frame payload
    max_frame_size: usize,
}

/// Transport over a TCP connection to the engine
pub type TcpTransport = StreamTransport<TcpStream>;

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already-connected stream
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Set the largest accepted frame payload
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    fn stream_mut(&mut self) -> Result<&mut S> {
        self.stream.as_mut().ok_or(Error::ConnectionClosed)
    }

    /// Read exactly `buf.len()` bytes from the stream
    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let stream = self.stream_mut()?;
        stream.read_exact(buf).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::ConnectionClosed
            } else {
                Error::Io(e)
            }
        })?;
        Ok(())
    }
}

impl TcpTransport {
    /// Connect to the engine using a SessionConfig
    pub async fn connect(config: &SessionConfig) -> Result<Self> {
        Self::connect_addr(&config.socket_addr(), config.connect_timeout)
            .await
            .map(|t| t.max_frame_size(config.max_frame_size))
    }

    /// Connect to the specified address
    pub async fn connect_addr(addr: &str, connect_timeout: Duration) -> Result<Self> {
        let stream = timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::ConnectionTimeout(connect_timeout))?
            .map_err(Error::Io)?;

        stream.set_nodelay(true).map_err(Error::Io)?;

        tracing::debug!(addr = addr, "Connected to engine");
        Ok(Self::new(stream))
    }
}

#[async_trait::async_trait]
impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        let bytes = frame.to_bytes();
        let stream = self.stream_mut()?;
        stream.write_all(&bytes).await.map_err(Error::Io)?;
        stream.flush().await.map_err(Error::Io)?;
        tracing::trace!(code = frame.code, len = bytes.len(), "Sent frame");
        Ok(())
    }

    async fn receive_frame(&mut self) -> Result<Frame> {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        self.read_exact(&mut header).await?;
        let size = parse_frame_length(header, self.max_frame_size)?;

        let mut payload = vec![0u8; size];
        self.read_exact(&mut payload).await?;
        let frame = Frame::from_payload(Bytes::from(payload))?;
        tracing::trace!(code = frame.code, len = size, "Received frame");
        Ok(frame)
    }

    fn set_max_frame_size(&mut self, size: usize) {
        self.max_frame_size = size;
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await.map_err(Error::Io)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_frame_roundtrip_over_duplex() {
        let (a, b) = duplex(1024);
        let mut left = StreamTransport::new(a);
        let mut right = StreamTransport::new(b);

        let frame = Frame::new(4, Bytes::new());
        left.send_frame(&frame).await.unwrap();
        let got = right.receive_frame().await.unwrap();
        assert_eq!(got.code, 4);
        assert!(got.body.is_empty());
    }

    #[tokio::test]
    async fn test_peer_close_is_connection_closed() {
        let (a, b) = duplex(64);
        let mut right = StreamTransport::new(b);
        drop(a);
        assert!(matches!(right.receive_frame().await, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (a, b) = duplex(1024);
        let mut left = StreamTransport::new(a);
        let mut right = StreamTransport::new(b).max_frame_size(8);

        left.send_frame(&Frame::new(1, Bytes::from_static(&[0u8; 16])))
            .await
            .unwrap();
        assert!(matches!(
            right.receive_frame().await,
            Err(Error::FrameTooLarge { size: 20, limit: 8 })
        ));
    }

    #[tokio::test]
    async fn test_closed_transport() {
        let (a, _b) = duplex(64);
        let mut t = StreamTransport::new(a);
        assert!(t.is_connected());
        t.close().await.unwrap();
        assert!(!t.is_connected());
        assert!(matches!(
            t.send_frame(&Frame::new(1, Bytes::new())).await,
            Err(Error::ConnectionClosed)
        ));
    }
}
