//! Transport layer for the engine channel
//!
//! Handles moving whole frames over the byte stream shared with the engine.

mod tcp;

pub use tcp::{StreamTransport, TcpTransport};

use crate::error::Result;
use crate::packet::Frame;

/// Trait for transport implementations
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Send a complete frame
    async fn send_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Wait for and return the next complete frame
    async fn receive_frame(&mut self) -> Result<Frame>;

    /// Set the largest accepted incoming frame payload
    fn set_max_frame_size(&mut self, size: usize);

    /// Check if the transport is connected
    fn is_connected(&self) -> bool;

    /// Close the connection
    async fn close(&mut self) -> Result<()>;
}
