use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use drhd_transport::DeviceStream;
use tracing::debug;

use crate::codec::{decode_frame, FrameConfig};
use crate::command::{hexify, CommandFrame, FRAME_LEN};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 1024;

/// Reads complete command frames from any `Read` stream.
///
/// Handles partial reads and coalesced frames internally. Callers always get
/// complete frames; surplus bytes stay buffered for the next call.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<CommandFrame> {
        loop {
            if self.buf.len() >= FRAME_LEN {
                debug!(frame = %hexify(&self.buf[..FRAME_LEN]), "RECV <<");
            }
            if let Some(frame) = decode_frame(&mut self.buf)? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Number of received bytes not yet returned as a frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<DeviceStream> {
    /// Create a frame reader for `DeviceStream` and apply read timeout from config.
    pub fn with_config_stream(inner: DeviceStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: drhd_transport::TransportError) -> FrameError {
    match err {
        drhd_transport::TransportError::Io(io) => FrameError::Io(io),
        drhd_transport::TransportError::Bind { source, .. }
        | drhd_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
    }
}
