use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};

use crate::codec::{decode_frame, Frame, FrameConfig, SYNC_BYTE};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 1024;

/// Reads complete frames from any `Read` byte source (serial port, file, socket).
///
/// Handles partial reads internally. A checksum failure is returned as an
/// error, but the reader stays usable: the damaged frame is gone and the
/// next call continues with the bytes that followed it.
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
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf)? {
                return Ok(frame);
            }
            self.resync();

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

    /// Drop noise that can never become a frame.
    fn resync(&mut self) {
        if !self.buf.contains(&SYNC_BYTE) {
            if !self.buf.is_empty() {
                tracing::trace!(dropped = self.buf.len(), "no sync byte in buffer");
            }
            self.buf.clear();
            return;
        }
        if self.buf.len() > self.config.max_buffer_size {
            // The sync byte at the front is a false positive announcing a
            // frame that will never fit; skip past it.
            tracing::warn!(
                buffered = self.buf.len(),
                max = self.config.max_buffer_size,
                "frame buffer limit exceeded, resynchronizing"
            );
            self.buf.advance(1);
        }
    }

    /// Number of bytes buffered but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying byte source.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying byte source.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner byte source.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Frame>;

    /// Yields frames and checksum errors until the source is exhausted.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_frame() {
            Err(FrameError::ConnectionClosed) => None,
            other => Some(other),
        }
    }
}
