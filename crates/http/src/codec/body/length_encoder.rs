use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::warn;

use crate::protocol::{PayloadItem, SendError};

/// Writes a body whose length was declared in `Content-Length`.
///
/// Bytes beyond the declared length are dropped; reaching `Eof` before the
/// declared length is an error, since the peer would otherwise wait for
/// bytes that never come.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    remaining: u64,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length }
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(mut bytes) => {
                let available = bytes.remaining() as u64;
                if available > self.remaining {
                    warn!(declared_remaining = self.remaining, available, "response body exceeds content-length, truncating");
                }

                let mut to_write = usize::try_from(self.remaining).map_or(bytes.remaining(), |remaining| remaining.min(bytes.remaining()));
                self.remaining -= to_write as u64;
                dst.reserve(to_write);
                while to_write > 0 {
                    let chunk = bytes.chunk();
                    let len = chunk.len().min(to_write);
                    dst.extend_from_slice(&chunk[..len]);
                    bytes.advance(len);
                    to_write -= len;
                }
                Ok(())
            }
            PayloadItem::Eof if self.remaining > 0 => {
                Err(SendError::invalid_body(format!("response body is {} bytes shorter than content-length", self.remaining)))
            }
            PayloadItem::Eof => Ok(()),
        }
    }
}
