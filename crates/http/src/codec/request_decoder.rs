//! Streaming request decoding.
//!
//! [`RequestDecoder`] alternates between two phases: it decodes a request
//! head with [`HeaderDecoder`], then hands the buffer to a [`PayloadDecoder`]
//! until the body's end is reached, then goes back to heads. Exactly the bytes
//! of the current request are consumed, so the read buffer is left at the
//! start of the next request on a kept-alive connection.

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};

/// `payload_decoder` is `None` while a head is expected.
#[derive(Debug, Default)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHeader, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    self.payload_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };

            return Ok(message);
        }

        let message = match self.header_decoder.decode(src)? {
            Some((header, payload_size)) => {
                self.payload_decoder = Some(payload_size.into());
                Some(Message::Header((header, payload_size)))
            }
            None => None,
        };

        Ok(message)
    }

    /// A peer that hangs up in the middle of a request ends the stream like a
    /// clean close: the partial request is dropped.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let message = self.decode(src)?;
        if message.is_none() && (!src.is_empty() || self.payload_decoder.is_some()) {
            trace!(remaining = src.len(), "peer closed the connection with a partial request");
            src.clear();
            self.payload_decoder = None;
        }
        Ok(message)
    }
}
