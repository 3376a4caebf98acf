//! Payload framing in both directions.
//!
//! Requests are decoded by [`PayloadDecoder`] (content-length, chunked, or no
//! body); responses are encoded by [`PayloadEncoder`] with the framing the
//! response framer picked.

mod chunked_decoder;
mod chunked_encoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
