//! `tokio_util::codec` implementations of HTTP/1.1 message framing.
//!
//! - [`RequestDecoder`] turns the read buffer into a request head followed by
//!   payload items, stopping exactly at the end of each request.
//! - [`ResponseEncoder`] serializes a response head and then its payload
//!   with fixed-length, chunked or no-body framing.
//!
//! ```
//! use bytes::BytesMut;
//! use micro_rack::codec::RequestDecoder;
//! use micro_rack::protocol::Message;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from(&b"GET /hello HTTP/1.1\r\nHost: localhost\r\n\r\n"[..]);
//! match decoder.decode(&mut buffer).unwrap() {
//!     Some(Message::Header((header, _payload_size))) => assert_eq!(header.uri().path(), "/hello"),
//!     _ => unreachable!(),
//! }
//! ```

mod body;
mod header;
mod request_decoder;
mod response_encoder;

pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
